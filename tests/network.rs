use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;

#[allow(dead_code)]
mod support;

#[test]
fn ten_concurrent_requests_all_succeed() {
    let responder = support::bind_random_port_responder();
    let addr = responder.server_addr();

    thread::spawn(move || responder.serve_forever());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            thread::spawn(move || {
                let mut client = TcpStream::connect(addr).unwrap();
                write!(
                    client,
                    "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
                )
                .unwrap();

                let mut content = String::new();
                client.read_to_string(&mut content).unwrap();

                assert!(content.starts_with("HTTP/1.1 200 OK\r\n"));
                assert!(content.contains("</html>"));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn pipelined_requests_are_all_answered() {
    let mut client = support::new_client_to_time_page_server();

    write!(client, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
    write!(client, "GET /two HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
    write!(
        client,
        "GET /three HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();

    assert_eq!(content.matches("HTTP/1.1 200 OK").count(), 3);
    assert_eq!(content.matches("</html>").count(), 3);
}

#[test]
fn http_1_0_connection_closes_after_the_response() {
    let mut client = support::new_client_to_time_page_server();

    write!(client, "GET / HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();

    // if the connection were kept alive, this read would never finish
    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();

    assert!(content.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(content.contains("</html>"));
}

#[test]
fn second_bind_on_the_same_port_fails() {
    let first = timepage::Server::http("127.0.0.1:0").unwrap();

    assert!(timepage::Server::http(first.server_addr()).is_err());
}

#[test]
fn malformed_request_line_gets_400() {
    let mut client = support::new_client_to_time_page_server();

    write!(client, "garbage\r\n\r\n").unwrap();

    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();

    assert!(content.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[test]
fn abandoned_request_still_gets_a_response() {
    let (server, mut client) = support::new_one_server_one_client();

    write!(
        client,
        "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    thread::spawn(move || {
        let request = server.recv().unwrap();
        // oops, handler gives up
        drop(request);
    });

    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();

    assert!(content.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
}

#[test]
fn try_recv_does_not_block() {
    let (server, _client) = support::new_one_server_one_client();

    assert!(server.try_recv().unwrap().is_none());
}

#[test]
fn connection_count_tracks_open_clients() {
    let (server, mut client) = support::new_one_server_one_client();

    // keep-alive, so the connection stays open while we look at the gauge
    write!(client, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();

    let request = server.recv().unwrap();
    assert_eq!(server.num_connections(), 1);

    request
        .respond(timepage::Response::from_string("bye"))
        .unwrap();
}
