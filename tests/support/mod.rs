use std::net::TcpStream;
use std::thread;

use timepage::{PageConfig, Responder, ResponderConfig, Server, ServerConfig};

/// Creates a server on a random port and a client connected to it.
pub fn new_one_server_one_client() -> (Server, TcpStream) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(server.server_addr()).unwrap();
    (server, client)
}

/// Binds a responder to a random port without starting to serve.
pub fn bind_random_port_responder() -> Responder {
    let config = ResponderConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
        },
        page: PageConfig::default(),
    };

    Responder::bind(config).unwrap()
}

/// Spawns a responder serving the time page and returns a connected client.
pub fn new_client_to_time_page_server() -> TcpStream {
    let responder = bind_random_port_responder();
    let addr = responder.server_addr();

    thread::spawn(move || responder.serve_forever());

    TcpStream::connect(addr).unwrap()
}
