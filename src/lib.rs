/*!
Minimal diagnostic HTTP server.

The crate answers one question: can this host accept and answer TCP/HTTP
connections? It binds a listener, and replies to every GET request -
whatever the path - with a small HTML page embedding the current server
time. There is no routing and no application framework involved.

# Simple usage

The whole diagnostic surface is the [`Responder`]:

```no_run
use timepage::{Responder, ResponderConfig};

let responder = Responder::bind(ResponderConfig::default()).unwrap();
println!("Server running at http://localhost:8000/");
responder.serve_forever();
```

# Using the server directly

The embedded [`Server`] can also be driven by hand, which is what the test
suite does. `recv()` blocks until the next request is available:

```no_run
use timepage::{Response, Server};

let server = Server::http("0.0.0.0:8000").unwrap();

for request in server.incoming_requests() {
    request.respond(Response::from_string("hello")).unwrap();
}
```

Requests from one connection are delivered in order, requests from distinct
connections interleave freely, and no state is shared between them: handling
may be spread over several threads without synchronization.
*/

use std::error::Error;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::client::ClientConnection;
use crate::log::*;
use crate::util::{MessagesQueue, RefinedTcpStream, TaskPool};

pub use crate::common::{Header, HeaderField, HttpVersion, Method, StatusCode};
pub use crate::page::{PageConfig, ResponsePage, TIMESTAMP_FORMAT};
pub use crate::request::Request;
pub use crate::responder::{Responder, ResponderConfig};
pub use crate::response::Response;

mod client;
mod common;
mod log;
mod page;
mod request;
mod responder;
mod response;
mod util;

/// Settings for the listening socket.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    /// All interfaces, port 8000.
    fn default() -> ServerConfig {
        ServerConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

/// The listening part of the crate.
///
/// Accepting connections starts as soon as the `Server` is built. Requests
/// are obtained with [`recv`](Server::recv), [`try_recv`](Server::try_recv)
/// or the [`incoming_requests`](Server::incoming_requests) iterator.
pub struct Server {
    // queue the background threads feed and `recv` consumes
    messages: Arc<MessagesQueue<Message>>,

    // set to true when the server must stop accepting
    close: Arc<AtomicBool>,

    // number of currently open client connections
    num_connections: Arc<AtomicUsize>,

    listening_addr: SocketAddr,
}

enum Message {
    Error(io::Error),
    NewRequest(Request),
}

impl From<Request> for Message {
    fn from(rq: Request) -> Message {
        Message::NewRequest(rq)
    }
}

/// Counter guard for the open-connections gauge.
struct Registration {
    counter: Arc<AtomicUsize>,
}

impl Registration {
    fn new(counter: Arc<AtomicUsize>) -> Registration {
        counter.fetch_add(1, Ordering::Release);
        Registration { counter }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Release);
    }
}

impl Server {
    /// Shortcut for building a server out of anything that resolves to a
    /// socket address.
    pub fn http<A>(addr: A) -> Result<Server, Box<dyn Error + Send + Sync + 'static>>
    where
        A: ToSocketAddrs,
    {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or("no address to bind to")?;

        Server::new(ServerConfig { addr })
    }

    /// Binds the listening socket and starts the accept thread.
    ///
    /// Returns an error if the port is already in use or cannot be bound;
    /// there is no retry.
    pub fn new(config: ServerConfig) -> Result<Server, Box<dyn Error + Send + Sync + 'static>> {
        let listener = TcpListener::bind(config.addr)?;
        let listening_addr = listener.local_addr()?;

        let messages = MessagesQueue::with_capacity(8);
        let close = Arc::new(AtomicBool::new(false));
        let num_connections = Arc::new(AtomicUsize::new(0));

        {
            let messages = Arc::clone(&messages);
            let close = Arc::clone(&close);
            let num_connections = Arc::clone(&num_connections);
            let task_pool = TaskPool::new();

            thread::spawn(move || {
                debug!("running accept thread");

                loop {
                    let accepted = listener.accept();

                    if close.load(Ordering::Acquire) {
                        break;
                    }

                    match accepted {
                        Ok((stream, _)) => {
                            let connection = RefinedTcpStream::new(stream)
                                .map(|(read, write)| ClientConnection::new(write, read));

                            let client = match connection {
                                Ok(client) => client,
                                Err(err) => {
                                    debug!("failed to split an accepted socket: {}", err);
                                    continue;
                                }
                            };

                            let messages = Arc::clone(&messages);
                            let close = Arc::clone(&close);
                            let registration = Registration::new(Arc::clone(&num_connections));

                            task_pool.spawn_task(Box::new(move || {
                                let _registration = registration;

                                for rq in client {
                                    messages.push(rq.into());

                                    if close.load(Ordering::Acquire) {
                                        break;
                                    }
                                }
                            }));
                        }

                        Err(err) => {
                            error!("error on connection accept: {}", err);
                            messages.push(Message::Error(err));
                            break;
                        }
                    }
                }
            });
        }

        Ok(Server {
            messages,
            close,
            num_connections,
            listening_addr,
        })
    }

    /// Returns the address the server is listening on.
    pub fn server_addr(&self) -> SocketAddr {
        self.listening_addr
    }

    /// Returns the number of clients currently connected to the server.
    pub fn num_connections(&self) -> usize {
        self.num_connections.load(Ordering::Acquire)
    }

    /// Blocks until an HTTP request has been submitted and returns it.
    ///
    /// An error means the listening socket itself failed.
    pub fn recv(&self) -> io::Result<Request> {
        match self.messages.pop() {
            Message::NewRequest(rq) => Ok(rq),
            Message::Error(err) => Err(err),
        }
    }

    /// Same as [`recv`](Server::recv) but doesn't block.
    pub fn try_recv(&self) -> io::Result<Option<Request>> {
        match self.messages.try_pop() {
            Some(Message::NewRequest(rq)) => Ok(Some(rq)),
            Some(Message::Error(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Returns an iterator over incoming requests.
    ///
    /// The iterator ends only when the listening socket fails.
    pub fn incoming_requests(&self) -> IncomingRequests<'_> {
        IncomingRequests { server: self }
    }
}

/// Iterator returned by [`Server::incoming_requests`].
pub struct IncomingRequests<'a> {
    server: &'a Server,
}

impl Iterator for IncomingRequests<'_> {
    type Item = Request;

    fn next(&mut self) -> Option<Request> {
        self.server.recv().ok()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close.store(true, Ordering::Release);
        // connect to ourselves to unblock the accept thread
        TcpStream::connect(self.listening_addr).ok();
    }
}
