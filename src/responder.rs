use std::error::Error;
use std::net::SocketAddr;

use crate::common::{Header, Method};
use crate::log::*;
use crate::page::{PageConfig, ResponsePage};
use crate::request::Request;
use crate::response::Response;
use crate::{Server, ServerConfig};

/// Configuration for a [`Responder`].
#[derive(Debug, Clone, Default)]
pub struct ResponderConfig {
    pub server: ServerConfig,
    pub page: PageConfig,
}

/// The single component of this crate: accepts connections and answers every
/// GET request, whatever its path, with the rendered time page.
///
/// The handler is stateless; each request is answered independently and two
/// responses differ only in the embedded timestamp.
pub struct Responder {
    server: Server,
    page: PageConfig,
}

impl Responder {
    /// Binds the listening socket.
    ///
    /// Fails if the port is already in use or the process lacks the
    /// privilege to bind it. There is no retry and no fallback port; the
    /// caller is expected to treat this as fatal.
    pub fn bind(config: ResponderConfig) -> Result<Responder, Box<dyn Error + Send + Sync + 'static>> {
        let server = Server::new(config.server)?;

        Ok(Responder {
            server,
            page: config.page,
        })
    }

    /// Returns the address the underlying listener is bound to.
    pub fn server_addr(&self) -> SocketAddr {
        self.server.server_addr()
    }

    /// Serves requests until the process is terminated externally.
    ///
    /// Only returns if the listening socket itself dies.
    pub fn serve_forever(&self) {
        for request in self.server.incoming_requests() {
            self.handle(request);
        }

        error!("listening socket closed, leaving the serve loop");
    }

    /// Answers one request: 200 with the time page for GET, 405 otherwise.
    fn handle(&self, request: Request) {
        debug!("{} {}", request.method(), request.url());

        let result = if *request.method() == Method::Get {
            let page = ResponsePage::generate(&self.page);
            request.respond(page.into_response())
        } else {
            let response = Response::empty(405)
                .with_header(Header::from_bytes(&b"Allow"[..], &b"GET"[..]).unwrap());
            request.respond(response)
        };

        if let Err(err) = result {
            debug!("error while sending response: {}", err);
        }
    }
}
