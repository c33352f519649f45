use std::fmt;
use std::io::{self, Cursor, ErrorKind, Read, Write};
use std::net::SocketAddr;

use crate::common::{Header, HttpVersion, Method};
use crate::log::*;
use crate::response::Response;
use crate::util::EqualReader;

/// Represents an HTTP request made by a client.
///
/// A `Request` is what the server produces and what your code must analyse
/// and answer. It implements `Send`, so requests can be dispatched to worker
/// threads.
///
/// If a `Request` is dropped without `respond` being called, an empty 500
/// response is automatically sent back to the client, so a handler that
/// panics still yields an answer.
pub struct Request {
    // where to read the body from
    data_reader: Box<dyn Read + Send + 'static>,

    // None once the request has been answered
    response_writer: Option<Box<dyn Write + Send + 'static>>,

    remote_addr: Option<SocketAddr>,

    method: Method,

    url: String,

    http_version: HttpVersion,

    headers: Vec<Header>,

    body_length: Option<usize>,
}

/// Bodies up to this size are buffered eagerly so that the connection can
/// move on to the next pipelined request immediately.
const EAGER_BODY_LIMIT: usize = 1024;

/// Builds a new request.
///
/// `source_data` must be positioned right after the header section; it is
/// consumed according to `Content-Length`/`Transfer-Encoding` so that the
/// stream ends up at the start of the next message.
pub(crate) fn new_request<R, W>(
    method: Method,
    url: String,
    http_version: HttpVersion,
    headers: Vec<Header>,
    remote_addr: Option<SocketAddr>,
    mut source_data: R,
    writer: W,
) -> io::Result<Request>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    // if a transfer-encoding is specified, Content-Length must be ignored
    // (RFC 7230 section 3.3.3)
    let transfer_encoding = headers
        .iter()
        .any(|h| h.field.equiv("Transfer-Encoding"));

    let content_length = if transfer_encoding {
        None
    } else {
        headers
            .iter()
            .find(|h| h.field.equiv("Content-Length"))
            .and_then(|h| h.value.as_str().trim().parse::<usize>().ok())
    };

    let data_reader: Box<dyn Read + Send + 'static> = match content_length {
        Some(0) => Box::new(io::empty()),

        Some(length) if length <= EAGER_BODY_LIMIT => {
            let mut buffer = vec![0u8; length];
            source_data.read_exact(&mut buffer)?;
            Box::new(Cursor::new(buffer))
        }

        Some(length) => Box::new(EqualReader::new(source_data, length)),

        None if transfer_encoding => Box::new(chunked_transfer::Decoder::new(source_data)),

        // neither Content-Length nor Transfer-Encoding: no body
        None => Box::new(io::empty()),
    };

    Ok(Request {
        data_reader,
        response_writer: Some(Box::new(writer)),
        remote_addr,
        method,
        url,
        http_version,
        headers,
        body_length: content_length,
    })
}

impl Request {
    /// Returns the method requested by the client (eg. `GET`, `POST`, etc.).
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the resource requested by the client.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns a list of all headers sent by the client.
    #[inline]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Returns the HTTP version of the request.
    #[inline]
    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    /// Returns the length of the body in bytes, if it is known upfront.
    #[inline]
    pub fn body_length(&self) -> Option<usize> {
        self.body_length
    }

    /// Returns the address of the client that sent this request, if the
    /// socket reported one.
    #[inline]
    pub fn remote_addr(&self) -> Option<&SocketAddr> {
        self.remote_addr.as_ref()
    }

    /// Allows to read the body of the request.
    #[inline]
    pub fn as_reader(&mut self) -> &mut (dyn Read + Send + 'static) {
        &mut self.data_reader
    }

    /// Sends a response to this request.
    ///
    /// Errors that merely indicate that the client hung up are swallowed;
    /// anything else is reported to the caller.
    pub fn respond<R>(mut self, response: Response<R>) -> io::Result<()>
    where
        R: Read,
    {
        match self.respond_impl(response) {
            Err(ref err)
                if matches!(
                    err.kind(),
                    ErrorKind::BrokenPipe
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::ConnectionRefused
                        | ErrorKind::ConnectionReset
                ) =>
            {
                debug!("client disconnected before the response was written");
                Ok(())
            }
            other => other,
        }
    }

    fn respond_impl<R>(&mut self, response: Response<R>) -> io::Result<()>
    where
        R: Read,
    {
        let mut writer = match self.response_writer.take() {
            Some(writer) => writer,
            None => return Ok(()),
        };

        let do_not_send_body = self.method == Method::Head;

        response.raw_print(writer.by_ref(), self.http_version, do_not_send_body)?;
        writer.flush()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "Request({} {} from {:?})",
            self.method, self.url, self.remote_addr
        )
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.response_writer.is_some() {
            let response = Response::empty(500);
            if let Err(err) = self.respond_impl(response) {
                debug!("error while sending 500 for an abandoned request: {}", err);
            }
        }
    }
}
