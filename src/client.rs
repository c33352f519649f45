use std::io::{self, BufReader, BufWriter, Read};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::common::{HttpVersion, Method, StatusCode};
use crate::request::{self, Request};
use crate::response::Response;
use crate::util::{RefinedTcpStream, SequentialReader, SequentialReaderBuilder};
use crate::util::SequentialWriterBuilder;

/// A `ClientConnection` stores a socket to a client and yields the `Request`
/// objects that arrive on it.
pub(crate) struct ClientConnection {
    // address of the client, if the socket reported one
    remote_addr: Option<SocketAddr>,

    // sequence of readers over the stream, so that pipelined requests are
    // consumed in the right order
    source: SequentialReaderBuilder<BufReader<RefinedTcpStream>>,

    // sequence of writers to the stream, to avoid writing response #2
    // before response #1
    sink: SequentialWriterBuilder<BufWriter<RefinedTcpStream>>,

    // reader to read the next request header from
    next_header_source: SequentialReader<BufReader<RefinedTcpStream>>,

    // set to true if we know that no more requests will come
    no_more_requests: bool,
}

/// Request lines or header lines beyond this size get the connection closed.
const MAX_LINE_LENGTH: usize = 8192;

/// Error that can happen when reading a request.
enum ReadError {
    WrongRequestLine,
    WrongHeader(HttpVersion),
    ReadIoError(io::Error),
}

impl ClientConnection {
    /// Creates a new `ClientConnection` that takes ownership of the two
    /// halves of the socket.
    pub fn new(write_socket: RefinedTcpStream, read_socket: RefinedTcpStream) -> ClientConnection {
        let remote_addr = read_socket.peer_addr().ok();

        let mut source = SequentialReaderBuilder::new(BufReader::new(read_socket));
        let first_header = source.next_reader();

        ClientConnection {
            remote_addr,
            source,
            sink: SequentialWriterBuilder::new(BufWriter::new(write_socket)),
            next_header_source: first_header,
            no_more_requests: false,
        }
    }

    /// Reads one CRLF-terminated line from `next_header_source`.
    ///
    /// The next read will start at the first byte of the following line.
    fn read_next_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        let mut prev_byte_was_cr = false;

        loop {
            let mut byte = [0u8];
            if self.next_header_source.read(&mut byte)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed in the middle of a line",
                ));
            }
            let byte = byte[0];

            if byte == b'\n' && prev_byte_was_cr {
                line.pop();
                return String::from_utf8(line)
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "line is not utf-8"));
            }

            prev_byte_was_cr = byte == b'\r';

            if line.len() >= MAX_LINE_LENGTH {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
            }

            line.push(byte);
        }
    }

    /// Reads a request from the stream. Blocks until the header section has
    /// been read.
    fn read(&mut self) -> Result<Request, ReadError> {
        let (method, url, version) = {
            let line = self.read_next_line().map_err(ReadError::ReadIoError)?;
            parse_request_line(line.trim())?
        };

        let headers = {
            let mut headers = Vec::new();
            loop {
                let line = self.read_next_line().map_err(ReadError::ReadIoError)?;
                let line = line.trim();
                if line.is_empty() {
                    break;
                }
                headers.push(line.parse().map_err(|_| ReadError::WrongHeader(version))?);
            }
            headers
        };

        // the writer slot for this request's response
        let writer = self.sink.next_writer();

        // `data_source` ends up holding the reader positioned at this
        // request's body, while a fresh reader waits for the next header
        let mut data_source = self.source.next_reader();
        std::mem::swap(&mut self.next_header_source, &mut data_source);

        request::new_request(
            method,
            url,
            version,
            headers,
            self.remote_addr,
            data_source,
            writer,
        )
        .map_err(ReadError::ReadIoError)
    }

    /// Writes a headers-only error response into the next writer slot.
    fn send_error_response(&mut self, status: StatusCode, version: HttpVersion) {
        let writer = self.sink.next_writer();
        Response::empty(status).raw_print(writer, version, false).ok();
    }
}

impl Iterator for ClientConnection {
    type Item = Request;

    /// Blocks until the next `Request` is available; returns `None` when no
    /// more requests will come from this client.
    fn next(&mut self) -> Option<Request> {
        if self.no_more_requests {
            return None;
        }

        loop {
            let rq = match self.read() {
                Err(ReadError::WrongRequestLine) => {
                    self.send_error_response(StatusCode(400), HttpVersion(1, 1));
                    // we don't know where the next request would start, so we
                    // have to close
                    return None;
                }

                Err(ReadError::WrongHeader(version)) => {
                    self.send_error_response(StatusCode(400), version);
                    return None;
                }

                Err(ReadError::ReadIoError(ref err)) if err.kind() == io::ErrorKind::TimedOut => {
                    self.send_error_response(StatusCode(408), HttpVersion(1, 1));
                    return None;
                }

                Err(ReadError::ReadIoError(_)) => return None,

                Ok(rq) => rq,
            };

            // requests with a version we don't implement get a 505, but the
            // connection survives
            if rq.http_version() > HttpVersion(1, 1) {
                let writer = self.sink.next_writer();
                Response::from_string("This server only supports HTTP versions 1.0 and 1.1")
                    .with_status_code(505)
                    .raw_print(writer, HttpVersion(1, 1), false)
                    .ok();
                continue;
            }

            self.update_connection_status(&rq);

            return Some(rq);
        }
    }
}

impl ClientConnection {
    /// Decides from the request headers whether this connection survives the
    /// current request.
    fn update_connection_status(&mut self, rq: &Request) {
        let connection_header = rq
            .headers()
            .iter()
            .find(|h| h.field.equiv("Connection"))
            .map(|h| h.value.as_str());

        match connection_header {
            Some(value) if value.eq_ignore_ascii_case("close") => self.no_more_requests = true,

            Some(value) if value.eq_ignore_ascii_case("upgrade") => self.no_more_requests = true,

            Some(value)
                if !value.eq_ignore_ascii_case("keep-alive")
                    && rq.http_version() == HttpVersion(1, 0) =>
            {
                self.no_more_requests = true
            }

            None if rq.http_version() == HttpVersion(1, 0) => self.no_more_requests = true,

            _ => (),
        }
    }
}

/// Parses the request line of the request, eg. `GET / HTTP/1.1`.
fn parse_request_line(line: &str) -> Result<(Method, String, HttpVersion), ReadError> {
    let mut words = line.split_whitespace();

    let (method, url, version) = match (words.next(), words.next(), words.next()) {
        (Some(m), Some(u), Some(v)) => (m, u, v),
        _ => return Err(ReadError::WrongRequestLine),
    };

    let method = Method::from_str(method).map_err(|_| ReadError::WrongRequestLine)?;
    let version = parse_http_version(version)?;

    Ok((method, url.to_string(), version))
}

/// Parses an `HTTP/1.1` token.
fn parse_http_version(token: &str) -> Result<HttpVersion, ReadError> {
    let version = token
        .strip_prefix("HTTP/")
        .ok_or(ReadError::WrongRequestLine)?;

    let mut digits = version.splitn(2, '.');
    let major = digits.next().and_then(|d| d.parse().ok());
    let minor = digits.next().and_then(|d| d.parse().ok());

    match (major, minor) {
        (Some(major), Some(minor)) => Ok(HttpVersion(major, minor)),
        _ => Err(ReadError::WrongRequestLine),
    }
}
