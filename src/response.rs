use std::io::{self, Cursor, Read, Write};
use std::time::SystemTime;

use chunked_transfer::Encoder;

use crate::common::{Header, HttpVersion, StatusCode};

/// Object representing an HTTP response whose purpose is to be given back to
/// a `Request`.
///
/// Some headers cannot be changed. Trying to define the value of one of these
/// with `with_header` has no effect on the output: `Connection`,
/// `Content-Length` and `Transfer-Encoding` are always determined by the
/// library so that the message framing stays consistent.
pub struct Response<R>
where
    R: Read,
{
    reader: R,
    status_code: StatusCode,
    headers: Vec<Header>,
    data_length: Option<usize>,
}

/// Framing chosen for the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferEncoding {
    Identity,
    Chunked,
}

/// An identity body needs a known length; everything else is chunked, except
/// towards HTTP/1.0 clients which predate chunked encoding.
fn choose_transfer_encoding(
    http_version: HttpVersion,
    data_length: Option<usize>,
) -> TransferEncoding {
    if http_version < HttpVersion(1, 1) || data_length.is_some() {
        TransferEncoding::Identity
    } else {
        TransferEncoding::Chunked
    }
}

impl<R: Read> Response<R> {
    pub fn new(
        status_code: StatusCode,
        headers: Vec<Header>,
        data: R,
        data_length: Option<usize>,
    ) -> Response<R> {
        Response {
            reader: data,
            status_code,
            headers,
            data_length,
        }
    }

    /// Returns the same response, but with an additional header.
    pub fn with_header(mut self, header: Header) -> Response<R> {
        self.add_header(header);
        self
    }

    /// Adds a header to the response.
    pub fn add_header(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// Returns the same response, but with a different status code.
    pub fn with_status_code<S>(mut self, code: S) -> Response<R>
    where
        S: Into<StatusCode>,
    {
        self.status_code = code.into();
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Writes the whole response to `writer`.
    ///
    /// The status line echoes the HTTP version of the request being answered.
    /// `Server` and `Date` headers are filled in unless the caller provided
    /// them; framing headers are always chosen by this function. When
    /// `do_not_send_body` is set (HEAD requests), headers are written as if
    /// the body were there but the body itself is suppressed.
    pub fn raw_print<W: Write>(
        mut self,
        mut writer: W,
        http_version: HttpVersion,
        do_not_send_body: bool,
    ) -> io::Result<()> {
        let transfer_encoding = choose_transfer_encoding(http_version, self.data_length);

        // framing and connection management don't belong to the caller
        self.headers.retain(|h| {
            !h.field.equiv("Connection")
                && !h.field.equiv("Content-Length")
                && !h.field.equiv("Transfer-Encoding")
        });

        write!(
            writer,
            "HTTP/{} {} {}\r\n",
            http_version,
            self.status_code.as_u16(),
            self.status_code.default_reason_phrase()
        )?;

        if !self.headers.iter().any(|h| h.field.equiv("Server")) {
            write!(writer, "Server: timepage (Rust)\r\n")?;
        }

        if !self.headers.iter().any(|h| h.field.equiv("Date")) {
            write!(writer, "Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()))?;
        }

        for header in &self.headers {
            write!(writer, "{}: {}\r\n", header.field, header.value.as_str())?;
        }

        match transfer_encoding {
            TransferEncoding::Chunked => write!(writer, "Transfer-Encoding: chunked\r\n")?,
            TransferEncoding::Identity => {
                if let Some(len) = self.data_length {
                    write!(writer, "Content-Length: {}\r\n", len)?;
                }
            }
        }

        write!(writer, "\r\n")?;

        if do_not_send_body {
            return Ok(());
        }

        match transfer_encoding {
            TransferEncoding::Chunked => {
                // the encoder writes the terminating chunk when dropped
                let mut encoder = Encoder::new(writer.by_ref());
                io::copy(&mut self.reader, &mut encoder)?;
            }
            TransferEncoding::Identity => {
                io::copy(&mut self.reader, &mut writer)?;
            }
        }

        Ok(())
    }
}

impl Response<Cursor<Vec<u8>>> {
    pub fn from_data<D>(data: D) -> Response<Cursor<Vec<u8>>>
    where
        D: Into<Vec<u8>>,
    {
        let data = data.into();
        let data_length = data.len();

        Response::new(
            StatusCode(200),
            Vec::new(),
            Cursor::new(data),
            Some(data_length),
        )
    }

    pub fn from_string<S>(data: S) -> Response<Cursor<Vec<u8>>>
    where
        S: Into<String>,
    {
        Response::from_data(data.into().into_bytes()).with_header(
            "Content-Type: text/plain; charset=utf-8".parse::<Header>().unwrap(),
        )
    }
}

impl Response<io::Empty> {
    /// Builds an empty response with the given status code.
    pub fn empty<S>(status_code: S) -> Response<io::Empty>
    where
        S: Into<StatusCode>,
    {
        Response::new(status_code.into(), Vec::new(), io::empty(), Some(0))
    }
}

#[cfg(test)]
mod tests {
    use super::Response;
    use crate::common::{Header, HttpVersion};

    fn print_to_string<R: std::io::Read>(
        response: Response<R>,
        version: HttpVersion,
        do_not_send_body: bool,
    ) -> String {
        let mut out = Vec::new();
        response.raw_print(&mut out, version, do_not_send_body).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn identity_body_with_content_length() {
        let response = Response::from_string("hello world");
        let out = print_to_string(response, HttpVersion(1, 1), false);

        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("Content-Length: 11\r\n"));
        assert!(out.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(out.ends_with("\r\n\r\nhello world"));
    }

    #[test]
    fn head_suppresses_body_but_keeps_headers() {
        let response = Response::from_string("hello world");
        let out = print_to_string(response, HttpVersion(1, 1), true);

        assert!(out.contains("Content-Length: 11\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
    }

    #[test]
    fn framing_headers_cannot_be_overridden() {
        let response = Response::from_string("hi")
            .with_header("Content-Length: 9999".parse::<Header>().unwrap());
        let out = print_to_string(response, HttpVersion(1, 1), false);

        assert!(out.contains("Content-Length: 2\r\n"));
        assert!(!out.contains("9999"));
    }

    #[test]
    fn unknown_length_is_chunked_for_http_1_1() {
        let data = b"streaming".to_vec();
        let response = Response::new(
            crate::StatusCode(200),
            Vec::new(),
            std::io::Cursor::new(data),
            None,
        );
        let out = print_to_string(response, HttpVersion(1, 1), false);

        assert!(out.contains("Transfer-Encoding: chunked\r\n"));
        assert!(out.contains("streaming"));
        // terminating chunk
        assert!(out.ends_with("0\r\n\r\n"));
    }

    #[test]
    fn status_line_echoes_request_version() {
        let response = Response::from_string("x");
        let out = print_to_string(response, HttpVersion(1, 0), false);

        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
    }
}
