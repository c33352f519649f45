use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// One half of a TCP stream that shuts its direction down when dropped.
///
/// Splitting a connection this way lets the read side and the write side be
/// owned by different layers while the socket is closed exactly once per
/// direction.
pub(crate) struct RefinedTcpStream {
    stream: TcpStream,
    close_read: bool,
    close_write: bool,
}

impl RefinedTcpStream {
    /// Splits a stream into a `(read, write)` pair.
    pub fn new(stream: TcpStream) -> io::Result<(RefinedTcpStream, RefinedTcpStream)> {
        let read_half = stream.try_clone()?;

        let read = RefinedTcpStream {
            stream: read_half,
            close_read: true,
            close_write: false,
        };

        let write = RefinedTcpStream {
            stream,
            close_read: false,
            close_write: true,
        };

        Ok((read, write))
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Drop for RefinedTcpStream {
    fn drop(&mut self) {
        if self.close_read {
            self.stream.shutdown(Shutdown::Read).ok();
        }

        if self.close_write {
            self.stream.shutdown(Shutdown::Write).ok();
        }
    }
}

impl Read for RefinedTcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for RefinedTcpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
