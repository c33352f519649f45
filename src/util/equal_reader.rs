use std::io::{self, Read};

/// A `Read` that reads exactly `size` bytes from a sub-reader, then EOF.
///
/// Any bytes not consumed when the reader is dropped are read and thrown
/// away, leaving the underlying stream positioned at the next message.
pub(crate) struct EqualReader<R>
where
    R: Read,
{
    reader: R,
    size: usize,
}

impl<R: Read> EqualReader<R> {
    pub fn new(reader: R, size: usize) -> EqualReader<R> {
        EqualReader { reader, size }
    }
}

impl<R: Read> Read for EqualReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.size == 0 {
            return Ok(0);
        }

        let buf = if buf.len() <= self.size {
            buf
        } else {
            &mut buf[..self.size]
        };

        let len = self.reader.read(buf)?;
        self.size -= len;
        Ok(len)
    }
}

impl<R: Read> Drop for EqualReader<R> {
    fn drop(&mut self) {
        let mut scratch = [0u8; 256];

        while self.size > 0 {
            let limit = self.size.min(scratch.len());
            match self.reader.read(&mut scratch[..limit]) {
                Ok(0) | Err(_) => break,
                Ok(len) => self.size -= len,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EqualReader;
    use std::io::{Cursor, Read};

    #[test]
    fn reads_exactly_the_requested_size() {
        let mut source = Cursor::new(b"helloworld".to_vec());

        {
            let mut reader = EqualReader::new(&mut source, 5);
            let mut out = String::new();
            reader.read_to_string(&mut out).unwrap();
            assert_eq!(out, "hello");
        }

        let mut rest = String::new();
        source.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "world");
    }

    #[test]
    fn drop_drains_unread_bytes() {
        let mut source = Cursor::new(b"helloworld".to_vec());

        {
            let _reader = EqualReader::new(&mut source, 5);
            // never read from it
        }

        let mut rest = String::new();
        source.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "world");
    }
}
