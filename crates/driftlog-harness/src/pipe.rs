//! In-memory byte pipe for write-then-read rigs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Writing half of an in-memory pipe.
pub struct PipeWriter(Rc<RefCell<VecDeque<u8>>>);

/// Reading half of an in-memory pipe.
///
/// Reading an empty pipe reports end of stream rather than blocking, so
/// rigs interleave writes and reads freely.
pub struct PipeReader(Rc<RefCell<VecDeque<u8>>>);

/// Create a connected pipe.
#[must_use]
pub fn pipe() -> (PipeWriter, PipeReader) {
    let buffer = Rc::new(RefCell::new(VecDeque::new()));
    (PipeWriter(Rc::clone(&buffer)), PipeReader(buffer))
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend(buf.iter().copied());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        let mut nread = 0;
        while nread < buf.len() {
            match inner.pop_front() {
                Some(byte) => {
                    buf[nread] = byte;
                    nread += 1;
                }
                None => break,
            }
        }
        Ok(nread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let (mut writer, mut reader) = pipe();
        writer.write_all(b"hello").unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn empty_pipe_reads_as_eof() {
        let (_writer, mut reader) = pipe();
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
