// SPDX-License-Identifier: MIT OR Apache-2.0
//! An in-process, full-duplex byte pipe (§4.3, §9 "loopback pipe for batch").
//!
//! Two cross-wired `std::sync::mpsc` channels stand in for a socketpair: each
//! endpoint is a `(PipeWriter, PipeReader)` pair implementing `Write`/`Read`,
//! so the exact same streaming codec used for a real connection can serve the
//! loopback side of a batch dispatch, with no special-cased parsing.

use std::io::{Read, Write};
use std::sync::mpsc::{Receiver, Sender, channel};

/// The write half of one pipe endpoint.
#[derive(Debug)]
pub struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

/// The read half of one pipe endpoint.
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    leftover: Vec<u8>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer pipe end dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.leftover.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.leftover = chunk,
                // Sender dropped: the peer is gone. Treat as a clean EOF,
                // matching a closed socket's read() returning 0.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.leftover.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.drain(..n);
        Ok(n)
    }
}

/// Create a full-duplex in-memory pipe, returning the two endpoints as
/// `(writer, reader)` pairs. Writes on one endpoint's writer are readable
/// from the other endpoint's reader.
pub fn duplex() -> ((PipeWriter, PipeReader), (PipeWriter, PipeReader)) {
    let (tx_a, rx_a) = channel();
    let (tx_b, rx_b) = channel();
    let a = (PipeWriter { tx: tx_a }, PipeReader { rx: rx_b, leftover: Vec::new() });
    let b = (PipeWriter { tx: tx_b }, PipeReader { rx: rx_a, leftover: Vec::new() });
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_written_on_one_end_arrive_on_the_other() {
        let ((mut w_a, _r_a), (_w_b, mut r_b)) = duplex();
        w_a.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        r_b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn read_is_split_across_multiple_writes() {
        let ((mut w_a, _r_a), (_w_b, mut r_b)) = duplex();
        w_a.write_all(b"ab").unwrap();
        w_a.write_all(b"cd").unwrap();
        let mut buf = [0u8; 2];
        r_b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
        r_b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");
    }

    #[test]
    fn dropping_the_writer_yields_eof() {
        let ((w_a, _r_a), (_w_b, mut r_b)) = duplex();
        drop(w_a);
        let mut buf = [0u8; 8];
        assert_eq!(r_b.read(&mut buf).unwrap(), 0);
    }
}
