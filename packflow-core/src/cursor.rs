//! Fixed-capacity input and output blocks with cursors.
//!
//! The pump owns one [`InputBlock`] and one [`OutputBlock`] per session.
//! Both are allocated once and never grow.

use std::io::{self, Read, Write};

/// Default block capacity (16 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

/// An input block: `(buffer, position, length)`.
///
/// Invariant: `position <= length <= capacity`. The block is only refilled
/// once `position == length`.
#[derive(Debug)]
pub struct InputBlock {
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
}

impl InputBlock {
    /// Create an empty input block with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    /// Get the capacity of the block.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the stream but not yet consumed by the engine.
    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    /// Check if every byte of the last read has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.len
    }

    /// Mark `n` bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.len, "consumed past end of input block");
        self.pos = (self.pos + n).min(self.len);
    }

    /// Refill the block from `reader`.
    ///
    /// Must only be called once the block is exhausted. Returns the number of
    /// bytes read; zero means end of input. Interrupted reads are retried.
    pub fn refill<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<usize> {
        debug_assert!(self.is_exhausted(), "refill of a non-exhausted input block");
        loop {
            match reader.read(&mut self.buf) {
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// An output block: `(buffer, position, capacity)`.
///
/// Invariant: the filled prefix `[0, position)` is written out in full
/// before the block is reused, after which `position` returns to zero.
#[derive(Debug)]
pub struct OutputBlock {
    buf: Box<[u8]>,
    pos: usize,
}

impl OutputBlock {
    /// Create an empty output block with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
        }
    }

    /// Get the capacity of the block.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The filled prefix.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Space the engine may write into.
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.pos..]
    }

    /// Mark `n` more bytes as filled.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.buf.len(), "filled past end of output block");
        self.pos = (self.pos + n).min(self.buf.len());
    }

    /// Write the filled prefix to `writer` and reset the cursor.
    ///
    /// Short writes are retried until the prefix is fully written.
    /// Returns the number of bytes written.
    pub fn flush_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<usize> {
        let n = self.pos;
        if n > 0 {
            writer.write_all(&self.buf[..n])?;
            self.pos = 0;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most 3 bytes per call.
    struct Trickle(Vec<u8>);

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(3);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_input_refill_and_consume() {
        let mut block = InputBlock::new(4);
        let mut reader: &[u8] = b"abcdef";
        assert_eq!(block.capacity(), 4);

        assert!(block.is_exhausted());
        assert_eq!(block.refill(&mut reader).unwrap(), 4);
        assert_eq!(block.remaining(), b"abcd");

        block.consume(3);
        assert_eq!(block.remaining(), b"d");
        block.consume(1);
        assert!(block.is_exhausted());

        assert_eq!(block.refill(&mut reader).unwrap(), 2);
        assert_eq!(block.remaining(), b"ef");
        block.consume(2);
        assert_eq!(block.refill(&mut reader).unwrap(), 0);
        assert!(block.is_exhausted());
    }

    #[test]
    fn test_output_flush_retries_short_writes() {
        let mut block = OutputBlock::new(8);
        assert_eq!(block.capacity(), 8);
        block.unfilled_mut()[..7].copy_from_slice(b"packflo");
        block.advance(7);
        assert_eq!(block.filled(), b"packflo");

        let mut sink = Trickle(Vec::new());
        assert_eq!(block.flush_to(&mut sink).unwrap(), 7);
        assert_eq!(sink.0, b"packflo");
        assert!(block.filled().is_empty());
        assert_eq!(block.unfilled_mut().len(), block.capacity());
    }
}
