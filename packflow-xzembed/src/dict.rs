//! LZ dictionary as a ring buffer that doubles as the output staging area.
//!
//! ```text
//!  0          start        pos        limit          end
//!  |  history   | unflushed |  writable  |   history   |
//! ```
//!
//! Decoded bytes land at `pos`; [`Dictionary::flush`] copies `[start, pos)`
//! to the caller and wraps `pos` back to zero once it reaches `end`.
//! `limit` bounds a decode step so it never produces more than the caller
//! has room for.

use packflow_core::error::{CodecError, Result};

use crate::CODEC_NAME;
use crate::memory::MemoryCap;

/// Ring dictionary bounded by a [`MemoryCap`].
#[derive(Debug)]
pub struct Dictionary {
    buf: Vec<u8>,
    cap: MemoryCap,
    /// First byte not yet flushed.
    start: usize,
    /// Next write position.
    pos: usize,
    /// Bytes of valid history, at most `end`.
    full: usize,
    /// Write bound of the current decode step.
    limit: usize,
    /// Dictionary size of the current block.
    end: usize,
}

impl Dictionary {
    /// Create an empty dictionary that may grow to `ceiling` bytes.
    pub fn new(ceiling: usize) -> Self {
        Self {
            buf: Vec::new(),
            cap: MemoryCap::new(ceiling),
            start: 0,
            pos: 0,
            full: 0,
            limit: 0,
            end: 0,
        }
    }

    /// Bytes currently allocated for the dictionary.
    pub fn allocated(&self) -> usize {
        self.buf.len()
    }

    /// Get the ceiling.
    pub fn ceiling(&self) -> usize {
        self.cap.ceiling()
    }

    /// Prepare for a block needing `size` bytes of history.
    ///
    /// The buffer is only reallocated when it is too small; the old buffer is
    /// freed first so the ceiling holds at every point.
    pub fn prepare(&mut self, size: usize) -> Result<()> {
        if size > self.cap.ceiling() {
            return Err(CodecError::memory(
                CODEC_NAME,
                format!(
                    "dictionary of {size} bytes exceeds the {} byte limit",
                    self.cap.ceiling()
                ),
            ));
        }
        if size > self.buf.len() {
            let old = std::mem::take(&mut self.buf);
            self.cap.release(old.len());
            drop(old);
            self.buf = self.cap.allocate(size)?;
        }
        self.end = size;
        self.reset();
        Ok(())
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.start = 0;
        self.pos = 0;
        self.full = 0;
        self.limit = 0;
    }

    /// Current write position; LZMA position state is derived from it.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Allow at most `out_max` more bytes before the next flush.
    pub fn set_limit(&mut self, out_max: usize) {
        self.limit = if self.end - self.pos <= out_max {
            self.end
        } else {
            self.pos + out_max
        };
    }

    /// Check if the current step may write another byte.
    pub fn has_space(&self) -> bool {
        self.pos < self.limit
    }

    /// Byte `dist + 1` positions back, or zero with no history.
    pub fn get(&self, dist: u32) -> u8 {
        if self.full == 0 {
            return 0;
        }
        let dist = dist as usize;
        let offset = if dist >= self.pos {
            self.pos + self.end - dist - 1
        } else {
            self.pos - dist - 1
        };
        self.buf[offset]
    }

    /// Append one byte.
    pub fn put(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos += 1;
        if self.full < self.pos {
            self.full = self.pos;
        }
    }

    /// Copy up to `*len` bytes from `dist + 1` back, stopping at the limit.
    ///
    /// `*len` is left holding what could not be copied yet.
    pub fn repeat(&mut self, len: &mut usize, dist: u32) -> Result<()> {
        let dist = dist as usize;
        if dist >= self.full || dist >= self.end {
            return Err(CodecError::data(CODEC_NAME, "match distance beyond history"));
        }

        let left = (self.limit - self.pos).min(*len);
        *len -= left;

        let mut back = if dist >= self.pos {
            self.pos + self.end - dist - 1
        } else {
            self.pos - dist - 1
        };
        for _ in 0..left {
            self.buf[self.pos] = self.buf[back];
            self.pos += 1;
            back += 1;
            if back == self.end {
                back = 0;
            }
        }

        if self.full < self.pos {
            self.full = self.pos;
        }
        Ok(())
    }

    /// Copy stored bytes from an uncompressed chunk, up to the limit.
    ///
    /// Returns the number of bytes taken from `input`.
    pub fn copy_uncompressed(&mut self, input: &[u8]) -> usize {
        let n = (self.limit - self.pos).min(input.len());
        self.buf[self.pos..self.pos + n].copy_from_slice(&input[..n]);
        self.pos += n;
        if self.full < self.pos {
            self.full = self.pos;
        }
        n
    }

    /// Move unflushed bytes to `out`; returns the number copied.
    ///
    /// The caller sizes the limit so that everything fits.
    pub fn flush(&mut self, out: &mut [u8]) -> usize {
        let n = self.pos - self.start;
        out[..n].copy_from_slice(&self.buf[self.start..self.pos]);
        if self.pos == self.end {
            self.pos = 0;
        }
        self.start = self.pos;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packflow_core::ErrorKind;

    fn dict(size: usize) -> Dictionary {
        let mut dict = Dictionary::new(1 << 20);
        dict.prepare(size).unwrap();
        dict
    }

    #[test]
    fn test_put_and_flush() {
        let mut dict = dict(4096);
        dict.set_limit(3);
        for &b in b"abc" {
            assert!(dict.has_space());
            dict.put(b);
        }
        assert!(!dict.has_space());

        let mut out = [0u8; 3];
        assert_eq!(dict.flush(&mut out), 3);
        assert_eq!(&out, b"abc");
        assert_eq!(dict.get(0), b'c');
        assert_eq!(dict.get(2), b'a');
    }

    #[test]
    fn test_overlapping_repeat_resumes() {
        let mut dict = dict(4096);
        dict.set_limit(1);
        dict.put(b'x');

        let mut out = [0u8; 16];
        let mut n = dict.flush(&mut out);

        let mut len = 10;
        dict.set_limit(4);
        dict.repeat(&mut len, 0).unwrap();
        assert_eq!(len, 6);
        n += dict.flush(&mut out[n..]);

        dict.set_limit(16);
        dict.repeat(&mut len, 0).unwrap();
        assert_eq!(len, 0);
        n += dict.flush(&mut out[n..]);
        assert_eq!(&out[..n], b"xxxxxxxxxxx");
    }

    #[test]
    fn test_wraps_at_end() {
        let mut dict = dict(4096);
        let mut out = vec![0u8; 4096];
        dict.set_limit(4096);
        for i in 0..4096 {
            dict.put(i as u8);
        }
        assert_eq!(dict.flush(&mut out), 4096);
        assert_eq!(dict.pos(), 0);

        dict.set_limit(2);
        let mut len = 2;
        dict.repeat(&mut len, 4095).unwrap();
        assert_eq!(dict.flush(&mut out), 2);
        assert_eq!(&out[..2], &[0, 1]);
    }

    #[test]
    fn test_distance_beyond_history() {
        let mut dict = dict(4096);
        dict.set_limit(8);
        dict.put(1);
        let mut len = 2;
        let err = dict.repeat(&mut len, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_prepare_respects_ceiling() {
        let mut dict = Dictionary::new(1 << 20);
        assert_eq!(dict.ceiling(), 1 << 20);
        dict.prepare(1 << 20).unwrap();
        assert_eq!(dict.allocated(), 1 << 20);

        let err = dict.prepare(2 << 20).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Memory);

        dict.prepare(4096).unwrap();
        assert_eq!(dict.allocated(), 1 << 20);
    }
}
