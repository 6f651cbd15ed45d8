//! Range decoder over one whole LZMA2 chunk.
//!
//! LZMA2 caps a compressed chunk at 64 KiB, so the chunk is collected in
//! full before decoding starts and every bit read is a bounds-checked index
//! into that buffer. A read past the chunk end is corrupt input.

use packflow_core::error::{CodecError, Result};

use crate::CODEC_NAME;

/// Number of bits in probability model.
pub const PROB_BITS: u32 = 11;

/// Initial probability (50%).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Maximum probability value.
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Number of bits to shift for probability update.
pub const MOVE_BITS: u32 = 5;

/// Largest compressed LZMA2 chunk.
pub const CHUNK_MAX: usize = 1 << 16;

/// Bytes consumed by range decoder initialization.
pub const INIT_BYTES: usize = 5;

/// Top value for range normalization.
const TOP_VALUE: u32 = 1 << 24;

/// Range decoder for LZMA2 chunks.
#[derive(Debug)]
pub struct RangeDecoder {
    buf: Box<[u8]>,
    /// Compressed size of the current chunk.
    size: usize,
    /// Bytes collected so far.
    len: usize,
    /// Read position.
    pos: usize,
    range: u32,
    code: u32,
}

impl RangeDecoder {
    /// Create a decoder with a chunk buffer of [`CHUNK_MAX`] bytes.
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; CHUNK_MAX].into_boxed_slice(),
            size: 0,
            len: 0,
            pos: 0,
            range: 0xFFFF_FFFF,
            code: 0,
        }
    }

    /// Start collecting a chunk of `size` compressed bytes.
    pub fn begin_chunk(&mut self, size: usize) -> Result<()> {
        if size < INIT_BYTES || size > CHUNK_MAX {
            return Err(CodecError::data(
                CODEC_NAME,
                format!("invalid compressed chunk size {size}"),
            ));
        }
        self.size = size;
        self.len = 0;
        self.pos = 0;
        Ok(())
    }

    /// Collect chunk bytes from `input`; returns the number taken.
    pub fn collect(&mut self, input: &[u8]) -> usize {
        let n = (self.size - self.len).min(input.len());
        self.buf[self.len..self.len + n].copy_from_slice(&input[..n]);
        self.len += n;
        n
    }

    /// Check if the whole chunk has been collected.
    pub fn is_collected(&self) -> bool {
        self.len == self.size
    }

    /// Initialize decoding of the collected chunk.
    pub fn init(&mut self) -> Result<()> {
        if self.buf[0] != 0x00 {
            return Err(CodecError::data(CODEC_NAME, "invalid range coder start byte"));
        }
        self.code = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]);
        self.range = 0xFFFF_FFFF;
        self.pos = INIT_BYTES;
        Ok(())
    }

    /// Check if the chunk was consumed exactly and the coder flushed cleanly.
    pub fn is_finished(&self) -> bool {
        self.pos == self.size && self.code == 0
    }

    /// Normalize the range (refill when range gets small).
    pub fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            let byte = *self.buf[..self.size].get(self.pos).ok_or_else(|| {
                CodecError::data(CODEC_NAME, "range decoder ran past chunk end")
            })?;
            self.pos += 1;
            self.range <<= 8;
            self.code = (self.code << 8) | byte as u32;
        }
        Ok(())
    }

    /// Decode a single bit with the given probability.
    pub fn bit(&mut self, prob: &mut u16) -> Result<u32> {
        self.normalize()?;

        let bound = (self.range >> PROB_BITS) * (*prob as u32);
        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            Ok(1)
        }
    }

    /// Decode `count` bits with fixed 50% probability.
    pub fn direct_bits(&mut self, count: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            self.normalize()?;
            self.range >>= 1;
            let bit = if self.code >= self.range {
                self.code -= self.range;
                1
            } else {
                0
            };
            result = (result << 1) | bit;
        }
        Ok(result)
    }

    /// Decode a bit tree (normal order).
    pub fn bit_tree(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut m = 1usize;
        for _ in 0..num_bits {
            m = (m << 1) | self.bit(&mut probs[m])? as usize;
        }
        Ok((m as u32) - (1 << num_bits))
    }

    /// Decode a bit tree (reverse order).
    pub fn reverse_bit_tree(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut result = 0u32;
        let mut m = 1usize;
        for i in 0..num_bits {
            let bit = self.bit(&mut probs[m])?;
            m = (m << 1) | bit as usize;
            result |= bit << i;
        }
        Ok(result)
    }
}

impl Default for RangeDecoder {
    fn default() -> Self {
        Self::new()
    }
}
