//! Hard-capped allocation for the decoder dictionary.

use packflow_core::error::{CodecError, Result};

use crate::CODEC_NAME;

/// Byte budget with a fixed ceiling.
///
/// Every dictionary allocation is reserved against the ceiling first and
/// then made with `try_reserve_exact`, so both an oversized request and an
/// allocator refusal surface as a memory error instead of growth or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCap {
    ceiling: usize,
    reserved: usize,
}

impl MemoryCap {
    /// Create a budget of `ceiling` bytes.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            reserved: 0,
        }
    }

    /// Get the ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Bytes currently reserved.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Bytes still available.
    pub fn available(&self) -> usize {
        self.ceiling - self.reserved
    }

    /// Reserve `bytes` against the ceiling.
    pub fn reserve(&mut self, bytes: usize) -> Result<()> {
        if bytes > self.available() {
            return Err(CodecError::memory(
                CODEC_NAME,
                format!(
                    "{bytes} bytes requested, {} of {} available",
                    self.available(),
                    self.ceiling
                ),
            ));
        }
        self.reserved += bytes;
        Ok(())
    }

    /// Return `bytes` to the budget.
    pub fn release(&mut self, bytes: usize) {
        self.reserved = self.reserved.saturating_sub(bytes);
    }

    /// Reserve and allocate a zeroed buffer of `bytes`.
    pub fn allocate(&mut self, bytes: usize) -> Result<Vec<u8>> {
        self.reserve(bytes)?;
        let mut buf = Vec::new();
        if buf.try_reserve_exact(bytes).is_err() {
            self.release(bytes);
            return Err(CodecError::memory(
                CODEC_NAME,
                format!("allocator refused {bytes} bytes"),
            ));
        }
        buf.resize(bytes, 0);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packflow_core::ErrorKind;

    #[test]
    fn test_reserve_within_ceiling() {
        let mut cap = MemoryCap::new(1024);
        cap.reserve(1000).unwrap();
        assert_eq!(cap.available(), 24);
        let err = cap.reserve(25).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Memory);
        assert_eq!(cap.reserved(), 1000);
    }

    #[test]
    fn test_allocate_and_release() {
        let mut cap = MemoryCap::new(1 << 20);
        let buf = cap.allocate(1 << 20).unwrap();
        assert_eq!(buf.len(), 1 << 20);
        assert!(cap.allocate(1).is_err());

        drop(buf);
        cap.release(1 << 20);
        assert_eq!(cap.available(), 1 << 20);
    }

    #[test]
    fn test_oversized_request_allocates_nothing() {
        let mut cap = MemoryCap::new(1 << 20);
        assert!(cap.allocate(2 << 20).is_err());
        assert_eq!(cap.reserved(), 0);
    }
}
