//! CRC implementations for container integrity fields.
//!
//! Two variants are needed by the codecs in this workspace:
//!
//! - **CRC-32 (ISO 3309)**: xz stream header/footer, block header and index
//!   fields, and the optional CRC-32 block check
//! - **CRC-64/ECMA-182**: the default xz block check
//!
//! Both are reflected, table-driven, and can be updated incrementally as
//! bytes are flushed out of a decoder, so a check never needs the whole
//! payload in memory.

/// Build a reflected 8-bit lookup table for a 32-bit polynomial.
const fn table32(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Build a reflected 8-bit lookup table for a 64-bit polynomial.
const fn table64(poly: u64) -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected).
const CRC32_TABLE: [u32; 256] = table32(0xEDB8_8320);

/// CRC-64 lookup table (ECMA-182, reflected polynomial 0xC96C5795D7870F42).
const CRC64_TABLE: [u64; 256] = table64(0xC96C_5795_D787_0F42);

/// CRC-32 calculator (ISO 3309).
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value / final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use packflow_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"123456789");
/// assert_eq!(crc.finalize(), 0xCBF43926);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFF_FFFF }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFF_FFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut c = self.crc;
        for &byte in data {
            c = CRC32_TABLE[((c ^ byte as u32) & 0xFF) as usize] ^ (c >> 8);
        }
        self.crc = c;
    }

    /// Get the current CRC value (without finalizing).
    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFF_FFFF
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        self.value()
    }

    /// Compute CRC-32 for a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-64/ECMA-182 calculator, the check used by xz.
///
/// # Example
///
/// ```
/// use packflow_core::crc::Crc64;
///
/// let mut crc = Crc64::new();
/// crc.update(b"123456789");
/// assert_eq!(crc.finalize(), 0x995DC9BBDF1939FA);
/// ```
#[derive(Debug, Clone)]
pub struct Crc64 {
    crc: u64,
}

impl Crc64 {
    /// Create a new CRC-64 calculator.
    pub fn new() -> Self {
        Self { crc: u64::MAX }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = u64::MAX;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut c = self.crc;
        for &byte in data {
            c = CRC64_TABLE[((c ^ byte as u64) & 0xFF) as usize] ^ (c >> 8);
        }
        self.crc = c;
    }

    /// Get the current CRC value (without finalizing).
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.crc ^ u64::MAX
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u64 {
        self.value()
    }

    /// Compute CRC-64 for a slice in one call.
    pub fn compute(data: &[u8]) -> u64 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc64 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_empty() {
        assert_eq!(Crc32::compute(b""), 0);
    }

    #[test]
    fn test_crc32_check() {
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_crc32_incremental() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut crc = Crc32::new();
        for piece in data.chunks(7) {
            crc.update(piece);
        }
        assert_eq!(crc.finalize(), Crc32::compute(data));
        assert_eq!(Crc32::compute(data), 0x414F_A339);
    }

    #[test]
    fn test_crc32_xz_stream_flags() {
        // Stream flags for a CRC-64 check, as stored in every `xz -C crc64` header
        assert_eq!(Crc32::compute(&[0x00, 0x04]), 0x46B4_D6E6);
    }

    #[test]
    fn test_crc64_empty() {
        assert_eq!(Crc64::compute(b""), 0);
    }

    #[test]
    fn test_crc64_check() {
        assert_eq!(Crc64::compute(b"123456789"), 0x995D_C9BB_DF19_39FA);
    }

    #[test]
    fn test_crc64_incremental() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();
        let mut crc = Crc64::new();
        crc.update(&data[..333]);
        crc.update(&data[333..]);
        assert_eq!(crc.value(), Crc64::compute(&data));
    }

    #[test]
    fn test_reset() {
        let mut crc = Crc64::new();
        crc.update(b"garbage");
        crc.reset();
        crc.update(b"123456789");
        assert_eq!(crc.finalize(), 0x995D_C9BB_DF19_39FA);
    }
}
