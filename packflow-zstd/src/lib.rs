//! # Packflow Zstandard
//!
//! Streaming Zstandard sessions for the packflow pump, backed by the
//! reference `libzstd` through the `zstd` crate's raw streaming API.
//!
//! The decoder accepts any number of concatenated frames (skippable frames
//! included) and completes at a frame boundary once input runs out. The
//! encoder writes a single frame with a content checksum.
//!
//! ## Example
//!
//! ```rust
//! use packflow_core::{Preset, Pump};
//! use packflow_zstd::{ZstdDecoder, ZstdEncoder};
//!
//! let data = b"Hello, Zstandard!";
//! let mut compressed = Vec::new();
//! Pump::default()
//!     .run(&mut ZstdEncoder::new(Preset::DEFAULT).unwrap(), &mut &data[..], &mut compressed)
//!     .unwrap();
//!
//! let mut restored = Vec::new();
//! Pump::default()
//!     .run(&mut ZstdDecoder::new().unwrap(), &mut &compressed[..], &mut restored)
//!     .unwrap();
//! assert_eq!(restored, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod decoder;
mod encoder;

pub use decoder::ZstdDecoder;
pub use encoder::ZstdEncoder;

use packflow_core::CodecError;
use std::io;

/// Codec name used in errors and log lines.
pub const CODEC_NAME: &str = "zstd";

/// Zstandard frame magic number (0xFD2FB528 little-endian).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Map a libzstd error to the packflow error classes.
///
/// libzstd errors reach us as `io::Error`s carrying `ZSTD_getErrorName`.
/// Corruption patterns are tested first: some of them, such as an oversized
/// entropy table, also mention memory.
pub(crate) fn classify(err: io::Error) -> CodecError {
    let name = err.to_string();
    let lower = name.to_ascii_lowercase();
    if lower.contains("corrupt")
        || lower.contains("checksum")
        || lower.contains("unknown frame")
        || lower.contains("src size")
        || lower.contains("dictionary")
        || lower.contains("unsupported")
    {
        CodecError::data(CODEC_NAME, name)
    } else if lower.contains("memory") || lower.contains("allocation") {
        CodecError::memory(CODEC_NAME, name)
    } else {
        CodecError::engine(CODEC_NAME, name)
    }
}
