//! # Packflow Xz
//!
//! Streaming xz sessions backed by liblzma (through `xz2`), plus the
//! [`DualModeDriver`] that picks compression or decompression from a
//! [`DriverConfig`](packflow_core::DriverConfig) and runs one pump.
//!
//! The decoder runs in concatenated mode: several xz streams placed back to
//! back decode as one continuous output. The encoder uses the liblzma easy
//! presets with a CRC-64 integrity check.
//!
//! ## Example
//!
//! ```rust
//! use packflow_core::DriverConfig;
//! use packflow_xz::DualModeDriver;
//!
//! let data = b"Hello, xz!";
//! let mut compressed = Vec::new();
//! DualModeDriver::new(DriverConfig::compress(6, false).unwrap())
//!     .run(&mut &data[..], &mut compressed)
//!     .unwrap();
//!
//! let mut restored = Vec::new();
//! DualModeDriver::new(DriverConfig::decompress())
//!     .run(&mut &compressed[..], &mut restored)
//!     .unwrap();
//! assert_eq!(restored, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod decoder;
mod driver;
mod encoder;

pub use decoder::XzDecoder;
pub use driver::DualModeDriver;
pub use encoder::XzEncoder;

use packflow_core::{Action, CodecError};

/// Codec name used in errors and log lines.
pub const CODEC_NAME: &str = "xz";

/// xz stream header magic bytes.
pub const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// Map a liblzma error to the packflow error classes.
pub(crate) fn classify(err: xz2::stream::Error) -> CodecError {
    use xz2::stream::Error;
    match err {
        Error::Data => CodecError::data(CODEC_NAME, "compressed data is corrupt"),
        Error::Format => CodecError::data(CODEC_NAME, "file format not recognized"),
        Error::Mem => CodecError::memory(CODEC_NAME, "cannot allocate memory"),
        Error::MemLimit => CodecError::memory(CODEC_NAME, "memory usage limit reached"),
        other => CodecError::engine(CODEC_NAME, format!("{other:?}")),
    }
}

pub(crate) fn lzma_action(action: Action) -> xz2::stream::Action {
    match action {
        Action::Run => xz2::stream::Action::Run,
        Action::Finish => xz2::stream::Action::Finish,
    }
}
