//! # Packflow Gzip
//!
//! Streaming gzip (RFC 1952) sessions for the packflow pump.
//!
//! Member framing (header, CRC-32, length) is handled here; the deflate body
//! runs through `flate2`'s raw engine.
//!
//! ## Example
//!
//! ```rust
//! use packflow_core::{Preset, Pump};
//! use packflow_gzip::{GzipDecoder, GzipEncoder};
//!
//! let data = b"Hello, gzip!";
//! let mut compressed = Vec::new();
//! Pump::default()
//!     .run(&mut GzipEncoder::new(Preset::DEFAULT), &mut &data[..], &mut compressed)
//!     .unwrap();
//!
//! let mut restored = Vec::new();
//! Pump::default()
//!     .run(&mut GzipDecoder::new(), &mut &compressed[..], &mut restored)
//!     .unwrap();
//! assert_eq!(restored, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod decoder;
mod encoder;
pub mod header;

pub use decoder::GzipDecoder;
pub use encoder::GzipEncoder;

/// Codec name used in errors and log lines.
pub const CODEC_NAME: &str = "gzip";
