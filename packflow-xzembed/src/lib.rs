//! # Packflow Xz Embedded
//!
//! A decoder-only, pure Rust xz implementation with a hard memory ceiling,
//! for targets where linking liblzma or letting a stream pick its own
//! dictionary size is not acceptable.
//!
//! ## Memory model
//!
//! - The dictionary is allocated through a [`MemoryCap`] and never exceeds
//!   [`EmbeddedOptions::dict_max`] (1 MiB by default). A stream declaring a
//!   larger dictionary fails with a memory error before anything is
//!   allocated for it.
//! - Everything else is fixed at construction: a 64 KiB LZMA2 chunk buffer,
//!   the LZMA probability tables and a 1 KiB header buffer.
//!
//! ## Supported streams
//!
//! Single-filter LZMA2 blocks with a None, CRC-32, CRC-64 or SHA-256 check.
//! CRC checks are verified, other checks are skipped. Other filter chains
//! are rejected as unsupported options.
//!
//! ## Example
//!
//! ```rust
//! use packflow_core::{ErrorKind, Pump};
//! use packflow_xzembed::XzEmbeddedDecoder;
//!
//! let mut decoder = XzEmbeddedDecoder::new();
//! let mut out = Vec::new();
//! let err = Pump::default()
//!     .run(&mut decoder, &mut &b"not xz"[..], &mut out)
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dict;
pub mod lzma;
pub mod lzma2;
pub mod memory;
pub mod model;
pub mod range;
mod stream;

pub use memory::MemoryCap;
pub use stream::{
    DEFAULT_DICT_MAX, EmbeddedOptions, FOOTER_MAGIC, HEADER_MAGIC, STREAM_HEADER_SIZE,
    XzEmbeddedDecoder,
};

/// Codec name used in errors and log lines.
pub const CODEC_NAME: &str = "xz-embedded";
