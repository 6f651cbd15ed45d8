//! # Packflow Core
//!
//! Core components shared by every packflow codec.
//!
//! This crate provides the pieces that do not depend on a particular
//! compression format:
//!
//! - [`traits`]: The [`Codec`] session contract
//! - [`pump`]: The chunked pump that drives a session over a reader and writer
//! - [`cursor`]: Fixed-capacity input and output blocks
//! - [`config`]: Presets, modes and block sizes
//! - [`crc`]: CRC-32 and CRC-64 checksums
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Front end                                               │
//! │     packflow CLI, DualModeDriver                        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Codec sessions                                          │
//! │     gzip (zlib), zstd, xz (liblzma), xz-embedded        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Pump (this crate)                                       │
//! │     InputBlock/OutputBlock, Action, StreamOutcome       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use packflow_core::crc::Crc32;
//! use packflow_core::{Preset, PumpConfig};
//!
//! let preset = Preset::new(9, true).unwrap();
//! assert_eq!(preset.zstd_level(), 22);
//!
//! let config = PumpConfig::uniform(4096).unwrap();
//! assert_eq!(config.input_block, 4096);
//!
//! assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crc;
pub mod cursor;
pub mod error;
pub mod pump;
pub mod traits;

// Re-exports for convenience
pub use config::{DriverConfig, Mode, Preset, PumpConfig, XZ_PRESET_EXTREME};
pub use crc::{Crc32, Crc64};
pub use cursor::{DEFAULT_BLOCK_SIZE, InputBlock, OutputBlock};
pub use error::{CodecError, ErrorKind, Result};
pub use pump::{Pump, PumpStats};
pub use traits::{Action, Codec, StreamOutcome};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{DriverConfig, Mode, Preset, PumpConfig};
    pub use crate::error::{CodecError, ErrorKind, Result};
    pub use crate::pump::{Pump, PumpStats};
    pub use crate::traits::{Action, Codec, StreamOutcome};
}
