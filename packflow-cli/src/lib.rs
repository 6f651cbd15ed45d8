//! # Packflow CLI
//!
//! Codec selection and exit-code mapping behind the `packflow` filter.
//!
//! The binary reads standard input, pushes it through one codec session and
//! writes the result to standard output. Everything it needs beyond
//! argument parsing lives here so it can be tested without a process.
//!
//! ## Example
//!
//! ```rust
//! use packflow_cli::{CodecKind, SessionConfig, transcode};
//! use packflow_core::DriverConfig;
//!
//! let compress = SessionConfig::new(DriverConfig::compress(6, false).unwrap());
//! let mut packed = Vec::new();
//! transcode(CodecKind::Zstd, &compress, &mut &b"hello"[..], &mut packed).unwrap();
//!
//! let decompress = SessionConfig::new(DriverConfig::decompress());
//! let mut restored = Vec::new();
//! transcode(CodecKind::Zstd, &decompress, &mut &packed[..], &mut restored).unwrap();
//! assert_eq!(restored, b"hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::ValueEnum;
use packflow_core::{
    Codec, CodecError, DriverConfig, ErrorKind, Mode, Pump, PumpStats, Result,
};
use packflow_gzip::{GzipDecoder, GzipEncoder};
use packflow_xz::DualModeDriver;
use packflow_xzembed::{EmbeddedOptions, XzEmbeddedDecoder};
use packflow_zstd::{ZstdDecoder, ZstdEncoder};
use std::fmt;
use std::io::{Read, Write};
use tracing::info;

/// Codec selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CodecKind {
    /// gzip (zlib deflate)
    Gzip,
    /// Zstandard
    Zstd,
    /// xz (liblzma)
    #[default]
    Xz,
    /// xz, bounded-memory decoder only
    XzEmbedded,
}

impl CodecKind {
    /// Codec name as used in errors and log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => packflow_gzip::CODEC_NAME,
            Self::Zstd => packflow_zstd::CODEC_NAME,
            Self::Xz => packflow_xz::CODEC_NAME,
            Self::XzEmbedded => packflow_xzembed::CODEC_NAME,
        }
    }

    /// Check if the codec can compress.
    pub fn can_compress(self) -> bool {
        !matches!(self, Self::XzEmbedded)
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to build one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Mode, preset and pump block sizes.
    pub driver: DriverConfig,
    /// Options for the bounded-memory decoder.
    pub embedded: EmbeddedOptions,
}

impl SessionConfig {
    /// Create a configuration with default embedded options.
    pub fn new(driver: DriverConfig) -> Self {
        Self {
            driver,
            embedded: EmbeddedOptions::default(),
        }
    }

    /// Replace the embedded decoder options.
    pub fn with_embedded(mut self, embedded: EmbeddedOptions) -> Self {
        self.embedded = embedded;
        self
    }
}

/// Build a session for `kind`.
///
/// xz sessions come from the [`DualModeDriver`]. Asking the embedded decoder
/// to compress is an initialization error.
pub fn build_codec(kind: CodecKind, config: &SessionConfig) -> Result<Box<dyn Codec>> {
    let DriverConfig { mode, preset, .. } = config.driver;

    let codec: Box<dyn Codec> = match (kind, mode) {
        (CodecKind::Xz, _) => return DualModeDriver::new(config.driver).session(),
        (CodecKind::Gzip, Mode::Compress) => Box::new(GzipEncoder::new(preset)),
        (CodecKind::Gzip, Mode::Decompress) => Box::new(GzipDecoder::new()),
        (CodecKind::Zstd, Mode::Compress) => Box::new(ZstdEncoder::new(preset)?),
        (CodecKind::Zstd, Mode::Decompress) => Box::new(ZstdDecoder::new()?),
        (CodecKind::XzEmbedded, Mode::Compress) => {
            return Err(CodecError::init("xz-embedded is a decoder only"));
        }
        (CodecKind::XzEmbedded, Mode::Decompress) => {
            Box::new(XzEmbeddedDecoder::with_options(config.embedded))
        }
    };

    match mode {
        Mode::Compress => info!(
            "{kind} compression: level {}{}",
            preset.level(),
            if preset.is_extreme() { " (extreme)" } else { "" }
        ),
        Mode::Decompress => info!("{kind} decompression"),
    }
    Ok(codec)
}

/// Run one session of `kind` from `reader` to `writer`.
pub fn transcode<R, W>(
    kind: CodecKind,
    config: &SessionConfig,
    reader: &mut R,
    writer: &mut W,
) -> Result<PumpStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if kind == CodecKind::Xz {
        return DualModeDriver::new(config.driver).run(reader, writer);
    }
    let mut codec = build_codec(kind, config)?;
    Pump::new(config.driver.pump).run(&mut codec, reader, writer)
}

/// Process exit code for success.
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit code for a command-line usage error (clap's own code).
pub const EXIT_USAGE: u8 = 2;

/// Process exit code for an error.
pub fn exit_code(err: &CodecError) -> u8 {
    match err.kind() {
        ErrorKind::Init => 3,
        ErrorKind::Read => 4,
        ErrorKind::Write => 5,
        ErrorKind::Data => 6,
        ErrorKind::Memory => 7,
        ErrorKind::Engine => 8,
    }
}
