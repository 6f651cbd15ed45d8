//! Configuration consumed from a front end.
//!
//! Values are validated here, before any engine is constructed.

use crate::cursor::DEFAULT_BLOCK_SIZE;
use crate::error::{CodecError, Result};

/// liblzma's `LZMA_PRESET_EXTREME` flag.
pub const XZ_PRESET_EXTREME: u32 = 0x8000_0000;

/// Direction of a codec session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Encode plain bytes into a compressed stream.
    Compress,
    /// Decode a compressed stream.
    #[default]
    Decompress,
}

/// Compression preset: a level in `0..=9` plus the extreme flag.
///
/// xz keeps both: the extreme flag is ORed onto the level. gzip and zstd
/// have no extreme mode, so the flag replaces the level with the strongest
/// setting of the engine (zlib level 9, zstd ultra level 22). Level 0 with
/// extreme therefore compresses exactly like level 9 with extreme.
///
/// Ignored by decompression sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    level: u8,
    extreme: bool,
}

impl Preset {
    /// Fastest preset (level 0).
    pub const FAST: Self = Self {
        level: 0,
        extreme: false,
    };
    /// Default preset (level 6).
    pub const DEFAULT: Self = Self {
        level: 6,
        extreme: false,
    };
    /// Strongest preset (level 9, extreme).
    pub const BEST: Self = Self {
        level: 9,
        extreme: true,
    };

    /// Create a preset, rejecting levels outside `0..=9`.
    pub fn new(level: u8, extreme: bool) -> Result<Self> {
        if level > 9 {
            return Err(CodecError::init(format!(
                "compression level {level} is outside 0-9"
            )));
        }
        Ok(Self { level, extreme })
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Check if the extreme flag is set.
    pub fn is_extreme(&self) -> bool {
        self.extreme
    }

    /// liblzma easy-encoder preset (`level | LZMA_PRESET_EXTREME`).
    pub fn xz_preset(&self) -> u32 {
        let preset = self.level as u32;
        if self.extreme {
            preset | XZ_PRESET_EXTREME
        } else {
            preset
        }
    }

    /// zlib compression level. Extreme always selects the best level.
    pub fn gzip_level(&self) -> u32 {
        if self.extreme { 9 } else { self.level as u32 }
    }

    /// zstd compression level.
    ///
    /// Level 0 maps to 1 (zstd treats 0 as "library default"), extreme
    /// selects the ultra level 22.
    pub fn zstd_level(&self) -> i32 {
        if self.extreme {
            22
        } else {
            (self.level as i32).max(1)
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Block sizes used by the chunked pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    /// Capacity of the input block (maximum bytes requested per read).
    pub input_block: usize,
    /// Capacity of the output block.
    pub output_block: usize,
}

impl PumpConfig {
    /// Create a pump configuration, rejecting zero-sized blocks.
    pub fn new(input_block: usize, output_block: usize) -> Result<Self> {
        if input_block == 0 || output_block == 0 {
            return Err(CodecError::init("pump block sizes must be non-zero"));
        }
        Ok(Self {
            input_block,
            output_block,
        })
    }

    /// Same capacity for both blocks.
    pub fn uniform(block: usize) -> Result<Self> {
        Self::new(block, block)
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            input_block: DEFAULT_BLOCK_SIZE,
            output_block: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Configuration of the dual-mode xz driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverConfig {
    /// Compress or decompress.
    pub mode: Mode,
    /// Compression preset (compress only).
    pub preset: Preset,
    /// Block sizes for the pump.
    pub pump: PumpConfig,
}

impl DriverConfig {
    /// Configuration for a decompression run.
    pub fn decompress() -> Self {
        Self::default()
    }

    /// Configuration for a compression run, validating the level.
    pub fn compress(level: u8, extreme: bool) -> Result<Self> {
        Ok(Self {
            mode: Mode::Compress,
            preset: Preset::new(level, extreme)?,
            pump: PumpConfig::default(),
        })
    }

    /// Replace the pump block sizes.
    pub fn with_pump(mut self, pump: PumpConfig) -> Self {
        self.pump = pump;
        self
    }
}
