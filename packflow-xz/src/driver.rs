//! Dual-mode xz driver.
//!
//! Chooses compression or decompression against a single xz session and
//! runs the pump once over the given streams.

use packflow_core::error::Result;
use packflow_core::{Codec, DriverConfig, Mode, Pump, PumpStats};
use std::io::{Read, Write};
use tracing::info;

use crate::{XzDecoder, XzEncoder};

/// Runs one xz compression or decompression pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualModeDriver {
    config: DriverConfig,
}

impl DualModeDriver {
    /// Create a driver for `config`.
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Build the session for the configured mode.
    ///
    /// Decompression ignores the preset.
    pub fn session(&self) -> Result<Box<dyn Codec>> {
        match self.config.mode {
            Mode::Compress => {
                let preset = self.config.preset;
                let encoder = XzEncoder::new(preset)?;
                info!(
                    "Compression: level {}{}",
                    preset.level(),
                    if preset.is_extreme() { " (extreme)" } else { "" }
                );
                Ok(Box::new(encoder))
            }
            Mode::Decompress => {
                let decoder = XzDecoder::new()?;
                info!("Decompression");
                Ok(Box::new(decoder))
            }
        }
    }

    /// Transcode all of `reader` into `writer`.
    pub fn run<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<PumpStats>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut session = self.session()?;
        Pump::new(self.config.pump).run(&mut session, reader, writer)
    }
}
