//! Streaming xz compression session.

use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, Preset, StreamOutcome};
use tracing::debug;
use xz2::stream::{Check, Status, Stream};

use crate::{CODEC_NAME, classify, lzma_action};

/// Encodes a single xz stream with a CRC-64 check.
pub struct XzEncoder {
    stream: Stream,
    complete: bool,
}

impl XzEncoder {
    /// Create a new compression session for `preset`.
    pub fn new(preset: Preset) -> Result<Self> {
        let raw = preset.xz_preset();
        let stream = Stream::new_easy_encoder(raw, Check::Crc64).map_err(|e| {
            CodecError::init(format!("xz encoder preset {:#x}: {e:?}", raw))
        })?;
        debug!(
            level = preset.level(),
            extreme = preset.is_extreme(),
            "xz encoder created"
        );
        Ok(Self {
            stream,
            complete: false,
        })
    }
}

impl Codec for XzEncoder {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, StreamOutcome)> {
        if self.complete {
            return Ok((0, 0, StreamOutcome::Complete));
        }

        let in_before = self.stream.total_in();
        let out_before = self.stream.total_out();
        let status = self
            .stream
            .process(input, output, lzma_action(action))
            .map_err(classify)?;
        let consumed = (self.stream.total_in() - in_before) as usize;
        let produced = (self.stream.total_out() - out_before) as usize;

        if matches!(status, Status::StreamEnd) {
            debug!(
                total_in = self.stream.total_in(),
                total_out = self.stream.total_out(),
                "xz stream finished"
            );
            self.complete = true;
            return Ok((consumed, produced, StreamOutcome::Complete));
        }
        Ok((consumed, produced, StreamOutcome::Continue))
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}
