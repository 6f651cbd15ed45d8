//! Streaming gzip compression session.

use flate2::{Compress, Compression, FlushCompress, Status};
use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, Crc32, Preset, StreamOutcome};
use tracing::debug;

use crate::CODEC_NAME;
use crate::header::{encode_header, encode_trailer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Body,
    Trailer,
    Done,
}

/// Encodes a single gzip member.
pub struct GzipEncoder {
    deflate: Compress,
    stage: Stage,
    /// Header or trailer bytes waiting for output space.
    pending: Vec<u8>,
    pending_pos: usize,
    crc: Crc32,
    size: u64,
}

impl GzipEncoder {
    /// Create a new compression session for `preset`.
    pub fn new(preset: Preset) -> Self {
        let level = preset.gzip_level();
        debug!(level, "gzip encoder created");
        Self {
            deflate: Compress::new(Compression::new(level), false),
            stage: Stage::Body,
            pending: encode_header(level).to_vec(),
            pending_pos: 0,
            crc: Crc32::new(),
            size: 0,
        }
    }

    /// Copy pending framing bytes; returns the number written.
    fn drain_pending(&mut self, output: &mut [u8]) -> usize {
        let n = (self.pending.len() - self.pending_pos).min(output.len());
        output[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
        self.pending_pos += n;
        n
    }

    fn has_pending(&self) -> bool {
        self.pending_pos < self.pending.len()
    }
}

impl Codec for GzipEncoder {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, StreamOutcome)> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            produced += self.drain_pending(&mut output[produced..]);
            if self.has_pending() {
                break;
            }

            match self.stage {
                Stage::Body => {
                    let flush = match action {
                        Action::Run => FlushCompress::None,
                        Action::Finish => FlushCompress::Finish,
                    };
                    let in_before = self.deflate.total_in();
                    let out_before = self.deflate.total_out();
                    let status = self
                        .deflate
                        .compress(&input[consumed..], &mut output[produced..], flush)
                        .map_err(|e| CodecError::engine(CODEC_NAME, e.to_string()))?;
                    let used = (self.deflate.total_in() - in_before) as usize;
                    let made = (self.deflate.total_out() - out_before) as usize;

                    self.crc.update(&input[consumed..consumed + used]);
                    self.size += used as u64;
                    consumed += used;
                    produced += made;

                    if status != Status::StreamEnd {
                        break;
                    }
                    self.pending = encode_trailer(self.crc.value(), self.size).to_vec();
                    self.pending_pos = 0;
                    self.stage = Stage::Trailer;
                }
                Stage::Trailer => {
                    debug!(size = self.size, "gzip member finished");
                    self.stage = Stage::Done;
                }
                Stage::Done => break,
            }
        }

        let outcome = if self.stage == Stage::Done {
            StreamOutcome::Complete
        } else {
            StreamOutcome::Continue
        };
        Ok((consumed, produced, outcome))
    }

    fn is_complete(&self) -> bool {
        self.stage == Stage::Done
    }
}
