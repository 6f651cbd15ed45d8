//! Streaming Zstandard decompression session.

use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, StreamOutcome};
use tracing::{debug, trace};
use zstd::stream::raw::{Decoder, InBuffer, Operation, OutBuffer};

use crate::{CODEC_NAME, classify};

/// Decodes a sequence of Zstandard frames.
pub struct ZstdDecoder {
    context: Decoder<'static>,
    /// No frame is partially decoded or partially flushed.
    at_boundary: bool,
    frames: u64,
    complete: bool,
}

impl ZstdDecoder {
    /// Create a new decompression session.
    pub fn new() -> Result<Self> {
        let context = Decoder::new()
            .map_err(|e| CodecError::init(format!("zstd decoder: {e}")))?;
        Ok(Self {
            context,
            at_boundary: true,
            frames: 0,
            complete: false,
        })
    }

    /// Number of frames fully decoded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Codec for ZstdDecoder {
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
        if action == Action::Finish && input.is_empty() && self.at_boundary {
            debug!(frames = self.frames, "zstd stream complete");
            self.complete = true;
            return Ok((0, 0, StreamOutcome::Complete));
        }

        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);
        let hint = self.context.run(&mut src, &mut dst).map_err(classify)?;
        let (consumed, produced) = (src.pos(), dst.pos());

        // A zero hint means the current frame is decoded and fully flushed.
        let frame_end = hint == 0;
        if frame_end && (consumed > 0 || !self.at_boundary) {
            self.frames += 1;
            trace!(frames = self.frames, "zstd frame finished");
        }
        if consumed > 0 || produced > 0 {
            self.at_boundary = frame_end;
        }

        if action == Action::Finish && consumed == input.len() && self.at_boundary {
            debug!(frames = self.frames, "zstd stream complete");
            self.complete = true;
            return Ok((consumed, produced, StreamOutcome::Complete));
        }
        Ok((consumed, produced, StreamOutcome::Continue))
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packflow_core::{ErrorKind, Pump, PumpConfig};

    fn decode(compressed: &[u8], block: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        Pump::new(PumpConfig::uniform(block).unwrap()).run(
            &mut ZstdDecoder::new()?,
            &mut &compressed[..],
            &mut out,
        )?;
        Ok(out)
    }

    #[test]
    fn test_decode_reference_frame() {
        let data = b"zstd frame payload ".repeat(3000);
        let compressed = zstd::encode_all(&data[..], 3).unwrap();
        for block in [1, 17, 4096, 16384] {
            assert_eq!(decode(&compressed, block).unwrap(), data);
        }
    }

    #[test]
    fn test_concatenated_frames() {
        let mut compressed = zstd::encode_all(&b"first frame, "[..], 1).unwrap();
        compressed.extend(zstd::encode_all(&b"second frame"[..], 19).unwrap());
        assert_eq!(decode(&compressed, 5).unwrap(), b"first frame, second frame");

        let mut decoder = ZstdDecoder::new().unwrap();
        Pump::default()
            .run(&mut decoder, &mut &compressed[..], &mut Vec::new())
            .unwrap();
        assert_eq!(decoder.frames(), 2);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(decode(&[], 16384).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_frame() {
        let compressed = zstd::encode_all(&b"truncated frame body"[..], 3).unwrap();
        let err = decode(&compressed[..compressed.len() - 2], 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_not_zstd() {
        let err = decode(b"\x00\x01\x02\x03 definitely not a frame", 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }
}
