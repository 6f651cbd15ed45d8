//! Streaming Zstandard compression session.

use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, Preset, StreamOutcome};
use tracing::debug;
use zstd::stream::raw::{CParameter, Encoder, InBuffer, Operation, OutBuffer};

use crate::{CODEC_NAME, classify};

/// Encodes its input as one Zstandard frame with a content checksum.
pub struct ZstdEncoder {
    context: Encoder<'static>,
    complete: bool,
}

impl ZstdEncoder {
    /// Create a new compression session for `preset`.
    pub fn new(preset: Preset) -> Result<Self> {
        let level = preset.zstd_level();
        let mut context = Encoder::new(level)
            .map_err(|e| CodecError::init(format!("zstd encoder level {level}: {e}")))?;
        context
            .set_parameter(CParameter::ChecksumFlag(true))
            .map_err(|e| CodecError::init(format!("zstd checksum flag: {e}")))?;
        debug!(level, "zstd encoder created");
        Ok(Self {
            context,
            complete: false,
        })
    }
}

impl Codec for ZstdEncoder {
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

        let mut dst = OutBuffer::around(output);

        if action == Action::Run || !input.is_empty() {
            let mut src = InBuffer::around(input);
            self.context.run(&mut src, &mut dst).map_err(classify)?;
            return Ok((src.pos(), dst.pos(), StreamOutcome::Continue));
        }

        // Bytes still buffered in the context after this call.
        let remaining = self.context.finish(&mut dst, true).map_err(classify)?;
        if remaining == 0 {
            debug!("zstd frame finished");
            self.complete = true;
            return Ok((0, dst.pos(), StreamOutcome::Complete));
        }
        Ok((0, dst.pos(), StreamOutcome::Continue))
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZSTD_MAGIC;
    use packflow_core::{Pump, PumpConfig};

    fn encode(data: &[u8], preset: Preset, block: usize) -> Vec<u8> {
        let mut out = Vec::new();
        Pump::new(PumpConfig::uniform(block).unwrap())
            .run(&mut ZstdEncoder::new(preset).unwrap(), &mut &data[..], &mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_reference_decoder_accepts_output() {
        let data: Vec<u8> = (0..80_000u32).map(|i| (i % 251) as u8).collect();
        for block in [1, 17, 16384] {
            let compressed = encode(&data, Preset::DEFAULT, block);
            assert_eq!(&compressed[..4], &ZSTD_MAGIC);
            assert_eq!(zstd::decode_all(&compressed[..]).unwrap(), data);
        }
    }

    #[test]
    fn test_empty_input_gives_valid_frame() {
        let compressed = encode(&[], Preset::DEFAULT, 16384);
        assert_eq!(&compressed[..4], &ZSTD_MAGIC);
        assert!(zstd::decode_all(&compressed[..]).unwrap().is_empty());
    }

    #[test]
    fn test_checksum_is_written() {
        let compressed = encode(b"checksummed", Preset::FAST, 16384);
        // Frame header descriptor: Content_Checksum_flag is bit 2.
        assert_ne!(compressed[4] & 0x04, 0);

        let mut corrupted = compressed.clone();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        assert!(zstd::decode_all(&corrupted[..]).is_err());
    }
}
