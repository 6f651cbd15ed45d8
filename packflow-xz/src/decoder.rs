//! Streaming xz decompression session.

use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, StreamOutcome};
use tracing::debug;
use xz2::stream::{CONCATENATED, Status, Stream};

use crate::{CODEC_NAME, classify, lzma_action};

/// Decodes one or more concatenated xz streams.
pub struct XzDecoder {
    stream: Stream,
    complete: bool,
}

impl XzDecoder {
    /// Create a decoder with no memory usage limit.
    pub fn new() -> Result<Self> {
        Self::with_memlimit(u64::MAX)
    }

    /// Create a decoder that fails with a memory error once liblzma would
    /// need more than `memlimit` bytes.
    pub fn with_memlimit(memlimit: u64) -> Result<Self> {
        let stream = Stream::new_stream_decoder(memlimit, CONCATENATED)
            .map_err(|e| CodecError::init(format!("xz decoder: {e:?}")))?;
        debug!(memlimit, "xz decoder created");
        Ok(Self {
            stream,
            complete: false,
        })
    }
}

impl Codec for XzDecoder {
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

        // MemNeeded is LZMA_BUF_ERROR: no progress was possible. The pump
        // turns that into a truncation error under Finish.
        match status {
            Status::StreamEnd => {
                debug!(
                    total_in = self.stream.total_in(),
                    total_out = self.stream.total_out(),
                    "xz stream end"
                );
                self.complete = true;
                Ok((consumed, produced, StreamOutcome::Complete))
            }
            Status::Ok | Status::GetCheck | Status::MemNeeded => {
                Ok((consumed, produced, StreamOutcome::Continue))
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packflow_core::{ErrorKind, Pump};
    use std::io::Write;
    use xz2::write::XzEncoder as ReferenceEncoder;

    fn reference_xz(data: &[u8], preset: u32) -> Vec<u8> {
        let mut encoder = ReferenceEncoder::new(Vec::new(), preset);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn decode(decoder: &mut XzDecoder, compressed: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        Pump::default().run(decoder, &mut &compressed[..], &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_decode_reference_stream() {
        let data = b"liblzma reference ".repeat(1000);
        let compressed = reference_xz(&data, 6);
        assert_eq!(decode(&mut XzDecoder::new().unwrap(), &compressed).unwrap(), data);
    }

    #[test]
    fn test_empty_input_is_truncated() {
        let err = decode(&mut XzDecoder::new().unwrap(), &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_memlimit() {
        // Preset 6 uses an 8 MiB dictionary.
        let compressed = reference_xz(b"needs a large dictionary", 6);
        let mut decoder = XzDecoder::with_memlimit(1 << 20).unwrap();
        let err = decode(&mut decoder, &compressed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Memory);
    }

    #[test]
    fn test_not_xz() {
        let err = decode(&mut XzDecoder::new().unwrap(), b"plain text, not xz").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_session_reports_completion() {
        let compressed = reference_xz(b"complete", 1);
        let mut decoder = XzDecoder::new().unwrap();
        decode(&mut decoder, &compressed).unwrap();
        assert!(decoder.is_complete());
    }
}
