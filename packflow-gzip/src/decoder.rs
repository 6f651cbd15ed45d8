//! Streaming gzip decompression session.

use flate2::{Decompress, DecompressError, FlushDecompress, Status};
use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, Crc32, StreamOutcome};
use tracing::debug;

use crate::CODEC_NAME;
use crate::header::{MAX_HEADER_LEN, TRAILER_LEN, parse_header, verify_trailer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Body,
    Trailer,
    Done,
}

/// Decodes the first member of a gzip stream.
///
/// The member header is parsed here; the deflate body goes through a raw
/// inflate engine. The trailer CRC-32 and length are verified before the
/// session reports completion. Bytes after the first member are not read.
pub struct GzipDecoder {
    inflate: Decompress,
    stage: Stage,
    header: Vec<u8>,
    trailer: [u8; TRAILER_LEN],
    trailer_len: usize,
    crc: Crc32,
    size: u64,
}

impl GzipDecoder {
    /// Create a new decompression session.
    pub fn new() -> Self {
        Self {
            inflate: Decompress::new(false),
            stage: Stage::Header,
            header: Vec::new(),
            trailer: [0u8; TRAILER_LEN],
            trailer_len: 0,
            crc: Crc32::new(),
            size: 0,
        }
    }

    /// Number of decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.size
    }

    /// Feed header bytes; returns how many of `input` belonged to the header.
    fn read_header(&mut self, input: &[u8]) -> Result<usize> {
        let before = self.header.len();
        let take = input.len().min(MAX_HEADER_LEN - before);
        self.header.extend_from_slice(&input[..take]);

        match parse_header(&self.header)? {
            Some(len) => {
                debug!(header_len = len, "gzip member header parsed");
                self.header = Vec::new();
                self.stage = Stage::Body;
                Ok(len - before)
            }
            None if self.header.len() >= MAX_HEADER_LEN => {
                Err(CodecError::data(CODEC_NAME, "member header too long"))
            }
            None => Ok(take),
        }
    }

    fn read_trailer(&mut self, input: &[u8]) -> Result<usize> {
        let take = (TRAILER_LEN - self.trailer_len).min(input.len());
        self.trailer[self.trailer_len..self.trailer_len + take].copy_from_slice(&input[..take]);
        self.trailer_len += take;

        if self.trailer_len == TRAILER_LEN {
            verify_trailer(&self.trailer, self.crc.value(), self.size)?;
            debug!(size = self.size, "gzip member verified");
            self.stage = Stage::Done;
        }
        Ok(take)
    }
}

impl Default for GzipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(err: DecompressError) -> CodecError {
    if err.needs_dictionary().is_some() {
        return CodecError::data(CODEC_NAME, "stream requires a preset dictionary");
    }
    let message = err.to_string();
    if message.contains("memory") {
        CodecError::memory(CODEC_NAME, message)
    } else {
        CodecError::data(CODEC_NAME, format!("invalid deflate data: {message}"))
    }
}

impl Codec for GzipDecoder {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        _action: Action,
    ) -> Result<(usize, usize, StreamOutcome)> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            match self.stage {
                Stage::Header => {
                    if consumed == input.len() {
                        break;
                    }
                    consumed += self.read_header(&input[consumed..])?;
                }
                Stage::Body => {
                    let in_before = self.inflate.total_in();
                    let out_before = self.inflate.total_out();
                    let status = self
                        .inflate
                        .decompress(
                            &input[consumed..],
                            &mut output[produced..],
                            FlushDecompress::None,
                        )
                        .map_err(classify)?;
                    let used = (self.inflate.total_in() - in_before) as usize;
                    let made = (self.inflate.total_out() - out_before) as usize;

                    self.crc.update(&output[produced..produced + made]);
                    self.size += made as u64;
                    consumed += used;
                    produced += made;

                    if status != Status::StreamEnd {
                        break;
                    }
                    self.stage = Stage::Trailer;
                }
                Stage::Trailer => {
                    consumed += self.read_trailer(&input[consumed..])?;
                    if self.stage != Stage::Done {
                        break;
                    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use packflow_core::{ErrorKind, Pump, PumpConfig};
    use std::io::Write;

    fn reference_gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn decode(compressed: &[u8], block: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        Pump::new(PumpConfig::uniform(block).unwrap()).run(
            &mut GzipDecoder::new(),
            &mut &compressed[..],
            &mut out,
        )?;
        Ok(out)
    }

    #[test]
    fn test_decode_reference_stream() {
        let data: Vec<u8> = b"gzip member body ".repeat(2000);
        let compressed = reference_gzip(&data);
        for block in [1, 17, 4096, 16384] {
            assert_eq!(decode(&compressed, block).unwrap(), data);
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut compressed = reference_gzip(b"first");
        compressed.extend_from_slice(&reference_gzip(b"second"));
        assert_eq!(decode(&compressed, 16384).unwrap(), b"first");

        let mut decoder = GzipDecoder::new();
        let mut out = Vec::new();
        Pump::new(PumpConfig::uniform(3).unwrap())
            .run(&mut decoder, &mut &compressed[..], &mut out)
            .unwrap();
        assert!(decoder.is_complete());
        assert_eq!(decoder.total_out(), 5);
    }

    #[test]
    fn test_empty_input_is_truncated() {
        let err = decode(&[], 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_truncated_trailer() {
        let compressed = reference_gzip(b"cut short");
        let err = decode(&compressed[..compressed.len() - 3], 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_crc_mismatch() {
        let mut compressed = reference_gzip(b"integrity");
        let crc_at = compressed.len() - 8;
        compressed[crc_at] ^= 0x01;
        let err = decode(&compressed, 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_garbage_input() {
        let err = decode(b"this is plainly not gzip", 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }
}
