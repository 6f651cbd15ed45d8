//! xz container parser for the bounded-memory decoder.
//!
//! ```text
//! +--------+---------+-----+---------+-------+--------+
//! | header | block 0 | ... | block n | index | footer |
//! +--------+---------+-----+---------+-------+--------+
//! ```
//!
//! Every field is parsed incrementally so the decoder can be fed one byte
//! at a time. Only single-filter LZMA2 blocks are supported.

use packflow_core::crc::{Crc32, Crc64};
use packflow_core::error::{CodecError, Result};
use packflow_core::{Action, Codec, StreamOutcome};
use tracing::{debug, trace};

use crate::CODEC_NAME;
use crate::lzma2::Lzma2Decoder;

/// Default dictionary ceiling.
pub const DEFAULT_DICT_MAX: usize = 1 << 20;

/// xz stream header magic bytes.
pub const HEADER_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// xz stream footer magic bytes.
pub const FOOTER_MAGIC: [u8; 2] = [b'Y', b'Z'];

/// Size of the stream header and footer.
pub const STREAM_HEADER_SIZE: usize = 12;

/// Largest block header.
const BLOCK_HEADER_MAX: usize = 1024;

/// LZMA2 filter ID.
const FILTER_LZMA2: u64 = 0x21;

/// Check sizes by check ID.
const CHECK_SIZES: [usize; 16] = [0, 4, 4, 4, 8, 8, 8, 16, 16, 16, 32, 32, 32, 64, 64, 64];

const CHECK_CRC32: u8 = 0x01;
const CHECK_CRC64: u8 = 0x04;

fn unsupported() -> CodecError {
    CodecError::engine(CODEC_NAME, "unsupported options")
}

/// Options for [`XzEmbeddedDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedOptions {
    /// Dictionary ceiling in bytes.
    pub dict_max: usize,
    /// Decode streams placed back to back, separated by stream padding.
    pub concatenated: bool,
}

impl Default for EmbeddedOptions {
    fn default() -> Self {
        Self {
            dict_max: DEFAULT_DICT_MAX,
            concatenated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    StreamHeader,
    BlockStart,
    BlockHeader,
    BlockData,
    BlockPadding,
    BlockCheck,
    Index,
    IndexPadding,
    IndexCrc,
    StreamFooter,
    StreamPadding,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexField {
    Count,
    Unpadded,
    Uncompressed,
}

/// Record count and size sums, accumulated from blocks and from the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    count: u64,
    unpadded: u64,
    uncompressed: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Block {
    header_size: usize,
    declared_compressed: Option<u64>,
    declared_uncompressed: Option<u64>,
    compressed: u64,
    uncompressed: u64,
}

/// Read one variable-length integer from `buf` at `*pos`.
fn read_vli(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..9 {
        let byte = *buf
            .get(*pos)
            .ok_or_else(|| CodecError::data(CODEC_NAME, "truncated integer in block header"))?;
        *pos += 1;
        value |= ((byte & 0x7F) as u64) << (i * 7);
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(CodecError::data(CODEC_NAME, "non-minimal integer encoding"));
            }
            return Ok(value);
        }
    }
    Err(CodecError::data(CODEC_NAME, "integer too large"))
}

fn le32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Bounded-memory xz decoder.
///
/// Memory use is the dictionary, capped at [`EmbeddedOptions::dict_max`],
/// plus a fixed overhead allocated at construction: one LZMA2 chunk buffer,
/// the LZMA probability tables and a block header buffer.
#[derive(Debug)]
pub struct XzEmbeddedDecoder {
    options: EmbeddedOptions,
    lzma2: Lzma2Decoder,
    sequence: Sequence,
    temp: Box<[u8; BLOCK_HEADER_MAX]>,
    temp_len: usize,
    temp_need: usize,
    stream_flags: [u8; 2],
    check_type: u8,
    crc32: Crc32,
    crc64: Crc64,
    block: Block,
    /// Totals over the decoded blocks of the current stream.
    blocks: Totals,
    /// Totals read back from the index.
    index: Totals,
    index_field: IndexField,
    index_records: u64,
    index_size: u64,
    index_crc: Crc32,
    vli: u64,
    vli_shift: u32,
    unpadded: u64,
    /// Stream padding bytes seen since the last footer.
    padding: u64,
    streams: u64,
    total_out: u64,
    complete: bool,
}

impl XzEmbeddedDecoder {
    /// Create a decoder with default options.
    pub fn new() -> Self {
        Self::with_options(EmbeddedOptions::default())
    }

    /// Create a decoder with `options`.
    pub fn with_options(options: EmbeddedOptions) -> Self {
        debug!(
            dict_max = options.dict_max,
            concatenated = options.concatenated,
            "xz-embedded decoder created"
        );
        Self {
            options,
            lzma2: Lzma2Decoder::new(options.dict_max),
            sequence: Sequence::StreamHeader,
            temp: Box::new([0u8; BLOCK_HEADER_MAX]),
            temp_len: 0,
            temp_need: STREAM_HEADER_SIZE,
            stream_flags: [0; 2],
            check_type: 0,
            crc32: Crc32::new(),
            crc64: Crc64::new(),
            block: Block::default(),
            blocks: Totals::default(),
            index: Totals::default(),
            index_field: IndexField::Count,
            index_records: 0,
            index_size: 0,
            index_crc: Crc32::new(),
            vli: 0,
            vli_shift: 0,
            unpadded: 0,
            padding: 0,
            streams: 0,
            total_out: 0,
            complete: false,
        }
    }

    /// Get the options.
    pub fn options(&self) -> &EmbeddedOptions {
        &self.options
    }

    /// Bytes currently allocated for the dictionary.
    pub fn dict_allocated(&self) -> usize {
        self.lzma2.dict_allocated()
    }

    /// Number of streams fully decoded.
    pub fn streams(&self) -> u64 {
        self.streams
    }

    fn expect(&mut self, sequence: Sequence, need: usize) {
        self.sequence = sequence;
        self.temp_len = 0;
        self.temp_need = need;
    }

    /// Collect header bytes into `temp`; true once `temp_need` are present.
    fn fill_temp(&mut self, input: &[u8], used: &mut usize) -> bool {
        let n = (self.temp_need - self.temp_len).min(input.len() - *used);
        self.temp[self.temp_len..self.temp_len + n].copy_from_slice(&input[*used..*used + n]);
        self.temp_len += n;
        *used += n;
        self.temp_len == self.temp_need
    }

    fn start_stream(&mut self) {
        self.blocks = Totals::default();
        self.index = Totals::default();
        self.padding = 0;
        self.expect(Sequence::StreamHeader, STREAM_HEADER_SIZE);
    }

    fn parse_stream_header(&mut self) -> Result<()> {
        let buf = &self.temp[..STREAM_HEADER_SIZE];
        if buf[..6] != HEADER_MAGIC {
            return Err(CodecError::data(CODEC_NAME, "file format not recognized"));
        }
        if Crc32::compute(&buf[6..8]) != le32(&buf[8..12]) {
            return Err(CodecError::data(CODEC_NAME, "stream header CRC mismatch"));
        }
        if buf[6] != 0 || buf[7] & 0xF0 != 0 {
            return Err(unsupported());
        }
        self.stream_flags = [buf[6], buf[7]];
        self.check_type = buf[7] & 0x0F;
        debug!(check = self.check_type, "xz stream header");
        Ok(())
    }

    fn parse_block_header(&mut self) -> Result<()> {
        let size = self.temp_need;
        let buf = &self.temp[..size];
        if Crc32::compute(&buf[..size - 4]) != le32(&buf[size - 4..]) {
            return Err(CodecError::data(CODEC_NAME, "block header CRC mismatch"));
        }

        // Exactly one filter and no reserved bits.
        let flags = buf[1];
        if flags & 0x3F != 0 {
            return Err(unsupported());
        }

        let body = &buf[..size - 4];
        let mut pos = 2;
        let declared_compressed = if flags & 0x40 != 0 {
            Some(read_vli(body, &mut pos)?)
        } else {
            None
        };
        let declared_uncompressed = if flags & 0x80 != 0 {
            Some(read_vli(body, &mut pos)?)
        } else {
            None
        };

        if read_vli(body, &mut pos)? != FILTER_LZMA2 || read_vli(body, &mut pos)? != 1 {
            return Err(unsupported());
        }
        let props = *body
            .get(pos)
            .ok_or_else(|| CodecError::data(CODEC_NAME, "truncated filter properties"))?;
        pos += 1;

        if body[pos..].iter().any(|&b| b != 0) {
            return Err(unsupported());
        }

        trace!(
            header_size = size,
            ?declared_compressed,
            ?declared_uncompressed,
            props,
            "xz block header"
        );
        self.lzma2.reset(props)?;
        self.block = Block {
            header_size: size,
            declared_compressed,
            declared_uncompressed,
            compressed: 0,
            uncompressed: 0,
        };
        self.crc32.reset();
        self.crc64.reset();
        Ok(())
    }

    fn update_check(&mut self, data: &[u8]) {
        match self.check_type {
            CHECK_CRC32 => self.crc32.update(data),
            CHECK_CRC64 => self.crc64.update(data),
            _ => {}
        }
    }

    fn check_block_sizes(&self) -> Result<()> {
        let block = &self.block;
        if block.declared_compressed.is_some_and(|d| block.compressed > d)
            || block.declared_uncompressed.is_some_and(|d| block.uncompressed > d)
        {
            return Err(CodecError::data(CODEC_NAME, "block exceeds its declared size"));
        }
        Ok(())
    }

    fn finish_block(&mut self) -> Result<()> {
        let block = self.block;
        if block.declared_compressed.is_some_and(|d| block.compressed != d)
            || block.declared_uncompressed.is_some_and(|d| block.uncompressed != d)
        {
            return Err(CodecError::data(CODEC_NAME, "block size mismatch"));
        }
        let check_size = CHECK_SIZES[self.check_type as usize] as u64;
        self.blocks.count += 1;
        self.blocks.unpadded += block.header_size as u64 + block.compressed + check_size;
        self.blocks.uncompressed += block.uncompressed;
        trace!(
            compressed = block.compressed,
            uncompressed = block.uncompressed,
            "xz block end"
        );
        Ok(())
    }

    fn verify_block_check(&self) -> Result<()> {
        let stored = &self.temp[..self.temp_need];
        let ok = match self.check_type {
            CHECK_CRC32 => self.crc32.value().to_le_bytes() == stored,
            CHECK_CRC64 => self.crc64.value().to_le_bytes() == stored,
            _ => true,
        };
        if !ok {
            return Err(CodecError::data(CODEC_NAME, "block check mismatch"));
        }
        Ok(())
    }

    fn index_byte(&mut self, byte: u8) -> Result<()> {
        self.index_crc.update(&[byte]);
        self.index_size += 1;

        if self.vli_shift >= 63 {
            return Err(CodecError::data(CODEC_NAME, "index integer too large"));
        }
        self.vli |= ((byte & 0x7F) as u64) << self.vli_shift;
        if byte & 0x80 != 0 {
            self.vli_shift += 7;
            return Ok(());
        }
        if byte == 0 && self.vli_shift > 0 {
            return Err(CodecError::data(CODEC_NAME, "non-minimal integer encoding"));
        }
        let value = self.vli;
        self.vli = 0;
        self.vli_shift = 0;

        match self.index_field {
            IndexField::Count => {
                if value != self.blocks.count {
                    return Err(CodecError::data(CODEC_NAME, "index record count mismatch"));
                }
                self.index_records = value;
                self.index_field = IndexField::Unpadded;
            }
            IndexField::Unpadded => {
                self.unpadded = value;
                self.index_field = IndexField::Uncompressed;
            }
            IndexField::Uncompressed => {
                self.index.count += 1;
                self.index.unpadded += self.unpadded;
                self.index.uncompressed += value;
                self.index_records -= 1;
                self.index_field = IndexField::Unpadded;
            }
        }
        if self.index_records == 0 {
            self.sequence = Sequence::IndexPadding;
        }
        Ok(())
    }

    fn parse_stream_footer(&mut self) -> Result<()> {
        let buf = &self.temp[..STREAM_HEADER_SIZE];
        if buf[10..12] != FOOTER_MAGIC {
            return Err(CodecError::data(CODEC_NAME, "stream footer magic mismatch"));
        }
        if Crc32::compute(&buf[4..10]) != le32(&buf[..4]) {
            return Err(CodecError::data(CODEC_NAME, "stream footer CRC mismatch"));
        }
        if (self.index_size / 4) as u32 != le32(&buf[4..8]) {
            return Err(CodecError::data(CODEC_NAME, "backward size mismatch"));
        }
        if buf[8..10] != self.stream_flags {
            return Err(CodecError::data(CODEC_NAME, "stream flags mismatch"));
        }
        self.streams += 1;
        debug!(
            blocks = self.blocks.count,
            uncompressed = self.blocks.uncompressed,
            "xz stream end"
        );
        Ok(())
    }

    /// Run the container state machine over `input` and `output`.
    fn run(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize)> {
        let mut used = 0;
        let mut made = 0;

        loop {
            match self.sequence {
                Sequence::StreamHeader => {
                    if !self.fill_temp(input, &mut used) {
                        return Ok((used, made));
                    }
                    self.parse_stream_header()?;
                    self.sequence = Sequence::BlockStart;
                }
                Sequence::BlockStart => {
                    let Some(&byte) = input.get(used) else {
                        return Ok((used, made));
                    };
                    if byte == 0 {
                        used += 1;
                        self.index_crc.reset();
                        self.index_crc.update(&[0]);
                        self.index_size = 1;
                        self.index_field = IndexField::Count;
                        self.index_records = 0;
                        self.vli = 0;
                        self.vli_shift = 0;
                        self.sequence = Sequence::Index;
                    } else {
                        self.expect(Sequence::BlockHeader, (byte as usize + 1) * 4);
                    }
                }
                Sequence::BlockHeader => {
                    if !self.fill_temp(input, &mut used) {
                        return Ok((used, made));
                    }
                    self.parse_block_header()?;
                    self.sequence = Sequence::BlockData;
                }
                Sequence::BlockData => {
                    let (u, m, end) = self.lzma2.decode(&input[used..], &mut output[made..])?;
                    self.update_check(&output[made..made + m]);
                    used += u;
                    made += m;
                    self.block.compressed += u as u64;
                    self.block.uncompressed += m as u64;
                    self.check_block_sizes()?;
                    if !end {
                        return Ok((used, made));
                    }
                    self.finish_block()?;
                    self.sequence = Sequence::BlockPadding;
                }
                Sequence::BlockPadding => {
                    if self.block.compressed % 4 == 0 {
                        let need = CHECK_SIZES[self.check_type as usize];
                        self.expect(Sequence::BlockCheck, need);
                        continue;
                    }
                    let Some(&byte) = input.get(used) else {
                        return Ok((used, made));
                    };
                    used += 1;
                    if byte != 0 {
                        return Err(CodecError::data(CODEC_NAME, "nonzero block padding"));
                    }
                    self.block.compressed += 1;
                }
                Sequence::BlockCheck => {
                    if !self.fill_temp(input, &mut used) {
                        return Ok((used, made));
                    }
                    self.verify_block_check()?;
                    self.sequence = Sequence::BlockStart;
                }
                Sequence::Index => {
                    let Some(&byte) = input.get(used) else {
                        return Ok((used, made));
                    };
                    used += 1;
                    self.index_byte(byte)?;
                }
                Sequence::IndexPadding => {
                    if self.index_size % 4 == 0 {
                        if self.index != self.blocks {
                            return Err(CodecError::data(CODEC_NAME, "index does not match blocks"));
                        }
                        self.expect(Sequence::IndexCrc, 4);
                        continue;
                    }
                    let Some(&byte) = input.get(used) else {
                        return Ok((used, made));
                    };
                    used += 1;
                    if byte != 0 {
                        return Err(CodecError::data(CODEC_NAME, "nonzero index padding"));
                    }
                    self.index_crc.update(&[0]);
                    self.index_size += 1;
                }
                Sequence::IndexCrc => {
                    if !self.fill_temp(input, &mut used) {
                        return Ok((used, made));
                    }
                    if self.index_crc.value() != le32(&self.temp[..4]) {
                        return Err(CodecError::data(CODEC_NAME, "index CRC mismatch"));
                    }
                    self.expect(Sequence::StreamFooter, STREAM_HEADER_SIZE);
                }
                Sequence::StreamFooter => {
                    if !self.fill_temp(input, &mut used) {
                        return Ok((used, made));
                    }
                    self.parse_stream_footer()?;
                    if self.options.concatenated {
                        self.padding = 0;
                        self.sequence = Sequence::StreamPadding;
                    } else {
                        self.sequence = Sequence::Done;
                    }
                }
                Sequence::StreamPadding => {
                    let Some(&byte) = input.get(used) else {
                        return Ok((used, made));
                    };
                    if byte == 0 {
                        used += 1;
                        self.padding += 1;
                        continue;
                    }
                    if self.padding % 4 != 0 {
                        return Err(CodecError::data(CODEC_NAME, "invalid stream padding"));
                    }
                    self.start_stream();
                }
                Sequence::Done => return Ok((used, made)),
            }
        }
    }
}

impl Default for XzEmbeddedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for XzEmbeddedDecoder {
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

        let (used, made) = self.run(input, output)?;
        self.total_out += made as u64;

        let done = match self.sequence {
            Sequence::Done => true,
            // Between streams, the end of input is the end of the data.
            Sequence::StreamPadding if action == Action::Finish && used == input.len() => {
                if self.padding % 4 != 0 {
                    return Err(CodecError::data(CODEC_NAME, "invalid stream padding"));
                }
                true
            }
            _ => false,
        };

        if done {
            debug!(
                streams = self.streams,
                total_out = self.total_out,
                "xz-embedded decode complete"
            );
            self.complete = true;
            return Ok((used, made, StreamOutcome::Complete));
        }
        Ok((used, made, StreamOutcome::Continue))
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}
