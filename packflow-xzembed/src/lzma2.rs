//! LZMA2 chunk decoder.
//!
//! LZMA2 wraps LZMA in chunks. Each chunk starts with a control byte:
//!
//! | Control     | Meaning                                          |
//! |-------------|--------------------------------------------------|
//! | `0x00`      | end of LZMA2 data                                |
//! | `0x01`      | uncompressed chunk, dictionary reset             |
//! | `0x02`      | uncompressed chunk                               |
//! | `0x80-0x9F` | LZMA chunk                                       |
//! | `0xA0-0xBF` | LZMA chunk, state reset                          |
//! | `0xC0-0xDF` | LZMA chunk, state reset, new properties          |
//! | `0xE0-0xFF` | LZMA chunk, dictionary reset, new properties     |
//!
//! The low five bits of an LZMA control byte are bits 16..21 of the
//! uncompressed size minus one.

use packflow_core::error::{CodecError, Result};
use tracing::trace;

use crate::CODEC_NAME;
use crate::dict::Dictionary;
use crate::lzma::LzmaDecoder;
use crate::model::LzmaProperties;
use crate::range::RangeDecoder;

/// Dictionary size from the LZMA2 filter properties byte.
pub fn dict_size_from_props(props: u8) -> Result<u32> {
    match props {
        0..=39 => Ok((2 | (props as u32 & 1)) << (props / 2 + 11)),
        40 => Ok(u32::MAX),
        _ => Err(CodecError::engine(CODEC_NAME, "unsupported options")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    Control,
    Unpacked0,
    Unpacked1,
    Packed0,
    Packed1,
    Properties,
    Collect,
    Run,
    CopySize0,
    CopySize1,
    Copy,
    End,
}

/// Decodes the LZMA2 payload of one xz block.
#[derive(Debug)]
pub struct Lzma2Decoder {
    dict: Dictionary,
    rc: RangeDecoder,
    lzma: LzmaDecoder,
    sequence: Sequence,
    /// Uncompressed bytes left in the current chunk.
    uncompressed: usize,
    /// Compressed size of the current chunk while reading its header.
    compressed: usize,
    /// Next LZMA chunk carries new properties.
    props_next: bool,
    need_dict_reset: bool,
    need_props: bool,
}

impl Lzma2Decoder {
    /// Create a decoder whose dictionary may grow to `dict_max` bytes.
    pub fn new(dict_max: usize) -> Self {
        Self {
            dict: Dictionary::new(dict_max),
            rc: RangeDecoder::new(),
            lzma: LzmaDecoder::new(),
            sequence: Sequence::Control,
            uncompressed: 0,
            compressed: 0,
            props_next: false,
            need_dict_reset: true,
            need_props: true,
        }
    }

    /// Bytes allocated for the dictionary.
    pub fn dict_allocated(&self) -> usize {
        self.dict.allocated()
    }

    /// Prepare for a new block whose filter properties byte is `props`.
    pub fn reset(&mut self, props: u8) -> Result<()> {
        let size = dict_size_from_props(props)?;
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        self.dict.prepare(size)?;
        self.sequence = Sequence::Control;
        self.need_dict_reset = true;
        self.need_props = true;
        Ok(())
    }

    /// Decode from `input` into `output`.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed, bytes produced, end of LZMA2 data reached)
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize, bool)> {
        let mut used = 0;
        let mut made = 0;

        loop {
            match self.sequence {
                Sequence::End => return Ok((used, made, true)),
                Sequence::Collect => {
                    used += self.rc.collect(&input[used..]);
                    if !self.rc.is_collected() {
                        return Ok((used, made, false));
                    }
                    self.rc.init()?;
                    self.sequence = Sequence::Run;
                }
                Sequence::Run => {
                    if made == output.len() {
                        return Ok((used, made, false));
                    }
                    self.dict.set_limit((output.len() - made).min(self.uncompressed));
                    self.lzma.decode(&mut self.rc, &mut self.dict)?;
                    let n = self.dict.flush(&mut output[made..]);
                    made += n;
                    self.uncompressed -= n;

                    if self.uncompressed == 0 {
                        if !self.rc.is_finished() || self.lzma.pending() > 0 {
                            return Err(CodecError::data(CODEC_NAME, "LZMA chunk size mismatch"));
                        }
                        self.sequence = Sequence::Control;
                    }
                }
                Sequence::Copy => {
                    if made == output.len() || used == input.len() {
                        return Ok((used, made, false));
                    }
                    self.dict.set_limit((output.len() - made).min(self.uncompressed));
                    let avail = (input.len() - used).min(self.uncompressed);
                    used += self.dict.copy_uncompressed(&input[used..used + avail]);
                    let n = self.dict.flush(&mut output[made..]);
                    made += n;
                    self.uncompressed -= n;

                    if self.uncompressed == 0 {
                        self.sequence = Sequence::Control;
                    }
                }
                _ => {
                    let Some(&byte) = input.get(used) else {
                        return Ok((used, made, false));
                    };
                    used += 1;
                    self.header_byte(byte)?;
                }
            }
        }
    }

    fn header_byte(&mut self, byte: u8) -> Result<()> {
        match self.sequence {
            Sequence::Control => self.control(byte)?,
            Sequence::Unpacked0 => {
                self.uncompressed += (byte as usize) << 8;
                self.sequence = Sequence::Unpacked1;
            }
            Sequence::Unpacked1 => {
                self.uncompressed += byte as usize + 1;
                self.sequence = Sequence::Packed0;
            }
            Sequence::Packed0 => {
                self.compressed = (byte as usize) << 8;
                self.sequence = Sequence::Packed1;
            }
            Sequence::Packed1 => {
                self.compressed += byte as usize + 1;
                self.rc.begin_chunk(self.compressed)?;
                self.sequence = if self.props_next {
                    Sequence::Properties
                } else {
                    Sequence::Collect
                };
            }
            Sequence::Properties => {
                let props = LzmaProperties::from_byte(byte).ok_or_else(|| {
                    CodecError::data(CODEC_NAME, format!("invalid LZMA properties {byte:#04x}"))
                })?;
                self.lzma.reset(props);
                self.sequence = Sequence::Collect;
            }
            Sequence::CopySize0 => {
                self.uncompressed = (byte as usize) << 8;
                self.sequence = Sequence::CopySize1;
            }
            Sequence::CopySize1 => {
                self.uncompressed += byte as usize + 1;
                self.sequence = Sequence::Copy;
            }
            Sequence::Collect | Sequence::Run | Sequence::Copy | Sequence::End => {}
        }
        Ok(())
    }

    fn control(&mut self, control: u8) -> Result<()> {
        trace!(control, "lzma2 chunk");

        if control == 0x00 {
            self.sequence = Sequence::End;
            return Ok(());
        }

        if control >= 0xE0 || control == 0x01 {
            self.need_props = true;
            self.need_dict_reset = false;
            self.dict.reset();
        } else if self.need_dict_reset {
            return Err(CodecError::data(CODEC_NAME, "missing dictionary reset"));
        }

        if control >= 0x80 {
            self.uncompressed = ((control & 0x1F) as usize) << 16;
            self.sequence = Sequence::Unpacked0;
            if control >= 0xC0 {
                self.need_props = false;
                self.props_next = true;
            } else if self.need_props {
                return Err(CodecError::data(CODEC_NAME, "missing LZMA properties"));
            } else {
                self.props_next = false;
                if control >= 0xA0 {
                    self.lzma.reset_state();
                }
            }
        } else {
            if control > 0x02 {
                return Err(CodecError::data(
                    CODEC_NAME,
                    format!("invalid LZMA2 control byte {control:#04x}"),
                ));
            }
            self.sequence = Sequence::CopySize0;
        }
        Ok(())
    }
}
