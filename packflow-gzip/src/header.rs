//! GZIP member header and trailer (RFC 1952).

use packflow_core::Crc32;
use packflow_core::error::{CodecError, Result};

use crate::CODEC_NAME;

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Size of the fixed part of a member header.
pub const FIXED_HEADER_LEN: usize = 10;

/// Size of the member trailer (CRC-32 and ISIZE).
pub const TRAILER_LEN: usize = 8;

/// Longest header accepted; names and comments beyond this are treated as
/// garbage rather than buffered without bound.
pub const MAX_HEADER_LEN: usize = 1 << 20;

/// Operating system byte written by the encoder (unknown).
const OS_UNKNOWN: u8 = 255;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
    /// Bits that must be zero.
    pub const RESERVED: u8 = 0xE0;
}

/// Build the header written in front of every member produced by the
/// encoder: no name, no timestamp, XFL derived from the level.
pub fn encode_header(level: u32) -> [u8; FIXED_HEADER_LEN] {
    let xfl = match level {
        9 => 2,
        0 | 1 => 4,
        _ => 0,
    };
    [
        GZIP_MAGIC[0],
        GZIP_MAGIC[1],
        CM_DEFLATE,
        0,
        0,
        0,
        0,
        0,
        xfl,
        OS_UNKNOWN,
    ]
}

/// Build the member trailer.
pub fn encode_trailer(crc: u32, size: u64) -> [u8; TRAILER_LEN] {
    let mut trailer = [0u8; TRAILER_LEN];
    trailer[..4].copy_from_slice(&crc.to_le_bytes());
    trailer[4..].copy_from_slice(&(size as u32).to_le_bytes());
    trailer
}

/// Try to parse a complete member header from the front of `buf`.
///
/// Returns `Ok(None)` if more bytes are needed, or the header length once
/// every optional field has been seen.
pub fn parse_header(buf: &[u8]) -> Result<Option<usize>> {
    if buf.len() >= 2 && buf[..2] != GZIP_MAGIC {
        return Err(CodecError::data(CODEC_NAME, "not in gzip format"));
    }
    if buf.len() < FIXED_HEADER_LEN {
        return Ok(None);
    }
    if buf[2] != CM_DEFLATE {
        return Err(CodecError::data(
            CODEC_NAME,
            format!("unknown compression method {}", buf[2]),
        ));
    }
    let flg = buf[3];
    if flg & flags::RESERVED != 0 {
        return Err(CodecError::data(CODEC_NAME, "reserved header flags set"));
    }

    let mut pos = FIXED_HEADER_LEN;

    if flg & flags::FEXTRA != 0 {
        let Some(xlen) = buf.get(pos..pos + 2) else {
            return Ok(None);
        };
        pos += 2 + u16::from_le_bytes([xlen[0], xlen[1]]) as usize;
        if buf.len() < pos {
            return Ok(None);
        }
    }

    for flag in [flags::FNAME, flags::FCOMMENT] {
        if flg & flag != 0 {
            match buf[pos..].iter().position(|&b| b == 0) {
                Some(nul) => pos += nul + 1,
                None => return Ok(None),
            }
        }
    }

    if flg & flags::FHCRC != 0 {
        let Some(stored) = buf.get(pos..pos + 2) else {
            return Ok(None);
        };
        let stored = u16::from_le_bytes([stored[0], stored[1]]);
        let actual = (Crc32::compute(&buf[..pos]) & 0xFFFF) as u16;
        if stored != actual {
            return Err(CodecError::data(CODEC_NAME, "header crc mismatch"));
        }
        pos += 2;
    }

    Ok(Some(pos))
}

/// Check a member trailer against the decoded data.
pub fn verify_trailer(trailer: &[u8; TRAILER_LEN], crc: u32, size: u64) -> Result<()> {
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let stored_size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
    if stored_crc != crc {
        return Err(CodecError::data(
            CODEC_NAME,
            format!("crc mismatch: expected {stored_crc:08x}, got {crc:08x}"),
        ));
    }
    if stored_size != size as u32 {
        return Err(CodecError::data(CODEC_NAME, "length mismatch"));
    }
    Ok(())
}
