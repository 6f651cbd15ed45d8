//! LZMA symbol decoder.
//!
//! Decodes literals, matches and reps from a collected chunk straight into
//! the [`Dictionary`]. Decoding stops at the dictionary limit; a match cut
//! short by the limit keeps its remaining length and resumes on the next
//! call.

use packflow_core::error::Result;

use crate::dict::Dictionary;
use crate::model::{
    DIST_ALIGN_BITS, DIST_MODEL_END, DIST_MODEL_START, DIST_SLOT_BITS, DIST_STATES,
    LEN_HIGH_BITS, LEN_LOW_BITS, LEN_LOW_SYMBOLS, LEN_MID_BITS, LEN_MID_SYMBOLS, LengthModel,
    LzmaModel, LzmaProperties, MATCH_LEN_MIN, State,
};
use crate::range::RangeDecoder;

/// Decode a match length.
fn decode_length(rc: &mut RangeDecoder, model: &mut LengthModel, pos_state: usize) -> Result<usize> {
    let len = if rc.bit(&mut model.choice)? == 0 {
        rc.bit_tree(&mut model.low[pos_state], LEN_LOW_BITS)? as usize
    } else if rc.bit(&mut model.choice2)? == 0 {
        LEN_LOW_SYMBOLS + rc.bit_tree(&mut model.mid[pos_state], LEN_MID_BITS)? as usize
    } else {
        LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS + rc.bit_tree(&mut model.high, LEN_HIGH_BITS)? as usize
    };
    Ok(len + MATCH_LEN_MIN)
}

/// LZMA decoder state carried across chunks.
#[derive(Debug, Clone)]
pub struct LzmaDecoder {
    model: LzmaModel,
    props: LzmaProperties,
    state: State,
    rep: [u32; 4],
    /// Remaining length of a match interrupted by the output limit.
    pending: usize,
}

impl LzmaDecoder {
    /// Create a decoder with default properties.
    pub fn new() -> Self {
        Self {
            model: LzmaModel::new(),
            props: LzmaProperties::default(),
            state: State::new(),
            rep: [0; 4],
            pending: 0,
        }
    }

    /// Reset state and probabilities, switching to `props`.
    pub fn reset(&mut self, props: LzmaProperties) {
        self.props = props;
        self.reset_state();
    }

    /// Reset state and probabilities, keeping the current properties.
    pub fn reset_state(&mut self) {
        self.model.reset();
        self.state = State::new();
        self.rep = [0; 4];
        self.pending = 0;
    }

    /// Remaining length of an interrupted match.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Decode symbols until the dictionary limit is reached.
    pub fn decode(&mut self, rc: &mut RangeDecoder, dict: &mut Dictionary) -> Result<()> {
        if self.pending > 0 {
            dict.repeat(&mut self.pending, self.rep[0])?;
        }

        let pos_mask = self.props.pos_mask();
        while dict.has_space() {
            let pos_state = dict.pos() & pos_mask;
            let state = self.state.value();

            if rc.bit(&mut self.model.is_match[state][pos_state])? == 0 {
                self.literal(rc, dict)?;
            } else if rc.bit(&mut self.model.is_rep[state])? == 0 {
                self.pending = self.simple_match(rc, pos_state)?;
                dict.repeat(&mut self.pending, self.rep[0])?;
            } else {
                match self.rep_match(rc, pos_state)? {
                    // Short rep: one byte at rep0.
                    None => {
                        let mut len = 1;
                        dict.repeat(&mut len, self.rep[0])?;
                    }
                    Some(len) => {
                        self.pending = len;
                        dict.repeat(&mut self.pending, self.rep[0])?;
                    }
                }
            }
        }

        rc.normalize()
    }

    fn literal(&mut self, rc: &mut RangeDecoder, dict: &mut Dictionary) -> Result<()> {
        let prev = dict.get(0) as usize;
        let lc = self.props.lc as usize;
        let coder = ((dict.pos() & self.props.literal_pos_mask()) << lc) + (prev >> (8 - lc));
        let probs = &mut self.model.literal[coder];

        let mut symbol = 1usize;
        if self.state.is_literal() {
            while symbol < 0x100 {
                symbol = (symbol << 1) | rc.bit(&mut probs[symbol])? as usize;
            }
        } else {
            let mut match_byte = dict.get(self.rep[0]) as usize;
            while symbol < 0x100 {
                let match_bit = (match_byte >> 7) & 1;
                match_byte <<= 1;
                let bit = rc.bit(&mut probs[0x100 + (match_bit << 8) + symbol])? as usize;
                symbol = (symbol << 1) | bit;
                if bit != match_bit {
                    while symbol < 0x100 {
                        symbol = (symbol << 1) | rc.bit(&mut probs[symbol])? as usize;
                    }
                    break;
                }
            }
        }

        dict.put((symbol - 0x100) as u8);
        self.state.update_literal();
        Ok(())
    }

    /// Decode a new match, pushing its distance into the rep history.
    fn simple_match(&mut self, rc: &mut RangeDecoder, pos_state: usize) -> Result<usize> {
        self.state.update_match();
        self.rep[3] = self.rep[2];
        self.rep[2] = self.rep[1];
        self.rep[1] = self.rep[0];

        let len = decode_length(rc, &mut self.model.match_len, pos_state)?;
        self.rep[0] = self.decode_distance(rc, len)?;
        Ok(len)
    }

    fn decode_distance(&mut self, rc: &mut RangeDecoder, len: usize) -> Result<u32> {
        let len_state = (len - MATCH_LEN_MIN).min(DIST_STATES - 1);
        let slot = rc.bit_tree(&mut self.model.distance.slot[len_state], DIST_SLOT_BITS)?;

        if slot < DIST_MODEL_START {
            return Ok(slot);
        }

        let bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << bits;

        if slot < DIST_MODEL_END {
            // The tree for this slot starts at `base - slot - 1`; index 0 of
            // a reverse tree is never used.
            let offset = (base - slot) as usize;
            let probs = &mut self.model.distance.special;
            let mut extra = 0u32;
            let mut m = 1usize;
            for i in 0..bits {
                let bit = rc.bit(&mut probs[offset + m - 1])?;
                m = (m << 1) | bit as usize;
                extra |= bit << i;
            }
            Ok(base + extra)
        } else {
            let direct = rc.direct_bits(bits - DIST_ALIGN_BITS)?;
            let align = rc.reverse_bit_tree(&mut self.model.distance.align, DIST_ALIGN_BITS)?;
            Ok(base + (direct << DIST_ALIGN_BITS) + align)
        }
    }

    /// Decode a rep match. `None` is a short rep.
    fn rep_match(&mut self, rc: &mut RangeDecoder, pos_state: usize) -> Result<Option<usize>> {
        let state = self.state.value();

        if rc.bit(&mut self.model.is_rep0[state])? == 0 {
            if rc.bit(&mut self.model.is_rep0_long[state][pos_state])? == 0 {
                self.state.update_short_rep();
                return Ok(None);
            }
        } else {
            let dist = if rc.bit(&mut self.model.is_rep1[state])? == 0 {
                self.rep[1]
            } else if rc.bit(&mut self.model.is_rep2[state])? == 0 {
                let d = self.rep[2];
                self.rep[2] = self.rep[1];
                d
            } else {
                let d = self.rep[3];
                self.rep[3] = self.rep[2];
                self.rep[2] = self.rep[1];
                d
            };
            self.rep[1] = self.rep[0];
            self.rep[0] = dist;
        }

        self.state.update_long_rep();
        let len = decode_length(rc, &mut self.model.rep_len, pos_state)?;
        Ok(Some(len))
    }
}

impl Default for LzmaDecoder {
    fn default() -> Self {
        Self::new()
    }
}
