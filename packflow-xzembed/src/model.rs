//! LZMA probability models.
//!
//! Tables are sized for the LZMA2 limits (`lc + lp <= 4`, `pb <= 4`) so the
//! whole model is allocated once per session and only reset between chunks.

use crate::range::PROB_INIT;

/// Largest number of position states (`pb <= 4`).
pub const POS_STATES_MAX: usize = 1 << 4;

/// Largest number of literal coders (`lc + lp <= 4`).
pub const LITERAL_CODERS_MAX: usize = 1 << 4;

/// Probabilities per literal coder.
pub const LITERAL_CODER_SIZE: usize = 0x300;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Number of bits for low length coding.
pub const LEN_LOW_BITS: u32 = 3;
/// Number of bits for mid length coding.
pub const LEN_MID_BITS: u32 = 3;
/// Number of bits for high length coding.
pub const LEN_HIGH_BITS: u32 = 8;

/// Number of low length symbols.
pub const LEN_LOW_SYMBOLS: usize = 1 << LEN_LOW_BITS;
/// Number of mid length symbols.
pub const LEN_MID_SYMBOLS: usize = 1 << LEN_MID_BITS;
/// Number of high length symbols.
pub const LEN_HIGH_SYMBOLS: usize = 1 << LEN_HIGH_BITS;

/// Minimum match length.
pub const MATCH_LEN_MIN: usize = 2;

/// Number of length states used to pick a distance slot tree.
pub const DIST_STATES: usize = 4;

/// Number of bits in a distance slot.
pub const DIST_SLOT_BITS: u32 = 6;

/// Number of distance slots.
pub const DIST_SLOTS: usize = 1 << DIST_SLOT_BITS;

/// Number of alignment bits for distance encoding.
pub const DIST_ALIGN_BITS: u32 = 4;
/// Size of alignment table.
pub const DIST_ALIGN_SIZE: usize = 1 << DIST_ALIGN_BITS;

/// First slot whose extra bits are modeled.
pub const DIST_MODEL_START: u32 = 4;

/// First slot that uses direct bits plus the align tree.
pub const DIST_MODEL_END: u32 = 14;

/// Distances covered by the modeled slots.
pub const FULL_DISTANCES: usize = 1 << (DIST_MODEL_END / 2);

/// LZMA state machine state.
///
/// States 0..=6 follow a literal, 7..=11 follow a match or rep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(u8);

impl State {
    /// Initial state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Get state value.
    pub fn value(self) -> usize {
        self.0 as usize
    }

    /// Check if the previous symbol was a literal.
    pub fn is_literal(self) -> bool {
        self.0 < 7
    }

    /// Update state after literal.
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    /// Update state after match.
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Update state after short rep.
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    /// Update state after long rep.
    pub fn update_long_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }
}

/// LZMA properties (lc, lp, pb).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProperties {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
}

impl LzmaProperties {
    /// Parse an LZMA2 properties byte.
    ///
    /// Returns `None` for values LZMA2 does not allow (`lc + lp > 4`).
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte >= 9 * 5 * 5 {
            return None;
        }
        let pb = byte as u32 / 45;
        let remaining = byte as u32 % 45;
        let lp = remaining / 9;
        let lc = remaining % 9;

        if lc + lp > 4 {
            return None;
        }

        Some(Self { lc, lp, pb })
    }

    /// Mask applied to the dictionary position for the position state.
    pub fn pos_mask(&self) -> usize {
        (1 << self.pb) - 1
    }

    /// Mask applied to the dictionary position for the literal coder.
    pub fn literal_pos_mask(&self) -> usize {
        (1 << self.lp) - 1
    }
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self { lc: 3, lp: 0, pb: 2 }
    }
}

/// Length model.
#[derive(Debug, Clone)]
pub struct LengthModel {
    /// Choice bit (low vs mid+high).
    pub choice: u16,
    /// Choice2 bit (mid vs high).
    pub choice2: u16,
    /// Low length probabilities (per position state).
    pub low: [[u16; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
    /// Mid length probabilities (per position state).
    pub mid: [[u16; LEN_MID_SYMBOLS]; POS_STATES_MAX],
    /// High length probabilities (shared).
    pub high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    /// Create a new length model.
    pub fn new() -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: [[PROB_INIT; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
            mid: [[PROB_INIT; LEN_MID_SYMBOLS]; POS_STATES_MAX],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for LengthModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Distance model.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    /// Distance slot trees, one per length state.
    pub slot: [[u16; DIST_SLOTS]; DIST_STATES],
    /// Reverse trees for slots 4..14, stored back to back.
    pub special: [u16; FULL_DISTANCES - DIST_MODEL_END as usize],
    /// Alignment probabilities.
    pub align: [u16; DIST_ALIGN_SIZE],
}

impl DistanceModel {
    /// Create a new distance model.
    pub fn new() -> Self {
        Self {
            slot: [[PROB_INIT; DIST_SLOTS]; DIST_STATES],
            special: [PROB_INIT; FULL_DISTANCES - DIST_MODEL_END as usize],
            align: [PROB_INIT; DIST_ALIGN_SIZE],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new()
    }
}

/// All LZMA probability tables.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// Is-match probabilities.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Is-rep probabilities.
    pub is_rep: [u16; NUM_STATES],
    /// Is-rep0 probabilities.
    pub is_rep0: [u16; NUM_STATES],
    /// Is-rep1 probabilities.
    pub is_rep1: [u16; NUM_STATES],
    /// Is-rep2 probabilities.
    pub is_rep2: [u16; NUM_STATES],
    /// Is-rep0-long probabilities.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Match length model.
    pub match_len: LengthModel,
    /// Rep match length model.
    pub rep_len: LengthModel,
    /// Literal coders.
    pub literal: Box<[[u16; LITERAL_CODER_SIZE]; LITERAL_CODERS_MAX]>,
    /// Distance model.
    pub distance: DistanceModel,
}

impl LzmaModel {
    /// Create a model with every probability at its initial value.
    pub fn new() -> Self {
        Self {
            is_match: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep0: [PROB_INIT; NUM_STATES],
            is_rep1: [PROB_INIT; NUM_STATES],
            is_rep2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(),
            rep_len: LengthModel::new(),
            literal: Box::new([[PROB_INIT; LITERAL_CODER_SIZE]; LITERAL_CODERS_MAX]),
            distance: DistanceModel::new(),
        }
    }

    /// Reset all probabilities to initial values.
    pub fn reset(&mut self) {
        for state in &mut self.is_match {
            state.fill(PROB_INIT);
        }
        self.is_rep.fill(PROB_INIT);
        self.is_rep0.fill(PROB_INIT);
        self.is_rep1.fill(PROB_INIT);
        self.is_rep2.fill(PROB_INIT);
        for state in &mut self.is_rep0_long {
            state.fill(PROB_INIT);
        }
        self.match_len.reset();
        self.rep_len.reset();
        for coder in self.literal.iter_mut() {
            coder.fill(PROB_INIT);
        }
        self.distance.reset();
    }
}

impl Default for LzmaModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = State::new();
        assert!(state.is_literal());

        state.update_match();
        assert_eq!(state.value(), 7);
        state.update_literal();
        assert_eq!(state.value(), 4);

        let mut state = State(10);
        state.update_literal();
        assert_eq!(state.value(), 4);

        let mut state = State(11);
        state.update_literal();
        assert_eq!(state.value(), 5);

        state.update_short_rep();
        assert_eq!(state.value(), 9);
        state.update_long_rep();
        assert_eq!(state.value(), 11);
    }

    #[test]
    fn test_properties_byte() {
        // xz default: lc=3, lp=0, pb=2.
        let props = LzmaProperties::from_byte(0x5D).unwrap();
        assert_eq!(props, LzmaProperties::default());
        assert_eq!(props.pos_mask(), 3);
        assert_eq!(props.literal_pos_mask(), 0);
    }

    #[test]
    fn test_properties_limits() {
        // lc=4, lp=1
        assert!(LzmaProperties::from_byte(13).is_none());
        // lc=4, lp=0, pb=4
        assert_eq!(
            LzmaProperties::from_byte(184),
            Some(LzmaProperties { lc: 4, lp: 0, pb: 4 })
        );
        assert!(LzmaProperties::from_byte(225).is_none());
    }

    #[test]
    fn test_special_table_fits_last_modeled_slot() {
        let slot = DIST_MODEL_END - 1;
        let bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << bits;
        let last = (base - slot) as usize + (1 << bits) - 2;
        assert_eq!(last, DistanceModel::new().special.len() - 1);
    }
}
