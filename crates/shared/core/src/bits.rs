//! Ternary condition words
//!
//! A condition word packs up to [`MAX_TRITS`] ternary values into a `u64`,
//! two bits per trit:
//!
//! ```text
//! 00  don't care (#)
//! 01  false
//! 10  true
//! 11  never produced
//! ```
//!
//! Word 0 holds the fundamental conditions, word 1 the technical ones.

use serde::{Deserialize, Serialize};

/// Maximum number of trits that fit in one word
pub const MAX_TRITS: usize = 31;

const TRIT_MASK: u64 = 0b11;

/// A single ternary condition value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Trit {
    /// Wildcard, matches anything
    #[default]
    DontCare = 0,
    False = 1,
    True = 2,
}

impl Trit {
    /// Decode a two-bit code. `0b11` is not a valid trit.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Trit::DontCare),
            1 => Some(Trit::False),
            2 => Some(Trit::True),
            _ => None,
        }
    }

    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn is_set(self) -> bool {
        self != Trit::DontCare
    }

    /// The other set value; wildcards stay wildcards
    pub fn flipped(self) -> Self {
        match self {
            Trit::DontCare => Trit::DontCare,
            Trit::False => Trit::True,
            Trit::True => Trit::False,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value { Trit::True } else { Trit::False }
    }
}

/// Which of the two condition words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Word {
    Fundamental = 0,
    Technical = 1,
}

impl Word {
    pub const ALL: [Word; 2] = [Word::Fundamental, Word::Technical];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Write `value` into trit slot `index` of `word`
#[inline]
pub fn set_trit(word: &mut u64, index: usize, value: Trit) {
    debug_assert!(index < MAX_TRITS, "trit index {index} out of range");
    let shift = 2 * index;
    *word = (*word & !(TRIT_MASK << shift)) | (value.code() << shift);
}

/// Read trit slot `index` of `word`
#[inline]
pub fn get_trit(word: u64, index: usize) -> Trit {
    debug_assert!(index < MAX_TRITS, "trit index {index} out of range");
    let code = (word >> (2 * index)) & TRIT_MASK;
    // 0b11 is never written by set_trit
    Trit::from_code(code).unwrap_or(Trit::DontCare)
}

/// Number of non-wildcard trits in a word
#[inline]
pub fn count_set(word: u64) -> u32 {
    // Each valid trit has at most one bit set, so popcount is the trit count
    word.count_ones()
}

/// Two condition words: fundamental and technical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BitCondition {
    pub words: [u64; 2],
}

impl BitCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, word: Word, index: usize) -> Trit {
        get_trit(self.words[word.index()], index)
    }

    pub fn set(&mut self, word: Word, index: usize, value: Trit) {
        set_trit(&mut self.words[word.index()], index, value);
    }

    pub fn word(&self, word: Word) -> u64 {
        self.words[word.index()]
    }

    /// Reset a whole word to wildcards
    pub fn clear(&mut self, word: Word) {
        self.words[word.index()] = 0;
    }

    pub fn count_set(&self, word: Word) -> u32 {
        count_set(self.word(word))
    }

    /// Non-wildcard trits across both words
    pub fn specificity(&self) -> u32 {
        count_set(self.words[0]) + count_set(self.words[1])
    }

    /// True iff no pair of bits holds the invalid `11` code
    pub fn is_well_formed(&self) -> bool {
        const HIGH: u64 = 0xAAAA_AAAA_AAAA_AAAA;
        self.words
            .iter()
            .all(|w| (w & HIGH) & ((w << 1) & HIGH) == 0)
    }
}

/// AND-based match of rule words against (inverted) state words.
///
/// Word 1 is ignored unless `technical` is set.
#[inline]
pub fn matches(rule: &BitCondition, state: &BitCondition, technical: bool) -> bool {
    if rule.words[0] & state.words[0] != 0 {
        return false;
    }
    !technical || rule.words[1] & state.words[1] == 0
}
