//! Market State
//!
//! Discretized indicators packed into the same two-word layout as rule
//! conditions. State words use the inverted coding:
//!
//! ```text
//! 01  condition met
//! 10  condition not met
//! ```
//!
//! so that `rule_word & state_word != 0` flags a mismatch.

use crate::bits::{BitCondition, Trit, Word, get_trit};
use serde::{Deserialize, Serialize};

/// Thresholds for `dividend / mean dividend`
pub const DIVIDEND_RATIO_THRESHOLDS: [f64; 7] = [0.6, 0.8, 0.9, 1.0, 1.1, 1.12, 1.4];

/// Thresholds for the value ratio (`p*r/d`, or the odds in LMSR mode)
pub const VALUE_RATIO_THRESHOLDS: [f64; 10] =
    [0.25, 0.5, 0.75, 0.875, 1.0, 1.125, 1.25, 1.5, 2.0, 4.0];

/// Thresholds for `price / MA(10)`
pub const TREND_RATIO_THRESHOLDS: [f64; 6] = [0.85, 0.9, 0.95, 1.05, 1.1, 1.15];

/// Moving average windows used by the technical bits
pub const MA_WINDOWS: [usize; 4] = [5, 10, 100, 500];

pub const FUNDAMENTAL_BITS: usize = 19;
pub const TECHNICAL_BITS: usize = 16;

/// Number of trit slots used by each word
pub fn bits_in(word: Word) -> usize {
    match word {
        Word::Fundamental => FUNDAMENTAL_BITS,
        Word::Technical => TECHNICAL_BITS,
    }
}

/// A run of `x > t_0 < t_1 < ...` conditions that must stay logically ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ladder {
    pub word: Word,
    pub start: usize,
    pub len: usize,
}

impl Ladder {
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

pub const LADDERS: [Ladder; 3] = [
    Ladder {
        word: Word::Fundamental,
        start: 0,
        len: DIVIDEND_RATIO_THRESHOLDS.len(),
    },
    Ladder {
        word: Word::Fundamental,
        start: 7,
        len: VALUE_RATIO_THRESHOLDS.len(),
    },
    Ladder {
        word: Word::Technical,
        start: 10,
        len: TREND_RATIO_THRESHOLDS.len(),
    },
];

const FUNDAMENTAL_NAMES: [&str; FUNDAMENTAL_BITS] = [
    "d/dbar>0.6",
    "d/dbar>0.8",
    "d/dbar>0.9",
    "d/dbar>1.0",
    "d/dbar>1.1",
    "d/dbar>1.12",
    "d/dbar>1.4",
    "value>1/4",
    "value>1/2",
    "value>3/4",
    "value>7/8",
    "value>1",
    "value>9/8",
    "value>5/4",
    "value>3/2",
    "value>2",
    "value>4",
    "d_up_0",
    "d_up_1",
];

const TECHNICAL_NAMES: [&str; TECHNICAL_BITS] = [
    "p_up_0",
    "p_up_1",
    "p_up_2",
    "p>MA5",
    "p>MA10",
    "p>MA100",
    "p>MA500",
    "MA5>MA10",
    "MA10>MA100",
    "MA100>MA500",
    "p/MA10>0.85",
    "p/MA10>0.9",
    "p/MA10>0.95",
    "p/MA10>1.05",
    "p/MA10>1.1",
    "p/MA10>1.15",
];

/// Human-readable label for a condition slot
pub fn bit_name(word: Word, index: usize) -> &'static str {
    let names: &[&'static str] = match word {
        Word::Fundamental => &FUNDAMENTAL_NAMES,
        Word::Technical => &TECHNICAL_NAMES,
    };
    names.get(index).copied().unwrap_or("unused")
}

/// Raw indicator values for one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Dividend over its long-run mean
    pub dividend_ratio: f64,
    /// `p*r/d` in classic mode, `p/(1-p)` in LMSR mode
    pub value_ratio: f64,
    /// Dividend rose this period, last period
    pub dividend_up: [bool; 2],
    /// Price rose this period, last period, two periods ago
    pub price_up: [bool; 3],
    /// Price above MA(5), MA(10), MA(100), MA(500)
    pub price_above_ma: [bool; 4],
    /// MA(5) > MA(10), MA(10) > MA(100), MA(100) > MA(500)
    pub ma_rising: [bool; 3],
    /// Price over MA(10)
    pub trend_ratio: f64,
}

/// Per-period discretized market conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketState {
    condition: BitCondition,
}

impl MarketState {
    /// Encode indicators into state words
    pub fn encode(ind: &Indicators) -> Self {
        let mut state = Self::default();

        let mut slot = 0;
        for t in DIVIDEND_RATIO_THRESHOLDS {
            state.set_condition(Word::Fundamental, slot, ind.dividend_ratio > t);
            slot += 1;
        }
        for t in VALUE_RATIO_THRESHOLDS {
            state.set_condition(Word::Fundamental, slot, ind.value_ratio > t);
            slot += 1;
        }
        for up in ind.dividend_up {
            state.set_condition(Word::Fundamental, slot, up);
            slot += 1;
        }
        debug_assert_eq!(slot, FUNDAMENTAL_BITS);

        let technical = ind
            .price_up
            .iter()
            .chain(ind.price_above_ma.iter())
            .chain(ind.ma_rising.iter())
            .copied()
            .chain(TREND_RATIO_THRESHOLDS.iter().map(|&t| ind.trend_ratio > t));
        for (i, met) in technical.enumerate() {
            state.set_condition(Word::Technical, i, met);
        }

        state
    }

    /// Record whether condition `index` of `word` holds this period
    pub fn set_condition(&mut self, word: Word, index: usize, met: bool) {
        // Inverted relative to rule trits: met is stored as the `False` code
        let code = if met { Trit::False } else { Trit::True };
        self.condition.set(word, index, code);
    }

    /// Decoded condition; `None` for a slot that was never written
    pub fn condition(&self, word: Word, index: usize) -> Option<bool> {
        match get_trit(self.condition.word(word), index) {
            Trit::False => Some(true),
            Trit::True => Some(false),
            Trit::DontCare => None,
        }
    }

    pub fn words(&self) -> &BitCondition {
        &self.condition
    }
}
