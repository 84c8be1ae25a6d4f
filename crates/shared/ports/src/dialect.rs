use agora_core::{BitCondition, SimRng, Trit, Word, bits_in, chance};
use serde::Serialize;
use std::fmt;

/// Fraction of condition slots in use, per word
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BitUsage {
    pub fundamental: f64,
    pub technical: f64,
}

impl BitUsage {
    pub fn for_word(&self, word: Word) -> f64 {
        match word {
            Word::Fundamental => self.fundamental,
            Word::Technical => self.technical,
        }
    }
}

/// Port for condition-bit mutation
///
/// Different rule dialects move between wildcard and set trits with
/// different transition probabilities:
/// - SFI: fixed probabilities
/// - NESFI: probabilities tied to current bit usage
pub trait RuleDialect: Send + Sync + fmt::Debug {
    /// Next value of a trit chosen for mutation
    fn mutate_trit(&self, current: Trit, usage_fraction: f64, rng: &mut SimRng) -> Trit;

    /// Name of the dialect
    fn name(&self) -> &str;

    /// Mutate each slot with probability `rate`. Word 1 is only touched for
    /// technical rules. Returns whether anything changed.
    fn mutate_condition(
        &self,
        condition: &mut BitCondition,
        technical: bool,
        usage: BitUsage,
        rate: f64,
        rng: &mut SimRng,
    ) -> bool {
        let mut changed = false;
        for word in Word::ALL {
            if word == Word::Technical && !technical {
                continue;
            }
            for index in 0..bits_in(word) {
                if !chance(rng, rate) {
                    continue;
                }
                let current = condition.get(word, index);
                let next = self.mutate_trit(current, usage.for_word(word), rng);
                if next != current {
                    condition.set(word, index, next);
                    changed = true;
                }
            }
        }
        changed
    }
}
