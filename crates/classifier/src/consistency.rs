//! Threshold ladder repair
//!
//! Each ladder is a run of conditions `x > t_0`, `x > t_1`, ... with rising
//! thresholds. A true bit implies every lower bit is true and a false bit
//! implies every higher bit is false, so at most two bits carry information:
//! the highest true bit and the lowest false bit above it. Everything else is
//! redundant or contradictory and is reset to a wildcard.

use crate::params::RuleParams;
use crate::rule::TradingRule;
use agora_core::{BitCondition, LADDERS, Ladder, SimRng, Trit, Word};
use rand::Rng;

/// Collapse one ladder to its informative bits.
///
/// `from_top` trusts the highest true bit when the ladder contradicts itself;
/// otherwise the lowest false bit wins. Returns whether anything changed.
pub fn repair_ladder(condition: &mut BitCondition, ladder: &Ladder, from_top: bool) -> bool {
    let trits: Vec<Trit> = ladder
        .indices()
        .map(|i| condition.get(ladder.word, i))
        .collect();
    let len = trits.len();

    let (keep_true, keep_false) = if from_top {
        let t = (0..len).rev().find(|&i| trits[i] == Trit::True);
        let lo = t.map_or(0, |t| t + 1);
        let f = (lo..len).find(|&i| trits[i] == Trit::False);
        (t, f)
    } else {
        let f = (0..len).find(|&i| trits[i] == Trit::False);
        let t = (0..f.unwrap_or(len)).rev().find(|&i| trits[i] == Trit::True);
        (t, f)
    };

    let mut changed = false;
    for (offset, trit) in trits.iter().enumerate() {
        let keep = Some(offset) == keep_true || Some(offset) == keep_false;
        if trit.is_set() && !keep {
            condition.set(ladder.word, ladder.start + offset, Trit::DontCare);
            changed = true;
        }
    }
    changed
}

impl TradingRule {
    /// Repair every ladder the rule uses, picking a scan direction per ladder
    /// at random. Returns the updated specificity.
    pub fn check_consistency(&mut self, params: &RuleParams, rng: &mut SimRng) -> u32 {
        let technical = self.is_technical();
        let mut changed = false;
        for ladder in LADDERS.iter() {
            if ladder.word == Word::Technical && !technical {
                continue;
            }
            let from_top = rng.gen_bool(0.5);
            changed |= repair_ladder(self.condition_mut(), ladder, from_top);
        }
        if changed {
            self.refresh(params);
        }
        self.specificity()
    }
}
