//! Rule dialects
//!
//! How a trit chosen for mutation moves between wildcard and set values.

use agora_core::{SimRng, Trit};
use agora_ports::RuleDialect;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed transition probabilities
///
/// ```text
/// #   -> true 1/3, false 1/3, # 1/3
/// set -> #    2/3, flipped 1/3
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SfiDialect;

impl RuleDialect for SfiDialect {
    fn mutate_trit(&self, current: Trit, _usage_fraction: f64, rng: &mut SimRng) -> Trit {
        let draw = rng.gen_range(0..3);
        match current {
            Trit::DontCare => match draw {
                0 => Trit::True,
                1 => Trit::False,
                _ => Trit::DontCare,
            },
            set => {
                if draw < 2 {
                    Trit::DontCare
                } else {
                    set.flipped()
                }
            }
        }
    }

    fn name(&self) -> &str {
        "SFI"
    }
}

/// Transition probabilities tied to the word's current bit usage `p`
///
/// ```text
/// #   -> set with probability p (true/false 50/50)
/// set -> #   with probability 1 - p, otherwise flipped
/// ```
///
/// The expected number of set trits is unchanged by a mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NesfiDialect;

impl RuleDialect for NesfiDialect {
    fn mutate_trit(&self, current: Trit, usage_fraction: f64, rng: &mut SimRng) -> Trit {
        let p = usage_fraction.clamp(0.0, 1.0);
        let draw: f64 = rng.r#gen();
        match current {
            Trit::DontCare => {
                if draw < p {
                    Trit::from_bool(rng.gen_bool(0.5))
                } else {
                    Trit::DontCare
                }
            }
            set => {
                if draw < 1.0 - p {
                    Trit::DontCare
                } else {
                    set.flipped()
                }
            }
        }
    }

    fn name(&self) -> &str {
        "NESFI"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Sfi,
    Nesfi,
}

/// Factory function to create rule dialects by kind
pub fn create_dialect(kind: DialectKind) -> Box<dyn RuleDialect> {
    match kind {
        DialectKind::Sfi => Box::new(SfiDialect),
        DialectKind::Nesfi => Box::new(NesfiDialect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::seeded;

    fn tally(dialect: &dyn RuleDialect, start: Trit, usage: f64) -> [usize; 3] {
        let mut rng = seeded(21);
        let mut counts = [0; 3];
        for _ in 0..30_000 {
            counts[dialect.mutate_trit(start, usage, &mut rng) as usize] += 1;
        }
        counts
    }

    fn share(count: usize) -> f64 {
        count as f64 / 30_000.0
    }

    #[test]
    fn test_sfi_transitions() {
        let from_wild = tally(&SfiDialect, Trit::DontCare, 0.0);
        for count in from_wild {
            assert!((share(count) - 1.0 / 3.0).abs() < 0.02);
        }

        let from_true = tally(&SfiDialect, Trit::True, 0.0);
        assert!((share(from_true[0]) - 2.0 / 3.0).abs() < 0.02);
        assert!((share(from_true[1]) - 1.0 / 3.0).abs() < 0.02);
        assert_eq!(from_true[2], 0);
    }

    #[test]
    fn test_nesfi_follows_usage() {
        let from_wild = tally(&NesfiDialect, Trit::DontCare, 0.2);
        assert!((share(from_wild[0]) - 0.8).abs() < 0.02);

        let from_false = tally(&NesfiDialect, Trit::False, 0.2);
        assert!((share(from_false[0]) - 0.8).abs() < 0.02);
        assert!((share(from_false[2]) - 0.2).abs() < 0.02);
        assert_eq!(from_false[1], 0);
    }

    #[test]
    fn test_nesfi_zero_usage_never_sets() {
        let from_wild = tally(&NesfiDialect, Trit::DontCare, 0.0);
        assert_eq!(from_wild[0], 30_000);
    }

    #[test]
    fn test_factory() {
        assert_eq!(create_dialect(DialectKind::Sfi).name(), "SFI");
        assert_eq!(create_dialect(DialectKind::Nesfi).name(), "NESFI");
    }
}
