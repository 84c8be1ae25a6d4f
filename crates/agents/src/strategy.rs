//! Learning strategies
//!
//! The behaviour that distinguishes agent flavours: which rule dialect they
//! mutate with and when they run the genetic algorithm. State (cash,
//! positions, rules) lives in [`crate::Agent`].

use agora_classifier::{DialectKind, GaParams, NesfiDialect, RuleDialect, SfiDialect, create_dialect};
use agora_core::{AgentKind, SimRng, chance};
use std::fmt;

pub trait LearningStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> AgentKind;

    /// Condition mutation used when cloning a parent
    fn dialect(&self) -> &dyn RuleDialect;

    /// Whether the GA runs this period
    fn ga_due(&self, period: u64, ga: &GaParams, rng: &mut SimRng) -> bool;
}

/// Probabilistic learner with fixed mutation probabilities
#[derive(Debug, Default)]
pub struct SfiLearner {
    dialect: SfiDialect,
}

impl LearningStrategy for SfiLearner {
    fn kind(&self) -> AgentKind {
        AgentKind::Sfi
    }

    fn dialect(&self) -> &dyn RuleDialect {
        &self.dialect
    }

    fn ga_due(&self, _period: u64, ga: &GaParams, rng: &mut SimRng) -> bool {
        chance(rng, ga.ga_prob)
    }
}

/// Probabilistic learner whose mutations preserve its bit usage
#[derive(Debug, Default)]
pub struct NesfiLearner {
    dialect: NesfiDialect,
}

impl LearningStrategy for NesfiLearner {
    fn kind(&self) -> AgentKind {
        AgentKind::Nesfi
    }

    fn dialect(&self) -> &dyn RuleDialect {
        &self.dialect
    }

    fn ga_due(&self, _period: u64, ga: &GaParams, rng: &mut SimRng) -> bool {
        chance(rng, ga.ga_prob)
    }
}

/// Learns on a fixed schedule
#[derive(Debug)]
pub struct FastLearner {
    dialect: Box<dyn RuleDialect>,
}

impl FastLearner {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect: create_dialect(dialect),
        }
    }
}

impl LearningStrategy for FastLearner {
    fn kind(&self) -> AgentKind {
        AgentKind::Fast
    }

    fn dialect(&self) -> &dyn RuleDialect {
        self.dialect.as_ref()
    }

    fn ga_due(&self, period: u64, ga: &GaParams, _rng: &mut SimRng) -> bool {
        period > 0 && period % ga.fast_interval.max(1) == 0
    }
}

/// Contingent-claim trader
#[derive(Debug)]
pub struct LmsrLearner {
    dialect: Box<dyn RuleDialect>,
}

impl LmsrLearner {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect: create_dialect(dialect),
        }
    }
}

impl LearningStrategy for LmsrLearner {
    fn kind(&self) -> AgentKind {
        AgentKind::Lmsr
    }

    fn dialect(&self) -> &dyn RuleDialect {
        self.dialect.as_ref()
    }

    fn ga_due(&self, _period: u64, ga: &GaParams, rng: &mut SimRng) -> bool {
        chance(rng, ga.ga_prob)
    }
}

/// Factory function to create learning strategies by kind.
///
/// `dialect` applies to fast and LMSR traders; SFI and NESFI traders always
/// use their own dialect.
pub fn create_strategy(kind: AgentKind, dialect: DialectKind) -> Box<dyn LearningStrategy> {
    match kind {
        AgentKind::Sfi => Box::new(SfiLearner::default()),
        AgentKind::Nesfi => Box::new(NesfiLearner::default()),
        AgentKind::Fast => Box::new(FastLearner::new(dialect)),
        AgentKind::Lmsr => Box::new(LmsrLearner::new(dialect)),
    }
}
