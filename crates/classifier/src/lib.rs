//! Agora Classifier
//!
//! Condition-action forecasting rules and the genetic algorithm that evolves
//! them. Each agent owns one [`RuleSet`]; dialects decide how condition bits
//! mutate.

mod consistency;
mod dialect;
mod params;
mod ree;
mod rule;
mod ruleset;

pub use consistency::repair_ladder;
pub use dialect::{DialectKind, NesfiDialect, SfiDialect, create_dialect};
pub use params::{GaParams, RuleParams};
pub use ree::{RationalExpectations, ReferenceCoefficients};
pub use rule::{MIN_VARIANCE, TradingRule};
pub use ruleset::{GaReport, PopulationStats, RuleSet};

// Re-export the port for convenience
pub use agora_ports::{BitUsage, RuleDialect};
