//! Agent Configuration

use agora_core::{ConfigError, ConfigResult, check_positive};
use serde::{Deserialize, Serialize};

/// How an agent turns its active rules into one forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Fittest qualifying active rule
    #[default]
    Best,
    /// Fitness-weighted draw among qualifying active rules
    Roulette,
    /// Fitness-weighted average of every rule
    Average,
}

/// Configuration for a trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    /// CARA risk aversion (lambda)
    pub risk_aversion: f64,

    pub initial_cash: f64,

    /// Shares held at start (classic mode only)
    pub initial_holding: f64,

    /// Cash floor; orders and taxes never push cash below it
    pub min_cash: f64,

    /// Largest order per period, in shares
    pub max_bid: f64,

    /// Most negative share position allowed
    pub min_holding: f64,

    pub selection: SelectionMethod,

    /// Matches a rule needs before it can be selected
    pub min_count: u64,

    /// Gate rules on the market state; otherwise every rule is active
    pub use_classifier: bool,

    /// Standard deviation of the perceived-probability error (LMSR)
    pub perception_noise: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            risk_aversion: 0.5,
            initial_cash: 20_000.0,
            initial_holding: 1.0,
            min_cash: -2_000.0,
            max_bid: 10.0,
            min_holding: -5.0,
            selection: SelectionMethod::Best,
            min_count: 2,
            use_classifier: true,
            perception_noise: 0.0,
        }
    }
}

impl AgentParams {
    /// Contingent-claim trader
    pub fn lmsr() -> Self {
        Self {
            initial_cash: 100.0,
            initial_holding: 0.0,
            min_cash: 0.0,
            use_classifier: false,
            perception_noise: 0.05,
            ..Default::default()
        }
    }

    /// Set risk aversion (builder pattern)
    pub fn with_risk_aversion(mut self, risk_aversion: f64) -> Self {
        self.risk_aversion = risk_aversion;
        self
    }

    /// Set perception noise (builder pattern)
    pub fn with_perception_noise(mut self, sd: f64) -> Self {
        self.perception_noise = sd;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("risk_aversion", self.risk_aversion)?;
        check_positive("max_bid", self.max_bid)?;
        if self.initial_cash < self.min_cash {
            return Err(ConfigError::invalid(
                "initial_cash",
                format!("{} is below min_cash {}", self.initial_cash, self.min_cash),
            ));
        }
        if self.min_holding > 0.0 {
            return Err(ConfigError::invalid("min_holding", "must be <= 0"));
        }
        if self.perception_noise.is_nan() || self.perception_noise < 0.0 {
            return Err(ConfigError::invalid(
                "perception_noise",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}
