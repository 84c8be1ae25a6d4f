//! Simulation Configuration
//!
//! Everything a run needs, with the classic constants as defaults. Partial
//! JSON files are accepted; missing fields keep their defaults.

use crate::dividend::DividendParams;
use crate::error::Result;
use agora_agents::AgentParams;
use agora_classifier::{DialectKind, GaParams, RuleParams};
use agora_core::{AgentKind, ConfigError, ConfigResult, MarketMode, check_positive, check_probability};
use agora_specialist::{LmsrParams, SpecialistParams};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A block of identically configured traders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentGroup {
    pub kind: AgentKind,
    pub count: usize,
    /// Mutation dialect; only fast and LMSR learners let you choose
    pub dialect: DialectKind,
    /// Rules also condition on the technical word
    pub technical: bool,
    pub params: AgentParams,
}

impl Default for AgentGroup {
    fn default() -> Self {
        Self {
            kind: AgentKind::Sfi,
            count: 25,
            dialect: DialectKind::Sfi,
            technical: true,
            params: AgentParams::default(),
        }
    }
}

/// One-time regime change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shock {
    pub period: u64,
    /// New true probability of the event (LMSR)
    #[serde(default)]
    pub probability: Option<f64>,
    /// New long-run dividend mean (classic)
    #[serde(default)]
    pub dividend_mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub mode: MarketMode,
    /// Periods including Init (0) and Terminal (`num_periods - 1`)
    pub num_periods: u64,
    pub interest_rate: f64,
    pub dividend: DividendParams,
    pub population: Vec<AgentGroup>,
    pub rule: RuleParams,
    pub ga: GaParams,
    pub specialist: SpecialistParams,
    pub lmsr: LmsrParams,
    /// Forecast variance of fresh LMSR rules
    pub lmsr_initial_variance: f64,
    /// Probability the claim event happens; resolves the market at the end
    pub true_probability: f64,
    /// Rational-expectations periods run before period 1 (classic)
    pub warmup_periods: u64,
    pub shock: Option<Shock>,
    /// Flag reports once no agent uses any condition bit
    pub stop_on_zero_bits: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl SimulationConfig {
    /// Stock market with 25 SFI traders
    pub fn classic() -> Self {
        Self {
            seed: 42,
            mode: MarketMode::Classic,
            num_periods: 10_000,
            interest_rate: 0.1,
            dividend: DividendParams::default(),
            population: vec![AgentGroup::default()],
            rule: RuleParams::default(),
            ga: GaParams::default(),
            specialist: SpecialistParams::default(),
            lmsr: LmsrParams::default(),
            lmsr_initial_variance: 0.01,
            true_probability: 0.5,
            warmup_periods: 501,
            shock: None,
            stop_on_zero_bits: false,
        }
    }

    /// Contingent-claim market with 10 noisy traders
    pub fn lmsr() -> Self {
        Self {
            mode: MarketMode::Lmsr,
            num_periods: 100,
            interest_rate: 0.0,
            population: vec![AgentGroup {
                kind: AgentKind::Lmsr,
                count: 10,
                technical: false,
                params: AgentParams::lmsr(),
                ..Default::default()
            }],
            rule: RuleParams::lmsr(),
            warmup_periods: 0,
            ..Self::classic()
        }
    }

    /// Set the seed (builder pattern)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the run length (builder pattern)
    pub fn with_periods(mut self, num_periods: u64) -> Self {
        self.num_periods = num_periods;
        self
    }

    /// Last trading period
    pub fn terminal_period(&self) -> u64 {
        self.num_periods.saturating_sub(1)
    }

    pub fn total_agents(&self) -> usize {
        self.population.iter().map(|g| g.count).sum()
    }

    /// Reject configurations the core cannot run
    pub fn validate(&self) -> ConfigResult<()> {
        if self.total_agents() == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        for group in &self.population {
            if group.kind.market() != self.mode {
                return Err(ConfigError::ModeMismatch {
                    kind: group.kind,
                    mode: self.mode,
                });
            }
            group.params.validate()?;
        }
        if self.num_periods < 2 {
            return Err(ConfigError::invalid(
                "num_periods",
                "need at least Init and Terminal",
            ));
        }
        if self.interest_rate.is_nan() || self.interest_rate < 0.0 {
            return Err(ConfigError::invalid("interest_rate", "must be non-negative"));
        }

        self.rule.validate()?;
        self.ga.validate()?;
        match self.mode {
            MarketMode::Classic => {
                self.dividend.validate()?;
                self.specialist.validate()?;
                check_positive("interest_rate", self.interest_rate)?;
            }
            MarketMode::Lmsr => {
                self.lmsr.validate()?;
                check_positive("lmsr_initial_variance", self.lmsr_initial_variance)?;
            }
        }
        check_probability("true_probability", self.true_probability)?;

        if let Some(shock) = &self.shock {
            let terminal = self.terminal_period();
            if shock.period == 0 || shock.period >= terminal {
                return Err(ConfigError::ShockOutsideRun {
                    period: shock.period,
                    terminal,
                });
            }
            if let Some(p) = shock.probability {
                check_probability("shock.probability", p)?;
            }
            if let Some(mean) = shock.dividend_mean {
                check_positive("shock.dividend_mean", mean)?;
            }
        }
        Ok(())
    }

    /// Load and validate a JSON configuration
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!("Loaded {:?} configuration from {}", config.mode, path.display());
        Ok(config)
    }
}
