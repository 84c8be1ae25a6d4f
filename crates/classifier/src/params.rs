//! Rule and GA Configuration

use agora_core::{ConfigError, ConfigResult, check_positive, check_probability};
use serde::{Deserialize, Serialize};

/// Parameters shaping individual trading rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParams {
    /// Probability that a fresh condition trit is set
    pub bit_prob: f64,

    /// Valid range of the price+dividend coefficient
    pub a_min: f64,
    pub a_max: f64,

    /// Valid range of the forecast offset
    pub b_min: f64,
    pub b_max: f64,

    /// Spread of fresh coefficients around the reference, as a fraction of range
    pub subrange: f64,

    /// Cap on a squared forecast error; also the fitness ceiling
    pub max_deviation: f64,

    /// Fitness charged per set condition trit
    pub bit_cost: f64,

    /// Time constant of the forecast variance average
    pub theta: f64,

    /// Periods without a match before a rule counts as stale
    pub max_non_active: u64,

    /// Probability of dropping each set trit when generalizing
    pub gen_frac: f64,

    /// Repair contradictory threshold ladders
    pub check_consistency: bool,

    /// Per-trit mutation probability
    pub prob_mutation: f64,

    /// Probability of resampling a coefficient over its whole range
    pub prob_long_jump: f64,

    /// Probability of a local coefficient perturbation
    pub prob_short_jump: f64,

    /// Size of a short jump, as a fraction of range
    pub nhood: f64,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            bit_prob: 0.1,
            a_min: 0.7,
            a_max: 1.2,
            b_min: -10.0,
            b_max: 19.0,
            subrange: 0.5,
            max_deviation: 500.0,
            bit_cost: 0.01,
            theta: 75.0,
            max_non_active: 4000,
            gen_frac: 0.25,
            check_consistency: true,
            prob_mutation: 0.03,
            prob_long_jump: 0.05,
            prob_short_jump: 0.2,
            nhood: 0.05,
        }
    }
}

impl RuleParams {
    /// Rules forecasting a probability rather than a price
    pub fn lmsr() -> Self {
        Self {
            a_min: 0.5,
            a_max: 1.5,
            b_min: -0.5,
            b_max: 0.5,
            max_deviation: 1.0,
            bit_cost: 1e-5,
            ..Default::default()
        }
    }

    pub fn a_range(&self) -> f64 {
        self.a_max - self.a_min
    }

    pub fn b_range(&self) -> f64 {
        self.b_max - self.b_min
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_probability("bit_prob", self.bit_prob)?;
        check_probability("gen_frac", self.gen_frac)?;
        check_probability("prob_mutation", self.prob_mutation)?;
        check_probability("prob_long_jump", self.prob_long_jump)?;
        check_probability("prob_short_jump", self.prob_short_jump)?;
        if self.prob_long_jump + self.prob_short_jump > 1.0 {
            return Err(ConfigError::invalid(
                "prob_short_jump",
                "long and short jump probabilities sum above 1",
            ));
        }
        if self.a_min > self.a_max {
            return Err(ConfigError::invalid("a_min", "exceeds a_max"));
        }
        if self.b_min > self.b_max {
            return Err(ConfigError::invalid("b_min", "exceeds b_max"));
        }
        check_positive("max_deviation", self.max_deviation)?;
        check_positive("theta", self.theta)?;
        if self.subrange < 0.0 || self.nhood < 0.0 || self.bit_cost < 0.0 {
            return Err(ConfigError::invalid(
                "subrange",
                "subrange, nhood and bit_cost must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Parameters of the per-agent genetic algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    /// Rules per agent
    pub num_rules: usize,

    /// Rules replaced per invocation
    pub new_rules: usize,

    pub prob_crossover: f64,

    /// Per-period invocation probability for probabilistic learners
    pub ga_prob: f64,

    /// Invocation interval for fast learners
    pub fast_interval: u64,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            num_rules: 100,
            new_rules: 20,
            prob_crossover: 0.1,
            ga_prob: 1.0 / 250.0,
            fast_interval: 25,
        }
    }
}

impl GaParams {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_rules == 0 {
            return Err(ConfigError::invalid("num_rules", "must be at least 1"));
        }
        if self.new_rules >= self.num_rules {
            return Err(ConfigError::invalid(
                "new_rules",
                format!(
                    "{} leaves no surviving parents out of {}",
                    self.new_rules, self.num_rules
                ),
            ));
        }
        check_probability("prob_crossover", self.prob_crossover)?;
        check_probability("ga_prob", self.ga_prob)?;
        if self.fast_interval == 0 {
            return Err(ConfigError::invalid("fast_interval", "must be at least 1"));
        }
        Ok(())
    }
}
