//! Dividend Process
//!
//! Exogenous dividend stream for the classic market:
//!
//! ```text
//! AR(1):        d' = mean + rho (d - mean) + e
//! random walk:  d' = d + e
//! ```
//!
//! with `e ~ N(0, noise_variance)`. Draws come from the world's shared
//! generator so a run is reproducible from its seed.

use agora_core::{ConfigError, ConfigResult, SimRng, check_probability, standard_normal};
use log::trace;
use serde::{Deserialize, Serialize};

/// Dividends never leave this band
pub const DIVIDEND_BOUNDS: (f64, f64) = (0.00005, 100.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendKind {
    /// Mean-reverting
    #[default]
    Ar1,
    /// No mean; the specialist skips its upper price bound
    RandomWalk,
}

/// Configuration for the dividend process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividendParams {
    pub process: DividendKind,
    pub mean: f64,
    /// Persistence of the AR(1) process
    pub rho: f64,
    pub noise_variance: f64,
}

impl Default for DividendParams {
    fn default() -> Self {
        Self {
            process: DividendKind::Ar1,
            mean: 10.0,
            rho: 0.95,
            noise_variance: 0.0743,
        }
    }
}

impl DividendParams {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(DIVIDEND_BOUNDS.0..=DIVIDEND_BOUNDS.1).contains(&self.mean) {
            return Err(ConfigError::invalid(
                "dividend.mean",
                format!("{} is outside the dividend bounds", self.mean),
            ));
        }
        check_probability("dividend.rho", self.rho)?;
        if self.noise_variance.is_nan() || self.noise_variance < 0.0 {
            return Err(ConfigError::invalid(
                "dividend.noise_variance",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DividendProcess {
    params: DividendParams,
    current: f64,
    previous: f64,
}

impl DividendProcess {
    /// Start at the long-run mean
    pub fn new(params: DividendParams) -> Self {
        let start = params.mean;
        Self {
            params,
            current: start,
            previous: start,
        }
    }

    pub fn params(&self) -> &DividendParams {
        &self.params
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    pub fn mean(&self) -> f64 {
        self.params.mean
    }

    /// Move the long-run mean; the current dividend is left alone
    pub fn set_mean(&mut self, mean: f64) {
        self.params.mean = mean.clamp(DIVIDEND_BOUNDS.0, DIVIDEND_BOUNDS.1);
    }

    /// Draw the next dividend
    pub fn next(&mut self, rng: &mut SimRng) -> f64 {
        let noise = self.params.noise_variance.sqrt() * standard_normal(rng);
        let raw = match self.params.process {
            DividendKind::Ar1 => {
                self.params.mean + self.params.rho * (self.current - self.params.mean) + noise
            }
            DividendKind::RandomWalk => self.current + noise,
        };
        let next = raw.clamp(DIVIDEND_BOUNDS.0, DIVIDEND_BOUNDS.1);
        if next != raw {
            trace!("dividend {raw:.6} clamped to {next}");
        }
        self.previous = self.current;
        self.current = next;
        next
    }
}
