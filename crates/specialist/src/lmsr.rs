//! LMSR market maker
//!
//! Binary contingent claims priced by a logarithmic market scoring rule:
//!
//! ```text
//! C(q+, q-) = b ln((e^(q+/b) + e^(q-/b)) / 2)
//! ```
//!
//! A trade of `x` units on one side costs `C(after) - C(before)`. Orders are
//! executed one at a time, so each order moves the price seen by the next.

use agora_core::{ClaimSide, ConfigError, ConfigResult, check_positive};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

/// Upper bound on linear-scan steps when seeding the book
const MAX_SEED_STEPS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmsrParams {
    /// Liquidity parameter `b`
    pub liquidity: f64,

    /// When positive, liquidity grows to `alpha * (q+ + q-)`
    pub alpha: f64,

    /// Price of the positive claim before any agent trades
    pub initial_probability: f64,

    /// Quantity step of the seeding scan
    pub seed_step: f64,
}

impl Default for LmsrParams {
    fn default() -> Self {
        Self {
            liquidity: 10.0,
            alpha: 0.0,
            initial_probability: 0.5,
            seed_step: 0.01,
        }
    }
}

impl LmsrParams {
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("liquidity", self.liquidity)?;
        check_positive("seed_step", self.seed_step)?;
        if self.alpha < 0.0 {
            return Err(ConfigError::invalid("alpha", "must be non-negative"));
        }
        if !(self.initial_probability > 0.0 && self.initial_probability < 1.0) {
            return Err(ConfigError::invalid(
                "initial_probability",
                format!("{} is not in (0, 1)", self.initial_probability),
            ));
        }
        Ok(())
    }
}

/// Normalized LMSR cost for a fixed liquidity
pub fn cost(q_pos: f64, q_neg: f64, liquidity: f64) -> f64 {
    let x = q_pos / liquidity;
    let y = q_neg / liquidity;
    let m = x.max(y);
    liquidity * (m + ((x - m).exp() + (y - m).exp()).ln() - std::f64::consts::LN_2)
}

/// Instantaneous price of the positive claim
pub fn positive_price(q_pos: f64, q_neg: f64, liquidity: f64) -> f64 {
    1.0 / (1.0 + ((q_neg - q_pos) / liquidity).exp())
}

/// Cost of one more unit on the chosen side
pub fn first_price(q_pos: f64, q_neg: f64, liquidity: f64, positive: bool) -> f64 {
    if positive {
        cost(q_pos + 1.0, q_neg, liquidity) - cost(q_pos, q_neg, liquidity)
    } else {
        cost(q_pos, q_neg + 1.0, liquidity) - cost(q_pos, q_neg, liquidity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmsrMarketMaker {
    params: LmsrParams,
    q_pos: f64,
    q_neg: f64,
    seed_pos: f64,
    seed_neg: f64,
    revenue: f64,
    liabilities: f64,
    volume_pos: f64,
    volume_neg: f64,
    period_volume_pos: f64,
    period_volume_neg: f64,
    outcome: Option<ClaimSide>,
}

impl LmsrMarketMaker {
    pub fn new(params: LmsrParams) -> Self {
        Self {
            params,
            q_pos: 0.0,
            q_neg: 0.0,
            seed_pos: 0.0,
            seed_neg: 0.0,
            revenue: 0.0,
            liabilities: 0.0,
            volume_pos: 0.0,
            volume_neg: 0.0,
            period_volume_pos: 0.0,
            period_volume_neg: 0.0,
            outcome: None,
        }
    }

    pub fn params(&self) -> &LmsrParams {
        &self.params
    }

    fn liquidity_at(&self, q_pos: f64, q_neg: f64) -> f64 {
        if self.params.alpha > 0.0 {
            self.params.liquidity.max(self.params.alpha * (q_pos + q_neg))
        } else {
            self.params.liquidity
        }
    }

    pub fn liquidity(&self) -> f64 {
        self.liquidity_at(self.q_pos, self.q_neg)
    }

    fn cost_at(&self, q_pos: f64, q_neg: f64) -> f64 {
        cost(q_pos, q_neg, self.liquidity_at(q_pos, q_neg))
    }

    /// Cost function at the current book
    pub fn current_cost(&self) -> f64 {
        self.cost_at(self.q_pos, self.q_neg)
    }

    pub fn quantity(&self, side: ClaimSide) -> f64 {
        match side {
            ClaimSide::Positive => self.q_pos,
            ClaimSide::Negative => self.q_neg,
        }
    }

    /// Quantity held by agents, excluding the seed
    pub fn held(&self, side: ClaimSide) -> f64 {
        match side {
            ClaimSide::Positive => self.q_pos - self.seed_pos,
            ClaimSide::Negative => self.q_neg - self.seed_neg,
        }
    }

    /// Instantaneous price of a claim
    pub fn price(&self, side: ClaimSide) -> f64 {
        let positive = positive_price(self.q_pos, self.q_neg, self.liquidity());
        match side {
            ClaimSide::Positive => positive,
            ClaimSide::Negative => 1.0 - positive,
        }
    }

    /// Market probability of the event
    pub fn probability(&self) -> f64 {
        self.price(ClaimSide::Positive)
    }

    /// Cost of the next whole unit on a side
    pub fn marginal_unit_price(&self, side: ClaimSide) -> f64 {
        self.quote(side, 1.0)
    }

    /// Cost of trading `quantity` units on a side; negative sells
    pub fn quote(&self, side: ClaimSide, quantity: f64) -> f64 {
        let (p, n) = match side {
            ClaimSide::Positive => (self.q_pos + quantity, self.q_neg),
            ClaimSide::Negative => (self.q_pos, self.q_neg + quantity),
        };
        self.cost_at(p, n) - self.current_cost()
    }

    /// Shift the book so that the positive price reaches the initial
    /// probability, scanning quantity in fixed steps. Returns the seed.
    pub fn seed(&mut self) -> f64 {
        let target = self.params.initial_probability;
        let step = self.params.seed_step;
        let side = if target >= 0.5 {
            ClaimSide::Positive
        } else {
            ClaimSide::Negative
        };

        let mut q = 0.0;
        for _ in 0..MAX_SEED_STEPS {
            let (p, n) = match side {
                ClaimSide::Positive => (q, 0.0),
                ClaimSide::Negative => (0.0, q),
            };
            let price = positive_price(p, n, self.liquidity_at(p, n));
            let reached = match side {
                ClaimSide::Positive => price >= target,
                ClaimSide::Negative => price <= target,
            };
            if reached {
                break;
            }
            q += step;
        }

        match side {
            ClaimSide::Positive => {
                self.q_pos = q;
                self.seed_pos = q;
            }
            ClaimSide::Negative => {
                self.q_neg = q;
                self.seed_neg = q;
            }
        }
        info!(
            "LMSR book seeded with {:.2} {:?} units, price {:.4}",
            q,
            side,
            self.probability()
        );
        q
    }

    /// Execute an order and return its cost to the trader
    pub fn execute(&mut self, side: ClaimSide, quantity: f64) -> f64 {
        if quantity == 0.0 {
            return 0.0;
        }
        let charge = self.quote(side, quantity);
        match side {
            ClaimSide::Positive => {
                self.q_pos += quantity;
                self.volume_pos += quantity.abs();
                self.period_volume_pos += quantity.abs();
            }
            ClaimSide::Negative => {
                self.q_neg += quantity;
                self.volume_neg += quantity.abs();
                self.period_volume_neg += quantity.abs();
            }
        }
        self.revenue += charge;
        if self.outcome.is_none() {
            self.liabilities = self
                .held(ClaimSide::Positive)
                .max(self.held(ClaimSide::Negative))
                .max(0.0);
        }
        trace!(
            "LMSR {:?} x{} cost {:.4}, price now {:.4}",
            side,
            quantity,
            charge,
            self.probability()
        );
        charge
    }

    /// Fix the outcome; liabilities become the actual payout
    pub fn settle(&mut self, outcome: ClaimSide) -> f64 {
        self.outcome = Some(outcome);
        self.liabilities = self.held(outcome).max(0.0);
        debug!(
            "LMSR settled {:?}: payout {:.4}, revenue {:.4}",
            outcome, self.liabilities, self.revenue
        );
        self.liabilities
    }

    pub fn outcome(&self) -> Option<ClaimSide> {
        self.outcome
    }

    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    pub fn liabilities(&self) -> f64 {
        self.liabilities
    }

    pub fn profit(&self) -> f64 {
        self.revenue - self.liabilities
    }

    pub fn volume(&self, side: ClaimSide) -> f64 {
        match side {
            ClaimSide::Positive => self.volume_pos,
            ClaimSide::Negative => self.volume_neg,
        }
    }

    /// Volume traded since the last call, per side
    pub fn take_period_volume(&mut self) -> (f64, f64) {
        let volumes = (self.period_volume_pos, self.period_volume_neg);
        self.period_volume_pos = 0.0;
        self.period_volume_neg = 0.0;
        volumes
    }
}
