//! Tâtonnement specialist
//!
//! Gropes for the price at which bids and offers balance, then rations the
//! long side of the market.

use crate::search::{SearchKind, create_price_search};
use agora_core::{ConfigError, ConfigResult, MAX_ITERATIONS, check_positive};
use agora_ports::{DemandSchedule, PriceSearch, Quote};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistParams {
    pub min_price: f64,
    pub max_price: f64,
    pub max_iterations: usize,
    /// Imbalance below which the market counts as cleared
    pub min_excess: f64,
    pub eta: f64,
    pub search: SearchKind,
}

impl Default for SpecialistParams {
    fn default() -> Self {
        Self {
            min_price: 0.01,
            max_price: 500.0,
            max_iterations: MAX_ITERATIONS,
            min_excess: 0.01,
            eta: 0.0005,
            search: SearchKind::Slope,
        }
    }
}

impl SpecialistParams {
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("min_price", self.min_price)?;
        if self.max_price <= self.min_price {
            return Err(ConfigError::invalid("max_price", "must exceed min_price"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("max_iterations", "must be at least 1"));
        }
        if self.min_excess < 0.0 {
            return Err(ConfigError::invalid("min_excess", "must be non-negative"));
        }
        check_positive("eta", self.eta)
    }
}

/// Result of one clearing round
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClearingOutcome {
    pub price: f64,
    pub volume: f64,
    pub bid_total: f64,
    pub offer_total: f64,
    pub imbalance: f64,
    /// Share of each bid that is filled
    pub bid_frac: f64,
    /// Share of each offer that is filled
    pub offer_frac: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug)]
pub struct Specialist {
    params: SpecialistParams,
    search: Box<dyn PriceSearch>,
    /// Skip the upper price bound, for dividend processes without a mean
    unbounded_above: bool,
}

impl Specialist {
    pub fn new(params: SpecialistParams, unbounded_above: bool) -> Self {
        let search = create_price_search(params.search, params.eta);
        Self {
            params,
            search,
            unbounded_above,
        }
    }

    pub fn params(&self) -> &SpecialistParams {
        &self.params
    }

    pub fn search_name(&self) -> &str {
        self.search.name()
    }

    fn clip(&self, price: f64) -> f64 {
        let floored = price.max(self.params.min_price);
        if self.unbounded_above {
            floored
        } else {
            floored.min(self.params.max_price)
        }
    }

    /// Search for a clearing price starting from `initial_price`.
    ///
    /// Participants are polled in order at every trial price. The last
    /// schedule each participant reported is the one at the returned price.
    /// Stopping on the iteration budget is not an error; the last trial price
    /// is kept.
    pub fn clear<D: DemandSchedule>(
        &self,
        participants: &mut [D],
        initial_price: f64,
        dividend: f64,
        interest_rate: f64,
    ) -> ClearingOutcome {
        let mut outcome = ClearingOutcome {
            price: self.clip(initial_price),
            ..Default::default()
        };

        for iteration in 1..=self.params.max_iterations {
            let quote = Quote {
                trial_price: outcome.price,
                dividend,
                interest_rate,
            };
            let mut bids = 0.0;
            let mut offers = 0.0;
            let mut slope_total = 0.0;
            for participant in participants.iter_mut() {
                let demand = participant.demand_at(&quote);
                if demand.quantity > 0.0 {
                    bids += demand.quantity;
                } else {
                    offers -= demand.quantity;
                }
                slope_total += demand.slope;
            }

            outcome.bid_total = bids;
            outcome.offer_total = offers;
            outcome.imbalance = bids - offers;
            outcome.iterations = iteration;

            if outcome.imbalance.abs() <= self.params.min_excess {
                outcome.converged = true;
                break;
            }
            if iteration == self.params.max_iterations {
                break;
            }
            let next = self
                .search
                .next_price(outcome.price, outcome.imbalance, slope_total);
            if !next.is_finite() {
                trace!("non-finite trial price from {}, holding", self.search.name());
                break;
            }
            outcome.price = self.clip(next);
        }

        if !outcome.converged {
            debug!(
                "no clearing after {} iterations, imbalance {:.4} at {:.4}",
                outcome.iterations, outcome.imbalance, outcome.price
            );
        }

        outcome.volume = outcome.bid_total.min(outcome.offer_total);
        outcome.bid_frac = if outcome.bid_total > 0.0 {
            outcome.volume / outcome.bid_total
        } else {
            0.0
        };
        outcome.offer_frac = if outcome.offer_total > 0.0 {
            outcome.volume / outcome.offer_total
        } else {
            0.0
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_ports::Demand;
    use approx::assert_relative_eq;

    /// Linear demand `k (value - p)`
    struct Linear {
        value: f64,
        k: f64,
        calls: usize,
    }

    impl Linear {
        fn new(value: f64, k: f64) -> Self {
            Self { value, k, calls: 0 }
        }
    }

    impl DemandSchedule for Linear {
        fn demand_at(&mut self, quote: &Quote) -> Demand {
            self.calls += 1;
            Demand {
                quantity: self.k * (self.value - quote.trial_price),
                slope: -self.k,
            }
        }
    }

    /// Fixed order regardless of price
    struct Fixed(f64);

    impl DemandSchedule for Fixed {
        fn demand_at(&mut self, _quote: &Quote) -> Demand {
            Demand {
                quantity: self.0,
                slope: 0.0,
            }
        }
    }

    #[test]
    fn test_linear_demand_clears_in_one_step() {
        let specialist = Specialist::new(SpecialistParams::default(), false);
        let mut book = vec![Linear::new(90.0, 1.0), Linear::new(110.0, 1.0)];

        let outcome = specialist.clear(&mut book, 80.0, 10.0, 0.1);

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 2);
        assert_relative_eq!(outcome.price, 100.0, epsilon = 1e-9);
        assert_relative_eq!(outcome.volume, 10.0, epsilon = 1e-9);
        assert_relative_eq!(outcome.bid_frac, 1.0, epsilon = 1e-9);
        assert_relative_eq!(outcome.offer_frac, 1.0, epsilon = 1e-9);
        assert_eq!(book[0].calls, 2);
    }

    #[test]
    fn test_non_convergence_keeps_last_trial_price() {
        let params = SpecialistParams {
            max_iterations: 3,
            ..Default::default()
        };
        let specialist = Specialist::new(params, false);
        let mut book = vec![Fixed(5.0), Fixed(-1.0)];

        let outcome = specialist.clear(&mut book, 100.0, 10.0, 0.1);

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 3);
        // Two eta steps on a constant imbalance of 4
        assert_relative_eq!(outcome.price, 100.0 * 1.002 * 1.002, epsilon = 1e-9);
        assert_relative_eq!(outcome.volume, 1.0);
        assert_relative_eq!(outcome.bid_frac, 0.2);
        assert_relative_eq!(outcome.offer_frac, 1.0);
    }

    #[test]
    fn test_price_clipped_to_bounds() {
        let specialist = Specialist::new(SpecialistParams::default(), false);
        let mut book = vec![Linear::new(10_000.0, 1.0)];
        let outcome = specialist.clear(&mut book, 100.0, 10.0, 0.1);
        assert_eq!(outcome.price, 500.0);

        let unbounded = Specialist::new(SpecialistParams::default(), true);
        let outcome = unbounded.clear(&mut book, 100.0, 10.0, 0.1);
        assert_relative_eq!(outcome.price, 10_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_book() {
        let specialist = Specialist::new(SpecialistParams::default(), false);
        let mut book: Vec<Fixed> = Vec::new();
        let outcome = specialist.clear(&mut book, 80.0, 10.0, 0.1);

        assert!(outcome.converged);
        assert_eq!(outcome.price, 80.0);
        assert_eq!(outcome.volume, 0.0);
        assert_eq!(outcome.bid_frac, 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(SpecialistParams::default().validate().is_ok());
        let bad = SpecialistParams {
            max_price: 0.001,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
