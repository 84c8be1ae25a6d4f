//! Stock-market demand and bookkeeping
//!
//! CARA demand at a trial price:
//!
//! ```text
//! x     = (a (p + d) + b - (1 + r) p) / (lambda sigma^2) - holding
//! slope = (a - (1 + r)) / (lambda sigma^2)
//! ```
//!
//! clamped to the bid limit, the cash floor and the minimum holding.

use crate::agent::{Agent, Holdings};
use agora_classifier::MIN_VARIANCE;
use agora_ports::{Demand, DemandSchedule, Quote};
use agora_specialist::ClearingOutcome;
use log::trace;

impl DemandSchedule for Agent {
    fn demand_at(&mut self, quote: &Quote) -> Demand {
        let params = self.params();
        let belief = *self.belief();
        let holding = self.shares();
        let p = quote.trial_price;
        let r1 = 1.0 + quote.interest_rate;
        let divisor = params.risk_aversion * belief.variance.max(MIN_VARIANCE);

        let forecast = belief.forecast(p + quote.dividend);
        let mut quantity = (forecast - r1 * p) / divisor - holding;
        let mut slope = (belief.a - r1) / divisor;

        if quantity > params.max_bid {
            quantity = params.max_bid;
            slope = 0.0;
        } else if quantity < -params.max_bid {
            quantity = -params.max_bid;
            slope = 0.0;
        }

        let spendable = self.cash - params.min_cash;
        if quantity > 0.0 && quantity * p > spendable {
            quantity = if spendable > 0.0 { spendable / p } else { 0.0 };
            slope = 0.0;
            trace!("agent {} bid limited by cash at {:.4}", self.id(), p);
        } else if quantity < 0.0 && quantity + holding < params.min_holding {
            quantity = (params.min_holding - holding).min(0.0);
            slope = 0.0;
        }

        self.demand = quantity;
        self.slope = slope;
        Demand { quantity, slope }
    }
}

impl Agent {
    /// Apply the rationed share of the last reported demand at the clearing
    /// price. Returns the signed quantity traded.
    pub fn fill(&mut self, outcome: &ClearingOutcome) -> f64 {
        let traded = if self.demand > 0.0 {
            self.demand * outcome.bid_frac
        } else {
            self.demand * outcome.offer_frac
        };
        if let Holdings::Stock { shares } = &mut self.holdings {
            *shares += traded;
            self.cash -= outcome.price * traded;
        }
        self.last_trade = traded;
        traded
    }

    /// Pay the interest-equivalent tax on the position and collect the
    /// dividend: `cash -= holding (r p - d)`, floored at the minimum.
    pub fn earnings_and_taxes(&mut self, price: f64, dividend: f64, interest_rate: f64) -> f64 {
        let holding = self.shares();
        self.cash -= holding * (interest_rate * price - dividend);
        if self.cash < self.params().min_cash {
            trace!("agent {} cash floored at {}", self.id(), self.params().min_cash);
            self.cash = self.params().min_cash;
        }
        self.mark_to_market(price)
    }
}
