//! Contingent-claim orders against the market maker

use crate::agent::{Agent, Holdings};
use agora_core::{ClaimSide, SimRng, standard_normal};
use agora_specialist::LmsrMarketMaker;
use log::trace;

/// Perceived probabilities stay strictly inside (0, 1)
const PROBABILITY_BOUNDS: (f64, f64) = (0.001, 0.999);

/// An order for one side of the claim market; negative quantity sells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimOrder {
    pub side: ClaimSide,
    pub quantity: f64,
}

impl Agent {
    /// `base` plus this agent's perception error, kept inside (0, 1)
    pub fn perceive(&self, base: f64, rng: &mut SimRng) -> f64 {
        let noise = self.params().perception_noise;
        let offset = if noise > 0.0 {
            noise * standard_normal(rng)
        } else {
            0.0
        };
        (base + offset).clamp(PROBABILITY_BOUNDS.0, PROBABILITY_BOUNDS.1)
    }

    /// Order this agent would place at the market maker's current prices.
    ///
    /// Holding the claim it now disfavours, the agent sells all of it.
    /// Otherwise it buys the CARA-optimal integer quantity of the favoured
    /// claim, cut back to the largest whole quantity whose cost respects
    /// the cash floor.
    pub fn claim_order(
        &self,
        market: &LmsrMarketMaker,
        perceived: f64,
        interest_rate: f64,
    ) -> Option<ClaimOrder> {
        let price = market.probability();
        let (side, value, side_price) = if perceived > price {
            (ClaimSide::Positive, perceived, price)
        } else if perceived < price {
            (ClaimSide::Negative, 1.0 - perceived, 1.0 - price)
        } else {
            return None;
        };

        let opposite = self.claims(side.opposite());
        if opposite > 0.0 {
            return Some(ClaimOrder {
                side: side.opposite(),
                quantity: -opposite,
            });
        }

        let divisor = self.params().risk_aversion * perceived * (1.0 - perceived);
        let wanted = ((value - (1.0 + interest_rate) * side_price) / divisor).round();
        let quantity = self.constrain_demand(market, side, wanted);
        (quantity > 0.0).then_some(ClaimOrder { side, quantity })
    }

    /// Largest whole quantity up to `wanted` whose cost leaves cash at or
    /// above the floor.
    ///
    /// The quote rises with quantity, so the cut is a bisection over whole
    /// units rather than a unit-by-unit walk down from `wanted`.
    pub fn constrain_demand(&self, market: &LmsrMarketMaker, side: ClaimSide, wanted: f64) -> f64 {
        let floor = self.params().min_cash;
        let affordable = |quantity: f64| self.cash - market.quote(side, quantity) >= floor;

        let wanted = wanted.max(0.0);
        if wanted == 0.0 || affordable(wanted) {
            return wanted;
        }

        // Invariant: `low` is affordable (or zero), `high` is not
        let (mut low, mut high) = (0.0_f64, wanted);
        while high - low > 1.0 {
            let mid = ((low + high) / 2.0).floor();
            if affordable(mid) {
                low = mid;
            } else {
                high = mid;
            }
        }
        trace!(
            "agent {} order cut from {} to {} by cash floor",
            self.id(),
            wanted,
            low
        );
        low
    }

    /// Trade against the market maker and pay for it. Returns the cost.
    pub fn execute_order(&mut self, market: &mut LmsrMarketMaker, order: ClaimOrder) -> f64 {
        let cost = market.execute(order.side, order.quantity);
        self.cash -= cost;
        if let Holdings::Claims { positive, negative } = &mut self.holdings {
            match order.side {
                ClaimSide::Positive => *positive += order.quantity,
                ClaimSide::Negative => *negative += order.quantity,
            }
        }
        self.last_trade = match order.side {
            ClaimSide::Positive => order.quantity,
            ClaimSide::Negative => -order.quantity,
        };
        cost
    }

    /// Redeem winning claims at one unit each; losing claims expire
    pub fn set_payout(&mut self, outcome: ClaimSide) -> f64 {
        let payout = self.claims(outcome);
        self.cash += payout;
        if let Holdings::Claims { positive, negative } = &mut self.holdings {
            *positive = 0.0;
            *negative = 0.0;
        }
        self.wealth = self.cash;
        payout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::agent_with;
    use crate::params::AgentParams;
    use agora_core::{AgentKind, seeded};
    use agora_specialist::LmsrParams;
    use approx::assert_relative_eq;

    fn trader(risk_aversion: f64) -> Agent {
        let params = AgentParams::lmsr()
            .with_risk_aversion(risk_aversion)
            .with_perception_noise(0.0);
        agent_with(AgentKind::Lmsr, params, vec![])
    }

    fn market() -> LmsrMarketMaker {
        let mut mm = LmsrMarketMaker::new(LmsrParams::default());
        mm.seed();
        mm
    }

    #[test]
    fn test_perception_clamped() {
        let agent = trader(1.0);
        let mut rng = seeded(1);
        assert_eq!(agent.perceive(0.9, &mut rng), 0.9);
        assert_eq!(agent.perceive(1.2, &mut rng), 0.999);
        assert_eq!(agent.perceive(-0.3, &mut rng), 0.001);
    }

    #[test]
    fn test_noisy_perception_varies() {
        let agent = agent_with(AgentKind::Lmsr, AgentParams::lmsr(), vec![]);
        let mut rng = seeded(2);
        let draws: Vec<f64> = (0..100).map(|_| agent.perceive(0.5, &mut rng)).collect();
        assert!(draws.iter().any(|&p| p > 0.5) && draws.iter().any(|&p| p < 0.5));
        assert!(draws.iter().all(|&p| (0.001..=0.999).contains(&p)));
    }

    #[test]
    fn test_buys_favoured_side() {
        let agent = trader(1.0);
        let order = agent.claim_order(&market(), 0.9, 0.0);
        // round(0.4 / 0.09) = 4
        assert_eq!(
            order,
            Some(ClaimOrder {
                side: ClaimSide::Positive,
                quantity: 4.0
            })
        );

        let order = agent.claim_order(&market(), 0.2, 0.0);
        // round(0.3 / 0.16) = 2
        assert_eq!(
            order,
            Some(ClaimOrder {
                side: ClaimSide::Negative,
                quantity: 2.0
            })
        );
    }

    #[test]
    fn test_no_order_at_fair_price() {
        assert_eq!(trader(1.0).claim_order(&market(), 0.5, 0.0), None);
        // Too risk averse to want a whole unit
        assert_eq!(trader(1000.0).claim_order(&market(), 0.9, 0.0), None);
    }

    #[test]
    fn test_opposite_position_unwound_first() {
        let mut agent = trader(1.0);
        let mut mm = market();
        let buy = agent.claim_order(&mm, 0.9, 0.0).unwrap();
        agent.execute_order(&mut mm, buy);
        assert_eq!(agent.claims(ClaimSide::Positive), 4.0);

        let order = agent.claim_order(&mm, 0.1, 0.0).unwrap();
        assert_eq!(order.side, ClaimSide::Positive);
        assert_eq!(order.quantity, -4.0);

        agent.execute_order(&mut mm, order);
        assert_eq!(agent.claims(ClaimSide::Positive), 0.0);
        // Round trip at the market maker is free
        assert_relative_eq!(agent.cash(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(mm.probability(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cash_floor_cuts_order() {
        let params = AgentParams {
            initial_cash: 1.0,
            ..AgentParams::lmsr()
        }
        .with_risk_aversion(1.0)
        .with_perception_noise(0.0);
        let agent = agent_with(AgentKind::Lmsr, params, vec![]);
        let mm = market();

        let order = agent.claim_order(&mm, 0.9, 0.0).unwrap();
        // One unit costs ~0.51, two ~1.05
        assert_eq!(order.quantity, 1.0);
        assert!(agent.cash() - mm.quote(ClaimSide::Positive, 1.0) >= 0.0);
    }

    #[test]
    fn test_reckless_order_capped_by_cash() {
        // Near-zero risk aversion wants billions of units
        let agent = trader(1e-9);
        let mm = market();
        let wanted = (0.4_f64 / (1e-9 * 0.09)).round();
        assert!(wanted > 1e9);

        let quantity = agent.constrain_demand(&mm, ClaimSide::Positive, wanted);
        assert!(quantity >= 1.0);
        assert_eq!(quantity, quantity.floor());
        assert!(mm.quote(ClaimSide::Positive, quantity) <= agent.cash());
        assert!(mm.quote(ClaimSide::Positive, quantity + 1.0) > agent.cash());
    }

    #[test]
    fn test_payout() {
        let mut agent = trader(1.0);
        let mut mm = market();
        let order = agent.claim_order(&mm, 0.9, 0.0).unwrap();
        let cost = agent.execute_order(&mut mm, order);

        assert_relative_eq!(agent.set_payout(ClaimSide::Positive), 4.0);
        assert_relative_eq!(agent.cash(), 100.0 - cost + 4.0);
        assert_eq!(agent.wealth(), agent.cash());
        assert_eq!(agent.claims(ClaimSide::Positive), 0.0);
    }
}
