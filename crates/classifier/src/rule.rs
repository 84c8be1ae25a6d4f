//! Trading Rule
//!
//! A single classifier: a ternary condition over the market state, a linear
//! forecast `E[p' + d'] = a (p + d) + b`, and the running accuracy of that
//! forecast.

use crate::params::RuleParams;
use crate::ree::ReferenceCoefficients;
use agora_core::{
    BitCondition, MarketState, SimRng, Trit, Word, bits_in, chance, matches, standard_normal,
};
use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;

/// Floor on a back-derived forecast variance
pub const MIN_VARIANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingRule {
    id: u64,
    condition: BitCondition,
    technical: bool,
    a: f64,
    b: f64,
    variance: f64,
    fitness: f64,
    specificity: u32,
    birth: u64,
    last_active: u64,
    last_used: u64,
    active_count: u64,
    used_count: u64,
    #[serde(skip)]
    pending_forecast: Option<f64>,
}

impl TradingRule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        condition: BitCondition,
        technical: bool,
        a: f64,
        b: f64,
        variance: f64,
        period: u64,
        params: &RuleParams,
    ) -> Self {
        let mut condition = condition;
        if !technical {
            condition.clear(Word::Technical);
        }
        let mut rule = Self {
            id,
            condition,
            technical,
            a,
            b,
            variance,
            fitness: 0.0,
            specificity: 0,
            birth: period,
            last_active: period,
            last_used: period,
            active_count: 0,
            used_count: 0,
            pending_forecast: None,
        };
        rule.refresh(params);
        rule
    }

    /// A fresh rule with coefficients scattered around `reference`
    pub fn random(
        id: u64,
        technical: bool,
        reference: &ReferenceCoefficients,
        params: &RuleParams,
        period: u64,
        rng: &mut SimRng,
    ) -> Self {
        let a = (reference.a + params.subrange * params.a_range() * standard_normal(rng))
            .clamp(params.a_min, params.a_max);
        let b = (reference.b + params.subrange * params.b_range() * standard_normal(rng))
            .clamp(params.b_min, params.b_max);

        let mut condition = BitCondition::new();
        for word in Word::ALL {
            if word == Word::Technical && !technical {
                continue;
            }
            for index in 0..bits_in(word) {
                if chance(rng, params.bit_prob) {
                    condition.set(word, index, Trit::from_bool(rng.gen_bool(0.5)));
                }
            }
        }

        let mut rule = Self::new(
            id,
            condition,
            technical,
            a,
            b,
            reference.variance,
            period,
            params,
        );
        if params.check_consistency {
            rule.check_consistency(params, rng);
        }
        rule
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn condition(&self) -> &BitCondition {
        &self.condition
    }

    pub fn is_technical(&self) -> bool {
        self.technical
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    pub fn birth(&self) -> u64 {
        self.birth
    }

    pub fn last_active(&self) -> u64 {
        self.last_active
    }

    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    pub fn active_count(&self) -> u64 {
        self.active_count
    }

    pub fn used_count(&self) -> u64 {
        self.used_count
    }

    pub fn pending_forecast(&self) -> Option<f64> {
        self.pending_forecast
    }

    /// Pure condition test against the market state
    pub fn condition_holds(&self, state: &MarketState) -> bool {
        matches(&self.condition, state.words(), self.technical)
    }

    /// Condition test that records the activation on success
    pub fn matches(&mut self, state: &MarketState, period: u64) -> bool {
        let hit = self.condition_holds(state);
        if hit {
            self.mark_active(period);
        }
        hit
    }

    /// Record an activation without testing the condition
    pub fn mark_active(&mut self, period: u64) {
        self.last_active = period;
        self.active_count += 1;
    }

    /// Record that the rule's forecast was acted on
    pub fn mark_used(&mut self, period: u64) {
        self.last_used = period;
        self.used_count += 1;
    }

    pub fn forecast(&self, price_plus_dividend: f64) -> f64 {
        self.a * price_plus_dividend + self.b
    }

    /// Store this period's forecast for scoring once the outcome is known
    pub fn record_forecast(&mut self, price_plus_dividend: f64) -> f64 {
        let forecast = self.forecast(price_plus_dividend);
        self.pending_forecast = Some(forecast);
        forecast
    }

    /// Score the pending forecast against the realized value.
    ///
    /// Returns whether a forecast was pending. Before `theta` periods have
    /// passed the variance keeps its initial value.
    pub fn update_fitness(&mut self, actual: f64, period: u64, params: &RuleParams) -> bool {
        let Some(predicted) = self.pending_forecast.take() else {
            return false;
        };
        if period as f64 > params.theta {
            let deviation = (actual - predicted).powi(2).min(params.max_deviation);
            let decay = 1.0 / params.theta;
            self.variance = (1.0 - decay) * self.variance + decay * deviation;
        }
        self.recompute_fitness(params);
        true
    }

    pub fn recompute_fitness(&mut self, params: &RuleParams) {
        self.fitness =
            params.max_deviation - self.variance - self.specificity as f64 * params.bit_cost;
    }

    /// Set fitness directly, back-deriving the variance that produces it.
    ///
    /// The variance is floored at [`MIN_VARIANCE`], so a target above
    /// `max_deviation - specificity * bit_cost` yields a lower fitness than
    /// asked for.
    pub fn assign_fitness(&mut self, fitness: f64, params: &RuleParams) {
        self.variance = (params.max_deviation - fitness - self.specificity as f64 * params.bit_cost)
            .max(MIN_VARIANCE);
        self.recompute_fitness(params);
    }

    pub fn is_stale(&self, period: u64, max_non_active: u64) -> bool {
        period.saturating_sub(self.last_active) > max_non_active
    }

    /// Replacement priority: stale rules first, then ascending fitness
    pub fn replacement_order(
        lhs: &TradingRule,
        rhs: &TradingRule,
        period: u64,
        max_non_active: u64,
    ) -> Ordering {
        let lhs_stale = lhs.is_stale(period, max_non_active);
        let rhs_stale = rhs.is_stale(period, max_non_active);
        rhs_stale
            .cmp(&lhs_stale)
            .then_with(|| lhs.fitness.total_cmp(&rhs.fitness))
    }

    /// Drop set trits at random and restart the rule at `mean_fitness`
    pub fn generalize(
        &mut self,
        mean_fitness: f64,
        period: u64,
        params: &RuleParams,
        rng: &mut SimRng,
    ) -> u32 {
        let mut dropped = 0;
        for word in Word::ALL {
            for index in 0..bits_in(word) {
                if self.condition.get(word, index).is_set() && chance(rng, params.gen_frac) {
                    self.condition.set(word, index, Trit::DontCare);
                    dropped += 1;
                }
            }
        }
        self.birth = period;
        self.last_active = period;
        self.last_used = period;
        self.active_count = 0;
        self.used_count = 0;
        self.pending_forecast = None;
        self.specificity = self.condition.specificity();
        self.assign_fitness(mean_fitness, params);
        dropped
    }

    /// Long or short jump on each coefficient. Returns whether either moved.
    pub fn mutate_coefficients(&mut self, params: &RuleParams, rng: &mut SimRng) -> bool {
        let (a, moved_a) = jump(self.a, params.a_min, params.a_max, params, rng);
        let (b, moved_b) = jump(self.b, params.b_min, params.b_max, params, rng);
        self.a = a;
        self.b = b;
        moved_a || moved_b
    }

    pub(crate) fn condition_mut(&mut self) -> &mut BitCondition {
        &mut self.condition
    }

    /// Recompute specificity and fitness after the condition changed
    pub(crate) fn refresh(&mut self, params: &RuleParams) {
        self.specificity = self.condition.specificity();
        self.recompute_fitness(params);
    }
}

fn jump(value: f64, min: f64, max: f64, params: &RuleParams, rng: &mut SimRng) -> (f64, bool) {
    let range = max - min;
    let draw: f64 = rng.r#gen();
    if draw < params.prob_long_jump {
        (min + range * rng.r#gen::<f64>(), true)
    } else if draw < params.prob_long_jump + params.prob_short_jump {
        let step = params.nhood * range * rng.gen_range(-1.0..=1.0);
        ((value + step).clamp(min, max), true)
    } else {
        (value, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Indicators, seeded};
    use approx::assert_relative_eq;

    fn params() -> RuleParams {
        RuleParams::default()
    }

    fn reference() -> ReferenceCoefficients {
        ReferenceCoefficients {
            a: 0.95,
            b: 4.5,
            variance: 4.0,
        }
    }

    fn bare_rule(technical: bool) -> TradingRule {
        TradingRule::new(1, BitCondition::new(), technical, 0.95, 4.5, 4.0, 0, &params())
    }

    #[test]
    fn test_fitness_identity() {
        let mut cond = BitCondition::new();
        cond.set(Word::Fundamental, 0, Trit::True);
        cond.set(Word::Fundamental, 9, Trit::False);
        let rule = TradingRule::new(1, cond, false, 1.0, 0.0, 4.0, 0, &params());

        assert_eq!(rule.specificity(), 2);
        assert_relative_eq!(rule.fitness(), 500.0 - 4.0 - 2.0 * 0.01);
    }

    #[test]
    fn test_non_technical_rule_drops_technical_bits() {
        let mut cond = BitCondition::new();
        cond.set(Word::Technical, 2, Trit::True);
        let rule = TradingRule::new(1, cond, false, 1.0, 0.0, 4.0, 0, &params());

        assert_eq!(rule.condition().word(Word::Technical), 0);
        assert_eq!(rule.specificity(), 0);
    }

    #[test]
    fn test_random_rule_within_ranges() {
        let mut rng = seeded(11);
        for id in 0..200 {
            let rule = TradingRule::random(id, true, &reference(), &params(), 0, &mut rng);
            assert!((0.7..=1.2).contains(&rule.a()));
            assert!((-10.0..=19.0).contains(&rule.b()));
            assert!(rule.condition().is_well_formed());
            assert_eq!(rule.specificity(), rule.condition().specificity());
        }
    }

    #[test]
    fn test_matches_records_activation() {
        let state = MarketState::encode(&Indicators {
            dividend_ratio: 1.2,
            ..Default::default()
        });
        let mut cond = BitCondition::new();
        cond.set(Word::Fundamental, 4, Trit::True);
        let mut rule = TradingRule::new(1, cond, false, 1.0, 0.0, 4.0, 0, &params());

        assert!(rule.matches(&state, 7));
        assert_eq!(rule.last_active(), 7);
        assert_eq!(rule.active_count(), 1);

        rule.condition_mut().set(Word::Fundamental, 6, Trit::True);
        assert!(!rule.matches(&state, 8));
        assert_eq!(rule.last_active(), 7);
        assert_eq!(rule.active_count(), 1);
    }

    #[test]
    fn test_variance_frozen_until_theta() {
        let mut rule = bare_rule(false);
        rule.record_forecast(100.0);
        assert!(rule.update_fitness(200.0, 10, &params()));
        assert_eq!(rule.variance(), 4.0);
        // Nothing pending any more
        assert!(!rule.update_fitness(200.0, 11, &params()));
    }

    #[test]
    fn test_variance_smoothing_and_clip() {
        let mut rule = bare_rule(false);
        let forecast = rule.record_forecast(80.0);
        rule.update_fitness(forecast + 3.0, 100, &params());
        assert_relative_eq!(rule.variance(), (74.0 / 75.0) * 4.0 + 9.0 / 75.0);

        let before = rule.variance();
        rule.record_forecast(80.0);
        rule.update_fitness(1e6, 101, &params());
        assert_relative_eq!(rule.variance(), (74.0 / 75.0) * before + 500.0 / 75.0);
        assert_relative_eq!(rule.fitness(), 500.0 - rule.variance());
    }

    #[test]
    fn test_assign_fitness_back_derives_variance() {
        let mut rule = bare_rule(false);
        rule.condition_mut().set(Word::Fundamental, 3, Trit::True);
        rule.refresh(&params());
        rule.assign_fitness(490.0, &params());

        assert_relative_eq!(rule.variance(), 10.0 - 0.01);
        assert_relative_eq!(rule.fitness(), 490.0);
    }

    #[test]
    fn test_replacement_order_puts_stale_first() {
        let mut strong_but_stale = bare_rule(false);
        strong_but_stale.assign_fitness(499.0, &params());
        let mut weak = bare_rule(false);
        weak.assign_fitness(100.0, &params());
        weak.last_active = 5000;

        assert_eq!(
            TradingRule::replacement_order(&strong_but_stale, &weak, 5000, 4000),
            Ordering::Less
        );
        // Same tier: fitness decides
        assert_eq!(
            TradingRule::replacement_order(&strong_but_stale, &weak, 10, 4000),
            Ordering::Greater
        );
    }

    #[test]
    fn test_generalize_resets_rule() {
        let mut rng = seeded(3);
        let mut cond = BitCondition::new();
        for i in 0..10 {
            cond.set(Word::Fundamental, 7 + i, Trit::True);
        }
        let mut rule = TradingRule::new(1, cond, false, 1.0, 0.0, 4.0, 0, &params());
        rule.mark_used(3);
        rule.record_forecast(1.0);

        let strict = RuleParams {
            gen_frac: 1.0,
            ..params()
        };
        let dropped = rule.generalize(480.0, 6000, &strict, &mut rng);

        assert_eq!(dropped, 10);
        assert_eq!(rule.specificity(), 0);
        assert_eq!(rule.birth(), 6000);
        assert_eq!(rule.used_count(), 0);
        assert_eq!(rule.pending_forecast(), None);
        assert_relative_eq!(rule.fitness(), 480.0);
    }

    #[test]
    fn test_assigned_fitness_respects_variance_floor() {
        let mut rule = bare_rule(false);
        rule.assign_fitness(480.0, &params());
        assert_relative_eq!(rule.variance(), 20.0);
        assert_relative_eq!(rule.fitness(), 480.0);

        // Above max_deviation the variance bottoms out
        rule.assign_fitness(600.0, &params());
        assert_eq!(rule.variance(), MIN_VARIANCE);
        assert_relative_eq!(rule.fitness(), 500.0 - MIN_VARIANCE);
    }

    #[test]
    fn test_coefficient_jumps_stay_in_range() {
        let mut rng = seeded(5);
        let jumpy = RuleParams {
            prob_long_jump: 0.5,
            prob_short_jump: 0.5,
            ..params()
        };
        let mut rule = bare_rule(false);
        for _ in 0..500 {
            assert!(rule.mutate_coefficients(&jumpy, &mut rng));
            assert!((0.7..=1.2).contains(&rule.a()));
            assert!((-10.0..=19.0).contains(&rule.b()));
        }
    }
}
