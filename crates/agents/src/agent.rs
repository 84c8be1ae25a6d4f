//! Agent
//!
//! One trader: a rule set, a cash account and a position. The learning
//! strategy decides the flavour; everything else is shared.

use crate::params::{AgentParams, SelectionMethod};
use crate::strategy::LearningStrategy;
use agora_classifier::{GaParams, GaReport, MIN_VARIANCE, RuleParams, RuleSet};
use agora_core::{AgentKind, ClaimSide, MarketMode, MarketState, SimRng, SimulationContext};
use log::debug;
use rand::Rng;
use serde::Serialize;

/// What the agent currently owns besides cash
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Holdings {
    Stock { shares: f64 },
    Claims { positive: f64, negative: f64 },
}

/// Where the current forecast came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BeliefSource {
    /// The selected rule, by id
    Rule(u64),
    /// Fitness-weighted average over all rules
    Average,
}

/// Forecast in use this period: `E[p' + d'] = a (p + d) + b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Belief {
    pub a: f64,
    pub b: f64,
    pub variance: f64,
    pub source: BeliefSource,
}

impl Belief {
    pub fn forecast(&self, price_plus_dividend: f64) -> f64 {
        self.a * price_plus_dividend + self.b
    }
}

#[derive(Debug)]
pub struct Agent {
    id: usize,
    strategy: Box<dyn LearningStrategy>,
    params: AgentParams,
    rules: RuleSet,
    active: Vec<usize>,
    old_active: Vec<usize>,
    pub(crate) cash: f64,
    pub(crate) holdings: Holdings,
    pub(crate) wealth: f64,
    belief: Belief,
    pub(crate) demand: f64,
    pub(crate) slope: f64,
    pub(crate) last_trade: f64,
    fallbacks: u64,
    ga_invocations: u64,
}

impl Agent {
    pub fn new(
        id: usize,
        strategy: Box<dyn LearningStrategy>,
        params: AgentParams,
        rules: RuleSet,
    ) -> Self {
        let holdings = match strategy.kind().market() {
            MarketMode::Classic => Holdings::Stock {
                shares: params.initial_holding,
            },
            MarketMode::Lmsr => Holdings::Claims {
                positive: 0.0,
                negative: 0.0,
            },
        };
        let belief = average_belief(&rules);
        Self {
            id,
            strategy,
            cash: params.initial_cash,
            wealth: params.initial_cash,
            params,
            rules,
            active: Vec::new(),
            old_active: Vec::new(),
            holdings,
            belief,
            demand: 0.0,
            slope: 0.0,
            last_trade: 0.0,
            fallbacks: 0,
            ga_invocations: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.strategy.kind()
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Indices of rules matched this period
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    /// Indices of rules matched last period
    pub fn old_active(&self) -> &[usize] {
        &self.old_active
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn wealth(&self) -> f64 {
        self.wealth
    }

    pub fn holdings(&self) -> Holdings {
        self.holdings
    }

    /// Share position; zero for claim traders
    pub fn shares(&self) -> f64 {
        match self.holdings {
            Holdings::Stock { shares } => shares,
            Holdings::Claims { .. } => 0.0,
        }
    }

    /// Claims held on one side; zero for stock traders
    pub fn claims(&self, side: ClaimSide) -> f64 {
        match (self.holdings, side) {
            (Holdings::Claims { positive, .. }, ClaimSide::Positive) => positive,
            (Holdings::Claims { negative, .. }, ClaimSide::Negative) => negative,
            (Holdings::Stock { .. }, _) => 0.0,
        }
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    /// Last demand reported to the specialist
    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Signed quantity actually traded this period
    pub fn last_trade(&self) -> f64 {
        self.last_trade
    }

    /// Times the agent fell back to an average forecast
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    pub fn ga_invocations(&self) -> u64 {
        self.ga_invocations
    }

    /// Run the GA if the strategy says it is due. Active-rule indices are
    /// carried across the re-sort by rule id; replaced rules drop out.
    ///
    /// Agents without the classifier learn too: all their rules are active,
    /// so all of them are scored and bred.
    pub fn invoke_ga(
        &mut self,
        period: u64,
        rule_params: &RuleParams,
        ga_params: &GaParams,
        ctx: &mut SimulationContext,
        rng: &mut SimRng,
    ) -> Option<GaReport> {
        if !self.strategy.ga_due(period, ga_params, rng) {
            return None;
        }

        let active_ids = self.ids_of(&self.active);
        let old_ids = self.ids_of(&self.old_active);

        let report = self.rules.invoke_ga(
            period,
            rule_params,
            ga_params,
            self.strategy.dialect(),
            ctx,
            rng,
        );

        self.active = self.positions_of(&active_ids);
        self.old_active = self.positions_of(&old_ids);
        self.ga_invocations += 1;
        debug!("agent {} ({}) ran GA at period {}", self.id, self.kind(), period);
        Some(report)
    }

    fn ids_of(&self, indices: &[usize]) -> Vec<u64> {
        indices
            .iter()
            .filter_map(|&i| self.rules.get(i).map(|r| r.id()))
            .collect()
    }

    fn positions_of(&self, ids: &[u64]) -> Vec<usize> {
        ids.iter()
            .filter_map(|&id| self.rules.position_of(id))
            .collect()
    }

    /// Match rules against the state and pick this period's forecast.
    ///
    /// Without a qualifying active rule the agent uses the fitness-weighted
    /// average of all rules and counts a fallback.
    pub fn choose_rule(
        &mut self,
        state: &MarketState,
        period: u64,
        ctx: &mut SimulationContext,
        rng: &mut SimRng,
    ) -> Belief {
        self.old_active = std::mem::take(&mut self.active);

        if self.params.use_classifier {
            for (index, rule) in self.rules.rules_mut().iter_mut().enumerate() {
                if rule.matches(state, period) {
                    self.active.push(index);
                }
            }
        } else {
            for rule in self.rules.rules_mut() {
                rule.mark_active(period);
            }
            self.active = (0..self.rules.len()).collect();
        }

        let selected = match self.params.selection {
            SelectionMethod::Best => self.select_best(),
            SelectionMethod::Roulette => self.select_roulette(rng),
            SelectionMethod::Average => {
                self.belief = average_belief(&self.rules);
                return self.belief;
            }
        };

        self.belief = match selected {
            Some(index) => {
                let rule = &mut self.rules.rules_mut()[index];
                rule.mark_used(period);
                Belief {
                    a: rule.a(),
                    b: rule.b(),
                    variance: rule.variance(),
                    source: BeliefSource::Rule(rule.id()),
                }
            }
            None => {
                self.fallbacks += 1;
                ctx.average_fallbacks += 1;
                debug!(
                    "agent {} has no qualifying rule at period {}, averaging",
                    self.id, period
                );
                average_belief(&self.rules)
            }
        };
        self.belief
    }

    fn qualifying(&self) -> impl Iterator<Item = usize> + '_ {
        let min_count = self.params.min_count;
        let gate = self.params.use_classifier;
        self.active.iter().copied().filter(move |&i| {
            !gate
                || self
                    .rules
                    .get(i)
                    .is_some_and(|r| r.active_count() >= min_count)
        })
    }

    fn select_best(&self) -> Option<usize> {
        self.qualifying().max_by(|&x, &y| {
            let fx = self.rules.rules()[x].fitness();
            let fy = self.rules.rules()[y].fitness();
            fx.total_cmp(&fy)
        })
    }

    fn select_roulette(&self, rng: &mut SimRng) -> Option<usize> {
        let candidates: Vec<usize> = self.qualifying().collect();
        if candidates.is_empty() {
            return None;
        }
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&i| self.rules.rules()[i].fitness().max(0.0))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Some(candidates[rng.gen_range(0..candidates.len())]);
        }
        let mut target = rng.gen_range(0.0..total);
        for (&index, &w) in candidates.iter().zip(weights.iter()) {
            if target < w {
                return Some(index);
            }
            target -= w;
        }
        candidates.last().copied()
    }

    /// Score last period's forecasts against the realized value. Returns the
    /// number of rules scored.
    pub fn update_performance(&mut self, actual: f64, period: u64, params: &RuleParams) -> usize {
        self.rules
            .rules_mut()
            .iter_mut()
            .map(|r| r.update_fitness(actual, period, params))
            .filter(|&scored| scored)
            .count()
    }

    /// Store this period's forecasts on every active rule
    pub fn record_forecasts(&mut self, price_plus_dividend: f64) {
        let rules = self.rules.rules_mut();
        for &index in &self.active {
            if let Some(rule) = rules.get_mut(index) {
                rule.record_forecast(price_plus_dividend);
            }
        }
    }

    /// Revalue the position at current prices
    pub fn mark_to_market(&mut self, price: f64) -> f64 {
        self.wealth = self.cash
            + match self.holdings {
                Holdings::Stock { shares } => price * shares,
                Holdings::Claims { positive, negative } => {
                    positive * price + negative * (1.0 - price)
                }
            };
        self.wealth
    }
}

/// Fitness-weighted average forecast over all rules
fn average_belief(rules: &RuleSet) -> Belief {
    let weights: Vec<f64> = rules.rules().iter().map(|r| r.fitness().max(0.0)).collect();
    let total: f64 = weights.iter().sum();
    let n = rules.len() as f64;
    let weight = |i: usize| {
        if total > 0.0 {
            weights[i] / total
        } else if n > 0.0 {
            1.0 / n
        } else {
            0.0
        }
    };

    let mut belief = Belief {
        a: 0.0,
        b: 0.0,
        variance: 0.0,
        source: BeliefSource::Average,
    };
    for (i, rule) in rules.rules().iter().enumerate() {
        let w = weight(i);
        belief.a += w * rule.a();
        belief.b += w * rule.b();
        belief.variance += w * rule.variance();
    }
    if rules.is_empty() {
        belief.a = 1.0;
    }
    belief.variance = belief.variance.max(MIN_VARIANCE);
    belief
}
