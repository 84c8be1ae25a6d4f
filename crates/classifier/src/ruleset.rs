//! Rule Set
//!
//! A fixed-size population of trading rules owned by one agent, and the
//! genetic algorithm that periodically replaces its weakest members.

use crate::params::{GaParams, RuleParams};
use crate::ree::ReferenceCoefficients;
use crate::rule::TradingRule;
use agora_core::{
    BitCondition, MAX_ITERATIONS, SimRng, SimulationContext, Trit, Word, bits_in, chance,
};
use agora_ports::{BitUsage, RuleDialect};
use log::debug;
use rand::Rng;
use serde::Serialize;
use std::ops::Range;

/// Fitness and structure summary of a rule population
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PopulationStats {
    pub mean_fitness: f64,
    pub fitness_variance: f64,
    pub mean_variance: f64,
    pub mean_specificity: f64,
    pub min_fitness: f64,
    pub max_fitness: f64,
}

/// Outcome of one GA invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GaReport {
    pub replaced: usize,
    pub crossovers: usize,
    pub mutations: usize,
    pub generalized: usize,
    pub mean_fitness: f64,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<TradingRule>,
    technical: bool,
    usage: BitUsage,
}

impl RuleSet {
    pub fn from_rules(rules: Vec<TradingRule>, technical: bool) -> Self {
        let mut set = Self {
            rules,
            technical,
            usage: BitUsage::default(),
        };
        set.recompute_usage();
        set
    }

    /// `count` fresh random rules
    pub fn random(
        count: usize,
        technical: bool,
        reference: &ReferenceCoefficients,
        params: &RuleParams,
        ctx: &mut SimulationContext,
        period: u64,
        rng: &mut SimRng,
    ) -> Self {
        let rules = (0..count)
            .map(|_| {
                TradingRule::random(ctx.next_rule_id(), technical, reference, params, period, rng)
            })
            .collect();
        Self::from_rules(rules, technical)
    }

    pub fn rules(&self) -> &[TradingRule] {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut [TradingRule] {
        &mut self.rules
    }

    pub fn get(&self, index: usize) -> Option<&TradingRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_technical(&self) -> bool {
        self.technical
    }

    pub fn position_of(&self, id: u64) -> Option<usize> {
        self.rules.iter().position(|r| r.id() == id)
    }

    /// Fraction of condition slots set, per word, over the whole set
    pub fn usage(&self) -> BitUsage {
        self.usage
    }

    pub fn recompute_usage(&mut self) {
        let n = self.rules.len() as f64;
        let fraction = |word: Word| {
            let slots = n * bits_in(word) as f64;
            if slots == 0.0 {
                return 0.0;
            }
            let set: u32 = self.rules.iter().map(|r| r.condition().count_set(word)).sum();
            set as f64 / slots
        };
        self.usage = BitUsage {
            fundamental: fraction(Word::Fundamental),
            technical: if self.technical {
                fraction(Word::Technical)
            } else {
                0.0
            },
        };
    }

    /// Set trits per word, summed over all rules
    pub fn bits_used(&self, word: Word) -> u32 {
        self.rules.iter().map(|r| r.condition().count_set(word)).sum()
    }

    pub fn stats(&self) -> PopulationStats {
        if self.rules.is_empty() {
            return PopulationStats::default();
        }
        let n = self.rules.len() as f64;
        let mean_fitness = self.rules.iter().map(|r| r.fitness()).sum::<f64>() / n;
        let fitness_variance = self
            .rules
            .iter()
            .map(|r| (r.fitness() - mean_fitness).powi(2))
            .sum::<f64>()
            / n;
        PopulationStats {
            mean_fitness,
            fitness_variance,
            mean_variance: self.rules.iter().map(|r| r.variance()).sum::<f64>() / n,
            mean_specificity: self.rules.iter().map(|r| r.specificity() as f64).sum::<f64>() / n,
            min_fitness: self
                .rules
                .iter()
                .map(|r| r.fitness())
                .fold(f64::INFINITY, f64::min),
            max_fitness: self
                .rules
                .iter()
                .map(|r| r.fitness())
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Stable sort into replacement order: stale first, then weakest first
    pub fn sort(&mut self, period: u64, max_non_active: u64) {
        self.rules
            .sort_by(|a, b| TradingRule::replacement_order(a, b, period, max_non_active));
    }

    /// Replace the `new_rules` lowest-ranked slots with offspring of the
    /// survivors. Stale rules are generalized first so they can compete again.
    pub fn invoke_ga(
        &mut self,
        period: u64,
        rule_params: &RuleParams,
        ga_params: &GaParams,
        dialect: &dyn RuleDialect,
        ctx: &mut SimulationContext,
        rng: &mut SimRng,
    ) -> GaReport {
        let mut report = GaReport::default();
        if self.rules.len() < 2 {
            return report;
        }

        self.sort(period, rule_params.max_non_active);
        let stats = self.stats();
        report.mean_fitness = stats.mean_fitness;

        for rule in self.rules.iter_mut() {
            if rule.is_stale(period, rule_params.max_non_active) {
                rule.generalize(stats.mean_fitness, period, rule_params, rng);
                report.generalized += 1;
            }
        }
        if report.generalized > 0 {
            self.sort(period, rule_params.max_non_active);
        }

        let replace = ga_params.new_rules.min(self.rules.len() - 1);
        let survivors = replace..self.rules.len();
        let usage = self.usage;

        for slot in 0..replace {
            let (condition, a, b) = if chance(rng, ga_params.prob_crossover) {
                let first = self.tournament(survivors.clone(), rng);
                let second = self.tournament(survivors.clone(), rng);
                report.crossovers += 1;
                self.crossover(first, second, rng)
            } else {
                let parent = self.tournament(survivors.clone(), rng);
                report.mutations += 1;
                self.mutate_clone(parent, usage, rule_params, dialect, rng)
            };

            let mut child = TradingRule::new(
                ctx.next_rule_id(),
                condition,
                self.technical,
                a,
                b,
                stats.mean_variance,
                period,
                rule_params,
            );
            if rule_params.check_consistency {
                child.check_consistency(rule_params, rng);
            }
            child.assign_fitness(stats.mean_fitness, rule_params);
            self.rules[slot] = child;
        }
        report.replaced = replace;

        self.recompute_usage();
        ctx.ga_invocations += 1;
        debug!(
            "GA at period {}: replaced {} ({} crossovers), generalized {}, mean fitness {:.4}",
            period, report.replaced, report.crossovers, report.generalized, report.mean_fitness
        );
        report
    }

    /// Fitter of two distinct candidates from `range`, preferring rules that
    /// have matched at least once
    pub fn tournament(&self, range: Range<usize>, rng: &mut SimRng) -> usize {
        let first = self.pick(range.clone(), None, rng);
        let second = self.pick(range, Some(first), rng);
        if self.rules[second].fitness() > self.rules[first].fitness() {
            second
        } else {
            first
        }
    }

    fn pick(&self, range: Range<usize>, exclude: Option<usize>, rng: &mut SimRng) -> usize {
        let mut candidate = rng.gen_range(range.clone());
        for _ in 0..MAX_ITERATIONS {
            let activated = self.rules[candidate].active_count() > 0;
            if activated && Some(candidate) != exclude {
                break;
            }
            candidate = rng.gen_range(range.clone());
        }
        if Some(candidate) == exclude && range.len() > 1 {
            candidate = if candidate + 1 < range.end {
                candidate + 1
            } else {
                range.start
            };
        }
        candidate
    }

    /// Offspring condition and coefficients from two parents
    fn crossover(
        &self,
        first: usize,
        second: usize,
        rng: &mut SimRng,
    ) -> (BitCondition, f64, f64) {
        let p1 = &self.rules[first];
        let p2 = &self.rules[second];

        let mut condition = BitCondition::new();
        for word in Word::ALL {
            if word == Word::Technical && !self.technical {
                continue;
            }
            for index in 0..bits_in(word) {
                let t = match (p1.condition().get(word, index), p2.condition().get(word, index)) {
                    (Trit::DontCare, other) | (other, Trit::DontCare) => other,
                    (x, y) => {
                        if rng.gen_bool(0.5) {
                            x
                        } else {
                            y
                        }
                    }
                };
                condition.set(word, index, t);
            }
        }

        let (a, b) = match rng.gen_range(0..3) {
            0 => {
                let w1 = 1.0 / p1.variance().max(f64::MIN_POSITIVE);
                let w2 = 1.0 / p2.variance().max(f64::MIN_POSITIVE);
                let total = w1 + w2;
                (
                    (w1 * p1.a() + w2 * p2.a()) / total,
                    (w1 * p1.b() + w2 * p2.b()) / total,
                )
            }
            1 => (
                if rng.gen_bool(0.5) { p1.a() } else { p2.a() },
                if rng.gen_bool(0.5) { p1.b() } else { p2.b() },
            ),
            _ => {
                if rng.gen_bool(0.5) {
                    (p1.a(), p1.b())
                } else {
                    (p2.a(), p2.b())
                }
            }
        };

        (condition, a, b)
    }

    fn mutate_clone(
        &self,
        parent: usize,
        usage: BitUsage,
        params: &RuleParams,
        dialect: &dyn RuleDialect,
        rng: &mut SimRng,
    ) -> (BitCondition, f64, f64) {
        let mut clone = self.rules[parent].clone();
        let mut condition = *clone.condition();
        dialect.mutate_condition(
            &mut condition,
            self.technical,
            usage,
            params.prob_mutation,
            rng,
        );
        clone.mutate_coefficients(params, rng);
        (condition, clone.a(), clone.b())
    }
}
