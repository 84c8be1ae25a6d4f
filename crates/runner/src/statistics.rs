//! World Statistics
//!
//! Per-period reports, the end-of-run summary and the tabular rule and bit
//! dumps. Everything here is a plain serializable struct so any reporting
//! collaborator can consume it.

use crate::executor::PeriodPhase;
use agora_agents::Agent;
use agora_core::{AgentKind, ClaimSide, FUNDAMENTAL_BITS, TECHNICAL_BITS, Word, bits_in};
use agora_specialist::ClearingOutcome;
use serde::Serialize;
use std::collections::BTreeMap;

/// Condition bits in use across the whole population
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BitUsageReport {
    pub fundamental: u64,
    pub technical: u64,
    /// Share of fundamental slots set, over every rule
    pub fundamental_fraction: f64,
    /// Share of technical slots set, over technical rules only
    pub technical_fraction: f64,
}

impl BitUsageReport {
    pub fn total(&self) -> u64 {
        self.fundamental + self.technical
    }
}

/// Wealth aggregate for one agent kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KindWealth {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
}

/// What happened in one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub period: u64,
    pub phase: PeriodPhase,
    /// Stock price, or the positive-claim price in LMSR mode
    pub price: f64,
    pub dividend: f64,
    /// Rational-expectations price, or the true probability in LMSR mode
    pub fundamental_price: f64,
    pub volume: f64,
    pub volume_positive: f64,
    pub volume_negative: f64,
    /// Tâtonnement details (classic mode)
    pub clearing: Option<ClearingOutcome>,
    pub revenue: f64,
    pub liabilities: f64,
    pub profit: f64,
    pub bits: BitUsageReport,
    pub wealth: BTreeMap<AgentKind, KindWealth>,
    /// Rules matched this period, over all agents
    pub active_rules: usize,
    /// GA runs this period
    pub ga_invocations: usize,
    /// Average-forecast fallbacks since the start of the run
    pub average_fallbacks: u64,
    pub stop_requested: bool,
}

/// End-of-run aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub periods: u64,
    pub average_price: f64,
    pub price_volatility: f64,
    pub total_volume: f64,
    pub price_fundamental_correlation: f64,
    pub final_mean_wealth: f64,
    pub wealth: BTreeMap<AgentKind, KindWealth>,
    pub revenue: f64,
    pub liabilities: f64,
    pub profit: f64,
    pub outcome: Option<ClaimSide>,
    pub ga_invocations: u64,
    pub average_fallbacks: u64,
}

/// One row of the per-agent rule dump
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRecord {
    pub agent: usize,
    pub kind: AgentKind,
    pub rule: u64,
    pub fitness: f64,
    pub variance: f64,
    pub specificity: u32,
    pub a: f64,
    pub b: f64,
    pub birth: u64,
    pub last_active: u64,
    pub last_used: u64,
    pub active_count: u64,
    pub used_count: u64,
}

/// One row of the per-agent bit-usage dump: how many rules set each bit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentBitRecord {
    pub agent: usize,
    pub kind: AgentKind,
    pub fundamental: Vec<u32>,
    pub technical: Vec<u32>,
    pub fundamental_total: u32,
    pub technical_total: u32,
}

pub fn bit_usage(agents: &[Agent]) -> BitUsageReport {
    let mut report = BitUsageReport::default();
    let mut fundamental_slots = 0usize;
    let mut technical_slots = 0usize;
    for agent in agents {
        let rules = agent.rules();
        report.fundamental += u64::from(rules.bits_used(Word::Fundamental));
        fundamental_slots += rules.len() * FUNDAMENTAL_BITS;
        if rules.is_technical() {
            report.technical += u64::from(rules.bits_used(Word::Technical));
            technical_slots += rules.len() * TECHNICAL_BITS;
        }
    }
    report.fundamental_fraction = ratio(report.fundamental as f64, fundamental_slots as f64);
    report.technical_fraction = ratio(report.technical as f64, technical_slots as f64);
    report
}

pub fn wealth_by_kind(agents: &[Agent]) -> BTreeMap<AgentKind, KindWealth> {
    let mut slices: BTreeMap<AgentKind, KindWealth> = BTreeMap::new();
    for agent in agents {
        let slice = slices.entry(agent.kind()).or_default();
        slice.count += 1;
        slice.total += agent.wealth();
    }
    for slice in slices.values_mut() {
        slice.mean = ratio(slice.total, slice.count as f64);
    }
    slices
}

pub fn mean_wealth(agents: &[Agent]) -> f64 {
    let total: f64 = agents.iter().map(Agent::wealth).sum();
    ratio(total, agents.len() as f64)
}

pub fn rule_records(agents: &[Agent]) -> Vec<RuleRecord> {
    agents
        .iter()
        .flat_map(|agent| {
            agent.rules().rules().iter().map(move |rule| RuleRecord {
                agent: agent.id(),
                kind: agent.kind(),
                rule: rule.id(),
                fitness: rule.fitness(),
                variance: rule.variance(),
                specificity: rule.specificity(),
                a: rule.a(),
                b: rule.b(),
                birth: rule.birth(),
                last_active: rule.last_active(),
                last_used: rule.last_used(),
                active_count: rule.active_count(),
                used_count: rule.used_count(),
            })
        })
        .collect()
}

pub fn agent_bit_records(agents: &[Agent]) -> Vec<AgentBitRecord> {
    agents
        .iter()
        .map(|agent| {
            let per_bit = |word: Word| -> Vec<u32> {
                (0..bits_in(word))
                    .map(|i| {
                        agent
                            .rules()
                            .rules()
                            .iter()
                            .filter(|r| r.condition().get(word, i).is_set())
                            .count() as u32
                    })
                    .collect()
            };
            let fundamental = per_bit(Word::Fundamental);
            let technical = per_bit(Word::Technical);
            AgentBitRecord {
                agent: agent.id(),
                kind: agent.kind(),
                fundamental_total: fundamental.iter().sum(),
                technical_total: technical.iter().sum(),
                fundamental,
                technical,
            }
        })
        .collect()
}

/// Pearson correlation; 0 when either series is flat or too short
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    let denominator = (var_x * var_y).sqrt();
    if denominator > 0.0 && denominator.is_finite() {
        cov / denominator
    } else {
        0.0
    }
}

/// Standard deviation over mean
pub fn volatility(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    ratio(variance.sqrt(), mean)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
