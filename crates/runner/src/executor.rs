//! Period Executor
//!
//! Advances the world one period at a time. Every period runs to completion
//! before the next one starts, and agents always act in population order:
//! against the market maker that order moves prices.
//!
//! ```text
//! Init      period 0          warm-up history / seed the LMSR book
//! Shock     shock.period      apply the regime change, then trade
//! Terminal  num_periods - 1   trade, then settle
//! Normal    otherwise         dividend -> GA -> rule choice -> clearing
//!                             -> fills -> forecasts -> taxes -> stats
//! ```

use crate::statistics::{self, PeriodReport, RunSummary};
use crate::world::{Market, World, rational_expectations};
use agora_core::{ClaimSide, ConfigResult, MarketState};
use agora_specialist::ClearingOutcome;
use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPhase {
    Init,
    Shock,
    Terminal,
    Normal,
}

impl PeriodPhase {
    pub fn for_period(period: u64, shock: Option<u64>, terminal: u64) -> Self {
        if period == 0 {
            PeriodPhase::Init
        } else if shock == Some(period) {
            PeriodPhase::Shock
        } else if period == terminal {
            PeriodPhase::Terminal
        } else {
            PeriodPhase::Normal
        }
    }
}

/// Trading activity of one period
#[derive(Debug, Clone, Copy, Default)]
struct Activity {
    volume: f64,
    volume_positive: f64,
    volume_negative: f64,
    clearing: Option<ClearingOutcome>,
    ga_invocations: usize,
}

#[derive(Debug)]
pub struct PeriodExecutor {
    world: World,
    prices: Vec<f64>,
    fundamentals: Vec<f64>,
    total_volume: f64,
}

impl PeriodExecutor {
    pub fn new(world: World) -> Self {
        Self {
            world,
            prices: Vec::new(),
            fundamentals: Vec::new(),
            total_volume: 0.0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    /// Start over from the stored configuration
    pub fn reset(&mut self) -> ConfigResult<()> {
        self.world.reset()?;
        self.prices.clear();
        self.fundamentals.clear();
        self.total_volume = 0.0;
        Ok(())
    }

    /// Run the next period. Returns `None` once the terminal period is done.
    pub fn step(&mut self) -> Option<PeriodReport> {
        if self.world.is_finished() {
            return None;
        }
        let period = self.world.period;
        let shock = self.world.config.shock.as_ref().map(|s| s.period);
        let phase = PeriodPhase::for_period(period, shock, self.world.config.terminal_period());

        let activity = match phase {
            PeriodPhase::Init => self.init(),
            PeriodPhase::Shock => {
                self.apply_shock(period);
                self.trade(period)
            }
            PeriodPhase::Terminal | PeriodPhase::Normal => self.trade(period),
        };
        if phase == PeriodPhase::Terminal {
            self.settle(period);
        }

        let report = self.report(period, phase, activity);
        if phase != PeriodPhase::Init {
            self.prices.push(report.price);
            self.fundamentals.push(report.fundamental_price);
            self.total_volume += report.volume;
        }
        debug!(
            "period {} ({:?}): price {:.4}, volume {:.2}, GA runs {}",
            period, phase, report.price, report.volume, report.ga_invocations
        );
        self.world.period += 1;
        Some(report)
    }

    /// Step until the terminal period, or until a report asks to stop
    pub fn run(&mut self) -> RunSummary {
        while let Some(report) = self.step() {
            if report.stop_requested {
                info!("No condition bits left in use at period {}, stopping", report.period);
                break;
            }
        }
        let summary = self.summary();
        info!(
            "Run finished after {} periods: average price {:.4}, volume {:.2}",
            summary.periods, summary.average_price, summary.total_volume
        );
        summary
    }

    pub fn summary(&self) -> RunSummary {
        let world = &self.world;
        let (revenue, liabilities, profit, outcome) = match world.market_maker() {
            Some(mm) => (mm.revenue(), mm.liabilities(), mm.profit(), mm.outcome()),
            None => (0.0, 0.0, 0.0, None),
        };
        let average_price = if self.prices.is_empty() {
            0.0
        } else {
            self.prices.iter().sum::<f64>() / self.prices.len() as f64
        };
        RunSummary {
            periods: world.period,
            average_price,
            price_volatility: statistics::volatility(&self.prices),
            total_volume: self.total_volume,
            price_fundamental_correlation: statistics::correlation(
                &self.prices,
                &self.fundamentals,
            ),
            final_mean_wealth: statistics::mean_wealth(&world.agents),
            wealth: statistics::wealth_by_kind(&world.agents),
            revenue,
            liabilities,
            profit,
            outcome,
            ga_invocations: world.ctx.ga_invocations,
            average_fallbacks: world.ctx.average_fallbacks,
        }
    }

    fn init(&mut self) -> Activity {
        let world = &mut self.world;
        match &mut world.market {
            Market::Specialist(_) => {
                let ree = world.ree;
                for _ in 0..world.config.warmup_periods {
                    let dividend = world.dividend.next(&mut world.rng);
                    let price = ree.map_or(world.price, |ree| ree.price(dividend));
                    world.history.push_dividend(dividend);
                    world.history.push_price(price);
                    world.price = price;
                }
                if world.config.warmup_periods == 0 {
                    world.history.push_dividend(world.dividend.current());
                    world.history.push_price(world.price);
                }
                info!(
                    "Warm-up done after {} periods, price {:.4}",
                    world.config.warmup_periods, world.price
                );
            }
            Market::MarketMaker(mm) => {
                mm.seed();
                world.price = mm.probability();
                world.history.push_price(world.price);
            }
        }
        for agent in &mut world.agents {
            agent.mark_to_market(world.price);
        }
        Activity::default()
    }

    fn apply_shock(&mut self, period: u64) {
        let world = &mut self.world;
        let Some(shock) = world.config.shock.clone() else {
            return;
        };
        if let Some(probability) = shock.probability {
            info!(
                "Shock at period {}: true probability {} -> {}",
                period, world.true_probability, probability
            );
            world.true_probability = probability;
        }
        if let Some(mean) = shock.dividend_mean {
            info!(
                "Shock at period {}: dividend mean {} -> {}",
                period,
                world.dividend.mean(),
                mean
            );
            world.dividend.set_mean(mean);
            world.history.set_mean_dividend(world.dividend.mean());
            if world.ree.is_some() {
                world.ree = Some(rational_expectations(&world.config, world.dividend.mean()));
            }
        }
    }

    fn trade(&mut self, period: u64) -> Activity {
        match self.world.market {
            Market::Specialist(_) => self.trade_stock(period),
            Market::MarketMaker(_) => self.trade_claims(period),
        }
    }

    fn trade_stock(&mut self, period: u64) -> Activity {
        let world = &mut self.world;
        let interest_rate = world.config.interest_rate;
        let dividend = world.dividend.next(&mut world.rng);
        world.history.push_dividend(dividend);
        let state = world.history.state();
        let ga_invocations = learn(world, period, &state);

        let Market::Specialist(specialist) = &world.market else {
            return Activity::default();
        };
        let outcome = specialist.clear(
            world.agents.as_mut_slice(),
            world.price,
            dividend,
            interest_rate,
        );

        let price = outcome.price;
        world.price = price;
        world.history.push_price(price);
        let actual = price + dividend;
        for agent in &mut world.agents {
            agent.fill(&outcome);
            agent.update_performance(actual, period, &world.config.rule);
            agent.record_forecasts(actual);
            agent.earnings_and_taxes(price, dividend, interest_rate);
        }

        Activity {
            volume: outcome.volume,
            clearing: Some(outcome),
            ga_invocations,
            ..Default::default()
        }
    }

    fn trade_claims(&mut self, period: u64) -> Activity {
        let world = &mut self.world;
        let interest_rate = world.config.interest_rate;
        let state = world.history.state();
        let ga_invocations = learn(world, period, &state);
        let opening = world.price;

        let Market::MarketMaker(mm) = &mut world.market else {
            return Activity::default();
        };
        for agent in &mut world.agents {
            let base = if agent.params().use_classifier {
                agent.belief().forecast(opening)
            } else {
                world.true_probability
            };
            let perceived = agent.perceive(base, &mut world.rng);
            if let Some(order) = agent.claim_order(mm, perceived, interest_rate) {
                agent.execute_order(mm, order);
            }
        }
        let probability = mm.probability();
        let (volume_positive, volume_negative) = mm.take_period_volume();

        world.price = probability;
        world.history.push_price(probability);
        for agent in &mut world.agents {
            agent.update_performance(probability, period, &world.config.rule);
            agent.record_forecasts(probability);
            agent.mark_to_market(probability);
        }

        Activity {
            volume: volume_positive + volume_negative,
            volume_positive,
            volume_negative,
            clearing: None,
            ga_invocations,
        }
    }

    fn settle(&mut self, period: u64) {
        let world = &mut self.world;
        match &mut world.market {
            Market::MarketMaker(mm) => {
                let outcome = if world.true_probability >= 0.5 {
                    ClaimSide::Positive
                } else {
                    ClaimSide::Negative
                };
                let payout = mm.settle(outcome);
                for agent in &mut world.agents {
                    agent.set_payout(outcome);
                }
                info!(
                    "Settled at period {}: {:?} pays {:.2}, market maker profit {:.4}",
                    period,
                    outcome,
                    payout,
                    mm.profit()
                );
            }
            Market::Specialist(_) => {
                for agent in &mut world.agents {
                    agent.mark_to_market(world.price);
                }
                info!(
                    "Terminal period {}: mean wealth {:.2}",
                    period,
                    statistics::mean_wealth(&world.agents)
                );
            }
        }
    }

    fn report(&self, period: u64, phase: PeriodPhase, activity: Activity) -> PeriodReport {
        let world = &self.world;
        let bits = statistics::bit_usage(&world.agents);
        let (revenue, liabilities, profit) = match world.market_maker() {
            Some(mm) => (mm.revenue(), mm.liabilities(), mm.profit()),
            None => (0.0, 0.0, 0.0),
        };
        let dividend = match world.market {
            Market::Specialist(_) => world.dividend(),
            Market::MarketMaker(_) => 0.0,
        };
        PeriodReport {
            period,
            phase,
            price: world.price,
            dividend,
            fundamental_price: world.fundamental_price(),
            volume: activity.volume,
            volume_positive: activity.volume_positive,
            volume_negative: activity.volume_negative,
            clearing: activity.clearing,
            revenue,
            liabilities,
            profit,
            bits,
            wealth: statistics::wealth_by_kind(&world.agents),
            active_rules: world.agents.iter().map(|a| a.active().len()).sum(),
            ga_invocations: activity.ga_invocations,
            average_fallbacks: world.ctx.average_fallbacks,
            stop_requested: world.config.stop_on_zero_bits && bits.total() == 0,
        }
    }
}

/// GA where due, then rule choice, agent by agent. Returns the GA runs.
fn learn(world: &mut World, period: u64, state: &MarketState) -> usize {
    let World {
        config,
        agents,
        rng,
        ctx,
        ..
    } = world;
    let mut runs = 0;
    for agent in agents.iter_mut() {
        if agent
            .invoke_ga(period, &config.rule, &config.ga, ctx, rng)
            .is_some()
        {
            runs += 1;
        }
        agent.choose_rule(state, period, ctx, rng);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Shock, SimulationConfig};

    #[test]
    fn test_phase_for_period() {
        assert_eq!(PeriodPhase::for_period(0, Some(5), 9), PeriodPhase::Init);
        assert_eq!(PeriodPhase::for_period(5, Some(5), 9), PeriodPhase::Shock);
        assert_eq!(PeriodPhase::for_period(9, Some(5), 9), PeriodPhase::Terminal);
        assert_eq!(PeriodPhase::for_period(3, Some(5), 9), PeriodPhase::Normal);
        assert_eq!(PeriodPhase::for_period(5, None, 9), PeriodPhase::Normal);
    }

    #[test]
    fn test_step_past_terminal_returns_none() {
        let config = SimulationConfig::lmsr().with_periods(4);
        let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
        let phases: Vec<PeriodPhase> = std::iter::from_fn(|| executor.step())
            .map(|r| r.phase)
            .collect();
        assert_eq!(
            phases,
            vec![
                PeriodPhase::Init,
                PeriodPhase::Normal,
                PeriodPhase::Normal,
                PeriodPhase::Terminal
            ]
        );
        assert!(executor.step().is_none());
        assert!(executor.world().is_finished());
    }

    #[test]
    fn test_shock_moves_true_probability() {
        let mut config = SimulationConfig::lmsr().with_periods(6);
        config.shock = Some(Shock {
            period: 2,
            probability: Some(0.2),
            dividend_mean: None,
        });
        let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
        executor.step();
        executor.step();
        assert_eq!(executor.world().true_probability(), 0.5);
        let report = executor.step().unwrap();
        assert_eq!(report.phase, PeriodPhase::Shock);
        assert_eq!(executor.world().true_probability(), 0.2);
        assert_eq!(report.fundamental_price, 0.2);
    }

    #[test]
    fn test_classic_warmup_fills_history() {
        let config = SimulationConfig {
            warmup_periods: 20,
            ..SimulationConfig::classic().with_periods(3)
        };
        let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
        let report = executor.step().unwrap();
        assert_eq!(report.phase, PeriodPhase::Init);
        assert_eq!(report.volume, 0.0);
        assert!(executor.world().history().moving_average(1).is_some());
        assert_eq!(report.price, executor.world().fundamental_price());
    }

    #[test]
    fn test_stop_flag_on_zero_bits() {
        let mut config = SimulationConfig::lmsr().with_periods(3);
        config.rule.bit_prob = 0.0;
        config.stop_on_zero_bits = true;
        let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
        let report = executor.step().unwrap();
        assert!(report.stop_requested);

        let summary = executor.run();
        assert_eq!(summary.periods, 2);
    }

    #[test]
    fn test_reset_restarts_run() {
        let config = SimulationConfig::lmsr().with_periods(5);
        let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
        let first = executor.run();
        executor.reset().unwrap();
        assert_eq!(executor.world().period(), 0);
        let second = executor.run();
        assert_eq!(first, second);
    }
}
