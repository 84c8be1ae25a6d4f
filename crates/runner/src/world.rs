//! World
//!
//! Owns everything a run mutates: the population, the pricing mechanism,
//! the dividend process, the market history, the random source and the
//! simulation context. Built from a validated [`SimulationConfig`].

use crate::config::SimulationConfig;
use crate::dividend::{DividendKind, DividendProcess};
use crate::history::MarketHistory;
use agora_agents::{Agent, create_strategy};
use agora_classifier::{RationalExpectations, ReferenceCoefficients, RuleSet};
use agora_core::{ConfigResult, MarketMode, SimRng, SimulationContext, seeded};
use agora_specialist::{LmsrMarketMaker, Specialist};
use log::info;

/// Pricing mechanism, fixed by the market mode
#[derive(Debug)]
pub enum Market {
    Specialist(Specialist),
    MarketMaker(LmsrMarketMaker),
}

#[derive(Debug)]
pub struct World {
    pub(crate) config: SimulationConfig,
    pub(crate) agents: Vec<Agent>,
    pub(crate) market: Market,
    pub(crate) dividend: DividendProcess,
    pub(crate) history: MarketHistory,
    pub(crate) ree: Option<RationalExpectations>,
    pub(crate) rng: SimRng,
    pub(crate) ctx: SimulationContext,
    /// Next period to execute
    pub(crate) period: u64,
    pub(crate) price: f64,
    pub(crate) true_probability: f64,
}

impl World {
    /// Validate the configuration and build the population
    pub fn setup(config: SimulationConfig) -> ConfigResult<Self> {
        config.validate()?;

        let mut rng = seeded(config.seed);
        let mut ctx = SimulationContext::new();

        let (ree, reference) = match config.mode {
            MarketMode::Classic => {
                let ree = rational_expectations(&config, config.dividend.mean);
                (Some(ree), ree.coefficients())
            }
            MarketMode::Lmsr => (
                None,
                ReferenceCoefficients::neutral(config.lmsr_initial_variance),
            ),
        };

        let mut agents = Vec::with_capacity(config.total_agents());
        for group in &config.population {
            for _ in 0..group.count {
                ctx.register_trader(group.kind);
                let rules = RuleSet::random(
                    config.ga.num_rules,
                    group.technical,
                    &reference,
                    &config.rule,
                    &mut ctx,
                    0,
                    &mut rng,
                );
                agents.push(Agent::new(
                    agents.len(),
                    create_strategy(group.kind, group.dialect),
                    group.params.clone(),
                    rules,
                ));
            }
        }

        let market = match config.mode {
            MarketMode::Classic => Market::Specialist(Specialist::new(
                config.specialist.clone(),
                config.dividend.process == DividendKind::RandomWalk,
            )),
            MarketMode::Lmsr => Market::MarketMaker(LmsrMarketMaker::new(config.lmsr.clone())),
        };

        let mean_dividend = match config.mode {
            MarketMode::Classic => config.dividend.mean,
            MarketMode::Lmsr => 0.0,
        };
        let history = MarketHistory::new(config.mode, config.interest_rate, mean_dividend);
        let price = match &ree {
            Some(ree) => ree.price(config.dividend.mean),
            None => config.lmsr.initial_probability,
        };

        info!(
            "World set up: {:?} market, {} agents, {} periods, seed {}",
            config.mode,
            agents.len(),
            config.num_periods,
            config.seed
        );

        Ok(Self {
            dividend: DividendProcess::new(config.dividend.clone()),
            true_probability: config.true_probability,
            config,
            agents,
            market,
            history,
            ree,
            rng,
            ctx,
            period: 0,
            price,
        })
    }

    /// Rebuild population, market, random source and context from the
    /// stored configuration
    pub fn reset(&mut self) -> ConfigResult<()> {
        *self = World::setup(self.config.clone())?;
        info!("World reset");
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: usize) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// The market maker, in LMSR mode
    pub fn market_maker(&self) -> Option<&LmsrMarketMaker> {
        match &self.market {
            Market::MarketMaker(mm) => Some(mm),
            Market::Specialist(_) => None,
        }
    }

    pub fn history(&self) -> &MarketHistory {
        &self.history
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Next period to execute
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Last stock price, or the positive-claim price in LMSR mode
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn dividend(&self) -> f64 {
        self.dividend.current()
    }

    pub fn true_probability(&self) -> f64 {
        self.true_probability
    }

    /// Rational-expectations price for the current dividend, or the true
    /// probability in LMSR mode
    pub fn fundamental_price(&self) -> f64 {
        match &self.ree {
            Some(ree) => ree.price(self.dividend.current()),
            None => self.true_probability,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.period >= self.config.num_periods
    }
}

/// Benchmark for a dividend mean, priced with the first group's risk
/// aversion
pub(crate) fn rational_expectations(config: &SimulationConfig, mean: f64) -> RationalExpectations {
    let lambda = config
        .population
        .first()
        .map(|g| g.params.risk_aversion)
        .unwrap_or_default();
    RationalExpectations::new(
        config.interest_rate,
        config.dividend.rho,
        mean,
        config.dividend.noise_variance,
        lambda,
    )
}
