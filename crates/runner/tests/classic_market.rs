//! Stock market runs through the specialist

use agora_agents::AgentParams;
use agora_classifier::{DialectKind, GaParams};
use agora_core::{AgentKind, ConfigError};
use agora_runner::{
    AgentGroup, DividendKind, PeriodExecutor, PeriodPhase, RunnerError, SimulationConfig, World,
};

fn short_run(seed: u64, periods: u64) -> SimulationConfig {
    SimulationConfig {
        population: vec![AgentGroup {
            count: 10,
            ..Default::default()
        }],
        ga: GaParams {
            num_rules: 40,
            new_rules: 8,
            ..Default::default()
        },
        ..SimulationConfig::classic()
            .with_seed(seed)
            .with_periods(periods)
    }
}

fn prices(config: SimulationConfig) -> Vec<f64> {
    let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
    std::iter::from_fn(|| executor.step())
        .map(|r| r.price)
        .collect()
}

#[test]
fn test_same_seed_same_run() {
    let _ = env_logger::try_init();

    let mut a = PeriodExecutor::new(World::setup(short_run(5, 40)).unwrap());
    let mut b = PeriodExecutor::new(World::setup(short_run(5, 40)).unwrap());
    loop {
        match (a.step(), b.step()) {
            (Some(x), Some(y)) => assert_eq!(x, y),
            (None, None) => break,
            _ => panic!("runs of different length"),
        }
    }
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn test_different_seed_different_run() {
    let _ = env_logger::try_init();
    assert_ne!(prices(short_run(1, 30)), prices(short_run(2, 30)));
}

#[test]
fn test_prices_and_cash_stay_bounded() {
    let _ = env_logger::try_init();

    let config = short_run(3, 120);
    let min_cash = config.population[0].params.min_cash;
    let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
    while let Some(report) = executor.step() {
        assert!((0.01..=500.0).contains(&report.price));
        assert!(report.dividend > 0.0);
        if report.phase != PeriodPhase::Init {
            let clearing = report.clearing.unwrap();
            assert!(clearing.iterations >= 1 && clearing.iterations <= 10);
            assert!(report.volume >= 0.0);
        }
        for agent in executor.world().agents() {
            assert!(agent.cash() >= min_cash - 1e-9);
            assert!(agent.shares() >= agent.params().min_holding - 1e-9);
        }
    }

    let summary = executor.summary();
    assert_eq!(summary.periods, 120);
    assert!(summary.average_price > 0.0);
    assert!(summary.price_volatility >= 0.0);
    assert!((-1.0..=1.0).contains(&summary.price_fundamental_correlation));
    assert_eq!(summary.outcome, None);
    assert_eq!(summary.wealth[&AgentKind::Sfi].count, 10);
}

#[test]
fn test_shares_are_conserved() {
    let _ = env_logger::try_init();

    let mut executor = PeriodExecutor::new(World::setup(short_run(8, 60)).unwrap());
    while executor.step().is_some() {
        let total: f64 = executor.world().agents().iter().map(|a| a.shares()).sum();
        approx::assert_relative_eq!(total, 10.0, epsilon = 1e-6);
    }
}

#[test]
fn test_fast_learners_run_ga_on_schedule() {
    let _ = env_logger::try_init();

    let mut config = short_run(4, 60);
    config.population = vec![AgentGroup {
        kind: AgentKind::Fast,
        count: 3,
        dialect: DialectKind::Nesfi,
        technical: false,
        params: AgentParams::default(),
    }];
    let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
    let runs: Vec<(u64, usize)> = std::iter::from_fn(|| executor.step())
        .filter(|r| r.ga_invocations > 0)
        .map(|r| (r.period, r.ga_invocations))
        .collect();

    assert_eq!(runs, vec![(25, 3), (50, 3)]);
    assert_eq!(executor.summary().ga_invocations, 6);
    // Non-technical rules never set technical bits
    assert_eq!(executor.world().agents()[0].rules().bits_used(agora_core::Word::Technical), 0);
}

#[test]
fn test_agents_without_classifier_still_learn() {
    let _ = env_logger::try_init();

    let mut config = short_run(12, 120);
    config.ga.ga_prob = 1.0;
    config.population = vec![AgentGroup {
        count: 3,
        params: AgentParams {
            use_classifier: false,
            ..Default::default()
        },
        ..Default::default()
    }];
    let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
    let initial: Vec<f64> = executor.world().agents()[0]
        .rules()
        .rules()
        .iter()
        .map(|r| r.variance())
        .collect();

    let summary = executor.run();
    assert!(summary.ga_invocations > 0);
    for agent in executor.world().agents() {
        assert!(agent.ga_invocations() > 0);
        assert_eq!(agent.active().len(), agent.rules().len());
    }
    let variances: Vec<f64> = executor.world().agents()[0]
        .rules()
        .rules()
        .iter()
        .map(|r| r.variance())
        .collect();
    assert_ne!(variances, initial);
}

#[test]
fn test_mixed_population_reports_each_kind() {
    let _ = env_logger::try_init();

    let mut config = short_run(6, 20);
    config.population = vec![
        AgentGroup {
            kind: AgentKind::Sfi,
            count: 4,
            ..Default::default()
        },
        AgentGroup {
            kind: AgentKind::Nesfi,
            count: 3,
            ..Default::default()
        },
        AgentGroup {
            kind: AgentKind::Fast,
            count: 2,
            ..Default::default()
        },
    ];
    let summary = PeriodExecutor::new(World::setup(config).unwrap()).run();
    assert_eq!(summary.wealth.len(), 3);
    assert_eq!(summary.wealth[&AgentKind::Nesfi].count, 3);
    assert_eq!(summary.wealth[&AgentKind::Fast].count, 2);
}

#[test]
fn test_dividend_shock_moves_fundamental_price() {
    let _ = env_logger::try_init();

    let mut config = short_run(2, 30);
    config.dividend.noise_variance = 0.0;
    config.shock = Some(agora_runner::Shock {
        period: 10,
        probability: None,
        dividend_mean: Some(12.0),
    });
    let mut executor = PeriodExecutor::new(World::setup(config).unwrap());
    let reports: Vec<_> = std::iter::from_fn(|| executor.step()).collect();

    assert_eq!(reports[10].phase, PeriodPhase::Shock);
    assert!(reports[9].dividend < 10.0 + 1e-9);
    assert!(reports[20].dividend > reports[10].dividend);
    assert!(reports[20].fundamental_price > reports[9].fundamental_price);
}

#[test]
fn test_random_walk_dividends_run() {
    let _ = env_logger::try_init();

    let mut config = short_run(9, 30);
    config.dividend.process = DividendKind::RandomWalk;
    let summary = PeriodExecutor::new(World::setup(config).unwrap()).run();
    assert_eq!(summary.periods, 30);
    assert!(summary.average_price > 0.0);
}

#[test]
fn test_json_config_loading() {
    let _ = env_logger::try_init();

    let dir = std::env::temp_dir();
    let good = dir.join("agora_runner_good_config.json");
    std::fs::write(
        &good,
        r#"{ "seed": 3, "num_periods": 12, "population": [{ "kind": "nesfi", "count": 2 }] }"#,
    )
    .unwrap();
    let config = SimulationConfig::from_json_file(&good).unwrap();
    assert_eq!(config.seed, 3);
    assert_eq!(config.population[0].kind, AgentKind::Nesfi);
    assert_eq!(config.population[0].params.initial_cash, 20_000.0);

    let mismatched = dir.join("agora_runner_mismatched_config.json");
    std::fs::write(&mismatched, r#"{ "mode": "lmsr" }"#).unwrap();
    assert!(matches!(
        SimulationConfig::from_json_file(&mismatched),
        Err(RunnerError::Config(ConfigError::ModeMismatch { .. }))
    ));

    let broken = dir.join("agora_runner_broken_config.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(
        SimulationConfig::from_json_file(&broken),
        Err(RunnerError::Json(_))
    ));

    assert!(matches!(
        SimulationConfig::from_json_file(dir.join("agora_runner_missing.json")),
        Err(RunnerError::Io(_))
    ));
}
