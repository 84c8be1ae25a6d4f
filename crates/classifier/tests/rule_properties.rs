//! Rule Properties Integration Test
//!
//! Checks classifier rules against the market state through the public API:
//! 1. Specificity equals an independent count of set trits
//! 2. Matching agrees with a trit-by-trit comparison of decoded conditions
//! 3. Consistency repair is idempotent whichever direction it scans
//! 4. The GA rewrites exactly the lowest-ranked slots

use agora_classifier::{
    GaParams, ReferenceCoefficients, RuleParams, RuleSet, SfiDialect, TradingRule, repair_ladder,
};
use agora_core::{
    FUNDAMENTAL_BITS, Indicators, LADDERS, MarketState, SimRng, SimulationContext,
    TECHNICAL_BITS, Trit, Word, bits_in, seeded,
};
use rand::Rng;
use std::collections::HashMap;

fn reference() -> ReferenceCoefficients {
    ReferenceCoefficients {
        a: 0.95,
        b: 4.5,
        variance: 4.0,
    }
}

fn random_indicators(rng: &mut SimRng) -> Indicators {
    Indicators {
        dividend_ratio: rng.gen_range(0.4..1.6),
        value_ratio: rng.gen_range(0.1..5.0),
        dividend_up: [rng.r#gen(), rng.r#gen()],
        price_up: [rng.r#gen(), rng.r#gen(), rng.r#gen()],
        price_above_ma: [rng.r#gen(), rng.r#gen(), rng.r#gen(), rng.r#gen()],
        ma_rising: [rng.r#gen(), rng.r#gen(), rng.r#gen()],
        trend_ratio: rng.gen_range(0.8..1.2),
    }
}

/// Reference matcher over decoded values, independent of the AND trick
fn matches_by_hand(rule: &TradingRule, state: &MarketState) -> bool {
    for word in Word::ALL {
        if word == Word::Technical && !rule.is_technical() {
            continue;
        }
        for index in 0..bits_in(word) {
            let asserted = match rule.condition().get(word, index) {
                Trit::DontCare => continue,
                Trit::True => true,
                Trit::False => false,
            };
            if state.condition(word, index) != Some(asserted) {
                return false;
            }
        }
    }
    true
}

#[test]
fn test_specificity_matches_independent_count() {
    let mut rng = seeded(101);
    let params = RuleParams {
        bit_prob: 0.4,
        ..Default::default()
    };

    for id in 0..500 {
        let rule = TradingRule::random(id, id % 2 == 0, &reference(), &params, 0, &mut rng);
        let counted = Word::ALL
            .iter()
            .flat_map(|&w| (0..bits_in(w)).map(move |i| (w, i)))
            .filter(|&(w, i)| rule.condition().get(w, i).is_set())
            .count() as u32;

        assert_eq!(rule.specificity(), counted);
        assert!(rule.specificity() as usize <= FUNDAMENTAL_BITS + TECHNICAL_BITS);
    }
}

#[test]
fn test_match_agrees_with_decoded_comparison() {
    let mut rng = seeded(202);
    // Sparse enough that both outcomes occur often
    let params = RuleParams {
        bit_prob: 0.08,
        check_consistency: false,
        ..Default::default()
    };
    let mut hits = 0;

    for id in 0..2000 {
        let rule = TradingRule::random(id, id % 3 != 0, &reference(), &params, 0, &mut rng);
        let state = MarketState::encode(&random_indicators(&mut rng));
        let expected = matches_by_hand(&rule, &state);

        assert_eq!(rule.condition_holds(&state), expected, "rule {id}");
        hits += expected as usize;
    }
    assert!(hits > 0 && hits < 2000);
}

#[test]
fn test_consistency_repair_idempotent() {
    let params = RuleParams {
        bit_prob: 0.6,
        check_consistency: false,
        ..Default::default()
    };

    for seed in 0..50 {
        let mut rng = seeded(seed);
        let mut rule = TradingRule::random(seed, true, &reference(), &params, 0, &mut rng);

        let first = rule.check_consistency(&params, &mut rng);
        let words = *rule.condition();
        // A different RNG state may pick the other direction; nothing may move
        let second = rule.check_consistency(&params, &mut rng);

        assert_eq!(first, second, "seed {seed}");
        assert_eq!(*rule.condition(), words, "seed {seed}");
    }
}

#[test]
fn test_repaired_ladder_stable_in_both_directions() {
    let mut rng = seeded(7);
    for _ in 0..200 {
        let mut cond = agora_core::BitCondition::new();
        for ladder in LADDERS.iter() {
            for index in ladder.indices() {
                let t = match rng.gen_range(0..3) {
                    0 => Trit::DontCare,
                    1 => Trit::False,
                    _ => Trit::True,
                };
                cond.set(ladder.word, index, t);
            }
        }
        for ladder in LADDERS.iter() {
            repair_ladder(&mut cond, ladder, rng.gen_bool(0.5));
            let repaired = cond;
            assert!(!repair_ladder(&mut cond, ladder, true));
            assert!(!repair_ladder(&mut cond, ladder, false));
            assert_eq!(cond, repaired);
        }
    }
}

#[test]
fn test_ga_rewrites_exactly_lowest_ranked_slots() {
    let mut rng = seeded(303);
    let mut ctx = SimulationContext::new();
    let rule_params = RuleParams::default();
    let ga_params = GaParams::default();
    let mut set = RuleSet::random(
        ga_params.num_rules,
        false,
        &reference(),
        &rule_params,
        &mut ctx,
        0,
        &mut rng,
    );

    // Give the population some history so fitness differs
    let state = MarketState::encode(&Indicators::default());
    for (i, rule) in set.rules_mut().iter_mut().enumerate() {
        rule.matches(&state, 1);
        rule.assign_fitness(450.0 + (i % 17) as f64, &rule_params);
    }

    let period = 40;
    let mut ranked: Vec<TradingRule> = set.rules().to_vec();
    ranked.sort_by(|a, b| {
        TradingRule::replacement_order(a, b, period, rule_params.max_non_active)
    });
    let doomed: Vec<u64> = ranked[..ga_params.new_rules]
        .iter()
        .map(|r| r.id())
        .collect();
    let before: HashMap<u64, TradingRule> =
        set.rules().iter().map(|r| (r.id(), r.clone())).collect();

    set.invoke_ga(
        period,
        &rule_params,
        &ga_params,
        &SfiDialect,
        &mut ctx,
        &mut rng,
    );

    let born_now = set.rules().iter().filter(|r| r.birth() == period).count();
    assert_eq!(born_now, ga_params.new_rules);
    assert!(
        set.rules()[..ga_params.new_rules]
            .iter()
            .all(|r| r.birth() == period)
    );

    for rule in &set.rules()[ga_params.new_rules..] {
        assert!(!doomed.contains(&rule.id()));
        assert_eq!(before.get(&rule.id()), Some(rule), "survivor changed");
    }
    assert_eq!(set.len(), ga_params.num_rules);
}
