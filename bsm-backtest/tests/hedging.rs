use bsm_backtest::hedging::{run_seed, simulate_gbm_path};
use bsm_backtest::pricing::price;
use bsm_backtest::{
    run_batch, HedgeConfig, HedgeEngine, MemorySink, NullSink, OptionType, SimEvent,
    TransactionCostModel,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_default_simulation() {
    let engine = HedgeEngine::new(HedgeConfig::default()).unwrap();
    let result = engine.run_seeded(&NullSink).unwrap();

    assert_eq!(result.price_path.len(), 253);
    assert_eq!(result.steps.len(), 253);
    assert_eq!(result.portfolio_values.len(), 253);
    let premium = price(150.0, 155.0, 0.5, 0.03, 0.25, OptionType::Call).unwrap();
    assert!((result.premium - premium).abs() < 1e-12);
    assert!(result.total_transaction_cost > 0.0);
    assert!(result.max_drawdown >= 0.0);
    assert!(result.total_return.unwrap().is_finite());
}

#[test]
fn test_supplied_path_matches_generated_run() {
    let engine = HedgeEngine::new(HedgeConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let path = simulate_gbm_path(150.0, 0.03, 0.25, 0.5, 252, &mut rng).unwrap();

    let replayed = engine.run_with_path(&path, &NullSink).unwrap();
    let generated = engine.run_seeded(&NullSink).unwrap();
    assert_eq!(replayed.portfolio_values, generated.portfolio_values);
}

#[test]
fn test_zero_cost_hedge_has_no_costs() {
    let engine = HedgeEngine::new(HedgeConfig {
        transaction_cost: TransactionCostModel::zero(),
        kind: OptionType::Put,
        ..Default::default()
    })
    .unwrap();
    let result = engine.run_seeded(&NullSink).unwrap();
    assert!(result.steps.iter().all(|s| s.transaction_cost == 0.0));
}

#[test]
fn test_step_fold_matches_run() {
    let engine = HedgeEngine::new(HedgeConfig {
        steps: 10,
        ..Default::default()
    })
    .unwrap();
    let path = [150.0, 151.0, 149.5, 152.0, 153.5, 150.0, 148.0, 151.0, 156.0, 158.0, 160.0];

    let (mut state, first) = engine.initial_state(path[0]).unwrap();
    let mut records = vec![first];
    for (i, &spot) in path.iter().enumerate().skip(1) {
        let (next, record) = engine.step(state, i, spot).unwrap();
        state = next;
        records.push(record);
    }

    let result = engine.run_with_path(&path, &NullSink).unwrap();
    assert_eq!(result.steps, records);
    // Short call finishes 5 in the money
    assert!((result.option_payoff - 5.0).abs() < 1e-12);
}

#[test]
fn test_batch_runs_independent_seeds() {
    let engine = HedgeEngine::new(HedgeConfig {
        steps: 20,
        ..Default::default()
    })
    .unwrap();
    let sink = MemorySink::new();
    let summary = run_batch(&engine, 10, 42, &sink).unwrap();

    assert_eq!(summary.runs.len(), 10);
    let seeds: Vec<u64> = summary.runs.iter().map(|r| r.seed).collect();
    assert_eq!(seeds, (0..10).map(|i| run_seed(42, i)).collect::<Vec<_>>());
    assert!(summary.std_total_return > 0.0);
    assert_eq!(
        sink.count(|e| matches!(e, SimEvent::HedgeCompleted { .. })),
        10
    );
}
