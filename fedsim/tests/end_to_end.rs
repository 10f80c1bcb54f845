use fedsim::{simulation, Execution, FedError, RunConfig, Weighting};

fn small_cfg() -> RunConfig {
    RunConfig {
        clients: 3,
        rounds: 2,
        local_epochs: 1,
        batch_size: 8,
        classes: 3,
        train_per_class: 30,
        test_per_class: 10,
        feature_dim: 4,
        hidden_layers: vec![6],
        seed: 7,
        ..RunConfig::default()
    }
}

#[test]
fn identical_configs_reproduce_identical_metrics() {
    let cfg = small_cfg();
    let first = simulation::run(&cfg).unwrap();
    let second = simulation::run(&cfg).unwrap();
    assert_eq!(first, second);
}

#[test]
fn parallel_execution_matches_sequential() {
    let sequential = simulation::run(&small_cfg()).unwrap();
    let parallel = simulation::run(&RunConfig {
        execution: Execution::Parallel,
        ..small_cfg()
    })
    .unwrap();

    assert_eq!(parallel, sequential);
}

#[test]
fn weighting_by_samples_completes_with_full_metrics() {
    let cfg = RunConfig { weighting: Weighting::BySamples, ..small_cfg() };
    let history = simulation::run(&cfg).unwrap();

    assert_eq!(history.len(), cfg.rounds);
    for (round, metrics) in history.iter().enumerate() {
        assert_eq!(metrics.round, round);
        assert_eq!(metrics.evals.len(), cfg.clients);
        for (id, eval) in metrics.evals.iter().enumerate() {
            assert_eq!(eval.client, id);
            assert!(eval.loss.is_finite() && eval.loss >= 0.0);
            assert!((0.0..=1.0).contains(&eval.accuracy));
            // 3 clients share 30 test samples
            assert_eq!(eval.samples, 10);
        }
    }
}

#[test]
fn the_global_schema_never_changes() {
    let mut coordinator = simulation::build(&small_cfg()).unwrap();
    let schema = coordinator.global().schema();

    coordinator.run(2).unwrap();
    assert_eq!(coordinator.global().schema(), schema);
    assert_eq!(coordinator.round(), 2);
}

#[test]
fn too_many_clients_fail_before_any_round() {
    let cfg = RunConfig { clients: 1000, ..small_cfg() };
    let err = simulation::run(&cfg).unwrap_err();
    assert!(matches!(err, FedError::InvalidPartition { clients: 1000, .. }));
}

#[test]
fn zero_rounds_is_rejected_by_validation() {
    let cfg = RunConfig { rounds: 0, ..small_cfg() };
    assert!(matches!(simulation::run(&cfg), Err(FedError::InvalidConfig(_))));
}
