//! Wires a full simulation together from a [`RunConfig`]: synthetic data,
//! partition, clients, coordinator.

use std::sync::Arc;

use log::info;
use ml_core::{gaussian_blobs, Mlp};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    client::SimClient,
    config::RunConfig,
    coordinator::Coordinator,
    error::FedError,
    metrics::RoundMetrics,
    params::ParameterSet,
    partition::partition,
};

/// Builds a ready-to-run coordinator: generates the shared dataset, draws
/// the partition, constructs one client per shard and initializes the
/// global parameters.
///
/// Everything is derived from `cfg.seed` through a single RNG stream, so a
/// fixed config reproduces the exact same simulation.
///
/// # Errors
/// - `FedError::InvalidConfig` for unusable hyperparameters.
/// - `FedError::InvalidPartition` if the client count does not fit the
///   generated dataset.
pub fn build(cfg: &RunConfig) -> Result<Coordinator<SimClient>, FedError> {
    cfg.validate()?;
    let trainer = cfg.sgd()?;

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let (train_data, test_data) = gaussian_blobs(
        cfg.classes,
        cfg.train_per_class,
        cfg.test_per_class,
        cfg.feature_dim,
        cfg.spread,
        &mut rng,
    );
    let train_data = Arc::new(train_data);
    let test_data = Arc::new(test_data);

    let sizes = cfg.layer_sizes();
    let initial = ParameterSet::new(Mlp::init(&sizes, &mut rng).tensors());

    let splits = partition(train_data.len(), test_data.len(), cfg.clients, &mut rng)?;

    let clients = splits
        .into_iter()
        .enumerate()
        .map(|(id, split)| {
            // local weights are arbitrary: the first broadcast overwrites them
            let model = Mlp::init(&sizes, &mut rng);
            let seed: u64 = rng.random();
            SimClient::new(
                id,
                model,
                Arc::clone(&train_data),
                Arc::clone(&test_data),
                split,
                trainer,
                seed,
            )
        })
        .collect();

    Ok(Coordinator::new(clients, initial, cfg.weighting, cfg.execution))
}

/// Builds and runs the whole simulation, returning the per-round metrics.
///
/// # Errors
/// Everything [`build`] can return, plus any round failure from the
/// coordinator.
pub fn run(cfg: &RunConfig) -> Result<Vec<RoundMetrics>, FedError> {
    let mut coordinator = build(cfg)?;
    info!(
        "simulation: {} clients, {} rounds, {:?} weighting, {:?} execution",
        cfg.clients, cfg.rounds, cfg.weighting, cfg.execution
    );
    coordinator.run(cfg.rounds)
}
