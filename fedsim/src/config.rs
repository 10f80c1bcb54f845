use std::{fs, num::NonZeroUsize, path::Path};

use ml_core::SgdConfig;
use serde::Deserialize;

use crate::error::FedError;

/// Aggregation weighting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Plain arithmetic mean of client updates. Matches the sample-weighted
    /// mean only when all shards are equally sized.
    Uniform,
    /// Mean weighted by each client's training sample count.
    BySamples,
}

/// Client execution mode within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// Clients run one at a time in registration order.
    Sequential,
    /// Clients run on a worker pool. The round boundary is still a barrier:
    /// all results are collected, in registration order, before aggregation.
    Parallel,
}

/// Run parameters for one simulation.
///
/// Everything is fixed at startup; there is no reconfiguration mid-run.
/// Defaults: 10 clients, 3 rounds, one local epoch per round, SGD with
/// lr 0.001 and momentum 0.9, unweighted averaging.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub clients: usize,
    pub rounds: usize,
    pub local_epochs: usize,
    pub batch_size: usize,
    pub lr: f32,
    pub momentum: f32,
    pub weighting: Weighting,
    pub execution: Execution,
    pub seed: u64,

    /// Synthetic dataset shape.
    pub classes: usize,
    pub train_per_class: usize,
    pub test_per_class: usize,
    pub feature_dim: usize,
    pub spread: f32,

    /// Hidden layer widths of the shared model.
    pub hidden_layers: Vec<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clients: 10,
            rounds: 3,
            local_epochs: 1,
            batch_size: 32,
            lr: 1e-3,
            momentum: 0.9,
            weighting: Weighting::Uniform,
            execution: Execution::Sequential,
            seed: 42,
            classes: 4,
            train_per_class: 250,
            test_per_class: 50,
            feature_dim: 8,
            spread: 0.35,
            hidden_layers: vec![16],
        }
    }
}

impl RunConfig {
    /// Loads a config from a JSON file; missing fields keep their defaults.
    ///
    /// # Errors
    /// `FedError::InvalidConfig` if the file cannot be read or parsed, or if
    /// the resulting values fail [`RunConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, FedError> {
        let content = fs::read_to_string(path)
            .map_err(|e| FedError::InvalidConfig(format!("cannot read '{}': {e}", path.display())))?;
        let cfg: Self = serde_json::from_str(&content)
            .map_err(|e| FedError::InvalidConfig(format!("invalid JSON in '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the cross-field invariants the types cannot express.
    ///
    /// Client count against dataset size is left to the partitioner, which
    /// reports it as `FedError::InvalidPartition`.
    pub fn validate(&self) -> Result<(), FedError> {
        let bail = |msg: &str| Err(FedError::InvalidConfig(msg.to_string()));

        if self.rounds == 0 {
            return bail("rounds must be positive");
        }
        if self.local_epochs == 0 {
            return bail("local_epochs must be positive");
        }
        if self.batch_size == 0 {
            return bail("batch_size must be positive");
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return bail("lr must be positive and finite");
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return bail("momentum must be in [0, 1)");
        }
        if self.classes < 2 {
            return bail("need at least two classes");
        }
        if self.train_per_class == 0 || self.test_per_class == 0 {
            return bail("need train and test samples per class");
        }
        if self.feature_dim == 0 {
            return bail("feature_dim must be positive");
        }
        if !(self.spread > 0.0 && self.spread.is_finite()) {
            return bail("spread must be positive and finite");
        }
        if self.hidden_layers.iter().any(|&h| h == 0) {
            return bail("hidden layer widths must be positive");
        }
        Ok(())
    }

    /// Local trainer settings derived from this config.
    ///
    /// # Errors
    /// `FedError::InvalidConfig` for zero epoch or batch counts.
    pub fn sgd(&self) -> Result<SgdConfig, FedError> {
        let epochs = NonZeroUsize::new(self.local_epochs)
            .ok_or_else(|| FedError::InvalidConfig("local_epochs must be positive".to_string()))?;
        let batch_size = NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| FedError::InvalidConfig("batch_size must be positive".to_string()))?;

        Ok(SgdConfig { lr: self.lr, momentum: self.momentum, epochs, batch_size })
    }

    /// Layer sizes of the shared model: features, hidden widths, classes.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(self.feature_dim);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(self.classes);
        sizes
    }
}
