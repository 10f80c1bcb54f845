use std::{collections::BTreeMap, sync::Arc};

use log::debug;
use ml_core::{evaluate, train, InMemoryDataset, Mlp, SgdConfig};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    error::FedError,
    params::{ParameterSet, ShapeSchema},
    partition::ClientSplit,
};

/// Result of one local training pass.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// The client's weights after training.
    pub params: ParameterSet,
    /// Training samples consumed, for aggregation weighting.
    pub samples: usize,
    /// Auxiliary values; empty for the simulation client.
    pub metrics: BTreeMap<String, f32>,
}

/// Result of one local evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    /// Average per-sample loss over the test shard.
    pub loss: f32,
    /// Test samples consumed.
    pub samples: usize,
    /// Auxiliary values; carries `"accuracy"`.
    pub metrics: BTreeMap<String, f32>,
}

impl EvalOutcome {
    /// The `"accuracy"` metric, NaN when absent.
    pub fn accuracy(&self) -> f32 {
        self.metrics.get("accuracy").copied().unwrap_or(f32::NAN)
    }
}

/// A federated participant as seen by the coordinator.
///
/// Implementations must be stateless with respect to the protocol: `fit`
/// and `evaluate` load the supplied parameters before doing anything else,
/// so the outcome of a call depends only on its arguments (plus the
/// client's private data and RNG stream), never on weights left over from
/// an earlier round.
pub trait FederatedClient: Send {
    fn id(&self) -> usize;

    /// Current local weights as a framework-independent value. No side
    /// effects.
    fn get_parameters(&self) -> ParameterSet;

    /// Strictly loads `params` into the local model.
    ///
    /// # Errors
    /// `FedError::ShapeMismatch` if the ordered shapes deviate from the
    /// model's; nothing is loaded partially.
    fn set_parameters(&mut self, params: &ParameterSet) -> Result<(), FedError>;

    /// Loads `params`, runs one configured training pass over the private
    /// train shard, and returns the updated weights together with the
    /// sample count used.
    fn fit(&mut self, params: &ParameterSet) -> Result<FitOutcome, FedError>;

    /// Loads `params` and measures loss and accuracy over the private test
    /// shard without updating weights.
    fn evaluate(&mut self, params: &ParameterSet) -> Result<EvalOutcome, FedError>;
}

/// Simulation client: an `ml_core` model plus its private data shards.
pub struct SimClient {
    id: usize,
    model: Mlp,
    schema: ShapeSchema,
    train_data: Arc<InMemoryDataset>,
    test_data: Arc<InMemoryDataset>,
    split: ClientSplit,
    trainer: SgdConfig,
    rng: StdRng,
}

impl SimClient {
    /// Creates a client around an already initialized model.
    ///
    /// The model's own weights are irrelevant: every `fit`/`evaluate` call
    /// starts by loading the coordinator's parameters. `seed` fixes the
    /// client's private shuffling stream.
    pub fn new(
        id: usize,
        model: Mlp,
        train_data: Arc<InMemoryDataset>,
        test_data: Arc<InMemoryDataset>,
        split: ClientSplit,
        trainer: SgdConfig,
        seed: u64,
    ) -> Self {
        let schema = ParameterSet::new(model.tensors()).schema();
        Self {
            id,
            model,
            schema,
            train_data,
            test_data,
            split,
            trainer,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn train_samples(&self) -> usize {
        self.split.train.len()
    }

    #[inline]
    pub fn test_samples(&self) -> usize {
        self.split.test.len()
    }
}

impl FederatedClient for SimClient {
    fn id(&self) -> usize {
        self.id
    }

    fn get_parameters(&self) -> ParameterSet {
        ParameterSet::new(self.model.tensors())
    }

    fn set_parameters(&mut self, params: &ParameterSet) -> Result<(), FedError> {
        self.schema.check(params)?;
        self.model.load_tensors(params.tensors())?;
        Ok(())
    }

    fn fit(&mut self, params: &ParameterSet) -> Result<FitOutcome, FedError> {
        self.set_parameters(params)?;
        train(
            &mut self.model,
            self.train_data.subset(&self.split.train),
            &self.trainer,
            &mut self.rng,
        )?;
        debug!(client = self.id; "local fit finished");

        Ok(FitOutcome {
            params: ParameterSet::new(self.model.tensors()),
            samples: self.split.train.len(),
            metrics: BTreeMap::new(),
        })
    }

    fn evaluate(&mut self, params: &ParameterSet) -> Result<EvalOutcome, FedError> {
        self.set_parameters(params)?;
        let eval = evaluate(&self.model, self.test_data.subset(&self.split.test))?;

        let mut metrics = BTreeMap::new();
        metrics.insert("accuracy".to_string(), eval.accuracy);

        Ok(EvalOutcome {
            loss: eval.loss,
            samples: self.split.test.len(),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn tiny_client() -> SimClient {
        let mut rng = StdRng::seed_from_u64(2);
        let (train, test) = ml_core::gaussian_blobs(2, 6, 3, 2, 0.2, &mut rng);

        let split = ClientSplit {
            train: (0..train.len()).collect(),
            test: (0..test.len()).collect(),
        };
        let model = Mlp::init(&[2, 2], &mut rng);

        SimClient::new(0, model, Arc::new(train), Arc::new(test), split, SgdConfig::default(), 9)
    }

    #[test]
    fn set_parameters_rejects_foreign_shapes() {
        let mut client = tiny_client();
        let bad = ParameterSet::new(vec![
            ArrayD::zeros(IxDyn(&[3, 2])),
            ArrayD::zeros(IxDyn(&[2])),
        ]);

        let err = client.set_parameters(&bad).unwrap_err();
        assert!(matches!(err, FedError::ShapeMismatch { slot: 0, .. }));
    }

    #[test]
    fn fit_reports_the_shard_sample_count() {
        let mut client = tiny_client();
        let global = client.get_parameters();

        let outcome = client.fit(&global).unwrap();
        assert_eq!(outcome.samples, client.train_samples());
        assert!(outcome.metrics.is_empty());
        assert!(client.schema.check(&outcome.params).is_ok());
    }

    #[test]
    fn evaluate_carries_an_accuracy_metric() {
        let mut client = tiny_client();
        let global = client.get_parameters();

        let outcome = client.evaluate(&global).unwrap();
        assert_eq!(outcome.samples, client.test_samples());
        let accuracy = outcome.accuracy();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn evaluate_depends_only_on_the_supplied_parameters() {
        let mut client = tiny_client();
        let global = client.get_parameters();

        let first = client.evaluate(&global).unwrap();

        // an interleaved fit must not leak into the next evaluation
        client.fit(&global).unwrap();
        let second = client.evaluate(&global).unwrap();

        assert_eq!(first, second);
    }
}
