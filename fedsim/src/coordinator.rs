use log::info;
use rayon::prelude::*;

use crate::{
    aggregate::fedavg,
    client::{FederatedClient, FitOutcome},
    config::{Execution, Weighting},
    error::FedError,
    metrics::{ClientEval, RoundMetrics},
    params::ParameterSet,
};

/// Drives the round lifecycle over a set of registered clients.
///
/// Each round evaluates every client with the current global parameters,
/// then trains every client from those same parameters, then aggregates the
/// returned updates into the next global set. The ordering is a contract:
/// metrics reported for round `t` describe the model aggregated at the end
/// of round `t - 1`.
pub struct Coordinator<C> {
    clients: Vec<C>,
    global: ParameterSet,
    weighting: Weighting,
    execution: Execution,
    round: usize,
}

impl<C: FederatedClient> Coordinator<C> {
    /// Creates a coordinator owning `initial` as the global parameters.
    ///
    /// Clients keep their registration order; under parallel execution the
    /// per-round results are still collected in that order, so both modes
    /// hand identical input sequences to the aggregator.
    pub fn new(
        clients: Vec<C>,
        initial: ParameterSet,
        weighting: Weighting,
        execution: Execution,
    ) -> Self {
        Self { clients, global: initial, weighting, execution, round: 0 }
    }

    #[inline]
    pub fn global(&self) -> &ParameterSet {
        &self.global
    }

    #[inline]
    pub fn round(&self) -> usize {
        self.round
    }

    #[inline]
    pub fn clients(&self) -> &[C] {
        &self.clients
    }

    /// Runs `rounds` full evaluate, fit, aggregate cycles and returns the
    /// per-round metrics.
    ///
    /// # Errors
    /// The first client failure aborts the run wrapped as
    /// `FedError::Client`; aggregation failures surface unchanged. The
    /// global parameters keep their last fully aggregated value on error.
    pub fn run(&mut self, rounds: usize) -> Result<Vec<RoundMetrics>, FedError> {
        let mut history = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            history.push(self.run_round()?);
        }
        Ok(history)
    }

    /// Executes a single round and returns its diagnostic metrics.
    pub fn run_round(&mut self) -> Result<RoundMetrics, FedError> {
        let round = self.round;
        info!("******** round {round}");

        let evals = self.evaluate_clients()?;
        for e in &evals {
            info!(
                "round {round} client {}: loss={:.4} accuracy={:.4} samples={}",
                e.client, e.loss, e.accuracy, e.samples
            );
        }

        let fits = self.fit_clients()?;
        let (updates, samples): (Vec<ParameterSet>, Vec<f32>) = fits
            .into_iter()
            .map(|f| (f.params, f.samples as f32))
            .unzip();

        self.global = match self.weighting {
            Weighting::Uniform => fedavg(&updates, None)?,
            Weighting::BySamples => fedavg(&updates, Some(&samples))?,
        };

        self.round += 1;
        Ok(RoundMetrics { round, evals })
    }

    /// Diagnostic pass with the pre-training global parameters. Does not
    /// change any state.
    fn evaluate_clients(&mut self) -> Result<Vec<ClientEval>, FedError> {
        let round = self.round;
        let global = &self.global;

        match self.execution {
            Execution::Sequential => {
                let mut evals = Vec::with_capacity(self.clients.len());
                for client in &mut self.clients {
                    let id = client.id();
                    let out = client
                        .evaluate(global)
                        .map_err(|e| FedError::Client { id, round, source: Box::new(e) })?;
                    evals.push(ClientEval {
                        client: id,
                        loss: out.loss,
                        samples: out.samples,
                        accuracy: out.accuracy(),
                    });
                }
                Ok(evals)
            }
            Execution::Parallel => self
                .clients
                .par_iter_mut()
                .map(|client| {
                    let id = client.id();
                    let out = client
                        .evaluate(global)
                        .map_err(|e| FedError::Client { id, round, source: Box::new(e) })?;
                    Ok(ClientEval {
                        client: id,
                        loss: out.loss,
                        samples: out.samples,
                        accuracy: out.accuracy(),
                    })
                })
                .collect(),
        }
    }

    /// Training pass; every client starts from the same global parameters.
    fn fit_clients(&mut self) -> Result<Vec<FitOutcome>, FedError> {
        let round = self.round;
        let global = &self.global;

        match self.execution {
            Execution::Sequential => {
                let mut fits = Vec::with_capacity(self.clients.len());
                for client in &mut self.clients {
                    let id = client.id();
                    let out = client
                        .fit(global)
                        .map_err(|e| FedError::Client { id, round, source: Box::new(e) })?;
                    fits.push(out);
                }
                Ok(fits)
            }
            Execution::Parallel => self
                .clients
                .par_iter_mut()
                .map(|client| {
                    let id = client.id();
                    client
                        .fit(global)
                        .map_err(|e| FedError::Client { id, round, source: Box::new(e) })
                })
                .collect(),
        }
    }
}
