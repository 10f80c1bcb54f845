//! Single-process federated averaging simulation.
//!
//! A [`Coordinator`] repeatedly broadcasts a global [`ParameterSet`] to a set
//! of [`FederatedClient`]s, each training a private model on a disjoint shard
//! of a shared dataset, and folds the returned updates back into the next
//! global set with [`fedavg`]. Raw samples never cross a client boundary.

mod aggregate;
mod client;
mod config;
mod coordinator;
mod error;
mod metrics;
mod params;
mod partition;
pub mod simulation;

pub use aggregate::fedavg;
pub use client::{EvalOutcome, FederatedClient, FitOutcome, SimClient};
pub use config::{Execution, RunConfig, Weighting};
pub use coordinator::Coordinator;
pub use error::{FedError, Result};
pub use metrics::{ClientEval, RoundMetrics};
pub use params::{ParameterSet, ShapeSchema};
pub use partition::{partition, ClientSplit};
