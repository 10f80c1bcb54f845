use std::{error::Error, fmt};

use ml_core::MlError;

/// The federation core's result type.
pub type Result<T> = std::result::Result<T, FedError>;

/// Failures surfaced by the federation core.
///
/// All of these are fail-fast: averaging has no defined meaning for partial
/// or malformed updates, so nothing is retried and nothing degrades
/// silently.
#[derive(Debug)]
pub enum FedError {
    /// A parameter set deviates from the expected ordered shapes.
    ///
    /// A missing or extra tensor position is reported with an empty shape on
    /// the short side.
    ShapeMismatch {
        slot: usize,
        got: Vec<usize>,
        expected: Vec<usize>,
    },

    /// Client count is invalid for the dataset size at setup.
    InvalidPartition { clients: usize, samples: usize },

    /// Aggregation was invoked without any updates.
    EmptyUpdates,

    /// The weight vector does not pair one-to-one with the updates.
    WeightCount { got: usize, expected: usize },

    /// The weight vector sums to zero or less, leaving the mean undefined.
    ZeroWeightSum,

    /// A run configuration value is unusable; caught before any round executes.
    InvalidConfig(String),

    /// The numeric backend rejected an operation.
    Ml(MlError),

    /// A client call failed; carries which client and round triggered it.
    Client {
        id: usize,
        round: usize,
        source: Box<FedError>,
    },
}

impl fmt::Display for FedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { slot, got, expected } => {
                write!(f, "tensor {slot} has shape {got:?}, expected {expected:?}")
            }
            Self::InvalidPartition { clients, samples } => {
                write!(f, "cannot split {samples} samples among {clients} clients")
            }
            Self::EmptyUpdates => write!(f, "aggregation requires at least one update"),
            Self::WeightCount { got, expected } => {
                write!(f, "got {got} weights for {expected} updates")
            }
            Self::ZeroWeightSum => {
                write!(f, "aggregation weights must sum to a positive value")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Ml(e) => write!(f, "ml backend: {e}"),
            Self::Client { id, round, source } => {
                write!(f, "client {id} failed in round {round}: {source}")
            }
        }
    }
}

impl Error for FedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ml(e) => Some(e),
            Self::Client { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<MlError> for FedError {
    fn from(e: MlError) -> Self {
        Self::Ml(e)
    }
}
