use std::fmt;

/// Errors produced by the numeric backend when inputs violate its contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MlError {
    /// A tensor's shape differs from the model's layout at this position.
    TensorShape {
        /// Position of the offending tensor in the model's export order.
        slot: usize,
        /// Observed shape.
        got: Vec<usize>,
        /// Shape the model's layout requires.
        expected: Vec<usize>,
    },

    /// The number of tensors differs from the model's layout.
    TensorCount { got: usize, expected: usize },

    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),
}

impl fmt::Display for MlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlError::TensorShape { slot, got, expected } => {
                write!(f, "tensor {slot} has shape {got:?}, expected {expected:?}")
            }
            MlError::TensorCount { got, expected } => {
                write!(f, "got {got} tensors, expected {expected}")
            }
            MlError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for MlError {}
