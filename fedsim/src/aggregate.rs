use ndarray::ArrayD;

use crate::{error::FedError, params::ParameterSet};

/// Federated averaging over client updates.
///
/// With `weights` the result is `sum(w_i * u_i) / sum(w_i)` per tensor
/// position, elementwise; without, the plain arithmetic mean. Accumulation
/// is a left-to-right fold over `updates`, so the result is reproducible
/// for deterministic inputs, and the mean itself is order-insensitive,
/// which keeps parallel rounds equivalent to sequential ones.
///
/// # Errors
/// - `FedError::EmptyUpdates` if `updates` is empty.
/// - `FedError::ShapeMismatch` if any update deviates from the first one's
///   schema.
/// - `FedError::WeightCount` / `FedError::ZeroWeightSum` for a weight
///   vector that does not pair with the updates or sums to nothing.
pub fn fedavg(
    updates: &[ParameterSet],
    weights: Option<&[f32]>,
) -> Result<ParameterSet, FedError> {
    let first = updates.first().ok_or(FedError::EmptyUpdates)?;
    let schema = first.schema();
    for update in &updates[1..] {
        schema.check(update)?;
    }

    let tensors = match weights {
        Some(w) => {
            if w.len() != updates.len() {
                return Err(FedError::WeightCount { got: w.len(), expected: updates.len() });
            }
            let total: f32 = w.iter().sum();
            if !(total > 0.0) {
                return Err(FedError::ZeroWeightSum);
            }

            (0..first.len())
                .map(|slot| {
                    let mut acc: ArrayD<f32> = ArrayD::zeros(first.tensors()[slot].raw_dim());
                    for (update, &wi) in updates.iter().zip(w) {
                        acc.scaled_add(wi, &update.tensors()[slot]);
                    }
                    acc / total
                })
                .collect()
        }
        None => {
            let n = updates.len() as f32;
            (0..first.len())
                .map(|slot| {
                    let mut acc: ArrayD<f32> = ArrayD::zeros(first.tensors()[slot].raw_dim());
                    for update in updates {
                        acc += &update.tensors()[slot];
                    }
                    acc / n
                })
                .collect()
        }
    };

    Ok(ParameterSet::new(tensors))
}
