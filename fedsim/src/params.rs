use ndarray::ArrayD;

use crate::error::FedError;

/// Ordered collection of a model's weight tensors.
///
/// A `ParameterSet` is a value: it is produced by a client after training or
/// by the aggregator, and is moved or cloned across ownership boundaries,
/// never mutated in place by another component.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    tensors: Vec<ArrayD<f32>>,
}

impl ParameterSet {
    pub fn new(tensors: Vec<ArrayD<f32>>) -> Self {
        Self { tensors }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    #[inline]
    pub fn tensors(&self) -> &[ArrayD<f32>] {
        &self.tensors
    }

    pub fn into_tensors(self) -> Vec<ArrayD<f32>> {
        self.tensors
    }

    /// The ordered shapes of this set.
    pub fn schema(&self) -> ShapeSchema {
        ShapeSchema {
            shapes: self.tensors.iter().map(|t| t.shape().to_vec()).collect(),
        }
    }
}

/// Ordered tensor shapes expected at a protocol boundary.
///
/// Captured once from a reference [`ParameterSet`] and then enforced on
/// every set crossing the boundary, so shape errors surface at the edge
/// instead of deep inside a numeric kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSchema {
    shapes: Vec<Vec<usize>>,
}

impl ShapeSchema {
    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[inline]
    pub fn shapes(&self) -> &[Vec<usize>] {
        &self.shapes
    }

    /// Validates `params` against this schema.
    ///
    /// # Errors
    /// `FedError::ShapeMismatch` naming the first offending tensor position.
    pub fn check(&self, params: &ParameterSet) -> Result<(), FedError> {
        for (slot, expected) in self.shapes.iter().enumerate() {
            match params.tensors.get(slot) {
                Some(t) if t.shape() == expected.as_slice() => {}
                Some(t) => {
                    return Err(FedError::ShapeMismatch {
                        slot,
                        got: t.shape().to_vec(),
                        expected: expected.clone(),
                    });
                }
                None => {
                    return Err(FedError::ShapeMismatch {
                        slot,
                        got: Vec::new(),
                        expected: expected.clone(),
                    });
                }
            }
        }

        if params.len() > self.shapes.len() {
            return Err(FedError::ShapeMismatch {
                slot: self.shapes.len(),
                got: params.tensors[self.shapes.len()].shape().to_vec(),
                expected: Vec::new(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn set(shapes: &[&[usize]]) -> ParameterSet {
        ParameterSet::new(shapes.iter().map(|s| ArrayD::zeros(IxDyn(s))).collect())
    }

    #[test]
    fn schema_accepts_matching_shapes() {
        let schema = set(&[&[4], &[2, 2]]).schema();
        assert!(schema.check(&set(&[&[4], &[2, 2]])).is_ok());
    }

    #[test]
    fn schema_reports_the_offending_slot() {
        let schema = set(&[&[4], &[2, 2]]).schema();
        let err = schema.check(&set(&[&[4], &[2, 3]])).unwrap_err();
        assert!(matches!(
            err,
            FedError::ShapeMismatch { slot: 1, ref got, ref expected }
                if got == &[2, 3] && expected == &[2, 2]
        ));
    }

    #[test]
    fn schema_rejects_missing_and_extra_tensors() {
        let schema = set(&[&[4], &[2, 2]]).schema();

        let err = schema.check(&set(&[&[4]])).unwrap_err();
        assert!(matches!(err, FedError::ShapeMismatch { slot: 1, ref got, .. } if got.is_empty()));

        let err = schema.check(&set(&[&[4], &[2, 2], &[3]])).unwrap_err();
        assert!(
            matches!(err, FedError::ShapeMismatch { slot: 2, ref expected, .. } if expected.is_empty())
        );
    }
}
