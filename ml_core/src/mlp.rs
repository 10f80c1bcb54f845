use ndarray::{Array1, Array2, ArrayD, ArrayView1, Ix1, Ix2};
use ndarray_rand::{rand_distr::StandardNormal, RandomExt};
use rand::Rng;

use crate::MlError;

/// Fully connected classifier: sigmoid hidden layers, softmax output.
///
/// Parameters are exported and loaded as a flat ordered list of tensors,
/// one weight matrix then one bias vector per layer. That order is the
/// model's layout contract; `load_tensors` enforces it strictly.
#[derive(Debug, Clone)]
pub struct Mlp {
    pub(crate) weights: Vec<Array2<f32>>,
    pub(crate) biases: Vec<Array1<f32>>,
}

impl Mlp {
    /// Builds a network with the given layer sizes, e.g. `[8, 16, 4]` for
    /// 8 features, one hidden layer of 16 units and 4 classes.
    ///
    /// Weights are fan-in-scaled normal draws from `rng`, biases start at
    /// zero.
    ///
    /// # Panics
    /// If fewer than two sizes are given or any size is zero.
    pub fn init<R: Rng>(sizes: &[usize], rng: &mut R) -> Self {
        assert!(sizes.len() >= 2, "need at least input and output layers");
        assert!(sizes.iter().all(|&s| s > 0), "layer sizes must be positive");

        let weights = (0..sizes.len() - 1)
            .map(|idx| {
                let scale = 1.0 / (sizes[idx] as f32).sqrt();
                let w: Array2<f32> =
                    Array2::random_using((sizes[idx + 1], sizes[idx]), StandardNormal, rng);
                w * scale
            })
            .collect();

        let biases = sizes[1..].iter().map(|&s| Array1::zeros(s)).collect();

        Self { weights, biases }
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.weights[0].ncols()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.biases[self.biases.len() - 1].len()
    }

    /// Current parameters in export order: weight then bias, layer by layer.
    pub fn tensors(&self) -> Vec<ArrayD<f32>> {
        self.weights
            .iter()
            .zip(&self.biases)
            .flat_map(|(w, b)| [w.clone().into_dyn(), b.clone().into_dyn()])
            .collect()
    }

    /// Strictly loads `tensors` as the new parameters.
    ///
    /// Every shape is validated before anything is written, so a failed load
    /// leaves the model untouched.
    ///
    /// # Errors
    /// - `MlError::TensorCount` if the tensor count differs from the layout.
    /// - `MlError::TensorShape` naming the first offending position.
    pub fn load_tensors(&mut self, tensors: &[ArrayD<f32>]) -> Result<(), MlError> {
        let expected = 2 * self.weights.len();
        if tensors.len() != expected {
            return Err(MlError::TensorCount { got: tensors.len(), expected });
        }

        for (idx, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let (rows, cols) = w.dim();
            let got = &tensors[2 * idx];
            if got.shape() != &[rows, cols] {
                return Err(MlError::TensorShape {
                    slot: 2 * idx,
                    got: got.shape().to_vec(),
                    expected: vec![rows, cols],
                });
            }
            let got = &tensors[2 * idx + 1];
            if got.shape() != &[b.len()] {
                return Err(MlError::TensorShape {
                    slot: 2 * idx + 1,
                    got: got.shape().to_vec(),
                    expected: vec![b.len()],
                });
            }
        }

        // all shapes verified, commit
        for (idx, tensor) in tensors.iter().enumerate() {
            let layer = idx / 2;
            if idx % 2 == 0 {
                self.weights[layer] = tensor.clone().into_dimensionality::<Ix2>().unwrap();
            } else {
                self.biases[layer] = tensor.clone().into_dimensionality::<Ix1>().unwrap();
            }
        }
        Ok(())
    }

    /// Class probabilities for one input.
    ///
    /// # Panics
    /// If `x` does not match the input layer dimension.
    pub fn forward(&self, x: ArrayView1<f32>) -> Array1<f32> {
        let last = self.weights.len() - 1;
        let mut a = x.to_owned();
        for (idx, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = w.dot(&a) + b;
            a = if idx == last { softmax(z.view()) } else { z.mapv(sigmoid) };
        }
        a
    }

    /// Forward pass keeping every layer's pre-activation and activation,
    /// as needed by backpropagation. `activations[0]` is the input itself.
    pub(crate) fn forward_trace(
        &self,
        x: ArrayView1<f32>,
    ) -> (Vec<Array1<f32>>, Vec<Array1<f32>>) {
        let last = self.weights.len() - 1;
        let mut activations = vec![x.to_owned()];
        let mut weighted_sums = Vec::with_capacity(self.weights.len());

        for (idx, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = w.dot(&activations[idx]) + b;
            let a = if idx == last { softmax(z.view()) } else { z.mapv(sigmoid) };
            weighted_sums.push(z);
            activations.push(a);
        }

        (activations, weighted_sums)
    }
}

#[inline]
pub(crate) fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

#[inline]
pub(crate) fn sigmoid_prime(z: f32) -> f32 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

fn softmax(z: ArrayView1<f32>) -> Array1<f32> {
    // shift by the max so exp never overflows
    let max = z.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = z.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn init_produces_layout_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = Mlp::init(&[3, 5, 2], &mut rng);

        assert_eq!(net.input_dim(), 3);
        assert_eq!(net.output_dim(), 2);

        let tensors = net.tensors();
        assert_eq!(tensors.len(), 4);
        assert_eq!(tensors[0].shape(), &[5, 3]);
        assert_eq!(tensors[1].shape(), &[5]);
        assert_eq!(tensors[2].shape(), &[2, 5]);
        assert_eq!(tensors[3].shape(), &[2]);
    }

    #[test]
    fn init_is_reproducible_for_a_fixed_seed() {
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(
            Mlp::init(&[2, 4, 2], &mut a).tensors(),
            Mlp::init(&[2, 4, 2], &mut b).tensors()
        );
    }

    #[test]
    fn load_tensors_round_trips() {
        let mut rng = StdRng::seed_from_u64(1);
        let source = Mlp::init(&[2, 3, 2], &mut rng);
        let mut target = Mlp::init(&[2, 3, 2], &mut rng);

        target.load_tensors(&source.tensors()).unwrap();
        assert_eq!(target.tensors(), source.tensors());
    }

    #[test]
    fn load_tensors_rejects_wrong_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = Mlp::init(&[2, 3, 2], &mut rng);
        let mut tensors = net.tensors();
        tensors.pop();

        let err = net.load_tensors(&tensors).unwrap_err();
        assert_eq!(err, MlError::TensorCount { got: 3, expected: 4 });
    }

    #[test]
    fn failed_load_leaves_the_model_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = Mlp::init(&[2, 3, 2], &mut rng);
        let before = net.tensors();

        let mut tensors = net.tensors();
        tensors[2] = ArrayD::zeros(IxDyn(&[5, 3]));

        let err = net.load_tensors(&tensors).unwrap_err();
        assert!(matches!(err, MlError::TensorShape { slot: 2, .. }));
        assert_eq!(net.tensors(), before);
    }

    #[test]
    fn forward_returns_a_probability_vector() {
        let mut rng = StdRng::seed_from_u64(4);
        let net = Mlp::init(&[3, 4, 3], &mut rng);
        let probs = net.forward(Array1::from_vec(vec![0.5, -1.0, 2.0]).view());

        assert_eq!(probs.len(), 3);
        assert!(probs.iter().all(|&p| p > 0.0 && p < 1.0));
        assert!((probs.sum() - 1.0).abs() < 1e-5);
    }
}
