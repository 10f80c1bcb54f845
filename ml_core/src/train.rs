use std::num::NonZeroUsize;

use ndarray::{Array1, Array2, ArrayView1};
use rand::{seq::SliceRandom, Rng};

use crate::{
    dataset::Subset,
    mlp::{sigmoid_prime, Mlp},
    MlError,
};

/// Hyperparameters for one local training pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SgdConfig {
    pub lr: f32,
    pub momentum: f32,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            momentum: 0.9,
            epochs: NonZeroUsize::MIN,
            batch_size: NonZeroUsize::new(32).unwrap(),
        }
    }
}

/// Loss and accuracy measured over a held-out subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Average per-sample cross-entropy loss.
    pub loss: f32,
    /// Fraction of samples whose argmax prediction matches the label.
    pub accuracy: f32,
}

/// Trains `model` in place with mini-batch SGD and momentum.
///
/// Each epoch reshuffles the subset with `rng` and walks it in batches of
/// `cfg.batch_size`; gradients are batch means of softmax cross-entropy
/// backpropagation. The momentum velocity is local to this call.
///
/// # Errors
/// `MlError::InvalidInput` if the subset is empty, its feature dimension
/// does not match the model input, or a label falls outside the model's
/// output range.
pub fn train<R: Rng>(
    model: &mut Mlp,
    data: Subset<'_>,
    cfg: &SgdConfig,
    rng: &mut R,
) -> Result<(), MlError> {
    if data.is_empty() {
        return Err(MlError::InvalidInput("training subset is empty"));
    }
    if data.feature_dim() != model.input_dim() {
        return Err(MlError::InvalidInput("feature dimension does not match the model input"));
    }

    let mut grad_w: Vec<Array2<f32>> =
        model.weights.iter().map(|w| Array2::zeros(w.dim())).collect();
    let mut grad_b: Vec<Array1<f32>> =
        model.biases.iter().map(|b| Array1::zeros(b.dim())).collect();
    let mut vel_w = grad_w.clone();
    let mut vel_b = grad_b.clone();

    let mut order: Vec<usize> = (0..data.len()).collect();

    for _ in 0..cfg.epochs.get() {
        order.shuffle(rng);

        for batch in order.chunks(cfg.batch_size.get()) {
            grad_w.iter_mut().for_each(|g| g.fill(0.0));
            grad_b.iter_mut().for_each(|g| g.fill(0.0));

            for &k in batch {
                let (x, label) = data.get(k);
                backprop(model, x.view(), label, &mut grad_w, &mut grad_b)?;
            }

            let scale = 1.0 / batch.len() as f32;

            // v <- mu * v + g, w <- w - lr * v
            for ((w, gw), vw) in model.weights.iter_mut().zip(&grad_w).zip(&mut vel_w) {
                vw.zip_mut_with(gw, |v, &g| *v = cfg.momentum * *v + g * scale);
                w.scaled_add(-cfg.lr, vw);
            }
            for ((b, gb), vb) in model.biases.iter_mut().zip(&grad_b).zip(&mut vel_b) {
                vb.zip_mut_with(gb, |v, &g| *v = cfg.momentum * *v + g * scale);
                b.scaled_add(-cfg.lr, vb);
            }
        }
    }

    Ok(())
}

/// Full pass over `data` without updating weights.
///
/// # Errors
/// `MlError::InvalidInput` under the same conditions as [`train`].
pub fn evaluate(model: &Mlp, data: Subset<'_>) -> Result<Evaluation, MlError> {
    if data.is_empty() {
        return Err(MlError::InvalidInput("evaluation subset is empty"));
    }
    if data.feature_dim() != model.input_dim() {
        return Err(MlError::InvalidInput("feature dimension does not match the model input"));
    }

    let mut loss_sum = 0.0_f32;
    let mut correct = 0_usize;

    for k in 0..data.len() {
        let (x, label) = data.get(k);
        let probs = model.forward(x.view());
        if label >= probs.len() {
            return Err(MlError::InvalidInput("class label outside the model's output range"));
        }

        loss_sum -= probs[label].max(1e-12).ln();
        if argmax(probs.view()) == label {
            correct += 1;
        }
    }

    let n = data.len() as f32;
    Ok(Evaluation { loss: loss_sum / n, accuracy: correct as f32 / n })
}

/// Accumulates one sample's gradients into `grad_w`/`grad_b` and returns the
/// sample's cross-entropy loss.
fn backprop(
    model: &Mlp,
    x: ArrayView1<f32>,
    label: usize,
    grad_w: &mut [Array2<f32>],
    grad_b: &mut [Array1<f32>],
) -> Result<f32, MlError> {
    let (activations, weighted_sums) = model.forward_trace(x);
    let probs = &activations[activations.len() - 1];
    if label >= probs.len() {
        return Err(MlError::InvalidInput("class label outside the model's output range"));
    }

    let loss = -probs[label].max(1e-12).ln();
    let n_layers = grad_w.len();

    // softmax + cross-entropy: dL/dz at the output is probs - onehot(label)
    let mut delta = probs.clone();
    delta[label] -= 1.0;

    grad_w[n_layers - 1] += &outer(delta.view(), activations[n_layers - 1].view());
    grad_b[n_layers - 1] += &delta;

    for idx in (0..n_layers - 1).rev() {
        delta = model.weights[idx + 1].t().dot(&delta)
            * weighted_sums[idx].mapv(sigmoid_prime);
        grad_w[idx] += &outer(delta.view(), activations[idx].view());
        grad_b[idx] += &delta;
    }

    Ok(loss)
}

/// Column times row: the (v.len(), w.len()) outer product.
fn outer(v: ArrayView1<f32>, w: ArrayView1<f32>) -> Array2<f32> {
    let col = v.to_shape((v.dim(), 1)).unwrap();
    let row = w.to_shape((1, w.dim())).unwrap();
    col.dot(&row)
}

fn argmax(v: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (idx, &val) in v.iter().enumerate() {
        if val > v[best] {
            best = idx;
        }
    }
    best
}
