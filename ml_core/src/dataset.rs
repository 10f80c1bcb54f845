use ndarray::Array1;
use ndarray_rand::{rand_distr::StandardNormal, RandomExt};
use rand::Rng;

/// Labeled classification samples held fully in memory.
///
/// Design goals:
/// - deterministic and test-friendly
/// - small API surface
/// - cheap index-subset views for shard-local training
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    inputs: Vec<Array1<f32>>,
    labels: Vec<usize>,
    classes: usize,
}

impl InMemoryDataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Panics
    /// - if `inputs` and `labels` differ in length
    /// - if the dataset is empty
    /// - if inputs differ in dimension or a label is `>= classes`
    pub fn new(inputs: Vec<Array1<f32>>, labels: Vec<usize>, classes: usize) -> Self {
        assert_eq!(inputs.len(), labels.len(), "inputs and labels must have same length");
        assert!(!inputs.is_empty(), "dataset must be non-empty");

        let dim = inputs[0].len();
        assert!(inputs.iter().all(|x| x.len() == dim), "inputs must share one dimension");
        assert!(labels.iter().all(|&l| l < classes), "labels must be < classes");

        Self { inputs, labels, classes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    #[inline]
    pub fn feature_dim(&self) -> usize {
        self.inputs[0].len()
    }

    /// Borrowed view over the samples selected by `indices`.
    ///
    /// # Panics
    /// If any index is out of bounds for this dataset.
    pub fn subset<'a>(&'a self, indices: &'a [usize]) -> Subset<'a> {
        assert!(
            indices.iter().all(|&i| i < self.len()),
            "subset index out of range"
        );
        Subset { data: self, indices }
    }
}

/// A zero-copy view over a subset of dataset indices.
#[derive(Debug, Clone, Copy)]
pub struct Subset<'a> {
    data: &'a InMemoryDataset,
    indices: &'a [usize],
}

impl<'a> Subset<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn feature_dim(&self) -> usize {
        self.data.feature_dim()
    }

    /// Sample `k` of the view (panics if out of bounds).
    #[inline]
    pub fn get(&self, k: usize) -> (&'a Array1<f32>, usize) {
        let i = self.indices[k];
        (&self.data.inputs[i], self.data.labels[i])
    }
}

/// Synthetic Gaussian-blob classification data, split into a training and a
/// test set drawn around the same per-class centers.
///
/// Centers are standard-normal draws scaled by 2, samples are
/// `center + spread * noise`. Every value comes from `rng`, so a fixed seed
/// reproduces the datasets exactly.
pub fn gaussian_blobs<R: Rng>(
    classes: usize,
    train_per_class: usize,
    test_per_class: usize,
    dim: usize,
    spread: f32,
    rng: &mut R,
) -> (InMemoryDataset, InMemoryDataset) {
    assert!(classes > 0, "need at least one class");
    assert!(train_per_class > 0 && test_per_class > 0, "need samples per class");
    assert!(dim > 0, "feature dimension must be positive");

    let centers: Vec<Array1<f32>> = (0..classes)
        .map(|_| {
            let c: Array1<f32> = Array1::random_using(dim, StandardNormal, rng);
            c * 2.0
        })
        .collect();

    let mut sample = |per_class: usize| {
        let mut inputs = Vec::with_capacity(classes * per_class);
        let mut labels = Vec::with_capacity(classes * per_class);
        for (label, center) in centers.iter().enumerate() {
            for _ in 0..per_class {
                let noise: Array1<f32> = Array1::random_using(dim, StandardNormal, rng);
                inputs.push(center + &(noise * spread));
                labels.push(label);
            }
        }
        InMemoryDataset::new(inputs, labels, classes)
    };

    let train = sample(train_per_class);
    let test = sample(test_per_class);
    (train, test)
}
