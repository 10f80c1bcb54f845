use rand::{seq::SliceRandom, Rng};

use crate::error::FedError;

/// Index shards assigned to one client: a slice of the shuffled train set
/// and an independent slice of the shuffled test set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits `train_len` train and `test_len` test indices among `clients`.
///
/// One permutation per set is drawn from `rng` and applied once; client `i`
/// then owns the `i`-th contiguous chunk of each. Chunks are `len / clients`
/// long and pairwise disjoint; the `len % clients` leftover samples are
/// dropped, not redistributed.
///
/// # Errors
/// `FedError::InvalidPartition` if `clients` is zero or exceeds either set.
pub fn partition<R: Rng>(
    train_len: usize,
    test_len: usize,
    clients: usize,
    rng: &mut R,
) -> Result<Vec<ClientSplit>, FedError> {
    if clients == 0 || clients > train_len {
        return Err(FedError::InvalidPartition { clients, samples: train_len });
    }
    if clients > test_len {
        return Err(FedError::InvalidPartition { clients, samples: test_len });
    }

    let train_perm = permutation(train_len, rng);
    let test_perm = permutation(test_len, rng);

    let per_train = train_len / clients;
    let per_test = test_len / clients;

    let splits = (0..clients)
        .map(|i| ClientSplit {
            train: train_perm[i * per_train..(i + 1) * per_train].to_vec(),
            test: test_perm[i * per_test..(i + 1) * per_test].to_vec(),
        })
        .collect();

    Ok(splits)
}

fn permutation<R: Rng>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}
