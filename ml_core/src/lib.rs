mod dataset;
mod error;
mod mlp;
mod train;

pub use dataset::{gaussian_blobs, InMemoryDataset, Subset};
pub use error::MlError;
pub use mlp::Mlp;
pub use train::{evaluate, train, Evaluation, SgdConfig};
