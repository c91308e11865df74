pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod recommender;
pub mod trainer;
pub mod utils;

pub use config::Config;
pub use dataset::{IdIndex, LoadedDataset, ScaleBounds, Triple};
pub use error::{RecoError, Result};
pub use model::LatentFactorModel;
pub use recommender::Recommender;
pub use trainer::{EpochStats, Hyperparameters, Trainer, TrainingStats};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
