use thiserror::Error;

/// Crate-wide error taxonomy. Training and inference are deterministic
/// given their inputs and seeds, so none of these are retried.
#[derive(Debug, Error)]
pub enum RecoError {
    #[error("malformed triplet record at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("training diverged at epoch {epoch} (loss = {loss})")]
    Divergence { epoch: usize, loss: f64 },

    #[error("no song in the listening vector resolves against the trained catalog")]
    InsufficientSignal,

    #[error("persisted model is inconsistent: {0}")]
    Format(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RecoError>;
