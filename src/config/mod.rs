use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub recommendation: RecommendationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
    pub max_rows: Option<usize>,
    pub train_fraction: f64,
    pub split_seed: u64,
    pub scale_min: f64,
    pub scale_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub latent_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub regularization: f64,
    pub epochs: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub model_dir: String,
    pub model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig {
                // Taste Profile triplets, http://millionsongdataset.com/tasteprofile/
                path: "train_triplets.txt".to_string(),
                max_rows: Some(100_000),
                train_fraction: 0.66,
                split_seed: 73,
                scale_min: 0.0,
                scale_max: 100.0,
            },
            model: ModelConfig { latent_dim: 40 },
            training: TrainingConfig {
                learning_rate: 0.001,
                regularization: 0.0005,
                epochs: 300,
                seed: 42,
            },
            recommendation: RecommendationConfig { top_n: 5 },
            storage: StorageConfig {
                model_dir: "models".to_string(),
                model_name: "collaborative".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TUNEFOLD"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
