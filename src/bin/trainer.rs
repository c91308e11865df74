use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use tunefold::model::persistence;
use tunefold::trainer::Trainer;
use tunefold::{dataset, init_tracing, Config, Hyperparameters, ScaleBounds};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Triplet file, overriding the configured dataset path.
    #[arg(short, long)]
    triplets: Option<String>,

    /// Name the fitted model is persisted under, overriding the config.
    #[arg(short, long)]
    model_name: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    info!("Starting tunefold training job");

    let config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    let triplet_path = args.triplets.unwrap_or_else(|| config.dataset.path.clone());
    let loaded = dataset::load_path(&triplet_path, config.dataset.max_rows)?;
    info!(
        triples = loaded.triples.len(),
        users = loaded.users.len(),
        songs = loaded.songs.len(),
        skipped = loaded.skipped,
        "dataset ready"
    );

    let bounds = ScaleBounds {
        min_val: config.dataset.scale_min,
        max_val: config.dataset.scale_max,
    };
    let mut triples = loaded.triples;
    dataset::scale_counts(&mut triples, bounds);

    let (train_set, validation_set) = dataset::split(
        &triples,
        config.dataset.train_fraction,
        config.dataset.split_seed,
    );
    info!(
        train = train_set.len(),
        validation = validation_set.len(),
        "dataset split"
    );

    let trainer = Trainer::new(Hyperparameters {
        latent_dim: config.model.latent_dim,
        learning_rate: config.training.learning_rate,
        regularization: config.training.regularization,
        epochs: config.training.epochs,
        seed: config.training.seed,
    });

    let model = trainer.init_model(loaded.songs.len(), loaded.users.len());
    let (model, stats) = trainer.fit(model, &train_set, &validation_set)?;

    if let Some(last) = stats.epochs().last() {
        info!(
            train_loss = last.train_loss,
            validation_loss = last.validation_loss,
            "training done"
        );
    }

    let model_name = args
        .model_name
        .unwrap_or_else(|| config.storage.model_name.clone());
    persistence::save(&model, Path::new(&config.storage.model_dir), &model_name)?;
    info!(
        name = %model_name,
        dir = %config.storage.model_dir,
        "model saved"
    );

    Ok(())
}
