use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::info;

use tunefold::model::persistence;
use tunefold::{dataset, init_tracing, Config, Recommender, ScaleBounds};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Name of the persisted model to query, overriding the config.
    #[arg(short, long)]
    model_name: Option<String>,

    /// Number of recommendations to print, overriding the config.
    #[arg(short = 'n', long)]
    top_n: Option<usize>,

    /// Listening history as SONG_ID=COUNT pairs.
    #[arg(required = true)]
    listening: Vec<String>,
}

fn parse_entry(raw: &str) -> Result<(String, u64)> {
    let (song_id, count) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected SONG_ID=COUNT, got {raw:?}"))?;
    let count = count
        .parse::<u64>()
        .with_context(|| format!("listening count in {raw:?}"))?;
    Ok((song_id.to_string(), count))
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    let listening = args
        .listening
        .iter()
        .map(|raw| parse_entry(raw))
        .collect::<Result<Vec<_>>>()?;

    // Index assignment is deterministic in first-seen order, so replaying
    // the triplet file rebuilds the mappings the model was trained with.
    let loaded = dataset::load_path(&config.dataset.path, config.dataset.max_rows)?;
    info!(
        users = loaded.users.len(),
        songs = loaded.songs.len(),
        "mappings rebuilt"
    );

    let model_name = args
        .model_name
        .unwrap_or_else(|| config.storage.model_name.clone());
    let model = persistence::load(Path::new(&config.storage.model_dir), &model_name)?;

    if model.n_songs() != loaded.songs.len() || model.n_users() != loaded.users.len() {
        bail!(
            "model {:?} was trained on {} songs / {} users but the triplet file encodes {} / {}",
            model_name,
            model.n_songs(),
            model.n_users(),
            loaded.songs.len(),
            loaded.users.len()
        );
    }

    let bounds = ScaleBounds {
        min_val: config.dataset.scale_min,
        max_val: config.dataset.scale_max,
    };
    let recommender = Recommender::new(&model, &loaded.songs, bounds);

    let top_n = args.top_n.unwrap_or(config.recommendation.top_n);
    let recommendations = recommender.recommend(&listening, top_n)?;
    for song_id in recommendations {
        println!("{song_id}");
    }

    Ok(())
}
