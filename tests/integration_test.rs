use std::path::PathBuf;

use tunefold::model::persistence;
use tunefold::trainer::Trainer;
use tunefold::{dataset, Hyperparameters, RecoError, Recommender, ScaleBounds};

const TRIPLETS: &str = "\
u0\ts0\t10
u0\ts1\t5
u1\ts1\t10
u1\ts2\t8
u2\ts0\t3
u2\ts3\t9
";

fn hyperparameters(epochs: usize) -> Hyperparameters {
    Hyperparameters {
        latent_dim: 2,
        learning_rate: 0.05,
        regularization: 0.01,
        epochs,
        seed: 42,
    }
}

fn temp_model_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tunefold-{tag}-{}", std::process::id()))
}

#[test]
fn test_end_to_end_training_reduces_loss() {
    let loaded = dataset::load(TRIPLETS.as_bytes(), None).unwrap();
    assert_eq!(loaded.users.len(), 3);
    assert_eq!(loaded.songs.len(), 4);
    assert_eq!(loaded.skipped, 0);

    let trainer = Trainer::new(hyperparameters(50));
    let model = trainer.init_model(loaded.songs.len(), loaded.users.len());
    let (_, stats) = trainer
        .fit(model, &loaded.triples, &loaded.triples)
        .unwrap();

    assert_eq!(stats.epochs().len(), 50);
    let smoothed = trainer_smoothed(&stats);
    assert!(
        smoothed[49] < smoothed[0],
        "moving-average loss did not improve: {} -> {}",
        smoothed[0],
        smoothed[49]
    );
}

fn trainer_smoothed(stats: &tunefold::TrainingStats) -> Vec<f64> {
    stats.smoothed_train_loss(5)
}

#[test]
fn test_end_to_end_recommendations_come_from_the_catalog() {
    let loaded = dataset::load(TRIPLETS.as_bytes(), None).unwrap();

    let trainer = Trainer::new(hyperparameters(50));
    let model = trainer.init_model(loaded.songs.len(), loaded.users.len());
    let (model, _) = trainer
        .fit(model, &loaded.triples, &loaded.triples)
        .unwrap();

    let bounds = ScaleBounds {
        min_val: 0.0,
        max_val: 10.0,
    };
    let recommender = Recommender::new(&model, &loaded.songs, bounds);

    let query = vec![
        ("s0".to_string(), 10),
        ("s1".to_string(), 5),
        ("never-seen".to_string(), 99),
    ];
    let recommendations = recommender.recommend(&query, 3).unwrap();

    assert!(!recommendations.is_empty());
    assert!(recommendations.len() <= 3);
    assert!(recommendations
        .iter()
        .all(|id| loaded.songs.get(id).is_some()));

    // A fully unresolvable history carries no signal.
    let cold = vec![("never-seen".to_string(), 99)];
    assert!(matches!(
        recommender.recommend(&cold, 3),
        Err(RecoError::InsufficientSignal)
    ));
}

#[test]
fn test_persistence_round_trip_is_bit_identical() {
    let loaded = dataset::load(TRIPLETS.as_bytes(), None).unwrap();
    let trainer = Trainer::new(hyperparameters(5));
    let model = trainer.init_model(loaded.songs.len(), loaded.users.len());
    let (model, _) = trainer.fit(model, &loaded.triples, &[]).unwrap();

    let dir = temp_model_dir("round-trip");
    persistence::save(&model, &dir, "small").unwrap();
    let restored = persistence::load(&dir, "small").unwrap();
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(model, restored);
}

#[test]
fn test_load_rejects_mismatched_latent_dimensions() {
    let narrow = Trainer::new(hyperparameters(1)).init_model(4, 3);
    let wide = Trainer::new(Hyperparameters {
        latent_dim: 3,
        ..hyperparameters(1)
    })
    .init_model(4, 3);

    let dir = temp_model_dir("shape-mismatch");
    persistence::save(&narrow, &dir, "narrow").unwrap();
    persistence::save(&wide, &dir, "wide").unwrap();

    // Splice a wide user matrix into the narrow model's blobs.
    std::fs::copy(dir.join("wide_p"), dir.join("narrow_p")).unwrap();
    let result = persistence::load(&dir, "narrow");
    std::fs::remove_dir_all(&dir).ok();

    assert!(matches!(result, Err(RecoError::Format(_))));
}

#[test]
fn test_load_rejects_truncated_blob() {
    let model = Trainer::new(hyperparameters(1)).init_model(4, 3);

    let dir = temp_model_dir("truncated");
    persistence::save(&model, &dir, "cut").unwrap();

    let q_path = dir.join("cut_q");
    let len = std::fs::metadata(&q_path).unwrap().len();
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(&q_path)
        .unwrap();
    file.set_len(len - 8).unwrap();
    drop(file);

    let result = persistence::load(&dir, "cut");
    std::fs::remove_dir_all(&dir).ok();

    assert!(matches!(result, Err(RecoError::Format(_))));
}

#[test]
fn test_full_pipeline_with_scaling_and_split() {
    let mut raw = String::new();
    for user in 0..10 {
        for song in 0..8 {
            if (user + song) % 3 != 0 {
                raw.push_str(&format!("user{user}\tsong{song}\t{}\n", user * song + 1));
            }
        }
    }

    let loaded = dataset::load(raw.as_bytes(), None).unwrap();
    let bounds = ScaleBounds {
        min_val: 0.0,
        max_val: 100.0,
    };
    let mut triples = loaded.triples;
    dataset::scale_counts(&mut triples, bounds);
    assert!(triples
        .iter()
        .all(|t| t.count >= 0.0 && t.count <= 100.0));

    let (train_set, validation_set) = dataset::split(&triples, 0.66, 73);
    assert_eq!(train_set.len() + validation_set.len(), triples.len());

    let trainer = Trainer::new(Hyperparameters {
        latent_dim: 4,
        learning_rate: 0.002,
        regularization: 0.001,
        epochs: 30,
        seed: 7,
    });
    let model = trainer.init_model(loaded.songs.len(), loaded.users.len());
    let (model, stats) = trainer.fit(model, &train_set, &validation_set).unwrap();

    assert!(stats
        .epochs()
        .iter()
        .all(|e| e.train_loss.is_finite() && e.validation_loss.is_finite()));

    let recommender = Recommender::new(&model, &loaded.songs, bounds);
    let query = vec![("song1".to_string(), 12), ("song2".to_string(), 3)];
    let recommendations = recommender.recommend(&query, 5).unwrap();
    assert!(recommendations.len() <= 5);
    assert!(recommendations
        .iter()
        .all(|id| loaded.songs.get(id).is_some()));
}
