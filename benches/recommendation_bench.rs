use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tunefold::trainer::Trainer;
use tunefold::{Hyperparameters, IdIndex, LatentFactorModel, Recommender, ScaleBounds, Triple};

const N_USERS: usize = 50;
const N_SONGS: usize = 200;

fn synthetic_triples(n: usize) -> Vec<Triple> {
    (0..n)
        .map(|i| Triple {
            user: (i * 13) % N_USERS,
            song: (i * 7) % N_SONGS,
            count: ((i * 11) % 20 + 1) as f64,
        })
        .collect()
}

fn song_catalog() -> IdIndex {
    let mut songs = IdIndex::new();
    for i in 0..N_SONGS {
        songs.get_or_insert(&format!("song{i}"));
    }
    songs
}

fn hyperparameters(epochs: usize) -> Hyperparameters {
    Hyperparameters {
        latent_dim: 32,
        learning_rate: 0.005,
        regularization: 0.01,
        epochs,
        seed: 42,
    }
}

fn fitted_model() -> LatentFactorModel {
    let triples = synthetic_triples(2000);
    let trainer = Trainer::new(hyperparameters(5));
    let model = trainer.init_model(N_SONGS, N_USERS);
    trainer.fit(model, &triples, &[]).unwrap().0
}

fn benchmark_training(c: &mut Criterion) {
    let triples = synthetic_triples(2000);

    c.bench_function("sgd_fit_one_epoch", |b| {
        b.iter(|| {
            let trainer = Trainer::new(hyperparameters(1));
            let model = trainer.init_model(N_SONGS, N_USERS);
            black_box(trainer.fit(model, &triples, &[]).unwrap());
        });
    });
}

fn benchmark_inference(c: &mut Criterion) {
    let model = fitted_model();
    let songs = song_catalog();
    let bounds = ScaleBounds {
        min_val: 0.0,
        max_val: 100.0,
    };
    let recommender = Recommender::new(&model, &songs, bounds);
    let query: Vec<(String, u64)> = (0..10)
        .map(|i| (format!("song{}", i * 17 % N_SONGS), (i + 1) as u64))
        .collect();

    c.bench_function("predict_all", |b| {
        b.iter(|| {
            black_box(model.predict_all(black_box(7)));
        });
    });

    c.bench_function("recommend_top_10", |b| {
        b.iter(|| {
            black_box(recommender.recommend(&query, 10).unwrap());
        });
    });
}

criterion_group!(benches, benchmark_training, benchmark_inference);
criterion_main!(benches);
