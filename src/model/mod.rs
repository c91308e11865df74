pub mod persistence;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Matrix-factorization model state: song embeddings `q` (songs x latent),
/// user embeddings `p` (users x latent), per-song and per-user bias terms
/// and a global bias.
///
/// The trainer owns and mutates the model exclusively while fitting; once
/// it is handed back it is read-only and safe to share across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentFactorModel {
    pub q: Array2<f64>,
    pub p: Array2<f64>,
    pub b_song: Array1<f64>,
    pub b_user: Array1<f64>,
    pub global_bias: f64,
}

impl LatentFactorModel {
    /// Fresh model: embeddings drawn uniformly from `[0, 1)` out of a
    /// seeded generator, biases zeroed.
    pub fn init(n_songs: usize, n_users: usize, latent_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let q = Array2::from_shape_simple_fn((n_songs, latent_dim), || rng.gen::<f64>());
        let p = Array2::from_shape_simple_fn((n_users, latent_dim), || rng.gen::<f64>());

        Self {
            q,
            p,
            b_song: Array1::zeros(n_songs),
            b_user: Array1::zeros(n_users),
            global_bias: 0.0,
        }
    }

    pub fn n_songs(&self) -> usize {
        self.q.nrows()
    }

    pub fn n_users(&self) -> usize {
        self.p.nrows()
    }

    pub fn latent_dim(&self) -> usize {
        self.q.ncols()
    }

    /// Predicted interaction strength for one (user, song) pair.
    pub fn predict(&self, user: usize, song: usize) -> f64 {
        self.global_bias
            + self.b_user[user]
            + self.b_song[song]
            + self.p.row(user).dot(&self.q.row(song))
    }

    /// Predicted interaction strength of `user` against the full catalog.
    pub fn predict_all(&self, user: usize) -> Array1<f64> {
        let mut scores = self.q.dot(&self.p.row(user));
        scores += &self.b_song;
        scores += self.global_bias + self.b_user[user];
        scores
    }
}
