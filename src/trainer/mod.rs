use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Triple;
use crate::error::{RecoError, Result};
use crate::model::LatentFactorModel;
use crate::utils::moving_average;

/// Everything one training run needs. One trainer parameterized by this
/// structure replaces per-experiment script copies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Size of the shared latent space for user and song embeddings.
    pub latent_dim: usize,
    /// SGD step size (gamma).
    pub learning_rate: f64,
    /// L2 penalty weight (lambda).
    pub regularization: f64,
    pub epochs: usize,
    /// Drives embedding initialization and the per-epoch reshuffles.
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EpochStats {
    pub train_loss: f64,
    pub validation_loss: f64,
}

/// Append-only per-epoch loss history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingStats {
    epochs: Vec<EpochStats>,
}

impl TrainingStats {
    pub fn epochs(&self) -> &[EpochStats] {
        &self.epochs
    }

    /// Trailing moving average of the train loss, for reporting on noisy
    /// per-epoch values.
    pub fn smoothed_train_loss(&self, window: usize) -> Vec<f64> {
        let losses: Vec<f64> = self.epochs.iter().map(|e| e.train_loss).collect();
        moving_average(&losses, window)
    }
}

pub struct Trainer {
    params: Hyperparameters,
}

impl Trainer {
    pub fn new(params: Hyperparameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Fresh model sized for the encoded dataset, seeded from the
    /// hyperparameters.
    pub fn init_model(&self, n_songs: usize, n_users: usize) -> LatentFactorModel {
        LatentFactorModel::init(n_songs, n_users, self.params.latent_dim, self.params.seed)
    }

    /// Runs exactly `epochs` epochs of sequential SGD over `train_set` and
    /// returns the fitted model with its loss history. Takes the model by
    /// value: the trainer is its only writer, and handing it back is the
    /// point where it becomes shareable.
    ///
    /// Triples are visited one at a time in a fresh seeded permutation per
    /// epoch; later triples sharing a user or song see the earlier update.
    /// Interrupting a run mid-epoch is not resumable.
    pub fn fit(
        &self,
        mut model: LatentFactorModel,
        train_set: &[Triple],
        validation_set: &[Triple],
    ) -> Result<(LatentFactorModel, TrainingStats)> {
        let gamma = self.params.learning_rate;
        let lambda = self.params.regularization;

        // Anchor predictions at the average interaction strength before
        // the latent terms learn the residuals.
        if !train_set.is_empty() {
            model.global_bias =
                train_set.iter().map(|t| t.count).sum::<f64>() / train_set.len() as f64;
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut order = train_set.to_vec();
        let mut stats = TrainingStats::default();

        for epoch in 0..self.params.epochs {
            // Reordering every epoch is required for SGD quality, not
            // cosmetic; a fixed order biases the trajectory.
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            for &Triple { user, song, count } in &order {
                let error = count - model.predict(user, song);

                // Snapshots taken before either side of the paired update;
                // both formulas must read the pre-update factors.
                let p_u = model.p.row(user).to_owned();
                let q_s = model.q.row(song).to_owned();

                let q_step = (&p_u * error - &q_s * lambda) * gamma;
                let p_step = (&q_s * error - &p_u * lambda) * gamma;

                let mut q_row = model.q.row_mut(song);
                q_row += &q_step;
                let mut p_row = model.p.row_mut(user);
                p_row += &p_step;

                model.b_user[user] += gamma * (error - lambda * model.b_user[user]);
                model.b_song[song] += gamma * (error - lambda * model.b_song[song]);

                loss_sum += error * error + lambda * (q_s.dot(&q_s) + p_u.dot(&p_u));
            }

            let train_loss = if order.is_empty() {
                0.0
            } else {
                loss_sum / order.len() as f64
            };
            let validation_loss = validation_loss(&model, validation_set);

            if !train_loss.is_finite() || !validation_loss.is_finite() {
                let loss = if train_loss.is_finite() {
                    validation_loss
                } else {
                    train_loss
                };
                return Err(RecoError::Divergence {
                    epoch: epoch + 1,
                    loss,
                });
            }

            info!(
                epoch = epoch + 1,
                train_loss, validation_loss, "epoch complete"
            );
            stats.epochs.push(EpochStats {
                train_loss,
                validation_loss,
            });
        }

        Ok((model, stats))
    }
}

/// Plain mean squared error of the post-epoch model over the validation
/// set. Read-only: no parameter updates happen here.
fn validation_loss(model: &LatentFactorModel, validation_set: &[Triple]) -> f64 {
    if validation_set.is_empty() {
        return 0.0;
    }

    validation_set
        .iter()
        .map(|t| {
            let error = t.count - model.predict(t.user, t.song);
            error * error
        })
        .sum::<f64>()
        / validation_set.len() as f64
}
