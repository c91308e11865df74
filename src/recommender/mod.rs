use std::cmp::Ordering;
use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::dataset::{normalize, IdIndex, ScaleBounds};
use crate::error::{RecoError, Result};
use crate::model::LatentFactorModel;
use crate::utils::{squared_euclidean, top_k_indices};

/// Nearest-neighbor inference over a fitted model. A query is a partial
/// listening vector for a possibly-unseen user; the answer is the top
/// songs of the trained user whose predicted scores over the queried
/// songs sit closest to it.
///
/// Holds the model by shared reference: inference never writes, so any
/// number of recommenders can run concurrently over one fitted model.
pub struct Recommender<'a> {
    model: &'a LatentFactorModel,
    songs: &'a IdIndex,
    bounds: ScaleBounds,
}

impl<'a> Recommender<'a> {
    /// `bounds` must be the scale the training counts were normalized
    /// into, so query vectors and predicted scores are comparable.
    pub fn new(model: &'a LatentFactorModel, songs: &'a IdIndex, bounds: ScaleBounds) -> Self {
        Self {
            model,
            songs,
            bounds,
        }
    }

    /// Resolves the listening vector against the trained catalog, keeping
    /// ascending song-index order. Unknown songs are dropped (a cold query
    /// naturally contains some); duplicate ids keep the last count.
    fn resolve(&self, listening: &[(String, u64)]) -> Vec<(usize, f64)> {
        let mut resolved: BTreeMap<usize, f64> = BTreeMap::new();
        for (song_id, count) in listening {
            if let Some(index) = self.songs.get(song_id) {
                resolved.insert(index, *count as f64);
            }
        }
        resolved.into_iter().collect()
    }

    /// Index of the trained user minimizing the squared Euclidean distance
    /// between their predicted scores over the queried songs and the
    /// normalized query. Ties break toward the lowest user index.
    pub fn nearest_user(&self, listening: &[(String, u64)]) -> Result<usize> {
        let resolved = self.resolve(listening);
        if resolved.is_empty() {
            return Err(RecoError::InsufficientSignal);
        }

        let song_indices: Vec<usize> = resolved.iter().map(|&(s, _)| s).collect();
        let raw_counts: Vec<f64> = resolved.iter().map(|&(_, c)| c).collect();
        let query = normalize(&raw_counts, self.bounds.min_val, self.bounds.max_val);

        (0..self.model.n_users())
            .into_par_iter()
            .map(|user| {
                let scores: Vec<f64> = song_indices
                    .iter()
                    .map(|&song| self.model.predict(user, song))
                    .collect();
                (user, squared_euclidean(&scores, &query))
            })
            .min_by(|a, b| match a.1.partial_cmp(&b.1) {
                Some(Ordering::Equal) | None => a.0.cmp(&b.0),
                Some(ordering) => ordering,
            })
            .map(|(user, _)| user)
            .ok_or(RecoError::InsufficientSignal)
    }

    /// Up to `top_n` external song ids, best predicted score first.
    pub fn recommend(&self, listening: &[(String, u64)], top_n: usize) -> Result<Vec<String>> {
        let user = self.nearest_user(listening)?;
        let scores = self.model.predict_all(user).to_vec();

        Ok(top_k_indices(&scores, top_n)
            .into_iter()
            .filter_map(|song| self.songs.id_for(song).map(str::to_owned))
            .collect())
    }
}
