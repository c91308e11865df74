use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;

use crate::error::{RecoError, Result};

/// Append-only bijection between external string ids and dense indices,
/// assigned in first-seen order. Indices are only meaningful for the
/// model trained against the same encoding pass.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    forward: HashMap<String, usize>,
    reverse: Vec<String>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index already assigned to `id`, or assigns the next one.
    pub fn get_or_insert(&mut self, id: &str) -> usize {
        if let Some(&index) = self.forward.get(id) {
            return index;
        }
        let index = self.reverse.len();
        self.forward.insert(id.to_owned(), index);
        self.reverse.push(id.to_owned());
        index
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.forward.get(id).copied()
    }

    pub fn id_for(&self, index: usize) -> Option<&str> {
        self.reverse.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}

/// One encoded interaction: dense user/song indices plus the listening
/// count (raw after loading, rescaled after `scale_counts`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triple {
    pub user: usize,
    pub song: usize,
    pub count: f64,
}

/// Target range counts are rescaled into before training. The same bounds
/// are applied to query vectors at inference time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min_val: f64,
    pub max_val: f64,
}

#[derive(Debug)]
pub struct LoadedDataset {
    pub triples: Vec<Triple>,
    pub users: IdIndex,
    pub songs: IdIndex,
    /// Malformed lines encountered and skipped during the load.
    pub skipped: usize,
}

fn parse_record(line: &str, line_no: usize) -> Result<(&str, &str, u64)> {
    let mut fields = line.split('\t');
    let user_id = fields.next().filter(|f| !f.is_empty());
    let song_id = fields.next().filter(|f| !f.is_empty());
    let count = fields.next();

    match (user_id, song_id, count, fields.next()) {
        (Some(user_id), Some(song_id), Some(count), None) => {
            let count = count.trim().parse::<u64>().map_err(|e| RecoError::Parse {
                line: line_no,
                reason: format!("listening count {count:?}: {e}"),
            })?;
            Ok((user_id, song_id, count))
        }
        _ => Err(RecoError::Parse {
            line: line_no,
            reason: "expected user_id\\tsong_id\\tlistening_count".to_string(),
        }),
    }
}

/// Parses tab-separated `user_id\tsong_id\tlistening_count` records and
/// encodes ids into dense first-seen indices. Malformed lines are skipped
/// and counted, never silently folded into the dataset. Stops once
/// `max_rows` triples have been materialized.
pub fn load<R: Read>(source: R, max_rows: Option<usize>) -> Result<LoadedDataset> {
    let reader = BufReader::new(source);
    let mut users = IdIndex::new();
    let mut songs = IdIndex::new();
    let mut triples = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_record(&line, line_no + 1) {
            Ok((user_id, song_id, count)) => {
                let user = users.get_or_insert(user_id);
                let song = songs.get_or_insert(song_id);
                triples.push(Triple {
                    user,
                    song,
                    count: count as f64,
                });
            }
            Err(err) => {
                warn!(%err, "skipping malformed triplet record");
                skipped += 1;
            }
        }

        if let Some(max) = max_rows {
            if triples.len() >= max {
                break;
            }
        }
    }

    Ok(LoadedDataset {
        triples,
        users,
        songs,
        skipped,
    })
}

/// Opens `path` for the duration of the load only; the file handle is
/// released once the dataset is materialized in memory.
pub fn load_path<P: AsRef<Path>>(path: P, max_rows: Option<usize>) -> Result<LoadedDataset> {
    load(File::open(path)?, max_rows)
}

/// Affine rescale of `values` into `[min_val, max_val]` using the slice's
/// own min/max. A degenerate column (every value equal) maps to `min_val`.
pub fn normalize(values: &[f64], min_val: f64, max_val: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi == lo {
        return vec![min_val; values.len()];
    }

    values
        .iter()
        .map(|&v| (max_val - min_val) * (v - lo) / (hi - lo) + min_val)
        .collect()
}

/// Rescales the count column of `triples` in place.
pub fn scale_counts(triples: &mut [Triple], bounds: ScaleBounds) {
    let counts: Vec<f64> = triples.iter().map(|t| t.count).collect();
    let scaled = normalize(&counts, bounds.min_val, bounds.max_val);
    for (triple, count) in triples.iter_mut().zip(scaled) {
        triple.count = count;
    }
}

/// Seeded shuffle followed by a partition: the first `fraction` of the
/// permuted triples become the training set, the rest the validation set.
pub fn split(triples: &[Triple], fraction: f64, seed: u64) -> (Vec<Triple>, Vec<Triple>) {
    let mut shuffled = triples.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let cut = (shuffled.len() as f64 * fraction) as usize;
    let validation = shuffled.split_off(cut.min(shuffled.len()));
    (shuffled, validation)
}
