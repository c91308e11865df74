//! Raw array persistence. A fitted model is written as one blob per
//! parameter block, keyed by model name: `{name}_q`, `{name}_p`,
//! `{name}_b_song`, `{name}_b_user`, `{name}_b_global`. Each blob is a
//! row/column header (u64 little-endian) followed by the f64 payload.
//! There is no schema evolution; any shape inconsistency on load is fatal.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::{Array1, Array2};

use super::LatentFactorModel;
use crate::error::{RecoError, Result};

fn blob_path(dir: &Path, name: &str, suffix: &str) -> std::path::PathBuf {
    dir.join(format!("{name}_{suffix}"))
}

fn write_blob<'a, I>(path: &Path, rows: usize, cols: usize, values: I) -> Result<()>
where
    I: Iterator<Item = &'a f64>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&(rows as u64).to_le_bytes())?;
    writer.write_all(&(cols as u64).to_le_bytes())?;
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn read_blob(path: &Path) -> Result<(usize, usize, Vec<f64>)> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut word = [0u8; 8];
    reader.read_exact(&mut word)?;
    let rows = u64::from_le_bytes(word);
    reader.read_exact(&mut word)?;
    let cols = u64::from_le_bytes(word);

    // The header fully determines the file length.
    let expected_len = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(8))
        .and_then(|n| n.checked_add(16));
    if expected_len != Some(file_len) {
        return Err(RecoError::Format(format!(
            "array blob {} claims {rows}x{cols} entries but holds {file_len} bytes",
            path.display()
        )));
    }

    let count = (rows * cols) as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        reader.read_exact(&mut word)?;
        values.push(f64::from_le_bytes(word));
    }

    Ok((rows as usize, cols as usize, values))
}

/// Writes every parameter block of `model` under `dir`, keyed by `name`.
pub fn save(model: &LatentFactorModel, dir: &Path, name: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    write_blob(
        &blob_path(dir, name, "q"),
        model.q.nrows(),
        model.q.ncols(),
        model.q.iter(),
    )?;
    write_blob(
        &blob_path(dir, name, "p"),
        model.p.nrows(),
        model.p.ncols(),
        model.p.iter(),
    )?;
    write_blob(
        &blob_path(dir, name, "b_song"),
        model.b_song.len(),
        1,
        model.b_song.iter(),
    )?;
    write_blob(
        &blob_path(dir, name, "b_user"),
        model.b_user.len(),
        1,
        model.b_user.iter(),
    )?;
    write_blob(
        &blob_path(dir, name, "b_global"),
        1,
        1,
        std::iter::once(&model.global_bias),
    )?;

    Ok(())
}

/// Reconstructs the model written by [`save`] bit-identically, validating
/// that all blocks agree on latent dimension and index counts.
pub fn load(dir: &Path, name: &str) -> Result<LatentFactorModel> {
    let (n_songs, q_dim, q_values) = read_blob(&blob_path(dir, name, "q"))?;
    let (n_users, p_dim, p_values) = read_blob(&blob_path(dir, name, "p"))?;

    if q_dim != p_dim {
        return Err(RecoError::Format(format!(
            "latent dimensions disagree: q is {q_dim}, p is {p_dim}"
        )));
    }

    let (b_song_len, b_song_cols, b_song) = read_blob(&blob_path(dir, name, "b_song"))?;
    if b_song_cols != 1 || b_song_len != n_songs {
        return Err(RecoError::Format(format!(
            "b_song has {b_song_len}x{b_song_cols} entries, expected {n_songs}x1"
        )));
    }

    let (b_user_len, b_user_cols, b_user) = read_blob(&blob_path(dir, name, "b_user"))?;
    if b_user_cols != 1 || b_user_len != n_users {
        return Err(RecoError::Format(format!(
            "b_user has {b_user_len}x{b_user_cols} entries, expected {n_users}x1"
        )));
    }

    let (g_rows, g_cols, global) = read_blob(&blob_path(dir, name, "b_global"))?;
    if g_rows != 1 || g_cols != 1 {
        return Err(RecoError::Format(format!(
            "b_global has {g_rows}x{g_cols} entries, expected a scalar"
        )));
    }

    let q = Array2::from_shape_vec((n_songs, q_dim), q_values)
        .map_err(|e| RecoError::Format(e.to_string()))?;
    let p = Array2::from_shape_vec((n_users, p_dim), p_values)
        .map_err(|e| RecoError::Format(e.to_string()))?;

    Ok(LatentFactorModel {
        q,
        p,
        b_song: Array1::from_vec(b_song),
        b_user: Array1::from_vec(b_user),
        global_bias: global[0],
    })
}
