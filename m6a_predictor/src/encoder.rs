//! Positional encoding of fixed-width nucleotide motifs.
//!
//! A batch of equal-length motif strings becomes one string column per
//! position (`position_1`..`position_L`), each over the {A,T,C,G}
//! domain. Encoding is per-base independent; no joint k-mer features.

use polars::prelude::*;

use crate::errors::{PredictError, PredictResult};

/// Split a non-empty batch of motifs into positional columns.
///
/// The width is taken from the first motif; every other motif must
/// match it exactly, otherwise the whole batch fails with a shape
/// error naming the offending row. Deterministic, no I/O.
///
/// Alphabet membership is not checked here: out-of-domain characters
/// are handled at one-hot assembly under the pipeline's category
/// policy.
pub fn encode(motifs: &[&str]) -> PredictResult<DataFrame> {
    let width = motifs
        .first()
        .map(|m| m.chars().count())
        .ok_or(PredictError::Shape {
            expected: 1,
            got: 0,
            row: 0,
        })?;

    let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(motifs.len()); width];
    for (row, motif) in motifs.iter().enumerate() {
        let got = motif.chars().count();
        if got != width {
            return Err(PredictError::Shape {
                expected: width,
                got,
                row,
            });
        }
        for (pos, base) in motif.chars().enumerate() {
            columns[pos].push(base.to_string());
        }
    }

    let mut df = DataFrame::default();
    for (pos, col) in columns.into_iter().enumerate() {
        df.with_column(Series::new(PlSmallStr::from(format!("position_{}", pos + 1)), col))?;
    }
    Ok(df)
}
