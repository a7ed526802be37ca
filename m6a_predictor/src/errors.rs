//! Error taxonomy for the prediction pipeline.
//! Every failure is surfaced synchronously to the caller; nothing is
//! retried or locally recovered.

use polars::error::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// Required input columns are absent from the record table.
    #[error("missing required columns: {missing:?}")]
    Schema { missing: Vec<String> },

    /// Motif width inconsistent within the batch, or mismatched to the
    /// width the model was trained on.
    #[error("motif length mismatch at row {row}: expected {expected}nt, got {got}nt")]
    Shape {
        expected: usize,
        got: usize,
        row: usize,
    },

    /// A categorical value outside the declared level set, under the
    /// strict category policy.
    #[error("unrecognized category {value:?} in column `{column}` at row {row}")]
    Category {
        column: String,
        row: usize,
        value: String,
    },

    /// Decision threshold outside [0, 1].
    #[error("threshold {0} is outside [0, 1]")]
    Threshold(f64),

    /// Classifier artifact loading, binding, or invocation failed.
    #[error("classifier error: {0}")]
    Model(String),

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

pub type PredictResult<T> = Result<T, PredictError>;
