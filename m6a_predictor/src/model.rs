//! Classifier artifact handling.
//!
//! The trained model travels as a JSON document (`ModelArtifact`)
//! holding the intercept, per-feature coefficients keyed by expanded
//! feature name, the training-time standardization statistics for the
//! numeric columns, a default decision threshold, and the feature
//! schema version it was fitted against. `LogisticModel::bind`
//! validates an artifact against a `FeatureSchema` and orders
//! everything into dense vectors; prediction is then a standardized
//! logistic score over the assembled feature matrix.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::errors::{PredictError, PredictResult};
use crate::schema::{FeatureSchema, NUMERIC_COLUMNS};

/// The one capability the pipeline needs from a trained model: per-row
/// probability of the Positive class, for a feature matrix assembled
/// in schema order. Implementations must be reentrant for read-only
/// inference.
pub trait Classifier: Send + Sync {
    fn predict_probability(&self, features: &Array2<f64>) -> PredictResult<Array1<f64>>;

    /// Width of the feature matrix this model expects.
    fn n_features(&self) -> usize;
}

/// Complete trained model data as persisted in JSON artifact files.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelArtifact {
    /// Feature schema the coefficients were fitted against.
    pub schema_version: String,
    pub intercept: f64,
    /// Expanded feature name -> coefficient.
    pub coefficients: HashMap<String, f64>,
    /// Numeric column name -> training mean.
    pub means: HashMap<String, f64>,
    /// Numeric column name -> training standard deviation.
    pub stds: HashMap<String, f64>,
    /// Decision threshold chosen at training time.
    pub threshold: f64,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> PredictResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PredictError::Model(format!("failed to read artifact {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            PredictError::Model(format!("failed to parse artifact {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PredictResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            PredictError::Model(format!("failed to serialize artifact: {e}"))
        })?;
        std::fs::write(path, json).map_err(|e| {
            PredictError::Model(format!("failed to write artifact {}: {e}", path.display()))
        })
    }
}

/// Standardized logistic scorer bound to a feature schema: coefficient
/// and statistic vectors are aligned with the expanded feature order,
/// so prediction is a straight matrix pass.
pub struct LogisticModel {
    intercept: f64,
    betas: Array1<f64>,
    means: Array1<f64>,
    stds: Array1<f64>,
    default_threshold: f64,
}

impl LogisticModel {
    /// Bind an artifact to the schema it claims to be trained against.
    ///
    /// Fails when the schema versions differ, when any expanded
    /// feature lacks a coefficient, when the artifact carries
    /// coefficients for features the schema does not declare, or when
    /// a numeric column is missing its training statistics. Catching
    /// all of this here means a successfully constructed model can
    /// never be misaligned with the matrices the pipeline assembles.
    pub fn bind(artifact: &ModelArtifact, schema: &FeatureSchema) -> PredictResult<Self> {
        if artifact.schema_version != schema.version() {
            return Err(PredictError::Model(format!(
                "artifact trained against schema `{}`, pipeline uses `{}`",
                artifact.schema_version,
                schema.version()
            )));
        }

        let names = schema.expanded_feature_names();

        let missing: Vec<&String> = names
            .iter()
            .filter(|n| !artifact.coefficients.contains_key(*n))
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::Model(format!(
                "artifact lacks coefficients for features {missing:?}"
            )));
        }
        let extra: Vec<&String> = artifact
            .coefficients
            .keys()
            .filter(|k| !names.iter().any(|n| n == *k))
            .collect();
        if !extra.is_empty() {
            return Err(PredictError::Model(format!(
                "artifact carries coefficients for undeclared features {extra:?}"
            )));
        }

        let mut betas = Array1::<f64>::zeros(names.len());
        let mut means = Array1::<f64>::zeros(names.len());
        let mut stds = Array1::<f64>::ones(names.len());

        for (j, name) in names.iter().enumerate() {
            betas[j] = artifact.coefficients[name];
            if NUMERIC_COLUMNS.contains(&name.as_str()) {
                let mean = artifact.means.get(name).ok_or_else(|| {
                    PredictError::Model(format!("artifact lacks training mean for `{name}`"))
                })?;
                let std = artifact.stds.get(name).ok_or_else(|| {
                    PredictError::Model(format!("artifact lacks training std for `{name}`"))
                })?;
                means[j] = *mean;
                stds[j] = std.max(1e-9);
            }
        }

        Ok(Self {
            intercept: artifact.intercept,
            betas,
            means,
            stds,
            default_threshold: artifact.threshold,
        })
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }
}

impl Classifier for LogisticModel {
    fn predict_probability(&self, features: &Array2<f64>) -> PredictResult<Array1<f64>> {
        if features.ncols() != self.betas.len() {
            return Err(PredictError::Model(format!(
                "feature matrix has {} columns, model expects {}",
                features.ncols(),
                self.betas.len()
            )));
        }

        // z-score with the stored training statistics, then sigmoid.
        let z = (features - &self.means) / &self.stds;
        let lin = z.dot(&self.betas) + self.intercept;
        Ok(lin.mapv(|v| 1.0 / (1.0 + (-v).exp())))
    }

    fn n_features(&self) -> usize {
        self.betas.len()
    }
}
