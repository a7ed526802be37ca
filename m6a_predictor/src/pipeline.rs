//! Batch and single-site m6A prediction.
//!
//! A `PredictionPipeline` couples a bound classifier with the feature
//! schema it was trained against and turns candidate-site tables into
//! the same tables augmented with `predicted_m6a_probability` and
//! `predicted_m6a_status`. The single-site surface is a one-row
//! adapter over the batch path, so validation, encoding and
//! thresholding have exactly one implementation.

use ndarray::Array2;
use polars::prelude::*;
use tracing::{info, warn};

use crate::encoder;
use crate::errors::{PredictError, PredictResult};
use crate::model::Classifier;
use crate::schema::{level_index, FeatureSchema, BASE_LEVELS, RNA_REGION_LEVELS, RNA_TYPE_LEVELS};

pub const PROB_COLUMN: &str = "predicted_m6a_probability";
pub const STATUS_COLUMN: &str = "predicted_m6a_status";
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// How out-of-set categorical values (including non-ACGT motif bases)
/// are handled. `Warn` reproduces the reference degradation: the
/// offending one-hot block stays all zeros, a warning is logged, and a
/// prediction is still produced. `Strict` fails the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryPolicy {
    #[default]
    Warn,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum M6aStatus {
    Positive,
    Negative,
}

impl M6aStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            M6aStatus::Positive => "Positive",
            M6aStatus::Negative => "Negative",
        }
    }
}

/// Result of scoring one candidate site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SitePrediction {
    pub probability: f64,
    pub status: M6aStatus,
}

pub struct PredictionPipeline<C: Classifier> {
    model: C,
    schema: FeatureSchema,
    policy: CategoryPolicy,
}

impl<C: Classifier> PredictionPipeline<C> {
    /// Couple a classifier with its schema. The width check here is
    /// the last line of defense against a model/schema mismatch that
    /// would otherwise score garbage silently.
    pub fn new(model: C, schema: FeatureSchema, policy: CategoryPolicy) -> PredictResult<Self> {
        if model.n_features() != schema.n_features() {
            return Err(PredictError::Model(format!(
                "model expects {} features, schema `{}` declares {}",
                model.n_features(),
                schema.version(),
                schema.n_features()
            )));
        }
        Ok(Self {
            model,
            schema,
            policy,
        })
    }

    /// Score every row of `records`, returning the input table plus
    /// the probability and status columns. Row count and order are
    /// preserved; extra columns pass through untouched.
    ///
    /// A probability strictly greater than `threshold` classifies
    /// Positive; equality classifies Negative.
    pub fn predict_batch(&self, records: &DataFrame, threshold: f64) -> PredictResult<DataFrame> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PredictError::Threshold(threshold));
        }
        let missing = self.schema.missing_columns(records);
        if !missing.is_empty() {
            return Err(PredictError::Schema { missing });
        }

        let n = records.height();
        let mut out = records.clone();
        if n == 0 {
            out.with_column(Series::new(PlSmallStr::from(PROB_COLUMN), Vec::<f64>::new()))?;
            out.with_column(Series::new(PlSmallStr::from(STATUS_COLUMN), Vec::<&str>::new()))?;
            return Ok(out);
        }

        info!("Scoring {} candidate m6A sites", n);

        let motif_col = records.column("dna_5mer")?.str()?;
        let motifs: Vec<&str> = motif_col.into_iter().map(|m| m.unwrap_or("")).collect();
        let encoded = encoder::encode(&motifs)?;
        if encoded.width() != self.schema.motif_len() {
            return Err(PredictError::Shape {
                expected: self.schema.motif_len(),
                got: encoded.width(),
                row: 0,
            });
        }

        // Column layout must mirror FeatureSchema::v1 exactly.
        let mut x = Array2::<f64>::zeros((n, self.schema.n_features()));
        let mut j = 0;
        self.fill_numeric(&mut x, j, records, "gc_content")?;
        j += 1;
        self.fill_one_hot(&mut x, j, "rna_type", records.column("rna_type")?.str()?, &RNA_TYPE_LEVELS)?;
        j += RNA_TYPE_LEVELS.len();
        self.fill_one_hot(&mut x, j, "rna_region", records.column("rna_region")?.str()?, &RNA_REGION_LEVELS)?;
        j += RNA_REGION_LEVELS.len();
        self.fill_numeric(&mut x, j, records, "exon_length")?;
        j += 1;
        self.fill_numeric(&mut x, j, records, "distance_to_junction")?;
        j += 1;
        self.fill_numeric(&mut x, j, records, "evolutionary_conservation")?;
        j += 1;
        for pos in 1..=self.schema.motif_len() {
            let name = format!("position_{pos}");
            self.fill_one_hot(&mut x, j, &name, encoded.column(&name)?.str()?, &BASE_LEVELS)?;
            j += BASE_LEVELS.len();
        }
        debug_assert_eq!(j, self.schema.n_features());

        let prob = self.model.predict_probability(&x)?;

        let status: Vec<&str> = prob
            .iter()
            .map(|&p| {
                if p > threshold {
                    M6aStatus::Positive.as_str()
                } else {
                    M6aStatus::Negative.as_str()
                }
            })
            .collect();

        out.with_column(Series::new(PlSmallStr::from(PROB_COLUMN), prob.to_vec()))?;
        out.with_column(Series::new(PlSmallStr::from(STATUS_COLUMN), status))?;
        Ok(out)
    }

    /// Score one candidate site from scalar attributes. Builds a
    /// one-row table and delegates to [`predict_batch`]; no logic of
    /// its own.
    ///
    /// [`predict_batch`]: PredictionPipeline::predict_batch
    #[allow(clippy::too_many_arguments)]
    pub fn predict_single(
        &self,
        gc_content: f64,
        rna_type: &str,
        rna_region: &str,
        exon_length: f64,
        distance_to_junction: f64,
        evolutionary_conservation: f64,
        dna_5mer: &str,
        threshold: f64,
    ) -> PredictResult<SitePrediction> {
        let records = df!(
            "gc_content" => [gc_content],
            "rna_type" => [rna_type],
            "rna_region" => [rna_region],
            "exon_length" => [exon_length],
            "distance_to_junction" => [distance_to_junction],
            "evolutionary_conservation" => [evolutionary_conservation],
            "dna_5mer" => [dna_5mer]
        )?;

        let scored = self.predict_batch(&records, threshold)?;
        let probability = scored
            .column(PROB_COLUMN)?
            .f64()?
            .get(0)
            .ok_or_else(|| PredictError::Model("prediction produced no output row".to_string()))?;
        let status = match scored.column(STATUS_COLUMN)?.str()?.get(0) {
            Some(s) if s == M6aStatus::Positive.as_str() => M6aStatus::Positive,
            _ => M6aStatus::Negative,
        };
        Ok(SitePrediction {
            probability,
            status,
        })
    }

    fn fill_numeric(
        &self,
        x: &mut Array2<f64>,
        j: usize,
        records: &DataFrame,
        name: &str,
    ) -> PredictResult<()> {
        // Integer CSV columns arrive as i64; cast before reading.
        let col = records.column(name)?.cast(&DataType::Float64)?;
        for (i, v) in col.f64()?.into_iter().enumerate() {
            x[[i, j]] = v.unwrap_or(f64::NAN);
        }
        Ok(())
    }

    fn fill_one_hot(
        &self,
        x: &mut Array2<f64>,
        block_start: usize,
        column: &str,
        values: &StringChunked,
        levels: &[&str],
    ) -> PredictResult<()> {
        for (row, value) in values.into_iter().enumerate() {
            match value.and_then(|v| level_index(levels, v)) {
                Some(k) => x[[row, block_start + k]] = 1.0,
                None => {
                    let shown = value.unwrap_or("<null>");
                    match self.policy {
                        CategoryPolicy::Strict => {
                            return Err(PredictError::Category {
                                column: column.to_string(),
                                row,
                                value: shown.to_string(),
                            })
                        }
                        CategoryPolicy::Warn => warn!(
                            "unrecognized category {:?} in column `{}` at row {}; prediction for this row is unreliable",
                            shown, column, row
                        ),
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogisticModel, ModelArtifact};
    use crate::schema::NUMERIC_COLUMNS;
    use ndarray::Array1;
    use polars::df;
    use std::collections::HashMap;

    /// Echoes the first feature column (raw gc_content) as the
    /// probability.
    struct GcModel;

    impl Classifier for GcModel {
        fn predict_probability(&self, features: &Array2<f64>) -> PredictResult<Array1<f64>> {
            Ok(features.column(0).to_owned())
        }

        fn n_features(&self) -> usize {
            FeatureSchema::v1().n_features()
        }
    }

    struct ConstModel(f64);

    impl Classifier for ConstModel {
        fn predict_probability(&self, features: &Array2<f64>) -> PredictResult<Array1<f64>> {
            Ok(Array1::from_elem(features.nrows(), self.0))
        }

        fn n_features(&self) -> usize {
            FeatureSchema::v1().n_features()
        }
    }

    fn sites() -> DataFrame {
        df![
            "site_id" => &["chr1:1014", "chr7:8802"],
            "gc_content" => &[0.3, 0.7],
            "rna_type" => &["mRNA", "lncRNA"],
            "rna_region" => &["CDS", "3'UTR"],
            "exon_length" => &[120.0, 64.0],
            "distance_to_junction" => &[8.0, -12.0],
            "evolutionary_conservation" => &[0.6, 0.2],
            "dna_5mer" => &["GGACA", "GGACT"]
        ]
        .unwrap()
    }

    fn pipeline<C: Classifier>(model: C, policy: CategoryPolicy) -> PredictionPipeline<C> {
        PredictionPipeline::new(model, FeatureSchema::v1(), policy).unwrap()
    }

    fn trained_artifact(gc_beta: f64) -> ModelArtifact {
        let schema = FeatureSchema::v1();
        let mut coefficients: HashMap<String, f64> = schema
            .expanded_feature_names()
            .iter()
            .map(|n| (n.clone(), 0.0))
            .collect();
        coefficients.insert("gc_content".to_string(), gc_beta);
        ModelArtifact {
            schema_version: schema.version().to_string(),
            intercept: 0.0,
            coefficients,
            means: NUMERIC_COLUMNS.iter().map(|n| (n.to_string(), 0.0)).collect(),
            stds: NUMERIC_COLUMNS.iter().map(|n| (n.to_string(), 1.0)).collect(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    #[test]
    fn batch_preserves_rows_and_passes_extra_columns_through() {
        let p = pipeline(GcModel, CategoryPolicy::Warn);
        let scored = p.predict_batch(&sites(), 0.5).unwrap();

        assert_eq!(scored.height(), 2);
        let ids = scored.column("site_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("chr1:1014"));
        assert_eq!(ids.get(1), Some("chr7:8802"));

        let prob = scored.column(PROB_COLUMN).unwrap().f64().unwrap();
        assert_eq!(prob.get(0), Some(0.3));
        assert_eq!(prob.get(1), Some(0.7));

        let status = scored.column(STATUS_COLUMN).unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("Negative"));
        assert_eq!(status.get(1), Some("Positive"));
    }

    #[test]
    fn probability_equal_to_threshold_classifies_negative() {
        let p = pipeline(ConstModel(0.5), CategoryPolicy::Warn);

        let scored = p.predict_batch(&sites(), 0.5).unwrap();
        let status = scored.column(STATUS_COLUMN).unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("Negative"));
        assert_eq!(status.get(1), Some("Negative"));

        let scored = p.predict_batch(&sites(), 0.49).unwrap();
        let status = scored.column(STATUS_COLUMN).unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("Positive"));
    }

    #[test]
    fn single_site_matches_batch_row() {
        let p = pipeline(GcModel, CategoryPolicy::Warn);

        let batch = p.predict_batch(&sites(), 0.5).unwrap();
        let single = p
            .predict_single(0.7, "lncRNA", "3'UTR", 64.0, -12.0, 0.2, "GGACT", 0.5)
            .unwrap();

        assert_eq!(
            Some(single.probability),
            batch.column(PROB_COLUMN).unwrap().f64().unwrap().get(1)
        );
        assert_eq!(single.status, M6aStatus::Positive);
    }

    #[test]
    fn missing_columns_fail_with_all_names() {
        let df = df![
            "gc_content" => &[0.5],
            "rna_type" => &["mRNA"],
            "exon_length" => &[100.0],
            "distance_to_junction" => &[4.0],
            "dna_5mer" => &["GGACA"]
        ]
        .unwrap();

        let p = pipeline(GcModel, CategoryPolicy::Warn);
        match p.predict_batch(&df, 0.5).unwrap_err() {
            PredictError::Schema { missing } => {
                assert_eq!(missing, vec!["rna_region", "evolutionary_conservation"]);
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn ragged_motifs_fail_with_shape_error() {
        let mut df = sites();
        df.with_column(Series::new(PlSmallStr::from("dna_5mer"), ["GGACA", "GGAC"]))
            .unwrap();

        let p = pipeline(GcModel, CategoryPolicy::Warn);
        assert!(matches!(
            p.predict_batch(&df, 0.5),
            Err(PredictError::Shape { expected: 5, got: 4, row: 1 })
        ));
    }

    #[test]
    fn motif_width_must_match_schema() {
        let mut df = sites();
        df.with_column(Series::new(PlSmallStr::from("dna_5mer"), ["GGAC", "TGAC"]))
            .unwrap();

        let p = pipeline(GcModel, CategoryPolicy::Warn);
        assert!(matches!(
            p.predict_batch(&df, 0.5),
            Err(PredictError::Shape { expected: 5, got: 4, .. })
        ));
    }

    #[test]
    fn out_of_domain_threshold_is_rejected() {
        let p = pipeline(GcModel, CategoryPolicy::Warn);
        assert!(matches!(
            p.predict_batch(&sites(), 1.1),
            Err(PredictError::Threshold(_))
        ));
        assert!(matches!(
            p.predict_batch(&sites(), -0.01),
            Err(PredictError::Threshold(_))
        ));
        assert!(matches!(
            p.predict_batch(&sites(), f64::NAN),
            Err(PredictError::Threshold(_))
        ));
    }

    #[test]
    fn strict_policy_fails_on_unknown_category() {
        let mut df = sites();
        df.with_column(Series::new(PlSmallStr::from("rna_type"), ["tRNA", "mRNA"]))
            .unwrap();

        let p = pipeline(GcModel, CategoryPolicy::Strict);
        match p.predict_batch(&df, 0.5).unwrap_err() {
            PredictError::Category { column, row, value } => {
                assert_eq!(column, "rna_type");
                assert_eq!(row, 0);
                assert_eq!(value, "tRNA");
            }
            other => panic!("expected Category error, got {other:?}"),
        }
    }

    #[test]
    fn warn_policy_still_scores_unknown_categories() {
        let mut df = sites();
        df.with_column(Series::new(PlSmallStr::from("rna_type"), ["tRNA", "mRNA"]))
            .unwrap();
        df.with_column(Series::new(PlSmallStr::from("dna_5mer"), ["ggaca", "GGACT"]))
            .unwrap();

        let p = pipeline(ConstModel(0.8), CategoryPolicy::Warn);
        let scored = p.predict_batch(&df, 0.5).unwrap();
        assert_eq!(scored.height(), 2);
        let status = scored.column(STATUS_COLUMN).unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("Positive"));
    }

    #[test]
    fn fixed_scenario_is_reproducible() {
        let schema = FeatureSchema::v1();
        let model = LogisticModel::bind(&trained_artifact(2.0), &schema).unwrap();
        let p = PredictionPipeline::new(model, schema, CategoryPolicy::Warn).unwrap();

        let first = p
            .predict_single(0.45, "mRNA", "3'UTR", 10.0, 8.0, 0.6, "GGACA", 0.5)
            .unwrap();
        let second = p
            .predict_single(0.45, "mRNA", "3'UTR", 10.0, 8.0, 0.6, "GGACA", 0.5)
            .unwrap();

        assert_eq!(first, second);
        let expected = 1.0 / (1.0 + (-0.9_f64).exp());
        assert!((first.probability - expected).abs() < 1e-12);
        assert_eq!(first.status, M6aStatus::Positive);
    }

    #[test]
    fn empty_batch_yields_empty_output_columns() {
        let df = sites().head(Some(0));
        let p = pipeline(GcModel, CategoryPolicy::Warn);
        let scored = p.predict_batch(&df, 0.5).unwrap();
        assert_eq!(scored.height(), 0);
        assert!(scored.column(PROB_COLUMN).is_ok());
        assert!(scored.column(STATUS_COLUMN).is_ok());
    }
}
