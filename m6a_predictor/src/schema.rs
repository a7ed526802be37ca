//! Training-time feature schema: column order, categorical level sets
//! and motif width. The schema is built once and bound to a classifier
//! artifact at pipeline construction, so training and inference cannot
//! silently drift apart.

use polars::frame::DataFrame;

/// Level order fixed at training time. Reordering any of these tables
/// misaligns the feature vector against the trained coefficients.
pub const RNA_TYPE_LEVELS: [&str; 4] = ["mRNA", "lincRNA", "lncRNA", "pseudogene"];
pub const RNA_REGION_LEVELS: [&str; 4] = ["CDS", "intron", "3'UTR", "5'UTR"];
pub const BASE_LEVELS: [&str; 4] = ["A", "T", "C", "G"];

pub const MOTIF_LEN: usize = 5;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "gc_content",
    "rna_type",
    "rna_region",
    "exon_length",
    "distance_to_junction",
    "evolutionary_conservation",
    "dna_5mer",
];

/// Columns carried through as raw numbers (z-scored with the training
/// statistics stored in the artifact); everything else is one-hot.
pub const NUMERIC_COLUMNS: [&str; 4] = [
    "gc_content",
    "exon_length",
    "distance_to_junction",
    "evolutionary_conservation",
];

pub const SCHEMA_VERSION: &str = "m6a-features-v1";

/// Immutable description of the feature layout a classifier was
/// trained on. `expanded` holds the one-hot feature names in the exact
/// order the assembled matrix uses.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    version: String,
    motif_len: usize,
    expanded: Vec<String>,
}

impl FeatureSchema {
    /// The v1 layout: gc_content, rna_type x4, rna_region x4,
    /// exon_length, distance_to_junction, evolutionary_conservation,
    /// then 4 base indicators per motif position.
    pub fn v1() -> Self {
        let mut expanded = Vec::with_capacity(12 + MOTIF_LEN * BASE_LEVELS.len());
        expanded.push("gc_content".to_string());
        for level in RNA_TYPE_LEVELS {
            expanded.push(format!("rna_type={level}"));
        }
        for level in RNA_REGION_LEVELS {
            expanded.push(format!("rna_region={level}"));
        }
        expanded.push("exon_length".to_string());
        expanded.push("distance_to_junction".to_string());
        expanded.push("evolutionary_conservation".to_string());
        for pos in 1..=MOTIF_LEN {
            for level in BASE_LEVELS {
                expanded.push(format!("position_{pos}={level}"));
            }
        }

        Self {
            version: SCHEMA_VERSION.to_string(),
            motif_len: MOTIF_LEN,
            expanded,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn motif_len(&self) -> usize {
        self.motif_len
    }

    /// Width of the assembled feature matrix.
    pub fn n_features(&self) -> usize {
        self.expanded.len()
    }

    /// One-hot feature names in assembly order.
    pub fn expanded_feature_names(&self) -> &[String] {
        &self.expanded
    }

    /// Required columns absent from `df`, in declaration order.
    pub fn missing_columns(&self, df: &DataFrame) -> Vec<String> {
        let present = df.get_column_names();
        REQUIRED_COLUMNS
            .iter()
            .filter(|name| !present.iter().any(|c| c.as_str() == **name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Index of `value` within a declared level set, `None` when the value
/// falls outside it.
pub fn level_index(levels: &[&str], value: &str) -> Option<usize> {
    levels.iter().position(|l| *l == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn expanded_layout_is_stable() {
        let schema = FeatureSchema::v1();
        let names = schema.expanded_feature_names();

        assert_eq!(schema.n_features(), 32);
        assert_eq!(names[0], "gc_content");
        assert_eq!(names[1], "rna_type=mRNA");
        assert_eq!(names[5], "rna_region=CDS");
        assert_eq!(names[8], "rna_region=5'UTR");
        assert_eq!(names[9], "exon_length");
        assert_eq!(names[11], "evolutionary_conservation");
        assert_eq!(names[12], "position_1=A");
        assert_eq!(names[31], "position_5=G");
    }

    #[test]
    fn missing_columns_reported_in_order() {
        let df = df![
            "gc_content" => &[0.5],
            "rna_type" => &["mRNA"],
            "exon_length" => &[100.0],
            "dna_5mer" => &["GGACA"]
        ]
        .unwrap();

        let schema = FeatureSchema::v1();
        assert_eq!(
            schema.missing_columns(&df),
            vec![
                "rna_region".to_string(),
                "distance_to_junction".to_string(),
                "evolutionary_conservation".to_string(),
            ]
        );
    }

    #[test]
    fn level_index_respects_declared_order() {
        assert_eq!(level_index(&RNA_REGION_LEVELS, "3'UTR"), Some(2));
        assert_eq!(level_index(&BASE_LEVELS, "T"), Some(1));
        assert_eq!(level_index(&RNA_TYPE_LEVELS, "tRNA"), None);
    }
}
