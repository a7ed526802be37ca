use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::helper_functions::{dataframe_to_csv, read_csv};
use crate::model::{LogisticModel, ModelArtifact};
use crate::pipeline::{CategoryPolicy, PredictionPipeline};
use crate::schema::FeatureSchema;

mod encoder;
mod errors;
mod helper_functions;
mod model;
mod pipeline;
mod schema;

const DEFAULT_MODEL_PATH: &str = "./data/m6a_logistic_model.json";
const DEFAULT_INPUT_PATH: &str = "./data/candidate_sites.csv";
const DEFAULT_OUTPUT_PATH: &str = "./m6a_predictions.csv";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting the m6A prediction pipeline");

    let mut args = std::env::args().skip(1);
    let model_path = args.next().unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());
    let input_path = args.next().unwrap_or_else(|| DEFAULT_INPUT_PATH.to_string());
    let output_path = args.next().unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string());

    let schema = FeatureSchema::v1();
    let artifact = ModelArtifact::load(&model_path)?;
    let model = LogisticModel::bind(&artifact, &schema)?;
    let threshold = model.default_threshold();
    info!(
        "Loaded classifier from {} (schema {}, threshold {:.3})",
        model_path,
        schema.version(),
        threshold
    );

    let pipeline = PredictionPipeline::new(model, schema, CategoryPolicy::Warn)?;

    let df = read_csv(&input_path).with_context(|| format!("reading {input_path}"))?;
    info!("Loaded {} candidate sites from {}", df.height(), input_path);

    let mut scored = pipeline.predict_batch(&df, threshold)?;

    dataframe_to_csv(&mut scored, &output_path, true)
        .with_context(|| format!("writing {output_path}"))?;
    info!("Predictions written to {}", output_path);

    Ok(())
}
