use clap::Parser;
use naksha_classifier::BuildingClassifier;
use naksha_core::LabelTable;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints the top-3 building predictions of each image as one JSON line.
#[derive(Parser, Debug)]
#[command(name = "naksha-classify", version)]
struct Args {
    /// ONNX export of the classifier.
    #[arg(long, env = "NAKSHA_MODEL")]
    model: PathBuf,

    /// Labels file, one per line. Defaults to the five campus buildings.
    #[arg(long, env = "NAKSHA_LABELS")]
    labels: Option<PathBuf>,

    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ort=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    let labels = match &args.labels {
        Some(path) => LabelTable::from_file(path)?,
        None => LabelTable::campus_buildings(),
    };
    let classifier = BuildingClassifier::load(&args.model, labels)?;

    for image in &args.images {
        let outcome = classifier.predict_outcome(image);
        println!("{}", serde_json::to_string(&outcome)?);
    }

    Ok(())
}
