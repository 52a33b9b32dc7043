use anomola::model::{self, AnomalyModel};
use anomola::tracking::Experiment;
use anomola::vision;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder containing training images
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Folder containing test images (resized in place to the training size)
    #[arg(long, default_value = "test-data")]
    test_dir: PathBuf,

    /// Tracking store root folder
    #[arg(long, default_value = "runs")]
    tracking_dir: PathBuf,

    /// Experiment name under the tracking store
    #[arg(long, default_value = "anomaly-detection")]
    experiment: String,

    /// Decision threshold: scores below it count as anomalies
    #[arg(long, default_value_t = model::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Training data: {}", args.data_dir.display());
    tracing::info!("Test data: {}", args.test_dir.display());

    let training_paths = vision::image_paths(&args.data_dir);
    let training_images = vision::load_images(&training_paths);
    tracing::info!("Loaded {} training images", training_images.len());

    let experiment = Experiment::new(&args.tracking_dir, &args.experiment)?;
    let run = experiment.start_run()?;
    run.log_param("threshold", &args.threshold.to_string())?;

    // Log the training listing, then drop the temporary file.
    let listing = PathBuf::from("train_data_paths.txt");
    let listing_text: String = training_paths
        .iter()
        .map(|p| format!("{}\n", p.display()))
        .collect();
    std::fs::write(&listing, listing_text).context("Failed to write the training listing")?;
    run.log_artifact(&listing)?;
    std::fs::remove_file(&listing).context("Failed to remove the training listing")?;

    let model = AnomalyModel::fit(&training_images).context("Failed to fit the outlier model")?;
    run.log_model(&model, "isolation_forest_model")?;

    // Bring every test image to the training dimensions before scoring.
    let target = model.expected_dimensions();
    let test_paths = vision::image_paths(&args.test_dir);
    for path in &test_paths {
        if let Err(e) = vision::resize_if_needed(path, target) {
            tracing::warn!("Skipping {}: {:#}", path.display(), e);
        }
    }

    let mut results = Vec::new();
    for path in &test_paths {
        let image = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                tracing::warn!("Skipping unreadable test image {}: {}", path.display(), e);
                continue;
            }
        };
        let verdict = if model.is_anomaly(&image, args.threshold)? {
            tracing::warn!("{} is an anomaly!", path.display());
            "anomaly"
        } else {
            tracing::info!("{} is not an anomaly", path.display());
            "not_anomaly"
        };
        results.push((path, verdict));
    }

    let results_file = PathBuf::from("anomaly_results.txt");
    let results_text: String = results
        .iter()
        .map(|(path, verdict)| format!("{}: {}\n", path.display(), verdict))
        .collect();
    std::fs::write(&results_file, results_text).context("Failed to write the anomaly results")?;
    run.log_artifact(&results_file)?;
    std::fs::remove_file(&results_file).context("Failed to remove the anomaly results")?;

    run.finish()?;
    tracing::info!("Scored {} test images", results.len());
    Ok(())
}
