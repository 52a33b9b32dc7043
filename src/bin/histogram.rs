use anomola::{plot, stats};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulation result JSON file
    input: PathBuf,

    /// Top-level run key to read from the document
    #[arg(long)]
    run_key: String,

    /// Output SVG path
    #[arg(long, default_value = "histogram.svg")]
    output: PathBuf,

    /// Number of histogram bins
    #[arg(long, default_value_t = 100)]
    bins: usize,

    /// Plot title; defaults to an event-count caption
    #[arg(long)]
    title: Option<String>,

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

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let doc: serde_json::Value =
        serde_json::from_str(&raw).context("Failed to parse the result document")?;

    let values = stats::extract_vector(&doc, &args.run_key)?;
    tracing::info!("Loaded {} values from '{}'", values.len(), args.run_key);

    let summary = stats::summarize(&values)?;
    let hist = stats::histogram(&values, args.bins)?;

    let title = match &args.title {
        Some(title) => title.clone(),
        None => format!("Histogram for {} events", values.len()),
    };
    plot::render_histogram(&hist, &summary, &title, &args.output)?;

    tracing::info!(
        "Mean: {:.2}, Variance: {:.2}, Standard deviation: {:.2}",
        summary.mean,
        summary.variance,
        summary.std_dev
    );
    tracing::info!("Wrote {}", args.output.display());
    Ok(())
}
