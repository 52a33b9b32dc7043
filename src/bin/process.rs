use anomola::blobstore::{self, ContainerClient};
use anomola::selector::{SelectorConfig, SelectorSession, SelectorWindow};
use anomola::source::{FrameSource, VideoFileSource};
use anomola::tracking::Experiment;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Blob container holding the recordings
    #[arg(long, default_value = "recordings")]
    container: String,

    /// Folder where downloaded videos land
    #[arg(long, default_value = "prerecordings")]
    video_dir: PathBuf,

    /// Folder receiving the crop files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Tracking store root folder
    #[arg(long, default_value = "runs")]
    tracking_dir: PathBuf,

    /// Experiment name under the tracking store
    #[arg(long, default_value = "video-processing")]
    experiment: String,

    /// Seconds between periodic crop writes once enabled with `p`
    #[arg(long, default_value_t = 600)]
    periodic_secs: u64,

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

    let client = match ContainerClient::from_env(&args.container) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&args.video_dir)
        .with_context(|| format!("Failed to create {}", args.video_dir.display()))?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let experiment = Experiment::new(&args.tracking_dir, &args.experiment)?;
    let run = experiment.start_run()?;
    run.log_param("video_dir", &args.video_dir.display().to_string())?;
    run.log_param("output_dir", &args.output_dir.display().to_string())?;

    for (num, blob) in client.list_blobs().iter().enumerate() {
        let label = blobstore::recording_label(blob)?;
        run.log_param(&format!("blob_{num}"), &label)?;

        let dest = args.video_dir.join(&label);
        let video = client.download_blob(blob, &dest, true)?;

        tracing::info!("Opening the selector for {}", label);
        let source = VideoFileSource::open(&video)?;
        let (width, height) = source.resolution();
        let mut window = SelectorWindow::new(&label, width, height)
            .context("Failed to open the preview window")?;

        let mut config = SelectorConfig::new(&args.output_dir, &label);
        config.periodic_interval = Duration::from_secs(args.periodic_secs);
        let mut session = SelectorSession::new(source, config);
        session.run(&mut window)?;

        // Attach this recording's crops to the run.
        for entry in std::fs::read_dir(&args.output_dir)
            .with_context(|| format!("Failed to read {}", args.output_dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            let from_this_recording = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&label))
                .unwrap_or(false);
            if path.is_file() && from_this_recording {
                run.log_artifact(&path)?;
            }
        }
    }

    run.finish()
}
