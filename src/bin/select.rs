use anomola::selector::{SelectorConfig, SelectorSession, SelectorWindow};
use anomola::source::{FrameSource, VideoFileSource};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to play
    video: PathBuf,

    /// Folder receiving the crop files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Crop file prefix; defaults to the video file stem
    #[arg(long)]
    prefix: Option<String>,

    /// Skip this many seconds of video before the first frame
    #[arg(long)]
    start_second: Option<f64>,

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

    let prefix = match &args.prefix {
        Some(prefix) => prefix.clone(),
        None => args
            .video
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video")
            .to_string(),
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    tracing::info!("Playing {}", args.video.display());
    let source = VideoFileSource::with_start_second(&args.video, args.start_second)?;
    let (width, height) = source.resolution();

    let mut window = SelectorWindow::new(&prefix, width, height)
        .context("Failed to open the preview window")?;

    let mut config = SelectorConfig::new(&args.output_dir, &prefix);
    config.periodic_interval = Duration::from_secs(args.periodic_secs);

    tracing::info!("Keys: a=add area, w=write crops, p=periodic writes, u=undo, q=quit");
    let mut session = SelectorSession::new(source, config);
    session.run(&mut window)
}
