use super::FrameSource;
use anyhow::{Context, Result};
use image::RgbImage;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Frame source backed by an ffmpeg child process decoding a video file
/// into raw RGB24 frames on its stdout.
#[derive(Debug)]
pub struct VideoFileSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_len: usize,
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

impl VideoFileSource {
    /// Open a video file and decode from its first frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_start_second(path, None)
    }

    /// Open a video file, skipping the first `start_second` seconds.
    pub fn with_start_second(path: impl AsRef<Path>, start_second: Option<f64>) -> Result<Self> {
        let path = path.as_ref();
        anyhow::ensure!(
            path.is_file(),
            "Video file {} does not exist",
            path.display()
        );

        let (width, height) = probe_dimensions(path)?;
        tracing::info!("Opening {} at {}x{}", path.display(), width, height);

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error"]);
        if let Some(seconds) = start_second {
            cmd.args(["-ss", &seconds.to_string()]);
        }
        cmd.arg("-i")
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .context("Failed to start ffmpeg (is it installed?)")?;
        let stdout = child
            .stdout
            .take()
            .context("Failed to attach to ffmpeg stdout")?;

        Ok(Self {
            child,
            stdout,
            width,
            height,
            frame_len: (width * height * 3) as usize,
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for VideoFileSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .stdout
                .read(&mut buf[filled..])
                .with_context(|| format!("Failed to read frame from {}", self.path.display()))?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                anyhow::bail!(
                    "Truncated frame ({} of {} bytes) from {}",
                    filled,
                    self.frame_len,
                    self.path.display()
                );
            }
            filled += n;
        }

        let frame = RgbImage::from_raw(self.width, self.height, buf)
            .context("Frame buffer does not match the probed resolution")?;
        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        // Stop the decoder if the session ends before the file does.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe (is ffmpeg installed?)")?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let probe: ProbeOutput =
        serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;
    let stream = probe
        .streams
        .first()
        .with_context(|| format!("No video stream in {}", path.display()))?;

    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => anyhow::bail!("No video dimensions reported for {}", path.display()),
    }
}
