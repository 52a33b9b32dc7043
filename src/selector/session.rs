use super::area::MarkedArea;
use super::{overlay, PreviewSurface};
use crate::source::FrameSource;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Commands the preview surface translates key presses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// `q`: end the session
    Quit,
    /// `a`: start marking a new area
    AddArea,
    /// `w`: write one crop per committed area now
    WriteNow,
    /// `p`: arm periodic crop writing
    EnablePeriodic,
    /// `u`: discard the most recently added area
    Undo,
}

/// Pointer activity routed to the area currently being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Pressed(u32, u32),
    Moved(u32, u32),
    Released(u32, u32),
}

/// Border colors cycle through this palette as areas are added.
const PALETTE: [Rgb<u8>; 5] = [
    Rgb([66, 135, 245]),
    Rgb([235, 64, 52]),
    Rgb([50, 168, 82]),
    Rgb([245, 197, 66]),
    Rgb([186, 85, 211]),
];

pub struct SelectorConfig {
    pub output_dir: PathBuf,
    pub prefix: String,
    /// Pixels trimmed from every crop edge so the drawn border stays out
    /// of the saved image.
    pub inset: u32,
    pub periodic_interval: Duration,
}

impl SelectorConfig {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            inset: 5,
            periodic_interval: Duration::from_secs(600),
        }
    }
}

/// Re-arming countdown for the periodic crop writer.
pub struct PeriodicTimer {
    interval: Duration,
    armed_at: Option<Instant>,
    counter: u32,
}

impl PeriodicTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed_at: None,
            counter: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Start (or restart) the countdown from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
    }

    /// Once a full interval has passed, hand out the next write index and
    /// restart the countdown.
    pub fn due(&mut self, now: Instant) -> Option<u32> {
        let armed_at = self.armed_at?;
        if now.duration_since(armed_at) < self.interval {
            return None;
        }
        self.armed_at = Some(now);
        let index = self.counter;
        self.counter += 1;
        Some(index)
    }
}

/// Interactive state for marking areas over a video and writing crops.
///
/// The session owns the frame source and the marked areas; the surface it
/// runs against only displays frames and reports input.
pub struct SelectorSession<S> {
    source: S,
    config: SelectorConfig,
    areas: Vec<MarkedArea>,
    active: Option<usize>,
    timer: PeriodicTimer,
}

impl<S: FrameSource> SelectorSession<S> {
    pub fn new(source: S, config: SelectorConfig) -> Self {
        let timer = PeriodicTimer::new(config.periodic_interval);
        Self {
            source,
            config,
            areas: Vec::new(),
            active: None,
            timer,
        }
    }

    pub fn areas(&self) -> &[MarkedArea] {
        &self.areas
    }

    pub fn active_area(&self) -> Option<&MarkedArea> {
        self.active.and_then(|i| self.areas.get(i))
    }

    /// Apply a key command. Returns `false` when the session should end.
    pub fn handle_command(
        &mut self,
        command: SessionCommand,
        frame: Option<&RgbImage>,
        now: Instant,
    ) -> Result<bool> {
        match command {
            SessionCommand::Quit => {
                tracing::info!("Quit requested");
                return Ok(false);
            }
            SessionCommand::AddArea => {
                let name = format!("area_{}", self.areas.len());
                let color = PALETTE[self.areas.len() % PALETTE.len()];
                tracing::info!("Marking new area {}", name);
                self.areas.push(MarkedArea::new(name, color));
                self.active = Some(self.areas.len() - 1);
            }
            SessionCommand::WriteNow => match frame {
                Some(frame) => {
                    self.write_crops(frame, "")?;
                }
                None => tracing::warn!("No frame available to write yet"),
            },
            SessionCommand::EnablePeriodic => {
                tracing::info!(
                    "Periodic crop writing enabled every {}s",
                    self.config.periodic_interval.as_secs()
                );
                self.timer.arm(now);
            }
            SessionCommand::Undo => {
                match self.areas.pop() {
                    Some(area) => tracing::info!("Removed {}", area.name()),
                    None => tracing::info!("No areas to remove"),
                }
                // The pointer must not keep driving a removed area.
                self.active = match self.active {
                    Some(i) if i < self.areas.len() => Some(i),
                    _ => None,
                };
            }
        }
        Ok(true)
    }

    /// Route a pointer event to the area currently being edited.
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        let Some(index) = self.active else { return };
        let Some(area) = self.areas.get_mut(index) else {
            return;
        };
        match event {
            MouseEvent::Pressed(x, y) => area.press(x, y),
            MouseEvent::Moved(x, y) => area.drag(x, y),
            MouseEvent::Released(x, y) => area.release(x, y),
        }
    }

    /// Write one crop per committed area. Periodic writes pass a postfix
    /// carrying the write index; manual writes pass an empty one.
    pub fn write_crops(&self, frame: &RgbImage, postfix: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for area in &self.areas {
            let Some(crop) = area.crop(frame, self.config.inset) else {
                tracing::warn!("Skipping {}: not committed or too small", area.name());
                continue;
            };
            let file_name = format!("{}_{}{}.png", self.config.prefix, area.name(), postfix);
            let path = self.config.output_dir.join(file_name);
            crop.save(&path)
                .with_context(|| format!("Failed to write crop {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Per-frame housekeeping: writes crops whenever the periodic timer
    /// elapses and re-arms it.
    pub fn tick(&mut self, frame: &RgbImage, now: Instant) -> Result<()> {
        if let Some(index) = self.timer.due(now) {
            self.write_crops(frame, &format!("_{index}"))?;
        }
        Ok(())
    }

    /// Drive the session against a surface until quit is requested, the
    /// surface closes, or the source ends or fails a read.
    pub fn run<W: PreviewSurface>(&mut self, surface: &mut W) -> Result<()> {
        loop {
            if !surface.is_open() {
                tracing::info!("Preview closed");
                break;
            }
            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("End of video");
                    break;
                }
                Err(e) => {
                    tracing::error!("Stopping the session: {:#}", e);
                    break;
                }
            };

            let now = Instant::now();
            let mut quit = false;
            for command in surface.poll_commands() {
                if !self.handle_command(command, Some(&frame), now)? {
                    quit = true;
                }
            }
            if quit {
                break;
            }
            for event in surface.poll_mouse() {
                self.handle_mouse(event);
            }
            self.tick(&frame, now)?;

            let mut display = frame.clone();
            overlay::draw_areas(&mut display, &self.areas);
            surface.present(&display)?;
        }
        Ok(())
    }
}
