mod area;
mod overlay;
mod session;
mod window;

pub use area::{AreaState, MarkedArea, Point};
pub use session::{
    MouseEvent, PeriodicTimer, SelectorConfig, SelectorSession, SessionCommand,
};
pub use window::SelectorWindow;

use anyhow::Result;
use image::RgbImage;

/// Trait for interactive preview surfaces
pub trait PreviewSurface {
    /// Whether the surface is still accepting frames
    fn is_open(&self) -> bool;

    /// Key commands pressed since the last poll
    fn poll_commands(&mut self) -> Vec<SessionCommand>;

    /// Pointer events since the last poll
    fn poll_mouse(&mut self) -> Vec<MouseEvent>;

    /// Show a frame
    fn present(&mut self, frame: &RgbImage) -> Result<()>;
}
