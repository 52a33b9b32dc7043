use super::{MouseEvent, PreviewSurface, SessionCommand};
use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

/// Native preview window. Shows frames and turns minifb key and mouse
/// state into the session's command and event types.
pub struct SelectorWindow {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    mouse_down: bool,
    last_pos: (u32, u32),
}

impl SelectorWindow {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let mut window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .context("Failed to open the preview window")?;
        window.set_target_fps(60);

        Ok(Self {
            window,
            buffer: vec![0; (width * height) as usize],
            width: width as usize,
            height: height as usize,
            mouse_down: false,
            last_pos: (0, 0),
        })
    }
}

const KEY_BINDINGS: [(Key, SessionCommand); 5] = [
    (Key::Q, SessionCommand::Quit),
    (Key::A, SessionCommand::AddArea),
    (Key::W, SessionCommand::WriteNow),
    (Key::P, SessionCommand::EnablePeriodic),
    (Key::U, SessionCommand::Undo),
];

impl PreviewSurface for SelectorWindow {
    fn is_open(&self) -> bool {
        self.window.is_open()
    }

    fn poll_commands(&mut self) -> Vec<SessionCommand> {
        KEY_BINDINGS
            .iter()
            .filter(|(key, _)| self.window.is_key_pressed(*key, KeyRepeat::No))
            .map(|(_, command)| *command)
            .collect()
    }

    fn poll_mouse(&mut self) -> Vec<MouseEvent> {
        let down = self.window.get_mouse_down(MouseButton::Left);
        let pos = self
            .window
            .get_mouse_pos(MouseMode::Clamp)
            .map(|(x, y)| (x as u32, y as u32))
            .unwrap_or(self.last_pos);

        let mut events = Vec::new();
        if down && !self.mouse_down {
            events.push(MouseEvent::Pressed(pos.0, pos.1));
        } else if down && pos != self.last_pos {
            events.push(MouseEvent::Moved(pos.0, pos.1));
        } else if !down && self.mouse_down {
            events.push(MouseEvent::Released(pos.0, pos.1));
        }
        self.mouse_down = down;
        self.last_pos = pos;
        events
    }

    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        let resized;
        let frame = if frame.dimensions() == (self.width as u32, self.height as u32) {
            frame
        } else {
            resized = image::imageops::resize(
                frame,
                self.width as u32,
                self.height as u32,
                FilterType::Lanczos3,
            );
            &resized
        };

        for (dst, pixel) in self.buffer.iter_mut().zip(frame.pixels()) {
            *dst = (u32::from(pixel[0]) << 16) | (u32::from(pixel[1]) << 8) | u32::from(pixel[2]);
        }
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .context("Failed to update the preview window")
    }
}
