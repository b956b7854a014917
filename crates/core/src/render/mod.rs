use serde::{Deserialize, Serialize};

use crate::{ActiveNote, Lane};

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BACKGROUND: Self = Self::rgb(0x1e, 0x1e, 0x1e);
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const RED: Self = Self::rgb(0xff, 0x00, 0x00);
    pub const BLUE: Self = Self::rgb(0x00, 0x00, 0xff);
    pub const GREEN: Self = Self::rgb(0x00, 0x80, 0x00);

    pub fn for_lane(lane: Lane) -> Self {
        match lane {
            Lane::Left => Self::BLUE,
            Lane::Right => Self::GREEN,
        }
    }
}

/// 2-D drawing target. Coordinates grow right and down from the top-left.
pub trait Surface {
    /// Width and height in drawing units.
    fn size(&self) -> (f32, f32);
    fn clear(&mut self, color: Color);
    /// Fills the axis-aligned rectangle at `origin` with the given `size`.
    fn fill_rect(&mut self, origin: (f32, f32), size: (f32, f32), color: Color);
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color);
    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Color);
    fn text(&mut self, position: (f32, f32), text: &str, color: Color);
}

/// Read-only copy of everything a frame needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub score: u64,
    pub bpm: f32,
    pub hit_zone_y: f32,
    pub note_radius: f32,
    pub notes: Vec<ActiveNote>,
    pub is_running: bool,
}

/// Draws snapshots. Holds no game state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn draw<S: Surface + ?Sized>(&self, snapshot: &RenderSnapshot, surface: &mut S) {
        let (width, height) = surface.size();
        surface.clear(Color::BACKGROUND);
        surface.fill_rect((0.0, 0.0), (width, height), Color::BACKGROUND);
        surface.text(
            (20.0, 30.0),
            &format!("Score: {}", snapshot.score),
            Color::WHITE,
        );
        surface.text(
            (20.0, 60.0),
            &format!("BPM: {}", snapshot.bpm.round()),
            Color::WHITE,
        );
        surface.line(
            (0.0, snapshot.hit_zone_y),
            (width, snapshot.hit_zone_y),
            Color::RED,
        );

        for note in &snapshot.notes {
            surface.fill_circle(
                (note.x, note.y),
                snapshot.note_radius,
                Color::for_lane(note.lane),
            );
        }
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Rect {
        origin: (f32, f32),
        size: (f32, f32),
        color: Color,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    Text {
        position: (f32, f32),
        text: String,
        color: Color,
    },
}

/// Surface that records draw calls since the last clear. Used headless and in tests.
#[derive(Debug, Clone)]
pub struct CommandSurface {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl CommandSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for CommandSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, origin: (f32, f32), size: (f32, f32), color: Color) {
        self.commands.push(DrawCommand::Rect {
            origin,
            size,
            color,
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn text(&mut self, position: (f32, f32), text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            position,
            text: text.to_string(),
            color,
        });
    }
}
