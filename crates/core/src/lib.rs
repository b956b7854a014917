//! Core library for the Beatdrop rhythm game.
//!
//! Setup flows one way: a decoded [`AudioTrack`] goes through the
//! [`TempoEstimator`], the estimate drives the [`ScheduleGenerator`], and the
//! resulting [`BeatSchedule`] is played by a [`Session`]. Once playing, the
//! session's tick spawns and moves notes while the [`Judge`] resolves queued
//! input against them. The [`Renderer`] only ever sees a [`RenderSnapshot`].

pub mod analysis;
pub mod audio;
pub mod chart;
pub mod config;
pub mod error;
pub mod input;
pub mod judge;
pub mod notes;
pub mod render;
pub mod session;
pub mod timeline;

pub use analysis::{TempoAnalysis, TempoEstimator};
pub use audio::{AudioTrack, ManualPlayback, Playback, WallClockPlayback};
pub use chart::{chart_rng, BeatEvent, BeatSchedule, ChartRng, Lane, ScheduleGenerator};
pub use config::{GameConfig, PlayfieldConfig};
pub use error::{BeatDropError, Result};
pub use input::{
    input_queue, spawn_line_reader, InputEvent, InputReaderHandle, InputReceiver, InputSender,
    KeyMap, ReaderExit,
};
pub use judge::{Judge, Judgement, Score, SessionStats};
pub use notes::{ActiveNote, NoteField, NoteOutcome, ResolvedNote};
pub use render::{Color, CommandSurface, DrawCommand, RenderSnapshot, Renderer, Surface};
pub use session::{Session, TickReport};
pub use timeline::{PlaybackSession, Spawner};
