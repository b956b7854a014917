use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::{BeatDropError, Result};

/// Immutable decoded audio owned by the engine for one play session.
#[derive(Clone, PartialEq)]
pub struct AudioTrack {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioTrack {
    /// Wraps mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BeatDropError::InvalidInput(
                "audio track requires a non-zero sample rate",
            ));
        }

        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    /// Keeps only the first channel of interleaved multi-channel audio.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(BeatDropError::InvalidInput(
                "audio track requires at least one channel",
            ));
        }

        let first_channel = samples
            .chunks_exact(channels as usize)
            .map(|frame| frame[0])
            .collect();
        Self::new(first_channel, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the track in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl fmt::Debug for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrack")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("duration", &self.duration())
            .finish()
    }
}

/// Audio output the session plays through. Its position is the clock every
/// spawn and motion update is derived from.
pub trait Playback: Send {
    /// Starts (or restarts) playing the track from the beginning.
    fn start(&mut self, track: &AudioTrack) -> Result<()>;

    /// Seconds since [`Playback::start`]; monotonic while active.
    fn position(&self) -> f64;

    /// Releases the output. The position stops advancing.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Silent playback that follows the wall clock. Used by the headless app.
#[derive(Debug, Default)]
pub struct WallClockPlayback {
    started: Option<Instant>,
    stopped_at: f64,
}

impl WallClockPlayback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Playback for WallClockPlayback {
    fn start(&mut self, _track: &AudioTrack) -> Result<()> {
        self.started = Some(Instant::now());
        self.stopped_at = 0.0;
        Ok(())
    }

    fn position(&self) -> f64 {
        match self.started {
            Some(started) => started.elapsed().as_secs_f64(),
            None => self.stopped_at,
        }
    }

    fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.stopped_at = started.elapsed().as_secs_f64();
        }
    }

    fn is_active(&self) -> bool {
        self.started.is_some()
    }
}

/// Playback whose position is moved by hand. Clones share the same position,
/// so a test can keep one handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualPlayback {
    position_bits: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
}

impl ManualPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the position forward; negative deltas are ignored.
    pub fn advance(&self, seconds: f64) {
        let current = self.position();
        self.set_position(current + seconds.max(0.0));
    }

    /// Jumps to an absolute position. Values behind the current position are
    /// ignored to keep the clock monotonic.
    pub fn set_position(&self, seconds: f64) {
        let next = seconds.max(self.position());
        self.position_bits.store(next.to_bits(), Ordering::SeqCst);
    }
}

impl Playback for ManualPlayback {
    fn start(&mut self, _track: &AudioTrack) -> Result<()> {
        self.position_bits.store(0f64.to_bits(), Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn position(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::SeqCst))
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
