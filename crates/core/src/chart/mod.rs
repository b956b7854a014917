use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{config::ChartConfig, BeatDropError, Result};

/// Random source behind lane choice and spawn jitter.
pub type ChartRng = Pcg64;

/// Seeded generator when `seed` is set, entropy-seeded otherwise.
pub fn chart_rng(seed: Option<u64>) -> ChartRng {
    match seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_entropy(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Left,
    Right,
}

impl Lane {
    /// Uniform coin flip between the two lanes.
    pub fn random(rng: &mut impl Rng) -> Self {
        if rng.gen_bool(0.5) {
            Lane::Left
        } else {
            Lane::Right
        }
    }
}

/// A single scheduled note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Seconds from the start of the track.
    pub time: f64,
    #[serde(rename = "type")]
    pub lane: Lane,
}

impl BeatEvent {
    pub fn new(time: f64, lane: Lane) -> Self {
        Self { time, lane }
    }
}

/// Ordered note chart for one track. Event times never decrease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatSchedule {
    #[serde(rename = "tempo")]
    tempo_bpm: f64,
    #[serde(rename = "notes")]
    events: Vec<BeatEvent>,
}

impl BeatSchedule {
    /// Builds a schedule from arbitrary events, stably sorted by time so ties
    /// keep their given order.
    pub fn from_events(tempo_bpm: f64, mut events: Vec<BeatEvent>) -> Result<Self> {
        if let Some(bad) = events.iter().find(|e| !e.time.is_finite() || e.time < 0.0) {
            return Err(BeatDropError::InvalidChart(format!(
                "note time {} is not a finite, non-negative number of seconds",
                bad.time
            )));
        }

        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { tempo_bpm, events })
    }

    pub fn empty() -> Self {
        Self {
            tempo_bpm: 0.0,
            events: Vec::new(),
        }
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn events(&self) -> &[BeatEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&BeatEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialises to the `{"tempo": .., "notes": [{"time", "type"}]}` chart
    /// format, with times rounded to milliseconds.
    pub fn to_json(&self) -> Result<String> {
        let rounded = Self {
            tempo_bpm: self.tempo_bpm,
            events: self
                .events
                .iter()
                .map(|e| BeatEvent::new((e.time * 1000.0).round() / 1000.0, e.lane))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&rounded)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BeatSchedule = serde_json::from_str(json)?;
        Self::from_events(raw.tempo_bpm, raw.events)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// Lays notes on a fixed grid derived from the tempo estimate.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    config: ChartConfig,
}

impl ScheduleGenerator {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }

    /// Seconds between two consecutive notes at `bpm`.
    pub fn note_interval(&self, bpm: f64) -> f64 {
        if bpm <= 0.0 {
            return 0.0;
        }
        60.0 / bpm * self.config.beat_spacing
    }

    /// One note every `beat_spacing` beats over `[0, duration)`, each on a
    /// random lane.
    pub fn generate(&self, bpm: f64, duration: f64, rng: &mut impl Rng) -> BeatSchedule {
        let interval = self.note_interval(bpm);
        if !(interval > 0.0) || !interval.is_finite() {
            tracing::warn!(
                bpm,
                spacing = self.config.beat_spacing,
                "degenerate note interval, chart left empty"
            );
            return BeatSchedule {
                tempo_bpm: bpm,
                events: Vec::new(),
            };
        }

        let events = (0u64..)
            .map(|i| i as f64 * interval)
            .take_while(|&time| time < duration)
            .map(|time| BeatEvent::new(time, Lane::random(&mut *rng)))
            .collect();

        BeatSchedule {
            tempo_bpm: bpm,
            events,
        }
    }
}
