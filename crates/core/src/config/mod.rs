use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Lane, Result};

/// Top-level configuration structure for the game.
///
/// Every section falls back to its defaults, so a config file only needs the
/// keys it wants to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub analysis: AnalysisConfig,
    pub chart: ChartConfig,
    pub playfield: PlayfieldConfig,
    pub scoring: ScoringConfig,
    pub input: InputConfig,
}

impl GameConfig {
    /// Parses a (possibly partial) JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Parameters of the energy-peak tempo estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    /// Minimum frame energy (sum of squared samples) for a frame to count as a peak.
    pub energy_floor: f32,
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Returned when no inter-peak interval can be measured.
    pub default_bpm: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            energy_floor: 0.01,
            min_bpm: 90.0,
            max_bpm: 140.0,
            default_bpm: 120.0,
        }
    }
}

/// Beat chart generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Beats between two consecutive notes.
    pub beat_spacing: f64,
    /// Fixes lane choice and spawn jitter when set.
    pub seed: Option<u64>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            beat_spacing: 2.0,
            seed: None,
        }
    }
}

/// Horizontal range notes of one lane may spawn in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, x: f32) -> bool {
        x >= self.min && x < self.max
    }
}

/// Geometry and timing of the note highway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldConfig {
    pub width: f32,
    pub height: f32,
    /// Distance of the hit line from the bottom edge.
    pub hit_zone_offset: f32,
    /// Seconds a note needs to fall from the top to the hit line.
    pub travel_time: f32,
    /// Half-width of the hit window around the hit line, exclusive.
    pub hit_tolerance: f32,
    pub left_band: Band,
    pub right_band: Band,
    pub note_radius: f32,
}

impl PlayfieldConfig {
    pub fn hit_zone_y(&self) -> f32 {
        self.height - self.hit_zone_offset
    }

    /// Fall speed in units per second shared by every note.
    pub fn note_speed(&self) -> f32 {
        if self.travel_time > 0.0 {
            self.hit_zone_y() / self.travel_time
        } else {
            0.0
        }
    }

    pub fn band(&self, lane: Lane) -> Band {
        match lane {
            Lane::Left => self.left_band,
            Lane::Right => self.right_band,
        }
    }
}

impl Default for PlayfieldConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            hit_zone_offset: 50.0,
            travel_time: 2.0,
            hit_tolerance: 30.0,
            left_band: Band::new(100.0, 250.0),
            right_band: Band::new(350.0, 500.0),
            note_radius: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub hit_reward: u64,
    pub bonus_reward: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hit_reward: 100,
            bonus_reward: 50,
        }
    }
}

/// Keyboard substitute for the two device buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub left_key: char,
    pub right_key: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            left_key: 'a',
            right_key: 'b',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(
            r#"{ "chart": { "seed": 7 }, "playfield": { "height": 500 } }"#,
        )
        .unwrap();

        assert_eq!(config.chart.seed, Some(7));
        assert_eq!(config.chart.beat_spacing, 2.0);
        assert_eq!(config.playfield.hit_zone_y(), 450.0);
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn default_note_speed_reaches_hit_line_in_two_seconds() {
        let playfield = PlayfieldConfig::default();
        assert_eq!(playfield.note_speed() * 2.0, playfield.hit_zone_y());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(GameConfig::from_json_str("{ not json").is_err());
    }
}
