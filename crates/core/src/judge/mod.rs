use serde::{Deserialize, Serialize};

use crate::{
    config::{PlayfieldConfig, ScoringConfig},
    InputEvent, Lane, NoteField, NoteOutcome, ResolvedNote,
};

/// Session score. Only ever grows until reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score(u64);

impl Score {
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn add(&mut self, points: u64) {
        self.0 = self.0.saturating_add(points);
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Per-session tallies of how inputs and notes were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub hits: u32,
    pub misses: u32,
    pub bonuses: u32,
    /// Lane hits that found no eligible note.
    pub ignored: u32,
}

impl SessionStats {
    pub fn record_note(&mut self, resolved: &ResolvedNote) {
        match resolved.outcome {
            NoteOutcome::Hit => self.hits += 1,
            NoteOutcome::Missed => self.misses += 1,
        }
    }
}

/// What a single input resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Judgement {
    Hit {
        note: ResolvedNote,
        points: u64,
    },
    Bonus { points: u64 },
    /// No eligible note; nothing changed.
    Ignored,
}

/// Resolves inputs against the notes near the hit line.
///
/// When several notes of the pressed lane are inside the window, the most
/// recently spawned one is taken, not the one closest to the line.
#[derive(Debug, Clone)]
pub struct Judge {
    hit_zone_y: f32,
    tolerance: f32,
    hit_reward: u64,
    bonus_reward: u64,
}

impl Judge {
    pub fn new(playfield: &PlayfieldConfig, scoring: &ScoringConfig) -> Self {
        Self {
            hit_zone_y: playfield.hit_zone_y(),
            tolerance: playfield.hit_tolerance,
            hit_reward: scoring.hit_reward,
            bonus_reward: scoring.bonus_reward,
        }
    }

    pub fn in_window(&self, y: f32) -> bool {
        (y - self.hit_zone_y).abs() < self.tolerance
    }

    /// Applies one input. A hit removes the note and scores it in the same
    /// call, so no other update can observe a half-resolved note.
    pub fn resolve(
        &self,
        event: InputEvent,
        field: &mut NoteField,
        score: &mut Score,
    ) -> Judgement {
        match event {
            InputEvent::LaneHit(lane) => self.resolve_lane(lane, field, score),
            InputEvent::ShakeOrBonus => {
                score.add(self.bonus_reward);
                Judgement::Bonus {
                    points: self.bonus_reward,
                }
            }
        }
    }

    fn resolve_lane(&self, lane: Lane, field: &mut NoteField, score: &mut Score) -> Judgement {
        let Some(index) = field.newest_matching(|n| n.lane == lane && self.in_window(n.y)) else {
            return Judgement::Ignored;
        };

        match field.consume(index) {
            Some(note) => {
                score.add(self.hit_reward);
                Judgement::Hit {
                    note,
                    points: self.hit_reward,
                }
            }
            None => Judgement::Ignored,
        }
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new(&PlayfieldConfig::default(), &ScoringConfig::default())
    }
}
