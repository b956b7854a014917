use serde::{Deserialize, Serialize};

use crate::Lane;

/// A note currently falling down the highway.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveNote {
    /// Spawn sequence number; later spawns have larger ids.
    pub id: u64,
    pub lane: Lane,
    pub x: f32,
    pub y: f32,
    /// Units per second, fixed at spawn.
    pub speed: f32,
}

/// How a note left the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteOutcome {
    /// Consumed by a matching input.
    Hit,
    /// Fell past the bottom edge unconsumed.
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNote {
    pub note: ActiveNote,
    pub outcome: NoteOutcome,
}

/// Active notes in spawn order.
#[derive(Debug, Clone, Default)]
pub struct NoteField {
    notes: Vec<ActiveNote>,
    next_id: u64,
}

impl NoteField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a note at the top of the field and returns its id.
    pub fn spawn(&mut self, lane: Lane, x: f32, speed: f32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notes.push(ActiveNote {
            id,
            lane,
            x,
            y: 0.0,
            speed,
        });
        id
    }

    /// Moves every note by `speed * dt` and removes those below `floor_y`.
    pub fn advance(&mut self, dt: f32, floor_y: f32) -> Vec<ResolvedNote> {
        if dt > 0.0 {
            for note in &mut self.notes {
                note.y += note.speed * dt;
            }
        }

        let mut missed = Vec::new();
        self.notes.retain(|note| {
            if note.y > floor_y {
                missed.push(ResolvedNote {
                    note: *note,
                    outcome: NoteOutcome::Missed,
                });
                false
            } else {
                true
            }
        });
        missed
    }

    /// Index of the most recently spawned note satisfying `predicate`.
    pub fn newest_matching(&self, predicate: impl Fn(&ActiveNote) -> bool) -> Option<usize> {
        self.notes.iter().rposition(predicate)
    }

    /// Removes the note at `index` as a hit.
    pub fn consume(&mut self, index: usize) -> Option<ResolvedNote> {
        if index >= self.notes.len() {
            return None;
        }
        Some(ResolvedNote {
            note: self.notes.remove(index),
            outcome: NoteOutcome::Hit,
        })
    }

    pub fn notes(&self) -> &[ActiveNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Drops every note and restarts id numbering.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.next_id = 0;
    }

    #[cfg(test)]
    pub(crate) fn push_at(&mut self, lane: Lane, y: f32) -> u64 {
        let id = self.spawn(lane, 0.0, 0.0);
        if let Some(note) = self.notes.last_mut() {
            note.y = y;
        }
        id
    }
}
