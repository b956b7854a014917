use rand::Rng;

use crate::{config::PlayfieldConfig, BeatSchedule, NoteField};

/// Maps playback position to track-relative elapsed time for one session.
/// Exists only while the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackSession {
    /// Playback position at which the session started.
    pub start_position: f64,
}

impl PlaybackSession {
    pub fn start(start_position: f64) -> Self {
        Self { start_position }
    }

    /// Seconds since the session started; never negative.
    pub fn elapsed(&self, position: f64) -> f64 {
        (position - self.start_position).max(0.0)
    }
}

/// Walks a schedule with a cursor that only moves forward, turning due events
/// into active notes.
#[derive(Debug, Default, Clone)]
pub struct Spawner {
    next_event: usize,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first event not spawned yet.
    pub fn cursor(&self) -> usize {
        self.next_event
    }

    pub fn reset(&mut self) {
        self.next_event = 0;
    }

    /// True once every event of `schedule` has been spawned.
    pub fn is_exhausted(&self, schedule: &BeatSchedule) -> bool {
        self.next_event >= schedule.len()
    }

    /// Spawns every event with `time <= elapsed`, in schedule order, and
    /// returns the ids of the new notes.
    pub fn tick(
        &mut self,
        elapsed: f64,
        schedule: &BeatSchedule,
        field: &mut NoteField,
        playfield: &PlayfieldConfig,
        rng: &mut impl Rng,
    ) -> Vec<u64> {
        let speed = playfield.note_speed();
        let mut spawned = Vec::new();

        while let Some(event) = schedule.get(self.next_event) {
            if event.time > elapsed {
                break;
            }

            let band = playfield.band(event.lane);
            let x = if band.max > band.min {
                rng.gen_range(band.min..band.max)
            } else {
                band.min
            };
            spawned.push(field.spawn(event.lane, x, speed));
            self.next_event += 1;
        }

        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chart_rng, BeatEvent, Lane, ScheduleGenerator};

    fn schedule() -> BeatSchedule {
        BeatSchedule::from_events(
            120.0,
            vec![
                BeatEvent::new(0.0, Lane::Left),
                BeatEvent::new(1.0, Lane::Right),
                BeatEvent::new(1.0, Lane::Left),
                BeatEvent::new(2.0, Lane::Right),
            ],
        )
        .unwrap()
    }

    #[test]
    fn spawns_only_due_events() {
        let schedule = schedule();
        let mut field = NoteField::new();
        let mut spawner = Spawner::new();
        let mut rng = chart_rng(Some(5));
        let playfield = PlayfieldConfig::default();

        let mut spawn_at = |elapsed: f64| {
            spawner
                .tick(elapsed, &schedule, &mut field, &playfield, &mut rng)
                .len()
        };
        assert_eq!(spawn_at(0.0), 1);
        assert_eq!(spawn_at(0.99), 0);
        assert_eq!(spawn_at(1.0), 2);
        assert_eq!(spawner.cursor(), 3);

        let lanes: Vec<Lane> = field.notes().iter().map(|n| n.lane).collect();
        assert_eq!(lanes, vec![Lane::Left, Lane::Right, Lane::Left]);
    }

    #[test]
    fn cursor_never_rewinds() {
        let schedule = schedule();
        let mut field = NoteField::new();
        let mut spawner = Spawner::new();
        let mut rng = chart_rng(Some(5));
        let playfield = PlayfieldConfig::default();

        spawner.tick(5.0, &schedule, &mut field, &playfield, &mut rng);
        assert!(spawner.is_exhausted(&schedule));
        assert!(spawner
            .tick(0.5, &schedule, &mut field, &playfield, &mut rng)
            .is_empty());
        assert_eq!(field.len(), 4);
    }

    #[test]
    fn spawn_positions_stay_in_lane_bands() {
        let schedule =
            ScheduleGenerator::default().generate(140.0, 120.0, &mut chart_rng(Some(11)));
        let mut field = NoteField::new();
        let mut spawner = Spawner::new();
        let playfield = PlayfieldConfig::default();

        spawner.tick(
            120.0,
            &schedule,
            &mut field,
            &playfield,
            &mut chart_rng(Some(12)),
        );

        assert_eq!(field.len(), schedule.len());
        for note in field.notes() {
            assert!(playfield.band(note.lane).contains(note.x));
            assert_eq!(note.y, 0.0);
            assert_eq!(note.speed, playfield.note_speed());
        }
    }

    #[test]
    fn elapsed_is_relative_to_session_start() {
        let session = PlaybackSession::start(3.0);
        assert_eq!(session.elapsed(4.25), 1.25);
        assert_eq!(session.elapsed(2.0), 0.0);
    }
}
