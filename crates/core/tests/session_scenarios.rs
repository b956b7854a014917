use std::io::Cursor;

use beatdrop_core::{
    chart_rng, spawn_line_reader, AudioTrack, BeatEvent, BeatSchedule, CommandSurface,
    GameConfig, InputEvent, Judgement, Lane, ManualPlayback, Playback, ReaderExit, Renderer,
    ScheduleGenerator, Session,
};

const RATE: u32 = 8000;

fn silent_track(seconds: f64) -> AudioTrack {
    AudioTrack::new(vec![0.0; (RATE as f64 * seconds) as usize], RATE).unwrap()
}

fn seeded_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.chart.seed = Some(2024);
    config
}

#[test]
fn clock_at_1_1_has_spawned_only_first_two_events() {
    let clock = ManualPlayback::new();
    let mut session = Session::new(seeded_config(), clock.clone());
    let tempo = session.load_track(silent_track(4.0));
    assert_eq!(tempo.bpm, 120.0);

    let times: Vec<f64> = session.schedule().events().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);

    session.start().unwrap();
    session.tick();
    clock.set_position(1.1);
    let report = session.tick();

    assert_eq!(report.spawned.len(), 1);
    assert_eq!(session.notes().len(), 2);
    let lanes: Vec<Lane> = session.notes().notes().iter().map(|n| n.lane).collect();
    let expected: Vec<Lane> = session.schedule().events()[..2].iter().map(|e| e.lane).collect();
    assert_eq!(lanes, expected);
}

#[test]
fn every_event_spawns_once_in_order_for_any_step_size() {
    let schedule = ScheduleGenerator::default().generate(133.0, 30.0, &mut chart_rng(Some(5)));

    for step in [1.0 / 144.0, 1.0 / 30.0, 0.37, 1.9] {
        let clock = ManualPlayback::new();
        let mut session = Session::new(seeded_config(), clock.clone());
        session.load_track_with_chart(silent_track(30.0), schedule.clone());
        session.start().unwrap();

        let mut spawned = Vec::new();
        spawned.extend(session.tick().spawned);
        while clock.position() < 30.0 {
            clock.advance(step);
            spawned.extend(session.tick().spawned);
        }

        assert_eq!(spawned.len(), schedule.len(), "step {step}");
        assert!(spawned.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn note_reaches_hit_line_after_two_seconds_regardless_of_frame_rate() {
    for fps in [30.0, 60.0, 144.0] {
        let clock = ManualPlayback::new();
        let mut session = Session::new(seeded_config(), clock.clone());
        let chart =
            BeatSchedule::from_events(120.0, vec![BeatEvent::new(0.0, Lane::Right)]).unwrap();
        session.load_track_with_chart(silent_track(4.0), chart);
        session.start().unwrap();
        session.tick();

        let frames = (2.0 * fps) as usize;
        for _ in 0..frames {
            clock.advance(1.0 / fps);
            session.tick();
        }

        let y = session.notes().notes()[0].y;
        let hit_y = session.config().playfield.hit_zone_y();
        assert!((y - hit_y).abs() < 0.5, "fps {fps}: y = {y}");
    }
}

#[test]
fn pressing_at_the_right_moment_scores_a_hit() {
    let clock = ManualPlayback::new();
    let mut session = Session::new(seeded_config(), clock.clone());
    let chart = BeatSchedule::from_events(120.0, vec![BeatEvent::new(0.5, Lane::Left)]).unwrap();
    session.load_track_with_chart(silent_track(4.0), chart);
    session.start().unwrap();

    clock.set_position(0.5);
    session.tick();
    // Hit line is reached two seconds after the spawn; aim ten units early.
    let speed = session.config().playfield.note_speed() as f64;
    clock.advance(2.0 - 10.0 / speed);
    session.tick();

    let too_early = session.handle_input(InputEvent::LaneHit(Lane::Right));
    assert_eq!(too_early, Judgement::Ignored);

    let judgement = session.handle_input(InputEvent::LaneHit(Lane::Left));
    assert!(matches!(judgement, Judgement::Hit { points: 100, .. }));
    assert_eq!(session.score(), 100);
    assert!(session.notes().is_empty());
    assert_eq!(session.stats().hits, 1);
}

#[test]
fn snapshot_renders_without_touching_state() {
    let clock = ManualPlayback::new();
    let mut session = Session::new(seeded_config(), clock.clone());
    session.load_track(silent_track(4.0));
    session.start().unwrap();
    clock.set_position(1.0);
    session.tick();

    let snapshot = session.snapshot();
    let mut surface = CommandSurface::new(600.0, 400.0);
    Renderer::new().draw(&snapshot, &mut surface);
    Renderer::new().draw(&snapshot, &mut surface);

    assert_eq!(session.snapshot(), snapshot);
    assert!(surface.texts().any(|t| t == "BPM: 120"));
}

#[tokio::test]
async fn device_tokens_flow_through_the_session_queue() {
    let clock = ManualPlayback::new();
    let mut session = Session::new(seeded_config(), clock.clone());
    session.load_track(silent_track(4.0));
    session.start().unwrap();

    let device = Cursor::new(b"SHAKE\nhello\nSHAKE\n".to_vec());
    let reader = spawn_line_reader(device, session.input_sender());
    assert_eq!(reader.join().await, ReaderExit::EndOfStream);

    let report = session.tick();
    assert_eq!(report.judgements.len(), 2);
    assert_eq!(session.score(), 100);

    // Stopping the session leaves the queue usable for later sessions.
    session.stop();
    assert!(session.input_sender().send(InputEvent::ShakeOrBonus).is_ok());
}
