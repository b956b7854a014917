//! Single owner of all mutable game state.
//!
//! A [`Session`] is driven by one caller-side loop: each [`Session::tick`]
//! drains queued input, moves notes, then spawns whatever the schedule says is
//! due. Rendering works from [`Session::snapshot`] and never mutates anything.
//! Background input readers only hold an [`InputSender`], so there is exactly
//! one writer for the note field and the score.

use crate::{
    chart_rng, config::GameConfig, input_queue, AudioTrack, BeatDropError, BeatSchedule, ChartRng,
    InputEvent, InputReceiver, InputSender, Judge, Judgement, NoteField, Playback, PlaybackSession,
    RenderSnapshot, ResolvedNote, Result, ScheduleGenerator, Score, SessionStats, Spawner,
    TempoAnalysis, TempoEstimator,
};

/// What one tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Track-relative seconds at this tick.
    pub elapsed: f64,
    /// Seconds since the previous tick.
    pub delta: f64,
    pub judgements: Vec<Judgement>,
    pub missed: Vec<ResolvedNote>,
    pub spawned: Vec<u64>,
}

pub struct Session {
    config: GameConfig,
    estimator: TempoEstimator,
    generator: ScheduleGenerator,
    judge: Judge,
    rng: ChartRng,
    playback: Box<dyn Playback>,
    track: Option<AudioTrack>,
    tempo: Option<TempoAnalysis>,
    schedule: BeatSchedule,
    clock: Option<PlaybackSession>,
    last_elapsed: f64,
    spawner: Spawner,
    field: NoteField,
    score: Score,
    stats: SessionStats,
    input_tx: InputSender,
    input_rx: InputReceiver,
}

impl Session {
    pub fn new(config: GameConfig, playback: impl Playback + 'static) -> Self {
        let (input_tx, input_rx) = input_queue();
        Self {
            estimator: TempoEstimator::new(config.analysis.clone()),
            generator: ScheduleGenerator::new(config.chart.clone()),
            judge: Judge::new(&config.playfield, &config.scoring),
            rng: chart_rng(config.chart.seed),
            playback: Box::new(playback),
            track: None,
            tempo: None,
            schedule: BeatSchedule::empty(),
            clock: None,
            last_elapsed: 0.0,
            spawner: Spawner::new(),
            field: NoteField::new(),
            score: Score::default(),
            stats: SessionStats::default(),
            input_tx,
            input_rx,
            config,
        }
    }

    /// Replaces the current track, estimating its tempo and generating a
    /// fresh chart. Any running session is stopped and all state cleared.
    pub fn load_track(&mut self, track: AudioTrack) -> TempoAnalysis {
        let tempo = self.estimator.analyse(&track);
        let schedule = self
            .generator
            .generate(tempo.bpm as f64, track.duration(), &mut self.rng);

        tracing::info!(
            bpm = tempo.bpm,
            raw_bpm = ?tempo.raw_bpm,
            peaks = tempo.peak_count,
            notes = schedule.len(),
            duration = track.duration(),
            "track loaded"
        );

        self.install(track, tempo, schedule);
        tempo
    }

    /// Replaces the current track but plays a prepared chart instead of
    /// generating one. The chart's tempo is shown as the BPM.
    pub fn load_track_with_chart(&mut self, track: AudioTrack, schedule: BeatSchedule) {
        let tempo = TempoAnalysis {
            bpm: schedule.tempo_bpm() as f32,
            raw_bpm: None,
            dominant_interval: None,
            peak_count: 0,
        };

        tracing::info!(
            bpm = tempo.bpm,
            notes = schedule.len(),
            duration = track.duration(),
            "track loaded with prepared chart"
        );

        self.install(track, tempo, schedule);
    }

    fn install(&mut self, track: AudioTrack, tempo: TempoAnalysis, schedule: BeatSchedule) {
        self.stop();
        self.track = Some(track);
        self.tempo = Some(tempo);
        self.schedule = schedule;
        self.reset_play_state();
    }

    /// Starts playing the loaded track from the beginning. Calling it while a
    /// session runs restarts that session.
    pub fn start(&mut self) -> Result<()> {
        let Some(track) = self.track.as_ref() else {
            return Err(BeatDropError::InvalidInput("no track loaded"));
        };

        if self.playback.is_active() {
            self.playback.stop();
        }
        self.playback.start(track)?;
        self.clock = Some(PlaybackSession::start(self.playback.position()));
        self.reset_play_state();

        // Presses made before the start belong to no session.
        while self.input_rx.try_recv().is_ok() {}

        tracing::info!(notes = self.schedule.len(), "session started");
        Ok(())
    }

    pub fn restart(&mut self) -> Result<()> {
        self.start()
    }

    /// Halts updates and releases the playback. Notes and score stay visible.
    /// Input readers are not affected.
    pub fn stop(&mut self) {
        if let Some(clock) = self.clock.take() {
            tracing::info!(
                score = self.score.value(),
                hits = self.stats.hits,
                misses = self.stats.misses,
                elapsed = clock.elapsed(self.playback.position()),
                "session stopped"
            );
        }
        if self.playback.is_active() {
            self.playback.stop();
        }
    }

    fn reset_play_state(&mut self) {
        self.spawner.reset();
        self.field.clear();
        self.score.reset();
        self.stats = SessionStats::default();
        self.last_elapsed = 0.0;
    }

    /// Advances the simulation to the current playback position.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        while let Ok(event) = self.input_rx.try_recv() {
            report.judgements.push(self.handle_input(event));
        }

        let Some(clock) = self.clock else {
            return report;
        };

        let elapsed = clock.elapsed(self.playback.position());
        let delta = (elapsed - self.last_elapsed).max(0.0);
        self.last_elapsed = elapsed;
        report.elapsed = elapsed;
        report.delta = delta;

        report.missed = self
            .field
            .advance(delta as f32, self.config.playfield.height);
        for missed in &report.missed {
            self.stats.record_note(missed);
        }

        report.spawned = self.spawner.tick(
            elapsed,
            &self.schedule,
            &mut self.field,
            &self.config.playfield,
            &mut self.rng,
        );

        report
    }

    /// Judges one input immediately. Ignored while no session runs.
    pub fn handle_input(&mut self, event: InputEvent) -> Judgement {
        if !self.is_running() {
            return Judgement::Ignored;
        }

        let judgement = self.judge.resolve(event, &mut self.field, &mut self.score);
        match &judgement {
            Judgement::Hit { note, .. } => self.stats.record_note(note),
            Judgement::Bonus { .. } => self.stats.bonuses += 1,
            Judgement::Ignored => self.stats.ignored += 1,
        }
        judgement
    }

    /// Queue handle for background input sources.
    pub fn input_sender(&self) -> InputSender {
        self.input_tx.clone()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            score: self.score.value(),
            bpm: self.bpm(),
            hit_zone_y: self.config.playfield.hit_zone_y(),
            note_radius: self.config.playfield.note_radius,
            notes: self.field.notes().to_vec(),
            is_running: self.is_running(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    /// True when every chart note has been spawned and resolved.
    pub fn is_finished(&self) -> bool {
        self.is_running() && self.spawner.is_exhausted(&self.schedule) && self.field.is_empty()
    }

    /// Track-relative seconds of the running session.
    pub fn elapsed(&self) -> Option<f64> {
        self.clock.map(|c| c.elapsed(self.playback.position()))
    }

    pub fn score(&self) -> u64 {
        self.score.value()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Current tempo estimate, or the default before any track is loaded.
    pub fn bpm(&self) -> f32 {
        self.tempo
            .map(|t| t.bpm)
            .unwrap_or(self.config.analysis.default_bpm)
    }

    pub fn tempo(&self) -> Option<&TempoAnalysis> {
        self.tempo.as_ref()
    }

    pub fn schedule(&self) -> &BeatSchedule {
        &self.schedule
    }

    pub fn track(&self) -> Option<&AudioTrack> {
        self.track.as_ref()
    }

    pub fn notes(&self) -> &NoteField {
        &self.field
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("track", &self.track)
            .field("tempo", &self.tempo)
            .field("notes", &self.schedule.len())
            .field("clock", &self.clock)
            .field("active", &self.field.len())
            .field("score", &self.score)
            .finish()
    }
}
