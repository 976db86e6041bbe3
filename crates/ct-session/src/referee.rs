//! Session referee.
//!
//! Owns every engine component, drives them from host frames and keeps the
//! session phase. Phase-mismatched calls are tolerated with a warning.

use std::collections::BTreeSet;
use std::rc::Rc;

use ct_engine::{
    BeatEvent, BeatWindow, ChartAdapter, Clock, Conductor, FrameLoop, Judge, Listeners,
    PitchAccuracyGate, PitchMatcher, SampleOutcome, Scheduler, Subscription, SystemClock,
    TickDriver,
};
use ct_ir::{
    ChartData, ChartError, ChartSnapshot, JudgmentResult, NoteId, PitchSample, SessionTimeMs,
};

use crate::config::SessionConfig;
use crate::state::{SessionPhase, SessionState};

/// Which notes are still to come, being sung, or done.
#[derive(Debug, Default)]
struct Membership {
    upcoming: BTreeSet<NoteId>,
    active: BTreeSet<NoteId>,
    passed: BTreeSet<NoteId>,
}

impl Membership {
    fn all_upcoming(chart: Option<&ChartData>) -> Self {
        Self {
            upcoming: chart
                .map(|c| c.notes.iter().map(|n| n.id).collect())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Rebuild from scratch for a jump to `time`. Active notes re-derive on the next frame.
    fn at(chart: Option<&ChartData>, time: SessionTimeMs) -> Self {
        let mut membership = Self::default();
        for note in chart.into_iter().flat_map(|c| c.notes.iter()) {
            if note.end_time_ms <= time {
                membership.passed.insert(note.id);
            } else {
                membership.upcoming.insert(note.id);
            }
        }
        membership
    }

    /// Move notes across the boundaries crossed by `now`, starting and
    /// stopping judgment at each transition.
    fn advance(&mut self, chart: &ChartData, judge: &mut Judge, now: SessionTimeMs) {
        for note in &chart.notes {
            if self.upcoming.contains(&note.id) && now >= note.start_time_ms {
                self.upcoming.remove(&note.id);
                self.active.insert(note.id);
                judge.start_judging_note(note);
            }
            if self.active.contains(&note.id) && now > note.end_time_ms {
                self.active.remove(&note.id);
                self.passed.insert(note.id);
                judge.stop_judging_note(note.id);
            }
        }
    }
}

pub struct Referee {
    config: SessionConfig,
    phase: SessionPhase,
    conductor: Conductor,
    scheduler: Scheduler,
    chart_adapter: ChartAdapter,
    beat_window: BeatWindow,
    judge: Judge,
    gate: PitchAccuracyGate,
    membership: Membership,
    state_listeners: Listeners<SessionState>,
    /// Wants frames exactly while `Playing` or `Gated`
    frame_loop: FrameLoop,
}

impl Referee {
    pub fn new(config: SessionConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            config,
            phase: SessionPhase::Idle,
            conductor: Conductor::new(clock, config.conductor),
            scheduler: Scheduler::new(config.scheduler),
            chart_adapter: ChartAdapter::with_tempo(config.conductor.tempo),
            beat_window: BeatWindow::new(config.beat_window),
            judge: Judge::new(config.judge, PitchMatcher::new(config.matcher)),
            gate: PitchAccuracyGate::new(config.gate),
            membership: Membership::default(),
            state_listeners: Listeners::new("referee"),
            frame_loop: FrameLoop::default(),
        }
    }

    pub fn with_system_clock(config: SessionConfig) -> Self {
        Self::new(config, Rc::new(SystemClock::new()))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if phase == self.phase {
            return;
        }
        log::debug!(target: "referee", "phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.sync_frame_loop();
        self.notify_state();
    }

    /// The conductor's loop stops while gated; this one keeps the gate checked.
    fn sync_frame_loop(&mut self) {
        if self.phase.is_live() {
            self.frame_loop.start();
        } else {
            self.frame_loop.stop();
        }
    }

    fn notify_state(&self) {
        if !self.state_listeners.is_empty() {
            self.state_listeners.emit(&self.session_state());
        }
    }

    fn reject(&self, op: &str) {
        log::warn!(target: "referee", "{} ignored in phase {}", op, self.phase);
    }

    /// Return every component to the top of the loaded chart.
    fn rewind(&mut self) {
        self.conductor.stop();
        self.judge.abandon_all();
        self.gate.reset();
        self.beat_window.reset();
        self.membership = Membership::all_upcoming(self.chart_adapter.chart());
    }

    // --- Loading ---

    /// Load a chart, replacing the current one.
    ///
    /// On failure the session is left `Idle` with no chart and the error is returned.
    pub fn load_chart(&mut self, snapshot: &ChartSnapshot) -> Result<(), ChartError> {
        if self.phase.is_started() {
            self.rewind();
        }
        self.set_phase(SessionPhase::Loading);

        let (tempo, beats) = match self.chart_adapter.load_snapshot(snapshot) {
            Ok(chart) => (chart.tempo, chart.beats.clone()),
            Err(err) => {
                log::warn!(target: "referee", "chart load failed: {}", err);
                self.chart_adapter.clear();
                self.beat_window.set_beats(Vec::new());
                self.judge.reset();
                self.gate.reset();
                self.membership = Membership::default();
                self.set_phase(SessionPhase::Idle);
                return Err(err);
            }
        };

        self.conductor.set_tempo(tempo);
        self.beat_window.set_beats(beats);
        self.judge.reset();
        self.rewind();
        self.set_phase(SessionPhase::Ready);
        Ok(())
    }

    // --- Transport ---

    pub fn start(&mut self) {
        if self.phase != SessionPhase::Ready {
            return self.reject("start");
        }
        self.judge.reset();
        self.conductor.start();
        self.set_phase(SessionPhase::Playing);
    }

    pub fn pause(&mut self) {
        if self.phase != SessionPhase::Playing {
            return self.reject("pause");
        }
        self.conductor.pause();
        self.set_phase(SessionPhase::Paused);
    }

    pub fn resume(&mut self) {
        if self.phase != SessionPhase::Paused {
            return self.reject("resume");
        }
        self.conductor.resume();
        self.set_phase(SessionPhase::Playing);
    }

    /// Back to the top: `Ready` with a chart, `Idle` without.
    pub fn stop(&mut self) {
        self.rewind();
        let phase = if self.chart_adapter.chart().is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        };
        self.set_phase(phase);
    }

    /// Jump to `time`. Membership is recomputed and in-progress judging dropped.
    pub fn seek(&mut self, time: SessionTimeMs) {
        if matches!(
            self.phase,
            SessionPhase::Idle | SessionPhase::Loading | SessionPhase::Completed
        ) {
            return self.reject("seek");
        }

        self.conductor.seek(time);
        let now = self.conductor.current_time_ms();
        self.judge.abandon_all();
        self.membership = Membership::at(self.chart_adapter.chart(), now);
        self.beat_window.seek(now);
        self.gate.reset();
        log::debug!(target: "referee", "seek to {}", now);

        if self.phase == SessionPhase::Gated {
            self.conductor.resume();
            self.set_phase(SessionPhase::Playing);
        } else {
            self.notify_state();
        }
    }

    // --- Frame ---

    /// Advance the session by one host frame.
    ///
    /// Returns the session time the frame ran at, or `None` outside
    /// `Playing`/`Gated`.
    pub fn on_frame(&mut self) -> Option<SessionTimeMs> {
        if !self.phase.is_live() {
            return None;
        }
        self.conductor.on_frame();
        let now = self.conductor.current_time_ms();

        let fired = self.scheduler.tick(now);
        let beats = self.beat_window.tick(now);
        if let Some(chart) = self.chart_adapter.chart() {
            self.membership.advance(chart, &mut self.judge, now);
        }
        log::trace!(
            target: "referee",
            "frame at {}: {} events, {} beats, {} active",
            now,
            fired,
            beats,
            self.membership.active.len()
        );

        self.apply_gate(now);

        let total = self
            .chart_adapter
            .chart()
            .map(|c| c.total_duration_ms)
            .unwrap_or(SessionTimeMs::ZERO);
        if self.phase.is_live() && now >= total {
            self.complete(now);
        }
        Some(now)
    }

    fn apply_gate(&mut self, now: SessionTimeMs) {
        // An episode cannot span a gap between notes.
        if self.membership.active.is_empty() && !self.gate.is_gated() {
            self.gate.reset();
            return;
        }
        let signal = self.gate.check_gate(now);
        match self.phase {
            SessionPhase::Playing if signal.should_pause => {
                self.conductor.pause();
                self.set_phase(SessionPhase::Gated);
            }
            SessionPhase::Gated if signal.should_resume || !self.gate.is_gated() => {
                self.conductor.resume();
                self.set_phase(SessionPhase::Playing);
            }
            _ => {}
        }
    }

    fn complete(&mut self, now: SessionTimeMs) {
        let still_active: Vec<NoteId> = self.membership.active.iter().copied().collect();
        for id in still_active {
            self.judge.stop_judging_note(id);
            self.membership.active.remove(&id);
            self.membership.passed.insert(id);
        }
        self.conductor.stop();
        self.conductor.seek(now);
        self.gate.reset();
        log::debug!(
            target: "referee",
            "completed at {} with {} judgments",
            now,
            self.judge.completed().len()
        );
        self.set_phase(SessionPhase::Completed);
    }

    /// Feed one detector reading.
    pub fn on_pitch_detected(&mut self, sample: &PitchSample) -> SampleOutcome {
        if !self.phase.is_live() {
            log::trace!(target: "referee", "pitch sample ignored in phase {}", self.phase);
            return SampleOutcome::default();
        }
        let outcome = self.judge.add_pitch_sample(sample);
        if outcome.notes_considered > 0 {
            self.gate.report_accuracy(outcome.matched_any, sample.time_ms);
        }
        outcome
    }

    /// Enable or disable the gate, resuming at once if it was holding the session.
    pub fn set_gate_enabled(&mut self, enabled: bool) {
        let signal = self.gate.set_enabled(enabled);
        if signal.should_resume && self.phase == SessionPhase::Gated {
            self.conductor.resume();
            self.set_phase(SessionPhase::Playing);
        }
    }

    /// Stop everything and drop all subscribers. The referee stays usable.
    pub fn dispose(&mut self) {
        self.rewind();
        self.state_listeners.clear();
        self.phase = SessionPhase::Idle;
        self.sync_frame_loop();
        self.chart_adapter.clear();
        self.membership = Membership::default();
    }

    // --- Frame loop ---

    /// Host hook told when `on_frame` calls are wanted.
    pub fn set_tick_driver(&mut self, driver: Box<dyn TickDriver>) {
        self.frame_loop.set_driver(driver);
    }

    /// True while the session wants `on_frame` calls, including while gated.
    pub fn wants_frames(&self) -> bool {
        self.frame_loop.is_active()
    }

    // --- Introspection ---

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_state(&self) -> SessionState {
        let now = self.conductor.current_time_ms();
        let chart = self.chart_adapter.chart();
        SessionState {
            phase: self.phase,
            current_time_ms: now,
            total_duration_ms: chart
                .map(|c| c.total_duration_ms)
                .unwrap_or(SessionTimeMs::ZERO),
            notes: chart.map(|c| c.notes.clone()).unwrap_or_default(),
            upcoming_note_ids: self.membership.upcoming.iter().copied().collect(),
            active_note_ids: self.membership.active.iter().copied().collect(),
            passed_note_ids: self.membership.passed.iter().copied().collect(),
            is_judging: self.judge.is_judging_any(),
            completed_judgments: self.judge.completed().to_vec(),
            gate: self.gate.state(),
            beat: self.beat_window.state(now),
        }
    }

    pub fn chart(&self) -> Option<&ChartData> {
        self.chart_adapter.chart()
    }

    pub fn conductor(&self) -> &Conductor {
        &self.conductor
    }

    pub fn conductor_mut(&mut self) -> &mut Conductor {
        &mut self.conductor
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn chart_adapter(&self) -> &ChartAdapter {
        &self.chart_adapter
    }

    pub fn beat_window(&self) -> &BeatWindow {
        &self.beat_window
    }

    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    pub fn gate(&self) -> &PitchAccuracyGate {
        &self.gate
    }

    // --- Subscriptions ---

    /// Called with a fresh snapshot on every phase change and seek.
    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&SessionState) + 'static,
    {
        self.state_listeners.subscribe(callback)
    }

    pub fn on_judgment<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&JudgmentResult) + 'static,
    {
        self.judge.subscribe(callback)
    }

    pub fn on_beat<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&BeatEvent) + 'static,
    {
        self.beat_window.subscribe(callback)
    }
}
