//! Integration test: load chart → start session → step frames with a manual
//! clock and simulated pitch → verify phases, membership and judgments.

use ct_engine::{EventKind, GateConfig, ManualClock, PitchAccuracyGate};
use ct_ir::{ChartSnapshot, NoteId, PitchSample, SessionTimeMs};
use ct_session::{Referee, SessionConfig, SessionPhase};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/charts")
}

fn load_snapshot(name: &str) -> ChartSnapshot {
    let text = fs::read_to_string(fixtures_dir().join(name)).unwrap();
    ChartSnapshot::from_json(&text).unwrap()
}

fn ready_session(name: &str, config: SessionConfig) -> (ManualClock, Referee) {
    let clock = ManualClock::new();
    let mut referee = Referee::new(config, Rc::new(clock.clone()));
    referee.load_chart(&load_snapshot(name)).unwrap();
    (clock, referee)
}

/// Target pitch of the first note sounding at `now`.
fn target(referee: &Referee, now: SessionTimeMs) -> Option<f64> {
    referee
        .chart()?
        .notes_active_at(now)
        .next()
        .map(|n| n.midi_pitch)
}

/// Advance in `step_ms` frames while the session is playing, up to `until`.
/// `pitch` maps (session time, target) to the sung MIDI pitch.
fn play<F>(clock: &ManualClock, referee: &mut Referee, step_ms: f64, until: f64, pitch: F)
where
    F: Fn(SessionTimeMs, f64) -> f64,
{
    for _ in 0..10_000 {
        let now = referee.conductor().current_time_ms();
        if referee.phase() != SessionPhase::Playing || now.as_ms() >= until {
            return;
        }
        clock.advance(step_ms);
        let now = referee.conductor().current_time_ms();
        if let Some(midi) = target(referee, now) {
            referee.on_pitch_detected(&PitchSample::voiced(now, pitch(now, midi), 0.9));
        }
        referee.on_frame();
    }
    panic!("session did not reach {}ms", until);
}

fn in_tune(_: SessionTimeMs, target: f64) -> f64 {
    target
}

// --- lifecycle ---

#[test]
fn idle_to_completed_with_one_judgment_per_note() {
    let clock = ManualClock::new();
    let mut referee = Referee::new(SessionConfig::default(), Rc::new(clock.clone()));
    assert_eq!(referee.phase(), SessionPhase::Idle);

    referee.load_chart(&load_snapshot("two_measures.json")).unwrap();
    assert_eq!(referee.phase(), SessionPhase::Ready);

    let activated = Rc::new(RefCell::new(Vec::new()));
    let sink = activated.clone();
    let _sub = referee.on_judgment(move |r| sink.borrow_mut().push(r.note_id));

    referee.start();
    assert_eq!(referee.phase(), SessionPhase::Playing);

    play(&clock, &mut referee, 16.0, 2500.0, in_tune);
    assert_eq!(referee.phase(), SessionPhase::Completed);

    let state = referee.session_state();
    assert_eq!(state.completed_judgments.len(), 3);
    assert_eq!(*activated.borrow(), vec![NoteId(0), NoteId(1), NoteId(2)]);
    for judgment in &state.completed_judgments {
        assert!(judgment.accuracy.ratio > 0.9, "{:?}", judgment);
        assert!(judgment.onset.voiced_at_onset);
        assert!(judgment.release.sustained);
    }
}

#[test]
fn coarse_frames_still_judge_every_note() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    referee.start();
    // each frame jumps past a whole note
    play(&clock, &mut referee, 600.0, 5000.0, in_tune);

    assert_eq!(referee.phase(), SessionPhase::Completed);
    let ids: Vec<NoteId> = referee
        .judge()
        .completed()
        .iter()
        .map(|r| r.note_id)
        .collect();
    assert_eq!(ids, vec![NoteId(0), NoteId(1), NoteId(2)]);
}

#[test]
fn completed_is_terminal_until_stop() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    referee.start();
    play(&clock, &mut referee, 20.0, 2500.0, in_tune);
    assert_eq!(referee.phase(), SessionPhase::Completed);

    referee.start();
    referee.seek(SessionTimeMs::new(100.0));
    assert_eq!(referee.phase(), SessionPhase::Completed);

    referee.stop();
    assert_eq!(referee.phase(), SessionPhase::Ready);
    referee.start();
    assert_eq!(referee.phase(), SessionPhase::Playing);
    assert!(referee.judge().completed().is_empty());
}

// --- seek ---

#[test]
fn backward_seek_passed_set_matches_end_times() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    referee.start();
    play(&clock, &mut referee, 20.0, 1800.0, in_tune);

    for target in [1200.0, 999.0, 500.0, 0.0] {
        referee.seek(SessionTimeMs::new(target));
        let state = referee.session_state();
        let expected: Vec<NoteId> = state
            .notes
            .iter()
            .filter(|n| n.end_time_ms.as_ms() <= target)
            .map(|n| n.id)
            .collect();
        assert_eq!(state.passed_note_ids, expected, "seek to {}", target);
        assert!(state.active_note_ids.is_empty());
    }
}

#[test]
fn repeated_seek_is_idempotent() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    referee.start();
    play(&clock, &mut referee, 20.0, 700.0, in_tune);

    referee.seek(SessionTimeMs::new(250.0));
    let first = referee.session_state();
    referee.seek(SessionTimeMs::new(250.0));
    let second = referee.session_state();
    assert_eq!(first.current_time_ms, second.current_time_ms);
    assert_eq!(first.passed_note_ids, second.passed_note_ids);
    assert_eq!(first.upcoming_note_ids, second.upcoming_note_ids);
}

#[test]
fn seek_then_play_reactivates_notes() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    referee.start();
    play(&clock, &mut referee, 20.0, 1500.0, in_tune);

    referee.seek(SessionTimeMs::new(600.0));
    play(&clock, &mut referee, 20.0, 700.0, in_tune);
    let state = referee.session_state();
    assert_eq!(state.active_note_ids, vec![NoteId(1)]);
    assert!(referee.judge().is_judging(NoteId(1)));
}

// --- gate ---

#[test]
fn gate_engages_after_grace_and_resumes_on_accuracy() {
    let mut gate = PitchAccuracyGate::new(GateConfig::default());
    let mut t = 1000.0;
    while t <= 1600.0 {
        gate.report_accuracy(false, SessionTimeMs::new(t));
        t += 25.0;
    }
    let signal = gate.check_gate(SessionTimeMs::new(1600.0));
    assert!(signal.should_pause);
    assert!(gate.state().is_gated);

    gate.report_accuracy(true, SessionTimeMs::new(1650.0));
    let signal = gate.check_gate(SessionTimeMs::new(1650.0));
    assert!(signal.should_resume);
    assert!(!gate.state().is_gated);
}

#[test]
fn flat_singing_gates_the_session() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    referee.start();
    play(&clock, &mut referee, 20.0, 1000.0, in_tune);
    // 80 cents flat from 1000ms on
    play(&clock, &mut referee, 20.0, 2500.0, |_, target| target - 0.8);

    assert_eq!(referee.phase(), SessionPhase::Gated);
    let held = referee.conductor().current_time_ms();
    // first flat sample at 1020, plus the 500ms grace
    assert_eq!(held.as_ms(), 1520.0);

    // wall time passes, session time does not
    clock.advance(3000.0);
    referee.on_frame();
    assert_eq!(referee.conductor().current_time_ms(), held);
    assert_eq!(referee.phase(), SessionPhase::Gated);

    referee.on_pitch_detected(&PitchSample::voiced(held, 64.0, 0.9));
    referee.on_frame();
    assert_eq!(referee.phase(), SessionPhase::Playing);

    play(&clock, &mut referee, 20.0, 2500.0, in_tune);
    assert_eq!(referee.phase(), SessionPhase::Completed);
}

#[test]
fn disabled_gate_never_pauses() {
    let config = SessionConfig::from_toml_str("[gate]\nenabled = false").unwrap();
    let (clock, mut referee) = ready_session("two_measures.json", config);
    referee.start();
    play(&clock, &mut referee, 20.0, 2500.0, |_, target| target + 2.0);

    assert_eq!(referee.phase(), SessionPhase::Completed);
    assert!(referee
        .judge()
        .completed()
        .iter()
        .all(|r| r.accuracy.ratio == 0.0));
}

// --- scheduler and beats ---

#[test]
fn scheduled_events_fire_in_time_order_during_play() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    let fired = Rc::new(RefCell::new(Vec::new()));

    let starts: Vec<SessionTimeMs> = referee
        .chart()
        .unwrap()
        .notes
        .iter()
        .map(|n| n.start_time_ms)
        .collect();
    // schedule in reverse to make sure order comes from time, not insertion
    for start in starts.into_iter().rev() {
        let sink = fired.clone();
        referee
            .scheduler_mut()
            .schedule(start, EventKind::NoteStart, move |e| {
                sink.borrow_mut().push(e.time_ms.as_ms())
            });
    }
    let cancelled = fired.clone();
    let id = referee
        .scheduler_mut()
        .schedule(SessionTimeMs::new(1200.0), EventKind::Metronome, move |_| {
            cancelled.borrow_mut().push(-1.0)
        });
    referee.scheduler_mut().cancel(id);

    referee.start();
    play(&clock, &mut referee, 50.0, 2500.0, in_tune);

    let times = fired.borrow();
    assert_eq!(*times, vec![0.0, 500.0, 1000.0]);
}

#[test]
fn every_beat_is_emitted_once_in_order() {
    let (clock, mut referee) = ready_session("two_measures.json", SessionConfig::default());
    let beats = Rc::new(RefCell::new(Vec::new()));
    let sink = beats.clone();
    let _sub = referee.on_beat(move |b| sink.borrow_mut().push(b.index));

    referee.start();
    play(&clock, &mut referee, 33.0, 2500.0, in_tune);

    assert_eq!(*beats.borrow(), (0..8).collect::<Vec<_>>());
}

// --- loading ---

#[test]
fn invalid_chart_leaves_session_idle() {
    let clock = ManualClock::new();
    let mut referee = Referee::new(SessionConfig::default(), Rc::new(clock));
    assert!(referee
        .load_chart(&load_snapshot("reversed_span.json"))
        .is_err());
    assert_eq!(referee.phase(), SessionPhase::Idle);
    referee.start();
    assert_eq!(referee.phase(), SessionPhase::Idle);
}
