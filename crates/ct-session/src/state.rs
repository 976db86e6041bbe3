//! Session phase and the read-only state snapshot handed to hosts.

use core::fmt;

use ct_engine::{BeatWindowState, GateState};
use ct_ir::{JudgmentResult, NoteId, SessionTimeMs, TimedNote};
use serde::Serialize;

/// Where the session is in its lifecycle.
///
/// `Idle -> Loading -> Ready -> Playing <-> Paused`, `Playing <-> Gated`,
/// `Playing | Gated -> Completed`; `stop` returns to `Ready` (or `Idle`
/// without a chart).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Gated,
    Completed,
}

impl SessionPhase {
    /// Phases in which frames advance the session.
    pub fn is_live(self) -> bool {
        matches!(self, SessionPhase::Playing | SessionPhase::Gated)
    }

    /// Phases that hold a started transport.
    pub fn is_started(self) -> bool {
        matches!(
            self,
            SessionPhase::Playing | SessionPhase::Paused | SessionPhase::Gated
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Loading => "loading",
            SessionPhase::Ready => "ready",
            SessionPhase::Playing => "playing",
            SessionPhase::Paused => "paused",
            SessionPhase::Gated => "gated",
            SessionPhase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Snapshot of a session at one instant. Owned; later changes do not show up in it.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub current_time_ms: SessionTimeMs,
    pub total_duration_ms: SessionTimeMs,
    pub notes: Vec<TimedNote>,
    /// Ascending id order in each set
    pub upcoming_note_ids: Vec<NoteId>,
    pub active_note_ids: Vec<NoteId>,
    pub passed_note_ids: Vec<NoteId>,
    /// At least one note is being judged
    pub is_judging: bool,
    pub completed_judgments: Vec<JudgmentResult>,
    pub gate: GateState,
    pub beat: BeatWindowState,
}

impl SessionState {
    pub fn is_gated(&self) -> bool {
        self.gate.is_gated
    }
}
