//! Core types for the cantor sing-along trainer.
//!
//! This crate defines the data model shared by the engine and the session
//! controller: chart snapshots as authored, notes and beats in absolute time,
//! live pitch samples, and per-note judgments.

mod beat;
mod chart;
mod error;
mod judgment;
mod note;
mod pitch;
pub mod snapshot;
mod time;

pub use beat::{BoundaryStyle, TimedBeat};
pub use chart::{ChartData, TonicIndicator, DEFAULT_PITCH_RANGE};
pub use error::ChartError;
pub use judgment::{ContinuousAccuracy, JudgmentResult, OnsetJudgment, ReleaseJudgment};
pub use note::{is_short_note, pitch_name_for_midi, NoteId, NoteShape, TimedNote};
pub use pitch::PitchSample;
pub use snapshot::{ChartSnapshot, SnapshotNote, SnapshotVoice, TimeGrid, TonicSign};
pub use time::{microbeat_duration_ms, SessionTimeMs};
