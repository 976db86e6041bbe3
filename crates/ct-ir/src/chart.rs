//! Loaded chart: notes, beats and derived metadata.

use serde::Serialize;

use crate::beat::TimedBeat;
use crate::note::{NoteId, TimedNote};
use crate::time::SessionTimeMs;

/// Pitch range used when neither the snapshot nor its notes provide one.
pub const DEFAULT_PITCH_RANGE: (f64, f64) = (48.0, 72.0);

/// A tonic marker placed on the grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TonicIndicator {
    pub time_ms: SessionTimeMs,
    pub column: u32,
    pub tonic: u8,
}

/// Everything a session needs from one chart, in absolute time.
///
/// Replaced wholesale on every load; references into a previous chart are stale.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Sorted by start time, ties broken by id
    pub notes: Vec<TimedNote>,
    /// Sorted by time, dense indices
    pub beats: Vec<TimedBeat>,
    pub tonic_indicators: Vec<TonicIndicator>,
    pub total_duration_ms: SessionTimeMs,
    pub voice_ids: Vec<String>,
    pub tempo: f64,
    pub min_midi_pitch: f64,
    pub max_midi_pitch: f64,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Look up a note by id.
    pub fn note(&self, id: NoteId) -> Option<&TimedNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Notes whose `[start, end]` window contains `time`.
    pub fn notes_active_at(&self, time: SessionTimeMs) -> impl Iterator<Item = &TimedNote> {
        self.notes.iter().filter(move |n| n.contains(time))
    }
}
