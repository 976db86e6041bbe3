//! Timed notes produced from a chart snapshot.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::time::SessionTimeMs;

/// Identifier of a note within one loaded chart.
///
/// Assigned in snapshot order (voice order, then note order within the voice).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub u32);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note-{}", self.0)
    }
}

/// Glyph a note is drawn with. Diamonds mark short notes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteShape {
    #[default]
    Oval,
    Diamond,
    #[serde(other)]
    Other,
}

/// A note with absolute timing. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedNote {
    pub id: NoteId,
    pub midi_pitch: f64,
    pub start_time_ms: SessionTimeMs,
    pub end_time_ms: SessionTimeMs,
    pub duration_ms: f64,
    pub voice_id: String,
    pub color: String,
    pub shape: NoteShape,
    /// Judged with the looser short-note tolerance.
    pub is_short_note: bool,
    pub pitch_name: String,
    /// First microbeat column the note covers.
    pub start_column: u32,
    /// Last microbeat column the note covers (inclusive).
    pub end_column: u32,
}

impl TimedNote {
    /// True while `time` lies within `[start, end]`.
    pub fn contains(&self, time: SessionTimeMs) -> bool {
        time >= self.start_time_ms && time <= self.end_time_ms
    }

    /// Number of microbeat columns covered.
    pub fn column_span(&self) -> u32 {
        self.end_column.saturating_sub(self.start_column) + 1
    }
}

/// Short-note rule: diamond glyph or a span of at most one column.
pub fn is_short_note(shape: NoteShape, start_column: u32, end_column: u32) -> bool {
    shape == NoteShape::Diamond || end_column.saturating_sub(start_column) + 1 <= 1
}

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name for the nearest MIDI note (60 = C4).
pub fn pitch_name_for_midi(midi: f64) -> String {
    let note = midi.round() as i32;
    let class = PITCH_CLASSES[note.rem_euclid(12) as usize];
    let octave = note.div_euclid(12) - 1;
    format!("{}{}", class, octave)
}
