//! Chart loading errors.

use thiserror::Error;

/// Errors raised while parsing or timing a chart snapshot.
#[derive(Error, Debug)]
pub enum ChartError {
    /// Tempo must be a positive, finite BPM value
    #[error("invalid tempo: {0}")]
    InvalidTempo(f64),

    /// A note ends before it starts
    #[error("note in voice '{voice_id}' ends at column {end_column} before it starts at {start_column}")]
    InvalidNoteSpan {
        voice_id: String,
        start_column: u32,
        end_column: u32,
    },

    /// Snapshot JSON could not be decoded
    #[error("snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
