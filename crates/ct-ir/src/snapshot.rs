//! Chart snapshot as produced by the authoring tool.
//!
//! Every field the adapter can live without is optional or defaulted, so a
//! partial snapshot still loads.

use serde::Deserialize;

use crate::beat::BoundaryStyle;
use crate::error::ChartError;
use crate::note::NoteShape;

/// Top-level snapshot document.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartSnapshot {
    /// Quarter-note BPM. Absent means "keep the adapter's current tempo".
    pub tempo: Option<f64>,
    pub min_midi_pitch: Option<f64>,
    pub max_midi_pitch: Option<f64>,
    pub time_grid: TimeGrid,
    pub voices: Vec<SnapshotVoice>,
    pub tonic_signs: Vec<TonicSign>,
}

/// Rhythmic grid description.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeGrid {
    pub microbeat_count: u32,
    /// Microbeats per macrobeat
    pub macrobeat_groupings: Vec<u32>,
    /// Boundary drawn after each macrobeat
    pub macrobeat_boundary_styles: Vec<BoundaryStyle>,
}

/// One voice (staff line) of the chart.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotVoice {
    pub voice_id: String,
    pub color: String,
    pub notes: Vec<SnapshotNote>,
}

/// A note placed on grid columns.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNote {
    pub start_microbeat_col: u32,
    pub end_microbeat_col: u32,
    pub midi_pitch: f64,
    #[serde(default)]
    pub shape: NoteShape,
    #[serde(default)]
    pub pitch_name: Option<String>,
}

/// Tonic marker at a grid column.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonicSign {
    pub column_index: u32,
    #[serde(default = "default_tonic")]
    pub tonic_number: u8,
}

fn default_tonic() -> u8 {
    1
}

impl ChartSnapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(text)?)
    }
}
