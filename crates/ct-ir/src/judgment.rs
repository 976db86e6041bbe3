//! Per-note judgment results.
//!
//! The three channels are reported side by side and never folded into a
//! single score; how they are weighed is up to the caller.

use serde::Serialize;

use crate::note::NoteId;
use crate::time::SessionTimeMs;

/// Channel A: share of voiced samples that were within tolerance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousAccuracy {
    /// `in_tolerance / total`, 0 when no voiced samples arrived
    pub ratio: f64,
    pub in_tolerance: u32,
    pub total: u32,
}

/// Channel B: how the note was attacked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnsetJudgment {
    /// A voiced sample arrived within the onset window
    pub voiced_at_onset: bool,
    /// That first sample was in tolerance
    pub in_tolerance_at_onset: bool,
    /// First voiced sample time minus note start; positive is late
    pub timing_error_ms: Option<f64>,
}

impl OnsetJudgment {
    pub fn is_hit(&self) -> bool {
        self.voiced_at_onset && self.in_tolerance_at_onset
    }
}

/// Channel C: how the note was held and released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseJudgment {
    /// Last voiced sample fell within the release window of the note end
    pub sustained: bool,
    /// Voicing stopped before the release window began
    pub released_early: bool,
    /// Last voiced sample time minus note end; negative is before the end
    pub timing_error_ms: Option<f64>,
}

/// Final judgment for one note.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgmentResult {
    pub note_id: NoteId,
    pub midi_pitch: f64,
    pub start_time_ms: SessionTimeMs,
    pub end_time_ms: SessionTimeMs,
    pub accuracy: ContinuousAccuracy,
    pub onset: OnsetJudgment,
    pub release: ReleaseJudgment,
    /// Voiced samples inside the note window
    pub total_samples: u32,
    pub in_tolerance_samples: u32,
    pub unvoiced_samples: u32,
    /// Mean signed deviation over voiced samples (0 when none)
    pub average_deviation_cents: f64,
    /// Mean absolute deviation over voiced samples (0 when none)
    pub average_absolute_deviation_cents: f64,
}
