//! Live pitch samples from an external detector.

use serde::{Deserialize, Serialize};

use crate::time::SessionTimeMs;

/// One detector reading. Consumed once.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchSample {
    pub time_ms: SessionTimeMs,
    /// Fractional MIDI pitch (60.5 = a quarter tone above C4)
    pub midi_pitch: f64,
    /// Detector confidence, 0..1
    pub clarity: f64,
    pub is_voiced: bool,
}

impl PitchSample {
    /// A voiced sample.
    pub fn voiced(time_ms: SessionTimeMs, midi_pitch: f64, clarity: f64) -> Self {
        Self { time_ms, midi_pitch, clarity, is_voiced: true }
    }

    /// A reading the detector classified as silence, with its confidence.
    pub fn unvoiced(time_ms: SessionTimeMs, clarity: f64) -> Self {
        Self { time_ms, midi_pitch: 0.0, clarity, is_voiced: false }
    }
}
