//! Pitch comparison against a target note.

use ct_ir::{PitchSample, TimedNote};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PitchMatcherConfig {
    pub default_tolerance_cents: f64,
    /// Applied to diamonds and single-column notes
    pub short_note_tolerance_cents: f64,
}

impl Default for PitchMatcherConfig {
    fn default() -> Self {
        Self {
            default_tolerance_cents: 50.0,
            short_note_tolerance_cents: 75.0,
        }
    }
}

/// Outcome of matching one sample against one note.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchMatch {
    pub is_match: bool,
    /// Positive is sharp
    pub deviation_cents: f64,
    pub absolute_deviation_cents: f64,
    pub tolerance_cents: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PitchMatcher {
    config: PitchMatcherConfig,
}

impl PitchMatcher {
    pub fn new(config: PitchMatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PitchMatcherConfig {
        &self.config
    }

    pub fn tolerance_for(&self, note: &TimedNote) -> f64 {
        if note.is_short_note {
            self.config.short_note_tolerance_cents
        } else {
            self.config.default_tolerance_cents
        }
    }

    pub fn match_sample(&self, sample: &PitchSample, note: &TimedNote) -> PitchMatch {
        let tolerance_cents = self.tolerance_for(note);
        if !sample.is_voiced {
            return PitchMatch {
                is_match: false,
                deviation_cents: f64::INFINITY,
                absolute_deviation_cents: f64::INFINITY,
                tolerance_cents,
            };
        }
        let deviation_cents = deviation_cents(sample.midi_pitch, note.midi_pitch);
        let absolute_deviation_cents = deviation_cents.abs();
        PitchMatch {
            is_match: absolute_deviation_cents <= tolerance_cents,
            deviation_cents,
            absolute_deviation_cents,
            tolerance_cents,
        }
    }
}

/// Signed distance in cents from `target_midi` to `detected_midi`.
pub fn deviation_cents(detected_midi: f64, target_midi: f64) -> f64 {
    (detected_midi - target_midi) * 100.0
}
