//! Simulated singers for headless runs.

use std::str::FromStr;

use ct_ir::{PitchSample, SessionTimeMs};

const CLARITY: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Singer {
    /// Dead on every note
    Accurate,
    /// 80 cents under every note
    Flat,
    /// Detector hears only silence
    Silent,
    /// Slow vibrato, ±70 cents
    Wobbly,
}

impl Singer {
    /// Reading for the detector at `now`, given the note sounding (if any).
    ///
    /// `corrected` makes any singer hit the target, as a student would after
    /// the session stops and waits for them.
    pub fn sample(self, now: SessionTimeMs, target: Option<f64>, corrected: bool) -> PitchSample {
        let Some(target) = target else {
            return PitchSample::unvoiced(now, CLARITY);
        };
        if corrected {
            return PitchSample::voiced(now, target, CLARITY);
        }
        match self {
            Singer::Accurate => PitchSample::voiced(now, target, CLARITY),
            Singer::Flat => PitchSample::voiced(now, target - 0.8, CLARITY),
            Singer::Silent => PitchSample::unvoiced(now, CLARITY),
            Singer::Wobbly => {
                let phase = now.as_ms() / 1000.0 * std::f64::consts::TAU * 1.5;
                PitchSample::voiced(now, target + 0.7 * phase.sin(), CLARITY)
            }
        }
    }
}

impl FromStr for Singer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accurate" => Ok(Singer::Accurate),
            "flat" => Ok(Singer::Flat),
            "silent" => Ok(Singer::Silent),
            "wobbly" => Ok(Singer::Wobbly),
            other => Err(format!(
                "unknown singer '{}' (expected accurate, flat, silent or wobbly)",
                other
            )),
        }
    }
}
