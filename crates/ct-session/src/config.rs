//! Session settings loaded from TOML.

use ct_engine::{
    BeatWindowConfig, ConductorConfig, GateConfig, JudgeConfig, PitchMatcherConfig,
    SchedulerConfig,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse session config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid session config: {0}")]
    Invalid(String),
}

/// Every tunable of a session. Missing sections and keys take their defaults.
///
/// ```toml
/// [judge]
/// onset_window_ms = 120
///
/// [gate]
/// enabled = false
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub conductor: ConductorConfig,
    pub scheduler: SchedulerConfig,
    pub beat_window: BeatWindowConfig,
    pub matcher: PitchMatcherConfig,
    pub judge: JudgeConfig,
    pub gate: GateConfig,
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("scheduler.lookahead_ms", self.scheduler.lookahead_ms),
            ("beat_window.early_margin_ms", self.beat_window.early_margin_ms),
            ("beat_window.late_margin_ms", self.beat_window.late_margin_ms),
            ("matcher.default_tolerance_cents", self.matcher.default_tolerance_cents),
            ("matcher.short_note_tolerance_cents", self.matcher.short_note_tolerance_cents),
            ("judge.onset_window_ms", self.judge.onset_window_ms),
            ("judge.release_window_ms", self.judge.release_window_ms),
            ("gate.grace_period_ms", self.gate.grace_period_ms),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    key, value
                )));
            }
        }

        let clarity = self.judge.min_clarity_threshold;
        if !(0.0..=1.0).contains(&clarity) {
            return Err(ConfigError::Invalid(format!(
                "judge.min_clarity_threshold must lie in 0..=1, got {}",
                clarity
            )));
        }

        let tempo = self.conductor.tempo;
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "conductor.tempo must be positive, got {}",
                tempo
            )));
        }
        Ok(())
    }
}
