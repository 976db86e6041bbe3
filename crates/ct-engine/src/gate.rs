//! Pitch accuracy gate.
//!
//! Pauses progress after off-pitch singing has lasted longer than a grace
//! period, and releases as soon as an accurate sample arrives. Reports are
//! only recorded; every transition happens in [`PitchAccuracyGate::check_gate`]
//! so a caller can batch reports and check once per frame.

use ct_ir::SessionTimeMs;
use serde::Deserialize;

use crate::listeners::{Listeners, Subscription};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,
    pub grace_period_ms: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_period_ms: 500.0,
        }
    }
}

/// Instruction for the caller after a check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateSignal {
    pub should_pause: bool,
    pub should_resume: bool,
}

impl GateSignal {
    const PAUSE: Self = Self { should_pause: true, should_resume: false };
    const RESUME: Self = Self { should_pause: false, should_resume: true };

    pub fn is_none(&self) -> bool {
        !self.should_pause && !self.should_resume
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateState {
    pub enabled: bool,
    pub is_gated: bool,
    /// Start of the current inaccuracy episode
    pub inaccuracy_start_ms: Option<SessionTimeMs>,
    /// Time left before the gate engages, as of the last check
    pub grace_period_remaining_ms: f64,
}

impl GateState {
    pub fn is_tracking(&self) -> bool {
        self.inaccuracy_start_ms.is_some() && !self.is_gated
    }
}

pub struct PitchAccuracyGate {
    config: GateConfig,
    gated: bool,
    inaccuracy_start: Option<SessionTimeMs>,
    /// First inaccurate report after the latest accurate one, not yet checked
    pending_inaccuracy: Option<SessionTimeMs>,
    accurate_since_check: bool,
    grace_remaining_ms: f64,
    listeners: Listeners<GateSignal>,
}

impl PitchAccuracyGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            gated: false,
            inaccuracy_start: None,
            pending_inaccuracy: None,
            accurate_since_check: false,
            grace_remaining_ms: config.grace_period_ms,
            listeners: Listeners::new("gate"),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Record one accuracy observation. Takes effect at the next check.
    pub fn report_accuracy(&mut self, accurate: bool, time: SessionTimeMs) {
        if !self.config.enabled {
            return;
        }
        if accurate {
            self.accurate_since_check = true;
            self.pending_inaccuracy = None;
        } else if self.pending_inaccuracy.is_none() {
            self.pending_inaccuracy = Some(time);
        }
    }

    /// Apply recorded reports and return what the caller should do.
    pub fn check_gate(&mut self, now: SessionTimeMs) -> GateSignal {
        if !self.config.enabled {
            return GateSignal::default();
        }
        let mut signal = GateSignal::default();

        if std::mem::take(&mut self.accurate_since_check) {
            self.inaccuracy_start = None;
            if self.gated {
                self.gated = false;
                signal = GateSignal::RESUME;
                log::debug!(target: "gate", "released at {}", now);
            }
        }

        if let Some(reported) = self.pending_inaccuracy.take() {
            if self.inaccuracy_start.is_none() {
                self.inaccuracy_start = Some(reported);
            }
        }

        let grace = self.config.grace_period_ms;
        self.grace_remaining_ms = match self.inaccuracy_start {
            Some(start) if !self.gated => {
                let elapsed = now.delta_ms(start);
                if elapsed >= grace && signal.is_none() {
                    self.gated = true;
                    signal = GateSignal::PAUSE;
                    log::debug!(
                        target: "gate",
                        "engaged at {} after {:.0}ms off pitch",
                        now,
                        elapsed
                    );
                    0.0
                } else {
                    (grace - elapsed).max(0.0)
                }
            }
            Some(_) => 0.0,
            None => grace,
        };

        if !signal.is_none() {
            self.listeners.emit(&signal);
        }
        signal
    }

    /// Enable or disable the gate. Disabling clears it, signalling resume if it was engaged.
    pub fn set_enabled(&mut self, enabled: bool) -> GateSignal {
        self.config.enabled = enabled;
        if enabled {
            GateSignal::default()
        } else {
            self.force_release()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Clear the gate and any episode. Repeated calls do nothing.
    pub fn force_release(&mut self) -> GateSignal {
        let was_gated = self.gated;
        self.clear();
        if was_gated {
            log::debug!(target: "gate", "force released");
            self.listeners.emit(&GateSignal::RESUME);
            GateSignal::RESUME
        } else {
            GateSignal::default()
        }
    }

    /// Clear all state without signalling.
    pub fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.gated = false;
        self.inaccuracy_start = None;
        self.pending_inaccuracy = None;
        self.accurate_since_check = false;
        self.grace_remaining_ms = self.config.grace_period_ms;
    }

    pub fn is_gated(&self) -> bool {
        self.gated
    }

    pub fn state(&self) -> GateState {
        GateState {
            enabled: self.config.enabled,
            is_gated: self.gated,
            inaccuracy_start_ms: self.inaccuracy_start,
            grace_period_remaining_ms: self.grace_remaining_ms,
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&GateSignal) + 'static,
    {
        self.listeners.subscribe(callback)
    }
}

impl Default for PitchAccuracyGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
