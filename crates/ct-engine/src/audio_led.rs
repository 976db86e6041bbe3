//! Session time slaved to an external audio position.

use std::cell::Cell;

use ct_ir::SessionTimeMs;

use crate::listeners::Subscription;
use crate::time_source::TimeSource;

/// Playback position reported by the host's audio engine.
pub trait AudioTimeSource {
    /// Current playback position in seconds.
    fn current_time_seconds(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// Register for play/pause changes. Sources that cannot report them return `None`.
    fn on_state_change(&mut self, _callback: Box<dyn FnMut(bool)>) -> Option<Subscription> {
        None
    }
}

/// Time source that follows an [`AudioTimeSource`].
///
/// Transport control belongs to the audio engine: `pause`, `resume` and `seek`
/// do nothing here and the host must drive the underlying source instead.
pub struct AudioLed {
    source: Option<Box<dyn AudioTimeSource>>,
    syncing: bool,
    calibration_offset_ms: f64,
    last_time: Cell<SessionTimeMs>,
    state_subscription: Option<Subscription>,
}

impl AudioLed {
    pub fn new() -> Self {
        Self {
            source: None,
            syncing: false,
            calibration_offset_ms: 0.0,
            last_time: Cell::new(SessionTimeMs::ZERO),
            state_subscription: None,
        }
    }

    /// Attach (or replace) the audio position source.
    pub fn set_source(&mut self, source: Box<dyn AudioTimeSource>) {
        let was_syncing = self.syncing;
        if was_syncing {
            self.stop();
        }
        self.source = Some(source);
        if was_syncing {
            self.start();
        }
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Additive correction applied to the reported audio position.
    pub fn set_calibration_offset_ms(&mut self, offset_ms: f64) {
        self.calibration_offset_ms = offset_ms;
    }

    pub fn calibration_offset_ms(&self) -> f64 {
        self.calibration_offset_ms
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing
    }
}

impl Default for AudioLed {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for AudioLed {
    /// Live audio position while syncing, otherwise the last value read.
    fn current_time_ms(&self) -> SessionTimeMs {
        match (&self.source, self.syncing) {
            (Some(source), true) => {
                let ms = source.current_time_seconds() * 1000.0 + self.calibration_offset_ms;
                let time = SessionTimeMs::new(ms);
                self.last_time.set(time);
                time
            }
            _ => self.last_time.get(),
        }
    }

    fn start(&mut self) {
        let Some(source) = self.source.as_mut() else {
            log::warn!(target: "conductor", "audio-led start without an audio source");
            return;
        };
        if self.syncing {
            return;
        }
        self.syncing = true;
        self.state_subscription = source.on_state_change(Box::new(|playing| {
            log::debug!(target: "conductor", "audio source playing={}", playing);
        }));
    }

    fn stop(&mut self) {
        self.syncing = false;
        if let Some(mut sub) = self.state_subscription.take() {
            sub.unsubscribe();
        }
        self.last_time.set(SessionTimeMs::ZERO);
    }

    fn pause(&mut self) {
        log::debug!(target: "conductor", "audio-led pause ignored; pause the audio source");
    }

    fn resume(&mut self) {
        log::debug!(target: "conductor", "audio-led resume ignored; resume the audio source");
    }

    fn seek(&mut self, time: SessionTimeMs) {
        log::debug!(target: "conductor", "audio-led seek to {} ignored; seek the audio source", time);
    }

    fn is_running(&self) -> bool {
        self.syncing && self.source.is_some()
    }

    fn is_paused(&self) -> bool {
        match &self.source {
            Some(source) => self.syncing && !source.is_playing(),
            None => false,
        }
    }
}
