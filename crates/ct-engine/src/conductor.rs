//! Authoritative session clock.
//!
//! Owns both time sources, routes every time-affecting call to the active one
//! and notifies subscribers as session time advances.

use std::rc::Rc;

use ct_ir::SessionTimeMs;
use serde::Deserialize;

use crate::audio_led::{AudioLed, AudioTimeSource};
use crate::clock::Clock;
use crate::driver::{FrameLoop, TickDriver};
use crate::listeners::{Listeners, Subscription};
use crate::playhead::Playhead;
use crate::time_source::TimeSource;

/// Minimum change in session time between subscriber notifications.
const NOTIFY_THRESHOLD_MS: f64 = 1.0;

/// Which source the session clock follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    #[default]
    PlayheadLed,
    AudioLed,
}

/// Named latency corrections, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LatencyOffsets {
    pub audio_output_ms: f64,
    pub input_ms: f64,
    pub visual_ms: f64,
}

/// Selects one of the [`LatencyOffsets`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetKey {
    AudioOutput,
    Input,
    Visual,
}

impl LatencyOffsets {
    pub fn get(&self, key: OffsetKey) -> f64 {
        match key {
            OffsetKey::AudioOutput => self.audio_output_ms,
            OffsetKey::Input => self.input_ms,
            OffsetKey::Visual => self.visual_ms,
        }
    }
}

/// Conductor settings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    pub mode: SyncMode,
    pub tempo: f64,
    pub offsets: LatencyOffsets,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::PlayheadLed,
            tempo: 120.0,
            offsets: LatencyOffsets::default(),
        }
    }
}

/// The session clock.
pub struct Conductor {
    mode: SyncMode,
    tempo: f64,
    offsets: LatencyOffsets,
    playhead: Playhead,
    audio: AudioLed,
    listeners: Listeners<SessionTimeMs>,
    last_notified: Option<SessionTimeMs>,
    frame_loop: FrameLoop,
    disposed: bool,
}

impl Conductor {
    pub fn new(clock: Rc<dyn Clock>, config: ConductorConfig) -> Self {
        if config.mode == SyncMode::AudioLed {
            log::warn!(
                target: "conductor",
                "audio-led mode needs an audio source; starting playhead-led"
            );
        }
        Self {
            mode: SyncMode::PlayheadLed,
            tempo: config.tempo,
            offsets: config.offsets,
            playhead: Playhead::new(clock),
            audio: AudioLed::new(),
            listeners: Listeners::new("conductor"),
            last_notified: None,
            frame_loop: FrameLoop::default(),
            disposed: false,
        }
    }

    fn source(&self) -> &dyn TimeSource {
        match self.mode {
            SyncMode::PlayheadLed => &self.playhead,
            SyncMode::AudioLed => &self.audio,
        }
    }

    fn source_mut(&mut self) -> &mut dyn TimeSource {
        match self.mode {
            SyncMode::PlayheadLed => &mut self.playhead,
            SyncMode::AudioLed => &mut self.audio,
        }
    }

    /// Reject calls after `dispose`.
    fn check_live(&self, op: &str) -> bool {
        if self.disposed {
            log::warn!(target: "conductor", "{} called on a disposed conductor", op);
        }
        !self.disposed
    }

    /// Run the frame loop only while the source runs unpaused.
    ///
    /// An audio-led source pauses and resumes behind our back, so its loop
    /// stays armed while running and `on_frame` skips the paused frames.
    fn sync_frame_loop(&mut self) {
        let wanted = match self.mode {
            SyncMode::PlayheadLed => self.is_running() && !self.is_paused(),
            SyncMode::AudioLed => self.is_running(),
        };
        if wanted {
            self.frame_loop.start();
        } else {
            self.frame_loop.stop();
        }
    }

    // --- Transport ---

    pub fn start(&mut self) {
        if !self.check_live("start") {
            return;
        }
        self.source_mut().start();
        self.last_notified = None;
        self.sync_frame_loop();
    }

    pub fn stop(&mut self) {
        if !self.check_live("stop") {
            return;
        }
        self.source_mut().stop();
        self.last_notified = None;
        self.sync_frame_loop();
    }

    pub fn pause(&mut self) {
        if !self.check_live("pause") {
            return;
        }
        self.source_mut().pause();
        self.sync_frame_loop();
    }

    pub fn resume(&mut self) {
        if !self.check_live("resume") {
            return;
        }
        self.source_mut().resume();
        self.sync_frame_loop();
    }

    pub fn seek(&mut self, time: SessionTimeMs) {
        if !self.check_live("seek") {
            return;
        }
        self.source_mut().seek(time);
        self.last_notified = None;
    }

    pub fn current_time_ms(&self) -> SessionTimeMs {
        self.source().current_time_ms()
    }

    /// Session time with one latency correction applied. Does not change the clock.
    pub fn adjusted_time_ms(&self, key: OffsetKey) -> SessionTimeMs {
        self.current_time_ms() + self.offsets.get(key)
    }

    pub fn is_running(&self) -> bool {
        self.source().is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.source().is_paused()
    }

    // --- Mode ---

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Switch sources, carrying position and running/paused state across.
    pub fn set_mode(&mut self, mode: SyncMode) {
        if !self.check_live("set_mode") || mode == self.mode {
            return;
        }
        if mode == SyncMode::AudioLed && !self.audio.has_source() {
            log::warn!(target: "conductor", "cannot switch to audio-led: no audio source attached");
            return;
        }

        let position = self.current_time_ms();
        let was_running = self.is_running();
        let was_paused = self.is_paused();

        self.source_mut().stop();
        self.mode = mode;
        if was_running {
            let source = self.source_mut();
            source.start();
            source.seek(position);
            if was_paused {
                source.pause();
            }
        }
        self.last_notified = None;
        self.sync_frame_loop();
        log::debug!(target: "conductor", "mode -> {:?} at {}", mode, position);
    }

    /// Attach the host audio engine used by [`SyncMode::AudioLed`].
    pub fn set_audio_source(&mut self, source: Box<dyn AudioTimeSource>) {
        self.audio.set_source(source);
    }

    pub fn set_audio_calibration_ms(&mut self, offset_ms: f64) {
        self.audio.set_calibration_offset_ms(offset_ms);
    }

    // --- Settings ---

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        if tempo.is_finite() && tempo > 0.0 {
            self.tempo = tempo;
        } else {
            log::warn!(target: "conductor", "ignoring invalid tempo {}", tempo);
        }
    }

    pub fn offsets(&self) -> LatencyOffsets {
        self.offsets
    }

    pub fn set_offsets(&mut self, offsets: LatencyOffsets) {
        self.offsets = offsets;
    }

    // --- Frame loop ---

    pub fn set_tick_driver(&mut self, driver: Box<dyn TickDriver>) {
        self.frame_loop.set_driver(driver);
    }

    /// True while the conductor wants frames.
    pub fn wants_frames(&self) -> bool {
        self.frame_loop.is_active()
    }

    /// One host frame. Notifies subscribers when time moved by at least 1ms.
    ///
    /// Returns the time delivered to subscribers, if any.
    pub fn on_frame(&mut self) -> Option<SessionTimeMs> {
        if self.disposed || !self.frame_loop.is_active() {
            return None;
        }
        if !self.is_running() {
            self.frame_loop.stop();
            return None;
        }
        // The audio engine may have paused underneath us.
        if self.is_paused() {
            return None;
        }
        let now = self.current_time_ms();
        let due = match self.last_notified {
            Some(last) => (now.delta_ms(last)).abs() >= NOTIFY_THRESHOLD_MS,
            None => true,
        };
        if !due {
            return None;
        }
        self.last_notified = Some(now);
        self.listeners.emit(&now);
        Some(now)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&SessionTimeMs) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Stop everything and drop subscribers. Terminal; repeated calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.source_mut().stop();
        self.frame_loop.stop();
        self.listeners.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
