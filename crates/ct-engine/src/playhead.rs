//! Wall-clock driven session time.

use std::rc::Rc;

use ct_ir::SessionTimeMs;

use crate::clock::Clock;
use crate::time_source::TimeSource;

/// Session clock derived from wall time.
///
/// `time = max(0, now - start - total_pause + seek_offset)`. Pauses are folded
/// into `total_pause_ms` on resume, so any number of pause/resume cycles adds
/// no drift.
pub struct Playhead {
    clock: Rc<dyn Clock>,
    start_wall_ms: f64,
    total_pause_ms: f64,
    seek_offset_ms: f64,
    /// Wall time the current pause began
    pause_started_ms: Option<f64>,
    running: bool,
}

impl Playhead {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            start_wall_ms: 0.0,
            total_pause_ms: 0.0,
            seek_offset_ms: 0.0,
            pause_started_ms: None,
            running: false,
        }
    }

    /// Accumulated paused wall time, including a pause still in progress.
    pub fn total_pause_ms(&self) -> f64 {
        match self.pause_started_ms {
            Some(started) => self.total_pause_ms + (self.clock.now_ms() - started),
            None => self.total_pause_ms,
        }
    }

    fn fold_pause(&mut self, now: f64) {
        if let Some(started) = self.pause_started_ms {
            self.total_pause_ms += now - started;
            self.pause_started_ms = Some(now);
        }
    }
}

impl TimeSource for Playhead {
    fn current_time_ms(&self) -> SessionTimeMs {
        if !self.running {
            return SessionTimeMs::new(self.seek_offset_ms);
        }
        let now = self.pause_started_ms.unwrap_or_else(|| self.clock.now_ms());
        SessionTimeMs::new(now - self.start_wall_ms - self.total_pause_ms + self.seek_offset_ms)
    }

    /// Start from the stored seek offset (0 unless seeked while stopped).
    fn start(&mut self) {
        if self.running {
            log::debug!(target: "conductor", "playhead already running");
            return;
        }
        self.start_wall_ms = self.clock.now_ms();
        self.total_pause_ms = 0.0;
        self.pause_started_ms = None;
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.start_wall_ms = 0.0;
        self.total_pause_ms = 0.0;
        self.seek_offset_ms = 0.0;
        self.pause_started_ms = None;
    }

    fn pause(&mut self) {
        if !self.running || self.pause_started_ms.is_some() {
            return;
        }
        self.pause_started_ms = Some(self.clock.now_ms());
    }

    fn resume(&mut self) {
        if let Some(started) = self.pause_started_ms.take() {
            self.total_pause_ms += self.clock.now_ms() - started;
        }
    }

    fn seek(&mut self, time: SessionTimeMs) {
        if !self.running {
            self.seek_offset_ms = time.as_ms();
            return;
        }
        let now = self.clock.now_ms();
        self.fold_pause(now);
        let elapsed = now - self.start_wall_ms - self.total_pause_ms;
        self.seek_offset_ms = time.as_ms() - elapsed;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_paused(&self) -> bool {
        self.running && self.pause_started_ms.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn playhead_at(start: f64) -> (ManualClock, Playhead) {
        let clock = ManualClock::starting_at(start);
        let playhead = Playhead::new(Rc::new(clock.clone()));
        (clock, playhead)
    }

    #[test]
    fn tracks_wall_time_after_start() {
        let (clock, mut ph) = playhead_at(5_000.0);
        assert_eq!(ph.current_time_ms(), SessionTimeMs::ZERO);
        ph.start();
        clock.advance(1234.0);
        assert_eq!(ph.current_time_ms().as_ms(), 1234.0);
        assert!(ph.is_running());
        assert!(!ph.is_paused());
    }

    #[test]
    fn time_freezes_while_paused() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        clock.advance(300.0);
        ph.pause();
        clock.advance(10_000.0);
        assert_eq!(ph.current_time_ms().as_ms(), 300.0);
        assert!(ph.is_paused());
    }

    #[test]
    fn many_pause_cycles_do_not_drift() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        let mut played = 0.0;
        for i in 0..100 {
            clock.advance(17.0);
            played += 17.0;
            ph.pause();
            clock.advance(3.0 + i as f64);
            ph.resume();
        }
        assert_eq!(ph.current_time_ms().as_ms(), played);
    }

    #[test]
    fn seek_while_running() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        clock.advance(500.0);
        ph.seek(SessionTimeMs::new(2000.0));
        assert_eq!(ph.current_time_ms().as_ms(), 2000.0);
        clock.advance(100.0);
        assert_eq!(ph.current_time_ms().as_ms(), 2100.0);
    }

    #[test]
    fn seek_while_paused_folds_pause() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        clock.advance(400.0);
        ph.pause();
        clock.advance(700.0);
        ph.seek(SessionTimeMs::new(100.0));
        assert_eq!(ph.current_time_ms().as_ms(), 100.0);
        clock.advance(50.0);
        assert_eq!(ph.current_time_ms().as_ms(), 100.0);
        ph.resume();
        clock.advance(25.0);
        assert_eq!(ph.current_time_ms().as_ms(), 125.0);
    }

    #[test]
    fn seek_is_idempotent() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        clock.advance(900.0);
        ph.seek(SessionTimeMs::new(250.0));
        let first = ph.current_time_ms();
        ph.seek(SessionTimeMs::new(250.0));
        assert_eq!(ph.current_time_ms(), first);
    }

    #[test]
    fn seek_before_start_sets_origin() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.seek(SessionTimeMs::new(1500.0));
        assert_eq!(ph.current_time_ms().as_ms(), 1500.0);
        ph.start();
        clock.advance(10.0);
        assert_eq!(ph.current_time_ms().as_ms(), 1510.0);
    }

    #[test]
    fn backward_seek_never_goes_negative() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        clock.advance(100.0);
        ph.seek(SessionTimeMs::ZERO);
        assert_eq!(ph.current_time_ms(), SessionTimeMs::ZERO);
    }

    #[test]
    fn stop_resets() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        clock.advance(100.0);
        ph.seek(SessionTimeMs::new(900.0));
        ph.stop();
        assert_eq!(ph.current_time_ms(), SessionTimeMs::ZERO);
        assert!(!ph.is_running());
    }

    #[test]
    fn pause_accounting_includes_open_pause() {
        let (clock, mut ph) = playhead_at(0.0);
        ph.start();
        ph.pause();
        clock.advance(40.0);
        assert_eq!(ph.total_pause_ms(), 40.0);
    }
}
