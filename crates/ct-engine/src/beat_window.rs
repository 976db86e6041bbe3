//! Beat tracking with early/late timing margins.
//!
//! Beats are emitted once each as time passes them. Between ticks the window
//! reports whether `now` sits just after the current beat or just before the
//! next one.

use std::collections::HashSet;

use ct_ir::{SessionTimeMs, TimedBeat};
use serde::Deserialize;

use crate::listeners::{Listeners, Subscription};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BeatWindowConfig {
    pub early_margin_ms: f64,
    pub late_margin_ms: f64,
}

impl Default for BeatWindowConfig {
    fn default() -> Self {
        Self {
            early_margin_ms: 100.0,
            late_margin_ms: 100.0,
        }
    }
}

/// Strongest role a beat plays. Measure outranks macrobeat outranks microbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeatKind {
    Measure,
    Macrobeat,
    Microbeat,
}

impl BeatKind {
    pub fn of(beat: &TimedBeat) -> Self {
        if beat.is_measure_start {
            BeatKind::Measure
        } else if beat.is_macrobeat {
            BeatKind::Macrobeat
        } else {
            BeatKind::Microbeat
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatEvent {
    pub kind: BeatKind,
    pub index: usize,
    pub time_ms: SessionTimeMs,
    /// `now` is within the early margin before the beat after this one
    pub in_early_window: bool,
    /// `now` is within the late margin after this beat
    pub in_late_window: bool,
}

/// Position of `now` relative to the beat grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeatWindowState {
    /// Last beat at or before `now`
    pub current_beat: Option<usize>,
    pub next_beat: Option<usize>,
    /// Within the early margin before the next beat
    pub in_early_window: bool,
    /// Within the late margin after the current beat
    pub in_late_window: bool,
}

pub struct BeatWindow {
    config: BeatWindowConfig,
    beats: Vec<TimedBeat>,
    /// First beat not yet scanned
    cursor: usize,
    emitted: HashSet<usize>,
    listeners: Listeners<BeatEvent>,
}

impl BeatWindow {
    pub fn new(config: BeatWindowConfig) -> Self {
        Self {
            config,
            beats: Vec::new(),
            cursor: 0,
            emitted: HashSet::new(),
            listeners: Listeners::new("beat_window"),
        }
    }

    pub fn config(&self) -> &BeatWindowConfig {
        &self.config
    }

    /// Replace the beat grid. Emission history is cleared.
    pub fn set_beats(&mut self, mut beats: Vec<TimedBeat>) {
        beats.sort_by(|a, b| a.time_ms.as_ms().total_cmp(&b.time_ms.as_ms()));
        self.beats = beats;
        self.reset();
    }

    pub fn beats(&self) -> &[TimedBeat] {
        &self.beats
    }

    pub fn state(&self, now: SessionTimeMs) -> BeatWindowState {
        let next = self.beats.partition_point(|b| b.time_ms <= now);
        let current = next.checked_sub(1);
        let next = (next < self.beats.len()).then_some(next);

        let in_late_window = current.is_some_and(|i| self.is_late(i, now));
        let in_early_window = next.is_some_and(|i| self.is_early(i, now));

        BeatWindowState {
            current_beat: current.map(|i| self.beats[i].index),
            next_beat: next.map(|i| self.beats[i].index),
            in_early_window,
            in_late_window,
        }
    }

    /// Beat at `pos` is still ahead of `now` and within the early margin.
    fn is_early(&self, pos: usize, now: SessionTimeMs) -> bool {
        self.beats.get(pos).is_some_and(|b| {
            b.time_ms > now && b.time_ms.delta_ms(now) <= self.config.early_margin_ms
        })
    }

    /// Beat at `pos` has sounded no more than the late margin before `now`.
    fn is_late(&self, pos: usize, now: SessionTimeMs) -> bool {
        self.beats.get(pos).is_some_and(|b| {
            b.time_ms <= now && now.delta_ms(b.time_ms) <= self.config.late_margin_ms
        })
    }

    /// Emit every beat that has come due since the last tick, in index order.
    pub fn tick(&mut self, now: SessionTimeMs) -> usize {
        let mut emitted = 0;
        while let Some(beat) = self.beats.get(self.cursor) {
            if beat.time_ms > now {
                break;
            }
            let pos = self.cursor;
            self.cursor += 1;
            if !self.emitted.insert(beat.index) {
                continue;
            }
            let event = BeatEvent {
                kind: BeatKind::of(beat),
                index: beat.index,
                time_ms: beat.time_ms,
                in_early_window: self.is_early(pos + 1, now),
                in_late_window: self.is_late(pos, now),
            };
            self.listeners.emit(&event);
            emitted += 1;
        }
        if emitted > 0 {
            log::trace!(target: "beat_window", "{} beats at {}", emitted, now);
        }
        emitted
    }

    /// Jump to `time`. Beats before it are treated as already played.
    pub fn seek(&mut self, time: SessionTimeMs) {
        self.cursor = self.beats.partition_point(|b| b.time_ms < time);
        self.emitted.clear();
    }

    /// Rewind to the first beat.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.emitted.clear();
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&BeatEvent) + 'static,
    {
        self.listeners.subscribe(callback)
    }
}

impl Default for BeatWindow {
    fn default() -> Self {
        Self::new(BeatWindowConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::BoundaryStyle;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn grid() -> Vec<TimedBeat> {
        // two measures of 2+2 at 250ms per microbeat
        (0..8)
            .map(|i| TimedBeat {
                index: i,
                time_ms: SessionTimeMs::new(i as f64 * 250.0),
                is_macrobeat: i % 2 == 0,
                is_measure_start: i % 4 == 0,
                grouping: 2,
                boundary_style: BoundaryStyle::Dashed,
            })
            .collect()
    }

    fn window() -> (BeatWindow, Rc<RefCell<Vec<BeatEvent>>>, Subscription) {
        let mut w = BeatWindow::default();
        w.set_beats(grid());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = w.subscribe(move |e| sink.borrow_mut().push(*e));
        (w, seen, sub)
    }

    #[test]
    fn emits_due_beats_in_order_once() {
        let (mut w, seen, _sub) = window();
        assert_eq!(w.tick(SessionTimeMs::new(600.0)), 3);
        assert_eq!(w.tick(SessionTimeMs::new(600.0)), 0);
        assert_eq!(w.tick(SessionTimeMs::new(760.0)), 1);

        let indices: Vec<usize> = seen.borrow().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn kind_precedence() {
        let (mut w, seen, _sub) = window();
        w.tick(SessionTimeMs::new(2000.0));
        let kinds: Vec<BeatKind> = seen.borrow().iter().take(4).map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![BeatKind::Measure, BeatKind::Microbeat, BeatKind::Macrobeat, BeatKind::Microbeat]
        );
    }

    #[test]
    fn state_partitions_early_and_late() {
        let w = {
            let mut w = BeatWindow::default();
            w.set_beats(grid());
            w
        };

        let s = w.state(SessionTimeMs::new(260.0));
        assert_eq!(s.current_beat, Some(1));
        assert_eq!(s.next_beat, Some(2));
        assert!(s.in_late_window);
        assert!(!s.in_early_window);

        let s = w.state(SessionTimeMs::new(420.0));
        assert!(!s.in_late_window);
        assert!(s.in_early_window);

        let s = w.state(SessionTimeMs::new(2000.0));
        assert_eq!(s.current_beat, Some(7));
        assert_eq!(s.next_beat, None);
        assert!(!s.in_early_window);
    }

    #[test]
    fn before_first_beat_has_no_current() {
        let mut w = BeatWindow::default();
        let mut beats = grid();
        for b in &mut beats {
            b.time_ms = b.time_ms + 500.0;
        }
        w.set_beats(beats);
        let s = w.state(SessionTimeMs::new(450.0));
        assert_eq!(s.current_beat, None);
        assert_eq!(s.next_beat, Some(0));
        assert!(s.in_early_window);
    }

    #[test]
    fn seek_skips_earlier_beats() {
        let (mut w, seen, _sub) = window();
        w.tick(SessionTimeMs::new(1000.0));
        seen.borrow_mut().clear();

        w.seek(SessionTimeMs::new(500.0));
        w.tick(SessionTimeMs::new(760.0));
        let indices: Vec<usize> = seen.borrow().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn reset_replays_from_start() {
        let (mut w, seen, _sub) = window();
        w.tick(SessionTimeMs::new(300.0));
        w.reset();
        w.tick(SessionTimeMs::new(300.0));
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let (mut w, seen, mut sub) = window();
        sub.unsubscribe();
        w.tick(SessionTimeMs::new(2000.0));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn late_flag_reflects_tick_lag() {
        let (mut w, seen, _sub) = window();
        w.tick(SessionTimeMs::new(20.0));
        w.tick(SessionTimeMs::new(500.0));
        let events = seen.borrow();
        assert!(events[0].in_late_window);
        // beat 1 at 250 seen at 500
        assert!(!events[1].in_late_window);
        assert!(events[2].in_late_window);
    }

    #[test]
    fn early_flag_is_per_event() {
        let (mut w, seen, _sub) = window();
        w.tick(SessionTimeMs::new(420.0));
        let events = seen.borrow();
        // beat 0's successor already sounded; beat 1's successor is 80ms ahead
        assert!(!events[0].in_early_window);
        assert!(events[1].in_early_window);
        assert!(!events[0].in_late_window);
        assert!(!events[1].in_late_window);
        assert_eq!(events[1].in_early_window, w.state(SessionTimeMs::new(420.0)).in_early_window);
    }
}
