//! Lookahead event scheduling.
//!
//! Hosts schedule callbacks against session time (note cues, metronome
//! clicks, UI hints) and the session tick fires whatever has come due.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use ct_ir::SessionTimeMs;
use serde::Deserialize;

/// Identifier of a scheduled event. Drawn from a counter; never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduledEventId(pub u64);

/// What a scheduled event is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    NoteStart,
    NoteEnd,
    Beat,
    Metronome,
    Custom(String),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::NoteStart => write!(f, "note-start"),
            EventKind::NoteEnd => write!(f, "note-end"),
            EventKind::Beat => write!(f, "beat"),
            EventKind::Metronome => write!(f, "metronome"),
            EventKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Passed to a callback when its event fires.
#[derive(Clone, Debug, PartialEq)]
pub struct FiredEvent {
    pub id: ScheduledEventId,
    pub kind: EventKind,
    /// When the event was scheduled for
    pub time_ms: SessionTimeMs,
    /// Session time of the tick that fired it
    pub fired_at: SessionTimeMs,
}

pub type EventCallback = Box<dyn FnMut(&FiredEvent)>;

/// A scheduled event. Frozen once fired or cancelled.
pub struct ScheduledEvent {
    pub id: ScheduledEventId,
    pub time_ms: SessionTimeMs,
    pub kind: EventKind,
    pub fired: bool,
    pub cancelled: bool,
    callback: Option<EventCallback>,
}

impl ScheduledEvent {
    /// Neither fired nor cancelled.
    pub fn is_pending(&self) -> bool {
        !self.fired && !self.cancelled
    }
}

impl fmt::Debug for ScheduledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledEvent")
            .field("id", &self.id)
            .field("time_ms", &self.time_ms)
            .field("kind", &self.kind)
            .field("fired", &self.fired)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Scheduler settings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Default window for `upcoming_events`; finished events older than twice
    /// this are dropped after each tick.
    pub lookahead_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { lookahead_ms: 100.0 }
    }
}

/// Event queue keyed by id.
pub struct Scheduler {
    config: SchedulerConfig,
    events: BTreeMap<ScheduledEventId, ScheduledEvent>,
    next_id: u64,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            events: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn lookahead_ms(&self) -> f64 {
        self.config.lookahead_ms
    }

    /// Schedule `callback` to fire on the first tick at or after `time`.
    pub fn schedule<F>(
        &mut self,
        time: SessionTimeMs,
        kind: EventKind,
        callback: F,
    ) -> ScheduledEventId
    where
        F: FnMut(&FiredEvent) + 'static,
    {
        let id = ScheduledEventId(self.next_id);
        self.next_id += 1;
        self.events.insert(
            id,
            ScheduledEvent {
                id,
                time_ms: time,
                kind,
                fired: false,
                cancelled: false,
                callback: Some(Box::new(callback)),
            },
        );
        id
    }

    /// Cancel a pending event. False if it already fired, was cancelled, or is unknown.
    pub fn cancel(&mut self, id: ScheduledEventId) -> bool {
        match self.events.get_mut(&id) {
            Some(event) if event.is_pending() => {
                event.cancelled = true;
                event.callback = None;
                true
            }
            _ => false,
        }
    }

    /// Move a pending event to a new time. Same failure cases as `cancel`.
    pub fn reschedule(&mut self, id: ScheduledEventId, time: SessionTimeMs) -> bool {
        match self.events.get_mut(&id) {
            Some(event) if event.is_pending() => {
                event.time_ms = time;
                true
            }
            _ => false,
        }
    }

    /// Fire every pending event due at `now`, earliest first.
    ///
    /// A panicking callback is logged and the batch continues. Returns the
    /// number of events fired.
    pub fn tick(&mut self, now: SessionTimeMs) -> usize {
        // BTreeMap iteration is in id order, so the stable sort keeps
        // same-time events in scheduling order.
        let mut due: Vec<(SessionTimeMs, ScheduledEventId)> = self
            .events
            .values()
            .filter(|e| e.is_pending() && e.time_ms <= now)
            .map(|e| (e.time_ms, e.id))
            .collect();
        due.sort_by(|a, b| a.0.as_ms().total_cmp(&b.0.as_ms()));

        for (_, id) in &due {
            let Some(event) = self.events.get_mut(id) else {
                continue;
            };
            event.fired = true;
            let fired = FiredEvent {
                id: event.id,
                kind: event.kind.clone(),
                time_ms: event.time_ms,
                fired_at: now,
            };
            if let Some(mut callback) = event.callback.take() {
                if catch_unwind(AssertUnwindSafe(|| callback(&fired))).is_err() {
                    log::error!(
                        target: "scheduler",
                        "callback for {} event {:?} panicked; continuing",
                        fired.kind,
                        fired.id
                    );
                }
            }
        }

        self.collect_garbage(now);
        if !due.is_empty() {
            log::trace!(target: "scheduler", "fired {} events at {}", due.len(), now);
        }
        due.len()
    }

    /// Drop finished events older than twice the lookahead.
    fn collect_garbage(&mut self, now: SessionTimeMs) {
        let cutoff = now.as_ms() - 2.0 * self.config.lookahead_ms;
        self.events
            .retain(|_, e| e.is_pending() || e.time_ms.as_ms() >= cutoff);
    }

    /// Pending events in `[now, now + window)`, earliest first.
    ///
    /// `window` defaults to the configured lookahead.
    pub fn upcoming_events(&self, now: SessionTimeMs, window: Option<f64>) -> Vec<&ScheduledEvent> {
        let end = now.as_ms() + window.unwrap_or(self.config.lookahead_ms);
        let mut upcoming: Vec<&ScheduledEvent> = self
            .events
            .values()
            .filter(|e| e.is_pending() && e.time_ms >= now && e.time_ms.as_ms() < end)
            .collect();
        upcoming.sort_by(|a, b| a.time_ms.as_ms().total_cmp(&b.time_ms.as_ms()));
        upcoming
    }

    pub fn get(&self, id: ScheduledEventId) -> Option<&ScheduledEvent> {
        self.events.get(&id)
    }

    /// Events still held, finished ones included until collected.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.events.values().filter(|e| e.is_pending()).count()
    }

    /// Drop every event. Ids keep counting up.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
