//! Timing and judgment engine for the cantor sing-along trainer.
//!
//! Keeps session time, fires scheduled events, tracks the beat grid and
//! judges live pitch against the loaded chart. Everything is single-threaded
//! and driven by explicit frame calls, so tests can step time by hand.

pub mod audio_led;
pub mod beat_window;
mod chart_adapter;
pub mod clock;
mod conductor;
mod driver;
pub mod gate;
mod judge;
mod listeners;
mod pitch_matcher;
mod playhead;
pub mod scheduler;
mod time_source;

pub use audio_led::{AudioLed, AudioTimeSource};
pub use beat_window::{BeatEvent, BeatKind, BeatWindow, BeatWindowConfig, BeatWindowState};
pub use chart_adapter::{ChartAdapter, DEFAULT_TEMPO};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conductor::{Conductor, ConductorConfig, LatencyOffsets, OffsetKey, SyncMode};
pub use driver::{FrameLoop, ManualDriver, TickDriver};
pub use gate::{GateConfig, GateSignal, GateState, PitchAccuracyGate};
pub use judge::{Judge, JudgeConfig, SampleOutcome};
pub use listeners::{ListenerKey, Listeners, Subscription};
pub use pitch_matcher::{deviation_cents, PitchMatch, PitchMatcher, PitchMatcherConfig};
pub use playhead::Playhead;
pub use scheduler::{
    EventCallback, EventKind, FiredEvent, ScheduledEvent, ScheduledEventId, Scheduler,
    SchedulerConfig,
};
pub use time_source::TimeSource;
