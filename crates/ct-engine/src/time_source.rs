//! Common interface of the session clocks.

use ct_ir::SessionTimeMs;

/// A session clock that can be driven by the conductor.
pub trait TimeSource {
    fn current_time_ms(&self) -> SessionTimeMs;
    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn seek(&mut self, time: SessionTimeMs);
    fn is_running(&self) -> bool;
    fn is_paused(&self) -> bool;
}
