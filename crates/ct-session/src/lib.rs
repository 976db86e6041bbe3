//! Session controller for the cantor trainer.
//!
//! [`Referee`] wires the engine components together, owns the session phase
//! and is the one type a host needs to play a chart.

mod config;
mod referee;
mod state;

pub use config::{ConfigError, SessionConfig};
pub use referee::Referee;
pub use state::{SessionPhase, SessionState};
