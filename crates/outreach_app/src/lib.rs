//! Outreach app: wiring between the monitor state machine and the engine.
pub mod config;
pub mod driver;
pub mod effects;
pub mod flows;
pub mod logging;
