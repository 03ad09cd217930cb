//! Outreach core: pure job-monitor state machine and view-model helpers.
mod config;
mod effect;
mod msg;
mod snapshot;
mod state;
mod update;
mod view_model;

pub use config::{JobConfig, JobSelection};
pub use effect::{Effect, Notice, NoticeLevel};
pub use msg::{Msg, StartFailure, StartResult};
pub use snapshot::{StatusKind, StatusSnapshot};
pub use state::{MonitorSettings, MonitorState, Phase, PollState};
pub use update::update;
pub use view_model::{format_elapsed, MonitorView};
