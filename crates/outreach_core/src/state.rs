use crate::view_model::MonitorView;
use crate::{JobConfig, StatusSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Resetting,
    Configuring,
    Starting,
    Recovering,
    Polling,
    Downloading,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Tunable timing knobs. Defaults are the production constants; tests and
/// the end-to-end scenarios compress them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub initial_poll_delay_ms: u64,
    pub max_poll_delay_ms: u64,
    /// Fixed wait before re-attempting a transiently failed start.
    pub recovery_delay_ms: u64,
    pub max_start_retries: u32,
    /// Poll-count threshold scales with the number of targets:
    /// `max(targets * ticks_per_target, min_tick_threshold)`.
    pub ticks_per_target: u64,
    pub min_tick_threshold: u64,
    /// Ticks of zero progress before the one-time reassurance notice.
    pub slow_start_ticks: u64,
    /// Refresh observability fields every Nth tick when the snapshot is
    /// otherwise unchanged.
    pub unchanged_refresh_stride: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            initial_poll_delay_ms: 10_000,
            max_poll_delay_ms: 30_000,
            recovery_delay_ms: 10_000,
            max_start_retries: 3,
            ticks_per_target: 40,
            min_tick_threshold: 120,
            slow_start_ticks: 30,
            unchanged_refresh_stride: 5,
        }
    }
}

/// Poll-timer bookkeeping for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollState {
    pub ticks: u64,
    pub delay_ms: u64,
    pub consecutive_errors: u32,
    /// Latched once the tick threshold fixes the interval at the maximum.
    pub reduced: bool,
    pub slow_start_notified: bool,
    pub threshold: u64,
}

/// State of one submitted job, owned by exactly one monitor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    settings: MonitorSettings,
    phase: Phase,
    config: Option<JobConfig>,
    start_attempts: u32,
    elapsed_seconds: u64,
    poll: PollState,
    last_snapshot: Option<StatusSnapshot>,
    current_target: Option<String>,
    status_line: String,
    failure: Option<String>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(MonitorSettings::default())
    }
}

impl MonitorState {
    pub fn new(settings: MonitorSettings) -> Self {
        let poll = PollState {
            delay_ms: settings.initial_poll_delay_ms,
            ..PollState::default()
        };
        Self {
            settings,
            phase: Phase::Idle,
            config: None,
            start_attempts: 0,
            elapsed_seconds: 0,
            poll,
            last_snapshot: None,
            current_target: None,
            status_line: String::new(),
            failure: None,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> Option<&JobConfig> {
        self.config.as_ref()
    }

    pub fn poll(&self) -> &PollState {
        &self.poll
    }

    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn view(&self) -> MonitorView {
        MonitorView {
            phase: self.phase,
            status_line: self.status_line.clone(),
            progress: self
                .last_snapshot
                .as_ref()
                .map(|s| s.progress)
                .unwrap_or(0),
            current_target: self.current_target.clone(),
            elapsed: crate::format_elapsed(self.elapsed_seconds),
            poll_delay_ms: self.poll.delay_ms,
            poll_ticks: self.poll.ticks,
            start_attempts: self.start_attempts,
            failure: self.failure.clone(),
        }
    }

    // Mutators are crate-private: only `update` changes state.

    pub(crate) fn begin_run(&mut self, config: JobConfig) {
        let threshold = (config.targets.len() as u64 * self.settings.ticks_per_target)
            .max(self.settings.min_tick_threshold);
        let settings = self.settings.clone();
        *self = Self::new(settings);
        self.poll.threshold = threshold;
        self.config = Some(config);
        self.phase = Phase::Resetting;
    }

    pub(crate) fn reset_to_idle(&mut self) {
        let settings = self.settings.clone();
        *self = Self::new(settings);
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_status_line(&mut self, line: impl Into<String>) {
        self.status_line = line.into();
    }

    pub(crate) fn set_failure(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
    }

    pub(crate) fn set_current_target(&mut self, target: Option<String>) {
        self.current_target = target;
    }

    pub(crate) fn current_target_ref(&self) -> &Option<String> {
        &self.current_target
    }

    pub(crate) fn set_last_snapshot(&mut self, snapshot: StatusSnapshot) {
        self.last_snapshot = Some(snapshot);
    }

    pub(crate) fn bump_start_attempts(&mut self) -> u32 {
        self.start_attempts += 1;
        self.start_attempts
    }

    pub(crate) fn start_attempts(&self) -> u32 {
        self.start_attempts
    }

    pub(crate) fn tick_second(&mut self) {
        self.elapsed_seconds += 1;
    }

    pub(crate) fn poll_mut(&mut self) -> &mut PollState {
        &mut self.poll
    }
}
