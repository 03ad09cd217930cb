use crate::{JobSelection, StatusSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a target/keyword selection; supersedes any live run.
    Submitted(JobSelection),
    /// Remote reset finished; either side may have failed without
    /// aborting the run.
    ResetCompleted { server_ok: bool, local_ok: bool },
    /// Remote accepted or rejected the job configuration.
    ConfigureCompleted(Result<(), String>),
    /// Outcome of one start attempt.
    StartCompleted(StartResult),
    /// The recovery delay after a transient start failure has passed.
    RecoveryElapsed,
    /// One status poll finished; `None` means the poll itself failed.
    PollCompleted(Option<StatusSnapshot>),
    /// Result materialization finished.
    DownloadCompleted(bool),
    /// One-second tick for the elapsed display.
    SecondElapsed,
    /// Explicit cancellation (navigation away / teardown).
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartResult {
    Started,
    /// A job with the same identity is already running; resume monitoring it.
    AlreadyRunning(StatusSnapshot),
    /// The request timed out client-side; the job may still have started.
    TimedOut,
    Failed(StartFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartFailure {
    /// The service could not be reached at all. Not retryable.
    Unreachable,
    /// Anything else; retried up to the configured limit.
    Transient(String),
}
