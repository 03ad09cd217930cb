/// One polled copy of the remote job status.
///
/// The authoritative state lives in the scraping service; a snapshot is an
/// immutable value compared structurally against the previous poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub completed: bool,
    pub error: Option<String>,
    pub no_results: bool,
    /// 0–100.
    pub progress: u8,
    pub current_phase: Option<String>,
    pub current_target: Option<String>,
    pub last_completed: Option<String>,
}

/// The single active interpretation of a snapshot.
///
/// The monitor picks exactly one branch per poll; precedence is fixed here
/// so a malformed snapshot (e.g. `completed` and `error` both set) cannot
/// drive two transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    Error(String),
    Completed,
    NoResults,
    Running,
    /// Neither a phase nor a completed step was ever reported, and the job
    /// is not running: the service cannot tell "never started" apart from
    /// "found nothing". Kept distinct from `NoResults` so callers can flag
    /// the ambiguity.
    Inactive,
    /// The job has not produced a decisive signal yet; keep polling.
    Waiting,
}

impl StatusSnapshot {
    pub fn interpret(&self) -> StatusKind {
        if let Some(error) = &self.error {
            return StatusKind::Error(error.clone());
        }
        if self.completed {
            return StatusKind::Completed;
        }
        if self.no_results {
            return StatusKind::NoResults;
        }
        if self.is_running {
            return StatusKind::Running;
        }
        if self.current_phase.is_none() && self.last_completed.is_none() {
            return StatusKind::Inactive;
        }
        StatusKind::Waiting
    }
}
