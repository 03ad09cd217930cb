use crate::{
    Effect, JobConfig, JobSelection, MonitorState, Msg, Notice, Phase, StartFailure, StartResult,
    StatusKind, StatusSnapshot,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not belong to the current phase (a poll completing after
/// cancellation, a stale recovery timer) are dropped without effects, so the
/// driver never has to reason about message/timer races.
pub fn update(mut state: MonitorState, msg: Msg) -> (MonitorState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submitted(selection) => on_submitted(&mut state, selection),
        Msg::ResetCompleted { server_ok, local_ok } => {
            on_reset_completed(&mut state, server_ok, local_ok)
        }
        Msg::ConfigureCompleted(result) => on_configure_completed(&mut state, result),
        Msg::StartCompleted(result) => on_start_completed(&mut state, result),
        Msg::RecoveryElapsed => on_recovery_elapsed(&mut state),
        Msg::PollCompleted(snapshot) => on_poll_completed(&mut state, snapshot),
        Msg::DownloadCompleted(ok) => on_download_completed(&mut state, ok),
        Msg::SecondElapsed => {
            if !matches!(state.phase(), Phase::Idle) && !state.phase().is_terminal() {
                state.tick_second();
            }
            Vec::new()
        }
        Msg::Cancelled => {
            state.reset_to_idle();
            vec![Effect::CancelTimers]
        }
    };

    (state, effects)
}

fn on_submitted(state: &mut MonitorState, selection: JobSelection) -> Vec<Effect> {
    if selection.targets.is_empty() {
        return vec![Effect::Notify(Notice::error(
            "Select at least one target before submitting",
        ))];
    }

    let max_retries = state.settings().max_start_retries;
    let config = JobConfig::from_selection(&selection, max_retries);
    state.begin_run(config);
    state.set_status_line("Resetting previous sessions...");

    // Superseding a live run tears its timers down before any new work.
    vec![Effect::CancelTimers, Effect::ResetRemote]
}

fn on_reset_completed(state: &mut MonitorState, _server_ok: bool, _local_ok: bool) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Resetting) {
        return Vec::new();
    }
    // Reset failures are tolerated on both sides; the run proceeds.
    let Some(config) = state.config().cloned() else {
        state.reset_to_idle();
        return vec![Effect::CancelTimers];
    };
    state.set_phase(Phase::Configuring);
    state.set_status_line("Updating configuration...");
    vec![Effect::PushConfig(config)]
}

fn on_configure_completed(
    state: &mut MonitorState,
    result: Result<(), String>,
) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Configuring) {
        return Vec::new();
    }
    match result {
        Ok(()) => {
            let target_count = state.config().map(|c| c.targets.len()).unwrap_or(0);
            state.set_phase(Phase::Starting);
            state.set_status_line(format!(
                "Starting scraping process for {target_count} targets..."
            ));
            vec![Effect::StartJob]
        }
        Err(reason) => {
            // A rejected configuration means no job was submitted at all.
            fail(state, format!("Failed to update configuration: {reason}"))
        }
    }
}

fn on_start_completed(state: &mut MonitorState, result: StartResult) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Starting) {
        return Vec::new();
    }
    match result {
        StartResult::Started => {
            state.set_status_line("Scraping started. Monitoring progress...");
            enter_polling(state)
        }
        StartResult::AlreadyRunning(snapshot) => {
            let progress = snapshot.progress;
            state.set_last_snapshot(snapshot);
            state.set_status_line(format!(
                "Resuming existing scraping job ({progress}% complete)..."
            ));
            enter_polling(state)
        }
        StartResult::TimedOut => {
            state.set_status_line("Waiting for scraping status...");
            let mut effects = vec![Effect::Notify(Notice::warning(
                "Start request timed out; the job may still be running. Monitoring progress...",
            ))];
            effects.extend(enter_polling(state));
            effects
        }
        StartResult::Failed(StartFailure::Unreachable) => fail(
            state,
            "Cannot connect to the scraping service. Check that it is running.",
        ),
        StartResult::Failed(StartFailure::Transient(reason)) => {
            let attempts = state.start_attempts();
            let max = state.settings().max_start_retries;
            if attempts < max {
                let attempt = state.bump_start_attempts();
                let delay_ms = state.settings().recovery_delay_ms;
                state.set_phase(Phase::Recovering);
                state.set_status_line(format!(
                    "Restarting scraping process (try {attempt}/{max})..."
                ));
                vec![
                    Effect::Notify(Notice::warning(format!(
                        "Scraping failed to start ({reason}). Attempting recovery (try {attempt}/{max})..."
                    ))),
                    Effect::ScheduleRecovery { delay_ms },
                ]
            } else {
                fail(state, "Failed to start scraping after multiple attempts")
            }
        }
    }
}

fn enter_polling(state: &mut MonitorState) -> Vec<Effect> {
    state.set_phase(Phase::Polling);
    vec![Effect::SchedulePoll { delay_ms: state.poll().delay_ms }]
}

fn on_recovery_elapsed(state: &mut MonitorState) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Recovering) {
        return Vec::new();
    }
    state.set_phase(Phase::Starting);
    vec![Effect::StartJob]
}

fn on_poll_completed(
    state: &mut MonitorState,
    snapshot: Option<StatusSnapshot>,
) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Polling) {
        return Vec::new();
    }
    state.poll_mut().ticks += 1;

    match snapshot {
        Some(snapshot) => on_poll_snapshot(state, snapshot),
        None => on_poll_failure(state),
    }
}

fn on_poll_snapshot(state: &mut MonitorState, snapshot: StatusSnapshot) -> Vec<Effect> {
    let mut effects = Vec::new();

    // A successful poll clears the failure backoff, unless the tick
    // threshold has already fixed the interval at the maximum.
    let initial = state.settings().initial_poll_delay_ms;
    {
        let poll = state.poll_mut();
        poll.consecutive_errors = 0;
        if !poll.reduced {
            poll.delay_ms = initial;
        }
    }

    // Frequency reduction fires once per run and never reverts.
    let threshold = state.poll().threshold;
    if !state.poll().reduced && state.poll().ticks >= threshold {
        let max_delay = state.settings().max_poll_delay_ms;
        let poll = state.poll_mut();
        poll.delay_ms = max_delay;
        poll.reduced = true;
        effects.push(Effect::Notify(Notice::info(
            "Scraping is taking longer than usual. Status will now update less frequently.",
        )));
    }

    match snapshot.interpret() {
        StatusKind::Running => {
            effects.extend(on_running_snapshot(state, snapshot));
            effects.push(Effect::SchedulePoll { delay_ms: state.poll().delay_ms });
        }
        StatusKind::Waiting => {
            state.set_last_snapshot(snapshot);
            state.set_status_line("Waiting for scraping to begin...");
            effects.push(Effect::SchedulePoll { delay_ms: state.poll().delay_ms });
        }
        StatusKind::Completed => {
            state.set_last_snapshot(snapshot);
            state.set_phase(Phase::Downloading);
            state.set_current_target(None);
            state.set_status_line("Scraping completed! Getting results...");
            effects.push(Effect::FetchArtifact);
        }
        StatusKind::Error(reason) => {
            state.set_last_snapshot(snapshot);
            effects.extend(fail(state, format!("Scraping error: {reason}")));
        }
        StatusKind::NoResults => {
            state.set_last_snapshot(snapshot);
            effects.extend(fail(state, "No results found for the specified criteria"));
        }
        StatusKind::Inactive => {
            // Distinct from an explicit no-results signal: the service
            // reported no activity at all, which also covers a job that
            // never started.
            state.set_last_snapshot(snapshot);
            effects.extend(fail(
                state,
                "Job reported no activity: it either never started or found nothing",
            ));
        }
    }

    effects
}

fn on_running_snapshot(state: &mut MonitorState, snapshot: StatusSnapshot) -> Vec<Effect> {
    let mut effects = Vec::new();
    let changed = state.last_snapshot() != Some(&snapshot);
    let ticks = state.poll().ticks;
    let stride = state.settings().unchanged_refresh_stride;

    // One-time reassurance when the job sits at zero progress; fires even
    // when consecutive snapshots are identical.
    if snapshot.progress == 0
        && ticks > state.settings().slow_start_ticks
        && !state.poll().slow_start_notified
    {
        state.poll_mut().slow_start_notified = true;
        effects.push(Effect::Notify(Notice::info(
            "Scraping is taking longer than usual to start. This is normal for many targets.",
        )));
    }

    if changed {
        if snapshot.current_target.is_some() {
            state.set_current_target(snapshot.current_target.clone());
        }
        let phase_text = snapshot
            .current_phase
            .clone()
            .unwrap_or_else(|| "Scraping in progress".to_string());
        state.set_status_line(format!(
            "{phase_text} (Progress: {}%)",
            snapshot.progress
        ));
    } else if stride > 0 && ticks % stride == 0 {
        // Unchanged snapshot: refresh only the observability fields.
        if snapshot.current_target.is_some()
            && snapshot.current_target != *state.current_target_ref()
        {
            state.set_current_target(snapshot.current_target.clone());
        }
        let phase_text = snapshot
            .current_phase
            .clone()
            .unwrap_or_else(|| "Scraping in progress".to_string());
        state.set_status_line(format!(
            "{phase_text} (Progress: {}%)",
            snapshot.progress
        ));
    }

    state.set_last_snapshot(snapshot);
    effects
}

fn on_poll_failure(state: &mut MonitorState) -> Vec<Effect> {
    let max_delay = state.settings().max_poll_delay_ms;
    let ticks = state.poll().ticks;
    {
        let poll = state.poll_mut();
        poll.consecutive_errors += 1;
        // Multiplicative backoff (x1.5, capped); the threshold latch wins.
        if !poll.reduced {
            poll.delay_ms = (poll.delay_ms * 3 / 2).min(max_delay);
        }
    }
    state.set_status_line(format!(
        "Waiting for status update... Server may be busy (attempt {ticks})"
    ));
    vec![Effect::SchedulePoll { delay_ms: state.poll().delay_ms }]
}

fn on_download_completed(state: &mut MonitorState, ok: bool) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Downloading) {
        return Vec::new();
    }
    if ok {
        state.set_phase(Phase::Completed);
        state.set_status_line("Results ready");
        vec![
            Effect::Notify(Notice::success("Data found and ready to use!")),
            Effect::CancelTimers,
        ]
    } else {
        fail(state, "Failed to save or download results")
    }
}

fn fail(state: &mut MonitorState, reason: impl Into<String>) -> Vec<Effect> {
    let reason = reason.into();
    state.set_phase(Phase::Failed);
    state.set_failure(reason.clone());
    state.set_status_line(reason.clone());
    vec![Effect::Notify(Notice::error(reason)), Effect::CancelTimers]
}
