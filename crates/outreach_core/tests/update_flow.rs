use outreach_core::{
    update, Effect, JobSelection, MonitorState, Msg, NoticeLevel, Phase, StartFailure,
    StartResult, StatusSnapshot,
};

fn selection(targets: &[&str]) -> JobSelection {
    JobSelection::new(
        targets.iter().map(|t| t.to_string()),
        vec!["react".to_string(), "php".to_string()],
    )
}

fn submit(targets: &[&str]) -> (MonitorState, Vec<Effect>) {
    update(MonitorState::default(), Msg::Submitted(selection(targets)))
}

/// Drive a fresh state up to `Polling` via the happy path.
fn into_polling(targets: &[&str]) -> MonitorState {
    let (state, _) = submit(targets);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, _) = update(state, Msg::ConfigureCompleted(Ok(())));
    let (state, _) = update(state, Msg::StartCompleted(StartResult::Started));
    assert_eq!(state.phase(), Phase::Polling);
    state
}

#[test]
fn submission_resets_and_then_configures() {
    let (state, effects) = submit(&["https://a.example", "https://b.example"]);
    assert_eq!(state.phase(), Phase::Resetting);
    assert_eq!(
        effects,
        vec![Effect::CancelTimers, Effect::ResetRemote]
    );

    // Reset failure on either side is tolerated.
    let (state, effects) =
        update(state, Msg::ResetCompleted { server_ok: false, local_ok: true });
    assert_eq!(state.phase(), Phase::Configuring);
    let config = match &effects[..] {
        [Effect::PushConfig(config)] => config.clone(),
        other => panic!("expected PushConfig, got {other:?}"),
    };
    assert_eq!(config.targets.len(), 2);
    assert_eq!(config.batch_size, 1);
    assert!(config.no_timeout);
}

#[test]
fn empty_selection_is_rejected_without_starting_a_run() {
    let (state, effects) = update(
        MonitorState::default(),
        Msg::Submitted(JobSelection::default()),
    );
    assert_eq!(state.phase(), Phase::Idle);
    assert!(matches!(
        &effects[..],
        [Effect::Notify(notice)] if notice.level == NoticeLevel::Error
    ));
}

#[test]
fn rejected_configuration_aborts_the_run() {
    let (state, _) = submit(&["https://a.example"]);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, effects) = update(
        state,
        Msg::ConfigureCompleted(Err("invalid keyword set".to_string())),
    );
    assert_eq!(state.phase(), Phase::Failed);
    assert!(effects.contains(&Effect::CancelTimers));
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notify(n) if n.level == NoticeLevel::Error && n.message.contains("invalid keyword set")
    )));
}

#[test]
fn successful_start_enters_polling_with_initial_delay() {
    let (state, _) = submit(&["https://a.example"]);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, effects) = update(state, Msg::ConfigureCompleted(Ok(())));
    assert_eq!(state.phase(), Phase::Starting);
    assert_eq!(effects, vec![Effect::StartJob]);

    let (state, effects) = update(state, Msg::StartCompleted(StartResult::Started));
    assert_eq!(state.phase(), Phase::Polling);
    assert_eq!(effects, vec![Effect::SchedulePoll { delay_ms: 10_000 }]);
}

#[test]
fn timed_out_start_still_enters_polling() {
    let (state, _) = submit(&["https://a.example"]);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, _) = update(state, Msg::ConfigureCompleted(Ok(())));
    let (state, effects) = update(state, Msg::StartCompleted(StartResult::TimedOut));

    assert_eq!(state.phase(), Phase::Polling);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notify(n) if n.level == NoticeLevel::Warning
    )));
    assert!(effects.contains(&Effect::SchedulePoll { delay_ms: 10_000 }));
}

#[test]
fn already_running_job_is_resumed() {
    let (state, _) = submit(&["https://a.example"]);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, _) = update(state, Msg::ConfigureCompleted(Ok(())));

    let snapshot = StatusSnapshot {
        is_running: true,
        progress: 40,
        current_phase: Some("collecting listings".to_string()),
        ..StatusSnapshot::default()
    };
    let (state, effects) = update(
        state,
        Msg::StartCompleted(StartResult::AlreadyRunning(snapshot.clone())),
    );
    assert_eq!(state.phase(), Phase::Polling);
    assert_eq!(state.last_snapshot(), Some(&snapshot));
    assert!(effects.contains(&Effect::SchedulePoll { delay_ms: 10_000 }));
    assert!(state.view().status_line.contains("40%"));
}

#[test]
fn transient_start_failures_recover_up_to_the_retry_limit() {
    let (state, _) = submit(&["https://a.example"]);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (mut state, _) = update(state, Msg::ConfigureCompleted(Ok(())));

    for attempt in 1..=3u32 {
        let (next, effects) = update(
            state,
            Msg::StartCompleted(StartResult::Failed(StartFailure::Transient(
                "503".to_string(),
            ))),
        );
        assert_eq!(next.phase(), Phase::Recovering, "attempt {attempt}");
        assert!(effects.contains(&Effect::ScheduleRecovery { delay_ms: 10_000 }));

        let (next, effects) = update(next, Msg::RecoveryElapsed);
        assert_eq!(next.phase(), Phase::Starting);
        assert_eq!(effects, vec![Effect::StartJob]);
        state = next;
    }

    // Fourth transient failure exhausts the limit.
    let (state, effects) = update(
        state,
        Msg::StartCompleted(StartResult::Failed(StartFailure::Transient(
            "503".to_string(),
        ))),
    );
    assert_eq!(state.phase(), Phase::Failed);
    assert!(effects.contains(&Effect::CancelTimers));
}

#[test]
fn unreachable_network_fails_without_recovery() {
    let (state, _) = submit(&["https://a.example"]);
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, _) = update(state, Msg::ConfigureCompleted(Ok(())));
    let (state, effects) = update(
        state,
        Msg::StartCompleted(StartResult::Failed(StartFailure::Unreachable)),
    );
    assert_eq!(state.phase(), Phase::Failed);
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::ScheduleRecovery { .. })));
}

#[test]
fn elapsed_seconds_only_accumulate_while_a_run_is_live() {
    let state = MonitorState::default();
    let (state, _) = update(state, Msg::SecondElapsed);
    assert_eq!(state.view().elapsed, "00:00:00");

    let state = into_polling(&["https://a.example"]);
    let (state, _) = update(state, Msg::SecondElapsed);
    let (state, _) = update(state, Msg::SecondElapsed);
    assert_eq!(state.view().elapsed, "00:00:02");

    let (state, _) = update(
        state,
        Msg::PollCompleted(Some(StatusSnapshot {
            error: Some("boom".to_string()),
            ..StatusSnapshot::default()
        })),
    );
    assert_eq!(state.phase(), Phase::Failed);
    let (state, _) = update(state, Msg::SecondElapsed);
    assert_eq!(state.view().elapsed, "00:00:02");
}

#[test]
fn download_outcome_decides_the_terminal_phase() {
    let state = into_polling(&["https://a.example"]);
    let (state, effects) = update(
        state,
        Msg::PollCompleted(Some(StatusSnapshot {
            completed: true,
            progress: 100,
            ..StatusSnapshot::default()
        })),
    );
    assert_eq!(state.phase(), Phase::Downloading);
    assert_eq!(effects, vec![Effect::FetchArtifact]);

    let (done, effects) = update(state.clone(), Msg::DownloadCompleted(true));
    assert_eq!(done.phase(), Phase::Completed);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notify(n) if n.level == NoticeLevel::Success
    )));

    let (failed, effects) = update(state, Msg::DownloadCompleted(false));
    assert_eq!(failed.phase(), Phase::Failed);
    assert!(effects.contains(&Effect::CancelTimers));
}
