use outreach_core::{
    update, Effect, JobSelection, MonitorState, Msg, NoticeLevel, Phase, StartResult,
    StatusSnapshot,
};

fn running(progress: u8, target: &str) -> StatusSnapshot {
    StatusSnapshot {
        is_running: true,
        progress,
        current_phase: Some("collecting listings".to_string()),
        current_target: Some(target.to_string()),
        ..StatusSnapshot::default()
    }
}

fn init_logging() {
    outreach_logging::initialize_for_tests();
}

fn into_polling(target_count: usize) -> MonitorState {
    init_logging();
    let selection = JobSelection::new(
        (0..target_count).map(|i| format!("https://t{i}.example")),
        vec!["react".to_string()],
    );
    let (state, _) = update(MonitorState::default(), Msg::Submitted(selection));
    let (state, _) = update(state, Msg::ResetCompleted { server_ok: true, local_ok: true });
    let (state, _) = update(state, Msg::ConfigureCompleted(Ok(())));
    let (state, _) = update(state, Msg::StartCompleted(StartResult::Started));
    assert_eq!(state.phase(), Phase::Polling);
    state
}

fn scheduled_delay(effects: &[Effect]) -> Option<u64> {
    effects.iter().find_map(|e| match e {
        Effect::SchedulePoll { delay_ms } => Some(*delay_ms),
        _ => None,
    })
}

#[test]
fn frequency_reduction_fires_exactly_once_at_the_threshold_tick() {
    // Three targets: threshold = max(3 * 40, 120) = 120.
    let mut state = into_polling(3);

    for tick in 1..120u64 {
        let (next, effects) = update(
            state,
            Msg::PollCompleted(Some(running(10, "https://t0.example"))),
        );
        assert_eq!(scheduled_delay(&effects), Some(10_000), "tick {tick}");
        assert!(!next.poll().reduced, "tick {tick}");
        state = next;
    }

    // Tick 120 switches to the reduced cadence, with a notice.
    let (next, effects) = update(
        state,
        Msg::PollCompleted(Some(running(10, "https://t0.example"))),
    );
    assert_eq!(next.poll().ticks, 120);
    assert!(next.poll().reduced);
    assert_eq!(scheduled_delay(&effects), Some(30_000));
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notify(n) if n.level == NoticeLevel::Info && n.message.contains("less frequently")
    )));
    state = next;

    // Never lowered again for this run, and the notice never repeats.
    for _ in 0..5 {
        let (next, effects) = update(
            state,
            Msg::PollCompleted(Some(running(11, "https://t1.example"))),
        );
        assert_eq!(scheduled_delay(&effects), Some(30_000));
        assert!(!effects.iter().any(|e| matches!(
            e,
            Effect::Notify(n) if n.message.contains("less frequently")
        )));
        state = next;
    }
}

#[test]
fn poll_failures_back_off_multiplicatively_and_reset_on_success() {
    let state = into_polling(2);

    let (state, effects) = update(state, Msg::PollCompleted(None));
    assert_eq!(scheduled_delay(&effects), Some(15_000));

    let (state, effects) = update(state, Msg::PollCompleted(None));
    assert_eq!(scheduled_delay(&effects), Some(22_500));

    // Capped at the maximum.
    let (state, effects) = update(state, Msg::PollCompleted(None));
    assert_eq!(scheduled_delay(&effects), Some(30_000));
    assert_eq!(state.poll().consecutive_errors, 3);

    // One success restores the initial cadence (threshold not reached).
    let (state, effects) = update(
        state,
        Msg::PollCompleted(Some(running(5, "https://t0.example"))),
    );
    assert_eq!(scheduled_delay(&effects), Some(10_000));
    assert_eq!(state.poll().consecutive_errors, 0);
}

#[test]
fn backoff_does_not_undercut_the_reduced_cadence() {
    let mut state = into_polling(1);
    // One target: threshold = max(40, 120) = 120.
    for _ in 0..120 {
        let (next, _) = update(
            state,
            Msg::PollCompleted(Some(running(0, "https://t0.example"))),
        );
        state = next;
    }
    assert!(state.poll().reduced);

    // Failures after the latch keep the fixed 30 s interval.
    let (state, effects) = update(state, Msg::PollCompleted(None));
    assert_eq!(scheduled_delay(&effects), Some(30_000));

    // So does the next success.
    let (_, effects) = update(
        state,
        Msg::PollCompleted(Some(running(50, "https://t0.example"))),
    );
    assert_eq!(scheduled_delay(&effects), Some(30_000));
}

#[test]
fn slow_start_notice_fires_once_even_for_identical_snapshots() {
    let mut state = into_polling(2);
    let mut notices = 0;

    for _ in 0..40 {
        let (next, effects) = update(
            state,
            Msg::PollCompleted(Some(running(0, "https://t0.example"))),
        );
        notices += effects
            .iter()
            .filter(|e| matches!(
                e,
                Effect::Notify(n) if n.message.contains("longer than usual to start")
            ))
            .count();
        state = next;
    }

    assert_eq!(notices, 1);
    assert!(state.poll().slow_start_notified);
}

#[test]
fn changed_current_target_overwrites_the_observability_field() {
    let state = into_polling(2);
    let (state, _) = update(
        state,
        Msg::PollCompleted(Some(running(10, "https://t0.example"))),
    );
    assert_eq!(
        state.view().current_target.as_deref(),
        Some("https://t0.example")
    );

    let (state, effects) = update(
        state,
        Msg::PollCompleted(Some(running(10, "https://t1.example"))),
    );
    assert_eq!(
        state.view().current_target.as_deref(),
        Some("https://t1.example")
    );
    // Still polling; no terminal branch was taken.
    assert_eq!(state.phase(), Phase::Polling);
    assert!(scheduled_delay(&effects).is_some());
}

#[test]
fn unchanged_snapshots_only_rearm_the_poll_timer() {
    let mut state = into_polling(2);
    let snapshot = running(10, "https://t0.example");
    let (next, _) = update(state, Msg::PollCompleted(Some(snapshot.clone())));
    state = next;

    for _ in 0..4 {
        let (next, effects) = update(state, Msg::PollCompleted(Some(snapshot.clone())));
        assert_eq!(effects, vec![Effect::SchedulePoll { delay_ms: 10_000 }]);
        state = next;
    }
}

#[test]
fn completed_snapshot_moves_to_downloading() {
    let state = into_polling(2);
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
}

#[test]
fn exactly_one_branch_is_taken_for_a_conflicting_snapshot() {
    let state = into_polling(2);
    let (state, effects) = update(
        state,
        Msg::PollCompleted(Some(StatusSnapshot {
            is_running: true,
            completed: true,
            error: Some("driver crashed".to_string()),
            no_results: true,
            ..StatusSnapshot::default()
        })),
    );
    // The explicit error wins; nothing schedules or downloads.
    assert_eq!(state.phase(), Phase::Failed);
    assert!(!effects.iter().any(|e| matches!(e, Effect::FetchArtifact)));
    assert!(scheduled_delay(&effects).is_none());
    assert_eq!(
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Notify(n) if n.level == NoticeLevel::Error))
            .count(),
        1
    );
}

#[test]
fn no_results_and_silent_snapshots_fail_with_distinct_messages() {
    let state = into_polling(2);
    let (failed, effects) = update(
        state.clone(),
        Msg::PollCompleted(Some(StatusSnapshot {
            no_results: true,
            ..StatusSnapshot::default()
        })),
    );
    assert_eq!(failed.phase(), Phase::Failed);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notify(n) if n.message.contains("No results found")
    )));

    let (failed, effects) = update(
        state,
        Msg::PollCompleted(Some(StatusSnapshot::default())),
    );
    assert_eq!(failed.phase(), Phase::Failed);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notify(n) if n.message.contains("no activity")
    )));
}
