use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use outreach_core::{
    update, Effect, JobSelection, MonitorSettings, MonitorState, Msg, Notice, Phase,
};
use outreach_logging::{orch_debug, orch_info, set_poll_tick};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::effects::EffectExecutor;

/// Observability stream from a running monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    PhaseChanged(Phase),
    Notice(Notice),
    StatusLine(String),
}

#[derive(Debug)]
pub struct MonitorOutcome {
    pub phase: Phase,
    pub artifact: Option<PathBuf>,
}

/// Drive one submitted job to a terminal phase.
///
/// The driver is the single owner of the run's timers: one poll deadline,
/// one recovery deadline, one elapsed ticker. They live in this function's
/// locals, so cancelling the token (or dropping the future) provably leaves
/// no background work alive, and two live poll timers cannot exist.
pub async fn run_monitor(
    selection: JobSelection,
    settings: MonitorSettings,
    mut executor: EffectExecutor,
    events: UnboundedSender<MonitorEvent>,
    cancel: CancellationToken,
) -> MonitorOutcome {
    let mut state = MonitorState::new(settings);
    let mut queue: VecDeque<Msg> = VecDeque::new();
    queue.push_back(Msg::Submitted(selection));

    let mut poll_deadline: Option<Instant> = None;
    let mut recovery_deadline: Option<Instant> = None;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        while let Some(msg) = queue.pop_front() {
            let previous_phase = state.phase();
            let previous_line = state.view().status_line;
            let (next, effects) = update(state, msg);
            state = next;

            if state.phase() != previous_phase {
                orch_info!("Monitor phase: {:?} -> {:?}", previous_phase, state.phase());
                let _ = events.send(MonitorEvent::PhaseChanged(state.phase()));
            }
            let line = state.view().status_line;
            if line != previous_line && !line.is_empty() {
                let _ = events.send(MonitorEvent::StatusLine(line));
            }

            for effect in effects {
                match effect {
                    Effect::ResetRemote => {
                        let (server_ok, local_ok) = executor.reset().await;
                        queue.push_back(Msg::ResetCompleted { server_ok, local_ok });
                    }
                    Effect::PushConfig(config) => {
                        let result = executor.configure(&config).await;
                        queue.push_back(Msg::ConfigureCompleted(result));
                    }
                    Effect::StartJob => {
                        let result = executor.start().await;
                        queue.push_back(Msg::StartCompleted(result));
                    }
                    Effect::ScheduleRecovery { delay_ms } => {
                        recovery_deadline =
                            Some(Instant::now() + Duration::from_millis(delay_ms));
                    }
                    Effect::SchedulePoll { delay_ms } => {
                        // Re-arming replaces the pending deadline; there is
                        // never more than one.
                        poll_deadline = Some(Instant::now() + Duration::from_millis(delay_ms));
                    }
                    Effect::FetchArtifact => {
                        let ok = executor.fetch_artifact().await;
                        queue.push_back(Msg::DownloadCompleted(ok));
                    }
                    Effect::CancelTimers => {
                        poll_deadline = None;
                        recovery_deadline = None;
                    }
                    Effect::Notify(notice) => {
                        let _ = events.send(MonitorEvent::Notice(notice));
                    }
                }
            }
        }

        if state.phase().is_terminal() {
            return MonitorOutcome {
                phase: state.phase(),
                artifact: executor.artifact().map(PathBuf::from),
            };
        }
        if state.phase() == Phase::Idle {
            // Only reachable after an explicit cancellation.
            return MonitorOutcome {
                phase: Phase::Idle,
                artifact: None,
            };
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                orch_debug!("Monitor cancelled; tearing down timers");
                queue.push_back(Msg::Cancelled);
            }
            _ = tokio::time::sleep_until(poll_deadline.unwrap_or_else(Instant::now)),
                if poll_deadline.is_some() =>
            {
                poll_deadline = None;
                set_poll_tick(state.poll().ticks + 1);
                let snapshot = executor.poll().await;
                queue.push_back(Msg::PollCompleted(snapshot));
            }
            _ = tokio::time::sleep_until(recovery_deadline.unwrap_or_else(Instant::now)),
                if recovery_deadline.is_some() =>
            {
                recovery_deadline = None;
                queue.push_back(Msg::RecoveryElapsed);
            }
            _ = ticker.tick() => {
                queue.push_back(Msg::SecondElapsed);
            }
        }
    }
}
