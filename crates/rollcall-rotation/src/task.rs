//! The per-session rotation task.

use std::sync::Arc;

use rollcall_session::{Rotation, SessionError, SessionState};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{CodeDisplay, CodeUpdate, DisplayError, RotationConfig, RotationScheduler};

/// How a rotation task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSummary {
    /// Codes issued after the opening one.
    pub rotations: u64,
    /// `true` if the task was cancelled, `false` if it noticed the session
    /// had closed on its own.
    pub cancelled: bool,
}

/// Owner's handle to a running rotation task.
///
/// Dropping the handle also stops the task (the shutdown channel closes),
/// but [`cancel`](Self::cancel) is the only way to know it has exited.
#[derive(Debug)]
pub struct RotationHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<RotationSummary>,
}

impl RotationHandle {
    /// Stop rotating and wait for the task to exit.
    ///
    /// Once this returns, no further `rotate` or `show_code` call from this
    /// task can happen.
    pub async fn cancel(self) -> RotationSummary {
        let _ = self.shutdown.send(());
        match self.join.await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::error!(%err, "rotation task panicked");
                RotationSummary {
                    rotations: 0,
                    cancelled: true,
                }
            }
        }
    }

    /// `true` once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawns the rotation task for the session currently open in `state`.
///
/// Every `config.interval` the task rotates the code and pushes it to each
/// display attached to the session. It ends when cancelled or when
/// `rotate` reports the session is no longer active.
pub fn spawn_rotation<D: CodeDisplay>(
    state: Arc<SessionState>,
    display: Arc<D>,
    config: RotationConfig,
) -> RotationHandle {
    let (shutdown, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(run(state, display, config, shutdown_rx));
    RotationHandle { shutdown, join }
}

async fn run<D: CodeDisplay>(
    state: Arc<SessionState>,
    display: Arc<D>,
    config: RotationConfig,
    mut shutdown: oneshot::Receiver<()>,
) -> RotationSummary {
    let mut scheduler = RotationScheduler::new(config);
    let interval = scheduler.interval();
    tracing::info!(interval_secs = interval.as_secs_f64(), "rotation task started");

    let mut issued = 0u64;
    let cancelled = loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break true,
            tick = scheduler.wait_for_rotation() => {
                let rotation = match state.rotate().await {
                    Ok(rotation) => rotation,
                    Err(SessionError::NotActive) => break false,
                    Err(err) => {
                        tracing::error!(%err, "rotation failed, stopping");
                        break false;
                    }
                };
                issued += 1;
                tracing::debug!(
                    session_id = %rotation.session_id,
                    rotation = tick.rotation,
                    submitted = rotation.submitted,
                    "code rotated"
                );
                push(&state, display.as_ref(), rotation, interval).await;
            }
        }
    };

    let summary = RotationSummary {
        rotations: issued,
        cancelled,
    };
    tracing::info!(
        rotations = summary.rotations,
        cancelled,
        "rotation task stopped"
    );
    summary
}

async fn push<D: CodeDisplay>(
    state: &SessionState,
    display: &D,
    rotation: Rotation,
    interval: std::time::Duration,
) {
    let update = CodeUpdate {
        session_id: rotation.session_id,
        code: rotation.code,
        submitted: rotation.submitted,
        interval,
    };
    for handle in &rotation.displays {
        match display.show_code(handle, &update).await {
            Ok(()) => {}
            Err(DisplayError::Gone(gone)) => {
                tracing::warn!(display = %gone, "display gone, detaching");
                state.detach_display(&gone).await;
            }
            Err(DisplayError::Failed(reason)) => {
                tracing::warn!(display = %handle, %reason, "display update failed");
            }
        }
    }
}
