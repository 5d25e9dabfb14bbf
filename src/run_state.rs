// =============================================================================
// run_state.rs - Run-scoped progress, log trail and cancellation
// =============================================================================
//
// A RunHandle is the explicit context every pipeline stage logs through. It is
// cheap to clone and can be handed to a concurrent caller (the progress
// endpoint, a Ctrl-C handler) which may read snapshots or request a stop.
//
// Writes go through a parking_lot RwLock, so a second writer is serialized
// rather than trusted to behave. The stop flag is only honoured at date
// boundaries by the orchestrator.
//
// `is_running` is released by RunGuard's Drop, which means it is cleared on
// every exit path: success, error, cancellation or panic unwinding.
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::IngestError;

/// Default capacity of the log trail.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Snapshot of a run's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub is_running: bool,
    pub stop_requested: bool,
    pub current_action: String,
    /// Most recent first. Oldest entries fall off past the capacity.
    pub logs: VecDeque<String>,
}

impl RunState {
    fn idle() -> Self {
        Self {
            is_running: false,
            stop_requested: false,
            current_action: "Idle".to_string(),
            logs: VecDeque::new(),
        }
    }
}

struct Shared {
    state: RwLock<RunState>,
    log_capacity: usize,
}

/// Shared, thread-safe handle to the run state.
#[derive(Clone)]
pub struct RunHandle {
    shared: Arc<Shared>,
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl RunHandle {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(RunState::idle()),
                log_capacity: log_capacity.max(1),
            }),
        }
    }

    /// Start a run: resets flags and the log trail and marks the handle as
    /// running. The returned guard clears `is_running` when dropped.
    pub fn begin(&self) -> Result<RunGuard, IngestError> {
        let mut state = self.shared.state.write();
        if state.is_running {
            return Err(IngestError::AlreadyRunning);
        }
        state.is_running = true;
        state.stop_requested = false;
        state.logs.clear();
        state.current_action = "Starting".to_string();
        Ok(RunGuard {
            handle: self.clone(),
        })
    }

    /// Append a timestamped entry to the trail and mirror it to tracing.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(target: "cause_list::run", "{message}");

        let entry = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        let mut state = self.shared.state.write();
        state.logs.push_front(entry);
        state.logs.truncate(self.shared.log_capacity);
        state.current_action = message.to_string();
    }

    /// Ask the current run to stop at the next date boundary. Ignored (and
    /// `false` returned) when nothing is running.
    pub fn request_stop(&self) -> bool {
        {
            let mut state = self.shared.state.write();
            if !state.is_running {
                return false;
            }
            state.stop_requested = true;
        }
        warn!("stop requested for the running cause-list ingestion");
        self.log("Stop requested by user...");
        true
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.state.read().stop_requested
    }

    pub fn snapshot(&self) -> RunState {
        self.shared.state.read().clone()
    }
}

/// Scoped ownership of a run. Dropping it clears `is_running` and
/// `stop_requested` unconditionally.
#[must_use = "dropping the guard immediately ends the run"]
pub struct RunGuard {
    handle: RunHandle,
}

impl RunGuard {
    pub fn handle(&self) -> &RunHandle {
        &self.handle
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = self.handle.shared.state.write();
        state.is_running = false;
        state.stop_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_are_most_recent_first_and_bounded() {
        let handle = RunHandle::new(50);
        for i in 0..60 {
            handle.log(format!("step {i}"));
        }
        let snap = handle.snapshot();
        assert_eq!(snap.logs.len(), 50);
        assert!(snap.logs[0].ends_with("step 59"));
        assert!(snap.logs[49].ends_with("step 10"));
        assert_eq!(snap.current_action, "step 59");
    }

    #[test]
    fn test_begin_resets_previous_trail() {
        let handle = RunHandle::default();
        handle.log("left over from last run");
        let guard = handle.begin().unwrap();
        assert!(guard.handle().snapshot().logs.is_empty());
        assert!(handle.snapshot().is_running);
    }

    #[test]
    fn test_guard_clears_running_flag_on_drop() {
        let handle = RunHandle::default();
        {
            let _guard = handle.begin().unwrap();
            assert!(handle.request_stop());
            assert!(handle.is_stop_requested());
        }
        assert!(!handle.snapshot().is_running);
        assert!(!handle.is_stop_requested());
    }

    #[test]
    fn test_guard_clears_running_flag_on_panic() {
        let handle = RunHandle::default();
        let inner = handle.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = inner.begin().unwrap();
            panic!("fault inside the run");
        }));
        assert!(result.is_err());
        assert!(!handle.snapshot().is_running);
    }

    #[test]
    fn test_second_run_is_rejected_while_first_is_active() {
        let handle = RunHandle::default();
        let _guard = handle.begin().unwrap();
        assert!(matches!(handle.begin(), Err(IngestError::AlreadyRunning)));
    }

    #[test]
    fn test_stop_request_ignored_when_idle() {
        let handle = RunHandle::default();
        assert!(!handle.request_stop());
        assert!(!handle.is_stop_requested());
    }
}
