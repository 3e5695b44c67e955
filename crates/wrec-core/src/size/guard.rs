//! RAII guard that marks the size state as polled while a loop is alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::state::SessionSizeState;

/// Sets `polling` on creation and clears it when dropped, so the flag is reset
/// however the loop ends (teardown, cancellation, or panic). A guard whose
/// instance has been superseded leaves the flag to the newer instance.
pub(super) struct PollingGuard {
    state: Arc<watch::Sender<SessionSizeState>>,
    current: Arc<AtomicU64>,
    instance: u64,
}

impl PollingGuard {
    pub(super) fn engage(
        state: Arc<watch::Sender<SessionSizeState>>,
        current: Arc<AtomicU64>,
        instance: u64,
    ) -> Self {
        state.send_modify(|s| s.polling = true);
        Self {
            state,
            current,
            instance,
        }
    }
}

impl Drop for PollingGuard {
    fn drop(&mut self) {
        if self.current.load(Ordering::SeqCst) == self.instance {
            self.state.send_modify(|s| s.polling = false);
        }
    }
}
