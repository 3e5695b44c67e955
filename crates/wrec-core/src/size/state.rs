//! Published size state and poller lifecycle phase.

/// Observable recording size. Written only by the active poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSizeState {
    /// Last successfully fetched size. May go down if the session is reset.
    pub bytes: u64,
    /// True exactly while a poll loop owns this state.
    pub polling: bool,
}

/// Lifecycle of the poller for one embedding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    /// No loop has been started yet.
    Idle,
    /// A loop is running.
    Polling,
    /// The last loop has exited; only a fresh start can poll again.
    Stopped,
}
