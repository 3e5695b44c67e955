//! Size poller: one poll loop per embedding context.
//!
//! The owner holds the embedding signal's sender and the poller holds a
//! receiver. A loop is started only when the context is embedded and a
//! session id is set, and only if no loop is already running. The loop checks
//! the signal (and a stop token) at the head of every cycle, so teardown takes
//! effect no later than the next scheduled tick; a fetch already in flight is
//! allowed to finish. A stopped loop is never resumed: the next start spawns a
//! fresh instance, even while the stopped one is still winding down. Only the
//! newest instance publishes sizes or clears the polling flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::guard::PollingGuard;
use super::source::SizeSource;
use super::state::{PollerPhase, SessionSizeState};

/// Floor applied to the poll interval so a loop never fetches back to back.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Stop request for one loop instance.
#[derive(Debug, Default)]
struct StopToken {
    requested: AtomicBool,
    notify: Notify,
}

impl StopToken {
    fn request(&self) {
        self.requested.store(true, Ordering::Relaxed);
        // notify_one stores a permit, so a loop that is mid-fetch still wakes
        // immediately once it starts waiting.
        self.notify.notify_one();
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }
}

struct PollerInstance {
    id: u64,
    stop: Arc<StopToken>,
    /// `None` once the handle has been awaited.
    handle: Option<JoinHandle<()>>,
}

impl PollerInstance {
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Running and not asked to stop.
    fn is_active(&self) -> bool {
        self.is_running() && !self.stop.is_requested()
    }

    async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(instance = self.id, error = %err, "size poller task ended abnormally");
            }
        }
    }
}

pub struct SizePoller<S> {
    source: Arc<S>,
    interval: Duration,
    embedding: watch::Receiver<bool>,
    session: watch::Sender<Option<String>>,
    state: Arc<watch::Sender<SessionSizeState>>,
    /// Id of the newest instance; older ones stay silent while winding down.
    current: Arc<AtomicU64>,
    active: Option<PollerInstance>,
    instances_started: u64,
}

impl<S: SizeSource> SizePoller<S> {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(source: S, interval: Duration, embedding: watch::Receiver<bool>) -> Self {
        let (session, _) = watch::channel(None);
        let (state, _) = watch::channel(SessionSizeState::default());
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "poll interval below minimum; using {} ms",
                MIN_POLL_INTERVAL.as_millis()
            );
        }
        Self {
            source: Arc::new(source),
            interval: interval.max(MIN_POLL_INTERVAL),
            embedding,
            session,
            state: Arc::new(state),
            current: Arc::new(AtomicU64::new(0)),
            active: None,
            instances_started: 0,
        }
    }

    /// Reader for the published size state.
    pub fn subscribe(&self) -> watch::Receiver<SessionSizeState> {
        self.state.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current published size state.
    pub fn size(&self) -> SessionSizeState {
        *self.state.borrow()
    }

    pub fn session(&self) -> Option<String> {
        self.session.borrow().clone()
    }

    /// Set (or clear) the session to poll and start a loop if the context is
    /// now eligible. A running loop picks up the new id on its next cycle.
    pub fn set_session(&mut self, session: Option<String>) -> bool {
        self.session.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session;
                true
            }
        });
        self.ensure_started()
    }

    pub fn phase(&self) -> PollerPhase {
        match &self.active {
            None => PollerPhase::Idle,
            Some(instance) if instance.is_active() => PollerPhase::Polling,
            Some(_) => PollerPhase::Stopped,
        }
    }

    /// Number of loop instances spawned so far.
    pub fn instances_started(&self) -> u64 {
        self.instances_started
    }

    fn is_embedded(&self) -> bool {
        self.embedding.has_changed().is_ok() && *self.embedding.borrow()
    }

    /// Start a fresh loop if the context is embedded, a session is set, and no
    /// loop is active. Returns true if a new loop was spawned; calling it while
    /// a loop is active is a no-op. A loop that was asked to stop does not count
    /// as active. Must be called within a tokio runtime.
    pub fn ensure_started(&mut self) -> bool {
        if self.active.as_ref().is_some_and(PollerInstance::is_active) {
            tracing::trace!("size poller already running; start ignored");
            return false;
        }
        if !self.is_embedded() || self.session.borrow().is_none() {
            return false;
        }

        self.instances_started += 1;
        let id = self.instances_started;
        self.current.store(id, Ordering::SeqCst);
        let stop = Arc::new(StopToken::default());
        let cycle = PollCycle {
            id,
            source: Arc::clone(&self.source),
            interval: self.interval,
            embedding: self.embedding.clone(),
            session: self.session.subscribe(),
            state: Arc::clone(&self.state),
            current: Arc::clone(&self.current),
            stop: Arc::clone(&stop),
        };
        let handle = tokio::spawn(cycle.run());
        self.active = Some(PollerInstance {
            id,
            stop,
            handle: Some(handle),
        });
        true
    }

    /// Ask the running loop (if any) to stop at its next check point.
    pub fn request_stop(&self) {
        if let Some(instance) = &self.active {
            instance.stop.request();
        }
    }

    /// Stop the running loop and wait until it has exited.
    pub async fn shutdown(&mut self) {
        self.request_stop();
        if let Some(instance) = self.active.as_mut() {
            instance.join().await;
        }
    }

    /// Drive the lifecycle from the embedding signal until its sender is
    /// dropped: every rise starts a loop, every fall waits for the current loop
    /// to wind down. Shuts the loop down on return.
    pub async fn follow_embedding(&mut self) {
        loop {
            let embedded = *self.embedding.borrow_and_update();
            if embedded {
                self.ensure_started();
            } else if let Some(instance) = self.active.as_mut() {
                instance.join().await;
            }
            if self.embedding.changed().await.is_err() {
                break;
            }
        }
        self.shutdown().await;
    }
}

impl<S> Drop for SizePoller<S> {
    fn drop(&mut self) {
        if let Some(instance) = &self.active {
            instance.stop.request();
        }
    }
}

/// How the wait between fetches ended.
enum Wake {
    Tick,
    Teardown,
}

/// State owned by one running loop instance.
struct PollCycle<S> {
    id: u64,
    source: Arc<S>,
    interval: Duration,
    embedding: watch::Receiver<bool>,
    session: watch::Receiver<Option<String>>,
    state: Arc<watch::Sender<SessionSizeState>>,
    current: Arc<AtomicU64>,
    stop: Arc<StopToken>,
}

impl<S: SizeSource> PollCycle<S> {
    async fn run(mut self) {
        let _guard = PollingGuard::engage(Arc::clone(&self.state), Arc::clone(&self.current), self.id);
        tracing::info!(instance = self.id, interval_ms = self.interval.as_millis() as u64, "size poller started");

        let mut cycles: u64 = 0;
        while self.should_continue() {
            cycles += 1;
            let session = self.session.borrow().clone();
            if let Some(session) = session {
                self.fetch_once(&session, cycles).await;
            }
            if let Wake::Teardown = self.wait_next_cycle().await {
                break;
            }
        }

        tracing::info!(instance = self.id, cycles, "size poller stopped");
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }

    fn should_continue(&mut self) -> bool {
        if self.stop.is_requested() || !self.is_current() {
            return false;
        }
        // A dropped sender counts as teardown of the embedding context.
        self.embedding.has_changed().is_ok() && *self.embedding.borrow_and_update()
    }

    async fn fetch_once(&self, session: &str, cycle: u64) {
        match self.source.fetch_size(session).await {
            Ok(_) if !self.is_current() => {
                tracing::debug!(instance = self.id, cycle, session, "superseded; size discarded");
            }
            Ok(bytes) => {
                self.state.send_if_modified(|s| {
                    if s.bytes == bytes {
                        false
                    } else {
                        s.bytes = bytes;
                        true
                    }
                });
                tracing::debug!(instance = self.id, cycle, session, bytes, "session size updated");
            }
            Err(err) => {
                tracing::warn!(instance = self.id, cycle, session, error = %err, "session size fetch failed");
            }
        }
    }

    /// Sleep for one interval. Wakes early only to tear down: on a stop
    /// request, on the signal going false, or on the signal's sender dropping.
    async fn wait_next_cycle(&mut self) -> Wake {
        if self.stop.is_requested() {
            return Wake::Teardown;
        }
        let deadline = Instant::now() + self.interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return Wake::Tick,
                _ = self.stop.notify.notified() => return Wake::Teardown,
                changed = self.embedding.changed() => {
                    if changed.is_err() || !*self.embedding.borrow_and_update() {
                        return Wake::Teardown;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::SizeFetchError;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Replays a fixed script of fetch results, then repeats the last success.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<u64, SizeFetchError>>>,
        last_ok: Mutex<u64>,
        calls: Arc<AtomicUsize>,
        sessions: Arc<Mutex<Vec<String>>>,
        latency: Duration,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<u64, SizeFetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last_ok: Mutex::new(0),
                calls: Arc::new(AtomicUsize::new(0)),
                sessions: Arc::new(Mutex::new(Vec::new())),
                latency: Duration::ZERO,
            }
        }

        /// Each fetch takes `latency` before its result is read off the script.
        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }
    }

    impl SizeSource for ScriptedSource {
        async fn fetch_size(&self, session: &str) -> Result<u64, SizeFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sessions.lock().unwrap().push(session.to_string());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            let mut last_ok = self.last_ok.lock().unwrap();
            match next {
                Some(Ok(bytes)) => {
                    *last_ok = bytes;
                    Ok(bytes)
                }
                Some(Err(e)) => Err(e),
                None => Ok(*last_ok),
            }
        }
    }

    const INTERVAL: Duration = Duration::from_millis(3000);

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_last_size_and_loop_continues() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(4096), Err(SizeFetchError::Http(503)), Ok(8192)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        assert!(poller.set_session(Some("abc".to_string())));
        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.size(), SessionSizeState { bytes: 4096, polling: true });

        advance(3000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.size().bytes, 4096);
        assert_eq!(poller.phase(), PollerPhase::Polling);

        advance(3000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(poller.size().bytes, 8192);
        assert_eq!(poller.phase(), PollerPhase::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn published_sizes_follow_fetch_order() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(4096), Err(SizeFetchError::Http(500)), Ok(8192), Ok(1024)]);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);
        let mut sizes = poller.subscribe();

        let recorder = tokio::spawn(async move {
            let mut seen = Vec::new();
            let mut last = 0;
            while sizes.changed().await.is_ok() {
                let bytes = sizes.borrow_and_update().bytes;
                if bytes != last {
                    seen.push(bytes);
                    last = bytes;
                }
            }
            seen
        });

        poller.set_session(Some("abc".to_string()));
        advance(3000 * 3 + 100).await;
        poller.shutdown().await;
        drop(poller);

        // a reset session may report a smaller size
        assert_eq!(recorder.await.unwrap(), vec![4096, 8192, 1024]);
    }

    #[tokio::test(start_paused = true)]
    async fn start_requires_embedding_and_session() {
        let (embed_tx, embed_rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![Ok(1)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        assert!(!poller.set_session(Some("abc".to_string())));
        assert_eq!(poller.phase(), PollerPhase::Idle);

        embed_tx.send_replace(true);
        assert!(!poller.set_session(None));
        assert_eq!(poller.phase(), PollerPhase::Idle);

        advance(10_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!poller.size().polling);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_a_no_op() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(10)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        assert!(poller.set_session(Some("abc".to_string())));
        assert!(!poller.ensure_started());
        assert!(!poller.ensure_started());
        assert_eq!(poller.instances_started(), 1);

        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn embedding_off_stops_and_restart_is_fresh() {
        let (embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(100)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("abc".to_string()));
        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // flip mid-wait: the loop wakes and exits without another fetch
        embed_tx.send_replace(false);
        advance(10).await;
        assert_eq!(poller.phase(), PollerPhase::Stopped);
        assert!(!poller.size().polling);

        advance(10_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!poller.ensure_started());

        embed_tx.send_replace(true);
        assert!(poller.ensure_started());
        assert_eq!(poller.instances_started(), 2);
        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.phase(), PollerPhase::Polling);
        assert!(poller.size().polling);
        assert_eq!(poller.size().bytes, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn brief_off_on_flicker_does_not_shorten_interval() {
        let (embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(1)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("abc".to_string()));
        advance(100).await;
        embed_tx.send_replace(true);
        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        advance(2900).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_loop_and_clears_polling() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(7)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("abc".to_string()));
        advance(100).await;
        poller.shutdown().await;
        assert_eq!(poller.phase(), PollerPhase::Stopped);
        assert_eq!(poller.size(), SessionSizeState { bytes: 7, polling: false });

        advance(10_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_signal_counts_as_teardown() {
        let (embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(7)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("abc".to_string()));
        advance(100).await;
        drop(embed_tx);
        advance(10).await;
        assert_eq!(poller.phase(), PollerPhase::Stopped);
        assert!(!poller.ensure_started());
        advance(10_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn running_loop_follows_session_change() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(1), Ok(2)]);
        let sessions = Arc::clone(&source.sessions);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("first".to_string()));
        advance(100).await;
        assert!(!poller.set_session(Some("second".to_string())));
        advance(3000).await;
        assert_eq!(poller.instances_started(), 1);
        assert_eq!(*sessions.lock().unwrap(), vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_embedding_restarts_on_each_rise() {
        let (embed_tx, embed_rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![Ok(5)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);
        poller.set_session(Some("abc".to_string()));

        let follower = tokio::spawn(async move {
            poller.follow_embedding().await;
            poller
        });

        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        embed_tx.send_replace(true);
        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        embed_tx.send_replace(false);
        advance(100).await;
        embed_tx.send_replace(true);
        advance(100).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(embed_tx);
        let poller = follower.await.unwrap();
        assert_eq!(poller.instances_started(), 2);
        assert_eq!(poller.phase(), PollerPhase::Stopped);
        assert!(!poller.size().polling);
    }

    #[tokio::test(start_paused = true)]
    async fn start_right_after_stop_spawns_fresh_instance() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(42)]).with_latency(Duration::from_millis(1000));
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("abc".to_string()));
        advance(500).await;
        poller.request_stop();
        assert_eq!(poller.phase(), PollerPhase::Stopped);

        // the stopped loop is still finishing its fetch
        assert!(poller.ensure_started());
        assert_eq!(poller.instances_started(), 2);
        assert_eq!(poller.phase(), PollerPhase::Polling);

        // old loop exits at 1000 ms; it must not clear the new loop's flag
        advance(600).await;
        assert!(poller.size().polling);
        advance(500).await;
        assert_eq!(poller.size().bytes, 42);

        advance(20_000).await;
        assert_eq!(poller.phase(), PollerPhase::Polling);
        assert!(poller.size().polling);
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_mid_fetch_publishes_result_then_stops() {
        let (embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(42)]).with_latency(Duration::from_millis(1000));
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, INTERVAL, embed_rx);

        poller.set_session(Some("abc".to_string()));
        advance(500).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.size().bytes, 0);

        embed_tx.send_replace(false);
        advance(600).await;
        assert_eq!(poller.size(), SessionSizeState { bytes: 42, polling: false });
        assert_eq!(poller.phase(), PollerPhase::Stopped);

        advance(10_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.size().bytes, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_minimum() {
        let (_embed_tx, embed_rx) = watch::channel(true);
        let source = ScriptedSource::new(vec![Ok(1)]);
        let calls = Arc::clone(&source.calls);
        let mut poller = SizePoller::new(source, Duration::ZERO, embed_rx);
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);

        poller.set_session(Some("abc".to_string()));
        advance(MIN_POLL_INTERVAL.as_millis() as u64 * 5 + 1).await;
        assert!(calls.load(Ordering::SeqCst) <= 6);
    }
}
