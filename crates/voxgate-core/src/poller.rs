// ── Door-log watcher ─────────────────────────────────────────────────
//
// One cancellable background task per account re-reads the newest
// door-log entry on a fixed cadence and broadcasts entries that are
// genuinely new. Deduplication keys on the vendor's CaptureTime;
// emission can be deferred while the vendor is still attaching the
// snapshot image. A persisted heartbeat stops a quick process restart
// from running two loops against the same account.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use voxgate_api::CloudClient;
use voxgate_api::models::DoorLogEntry;

use crate::error::CoreError;
use crate::event::DoorEventSender;
use crate::store::AccountStore;

/// Fixed poll cadence for the personal door log.
pub const DOOR_LOG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A persisted heartbeat younger than this means a watcher is already
/// running somewhere, so starting another is skipped. Advisory only:
/// the window tolerates one duplicate spawn, never data loss.
pub const WATCHER_START_GUARD: Duration = Duration::from_secs(15);

/// What to do with a freshly fetched door-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDecision {
    /// Remember the entry but emit nothing. First sighting, or an
    /// entry that cannot be compared for lack of a capture time.
    AdoptSilently,
    /// Same capture time as the last seen entry; nothing happened.
    Duplicate,
    /// New, but the snapshot is still uploading. Leave the last seen
    /// entry untouched so the next tick re-evaluates this one.
    Defer,
    /// New and ready: remember it and broadcast it.
    Emit,
}

/// Classify a fetched entry against the last seen one.
///
/// Deferral applies only when the picture URL field is structurally
/// present but empty AND the account is configured to wait. An absent
/// field never defers, so event types that carry no image still fire.
/// An entry missing its capture time is adopted rather than compared,
/// since nothing later could be deduplicated against it.
pub fn evaluate_entry(
    last_seen: Option<&DoorLogEntry>,
    entry: &DoorLogEntry,
    wait_for_image: bool,
) -> LogDecision {
    let Some(last) = last_seen else {
        return LogDecision::AdoptSilently;
    };
    if !last.has_capture_time() || !entry.has_capture_time() {
        return LogDecision::AdoptSilently;
    }
    if entry.capture_time == last.capture_time {
        return LogDecision::Duplicate;
    }
    if wait_for_image && entry.picture_pending() {
        return LogDecision::Defer;
    }
    LogDecision::Emit
}

fn heartbeat_is_fresh(now: f64, last: Option<f64>, guard: Duration) -> bool {
    last.is_some_and(|last| now - last < guard.as_secs_f64())
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Handle to the background door-log watcher.
///
/// Construction spawns nothing. [`start`](Self::start) spawns at most
/// one task; [`stop`](Self::stop) cancels it and waits for it to wind
/// down.
pub struct DoorLogPoller {
    client: Arc<CloudClient>,
    store: AccountStore,
    events: DoorEventSender,
    interval: Duration,
    start_guard: Duration,
    is_polling: Arc<AtomicBool>,
    cancel: Mutex<Option<CancellationToken>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DoorLogPoller {
    pub fn new(
        client: Arc<CloudClient>,
        store: AccountStore,
        events: DoorEventSender,
        interval: Duration,
        start_guard: Duration,
    ) -> Self {
        Self {
            client,
            store,
            events,
            interval,
            start_guard,
            is_polling: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Whether the watcher loop is currently running in this process.
    pub fn is_polling(&self) -> bool {
        self.is_polling.load(Ordering::SeqCst)
    }

    /// Spawn the watcher unless one is already running.
    ///
    /// Returns `false` when skipped: either this process already has
    /// the loop, or a persisted heartbeat younger than the start guard
    /// says another one does.
    pub async fn start(&self) -> bool {
        if self.is_polling.swap(true, Ordering::SeqCst) {
            debug!("door-log watcher already running in this process");
            return false;
        }
        let now = epoch_now();
        if heartbeat_is_fresh(now, self.store.last_polling_time().await, self.start_guard) {
            debug!("recent watcher heartbeat found, not starting another");
            self.is_polling.store(false, Ordering::SeqCst);
            return false;
        }
        if let Err(err) = self.store.record_polling_heartbeat(now).await {
            warn!(error = %err, "could not record the watcher heartbeat");
        }

        let cancel = CancellationToken::new();
        let context = PollContext {
            client: Arc::clone(&self.client),
            store: self.store.clone(),
            events: self.events.clone(),
            is_polling: Arc::clone(&self.is_polling),
        };
        let handle = tokio::spawn(door_log_poll_task(context, self.interval, cancel.clone()));
        *self.cancel.lock().await = Some(cancel);
        *self.handle.lock().await = Some(handle);
        debug!(interval = ?self.interval, "door-log watcher started");
        true
    }

    /// Cancel the watcher and wait for the task to finish.
    pub async fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

struct PollContext {
    client: Arc<CloudClient>,
    store: AccountStore,
    events: DoorEventSender,
    is_polling: Arc<AtomicBool>,
}

async fn door_log_poll_task(context: PollContext, period: Duration, cancel: CancellationToken) {
    let mut last_seen = context.store.latest_door_log().await;
    // The first tick fires immediately, so a fresh watcher polls right
    // away. Delay keeps a slow fetch from causing a burst of catch-up
    // ticks afterwards.
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(err) = poll_once(&context, &mut last_seen).await {
                    debug!(error = %err, "door-log poll iteration failed");
                }
            }
        }
    }
    context.is_polling.store(false, Ordering::SeqCst);
    debug!("door-log watcher stopped");
}

/// One watcher iteration: heartbeat, fetch, classify, persist, emit.
///
/// The dedup state only advances once the entry is persisted, so a
/// failed store write means the same entry is re-evaluated next tick
/// rather than silently dropped.
async fn poll_once(
    context: &PollContext,
    last_seen: &mut Option<DoorLogEntry>,
) -> Result<(), CoreError> {
    if let Err(err) = context.store.record_polling_heartbeat(epoch_now()).await {
        warn!(error = %err, "could not record the watcher heartbeat");
    }

    let entries = context.client.fetch_door_log().await?;
    let Some(entry) = entries.into_iter().next() else {
        return Ok(());
    };

    let wait_for_image = context.store.wait_for_image().await;
    match evaluate_entry(last_seen.as_ref(), &entry, wait_for_image) {
        LogDecision::Duplicate => {}
        LogDecision::Defer => {
            debug!(capture_time = %entry.capture_time, "new door entry, waiting for the snapshot URL");
        }
        LogDecision::AdoptSilently => {
            context.store.set_latest_door_log(&entry).await?;
            *last_seen = Some(entry);
        }
        LogDecision::Emit => {
            context.store.set_latest_door_log(&entry).await?;
            debug!(capture_time = %entry.capture_time, "new door event");
            let entry = Arc::new(entry);
            *last_seen = Some(entry.as_ref().clone());
            // No receivers is fine; the store still tracked the entry.
            let _ = context.events.send(entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::door_event_channel;
    use tempfile::TempDir;
    use voxgate_api::TransportConfig;

    fn entry(capture_time: &str, pic_url: Option<&str>) -> DoorLogEntry {
        DoorLogEntry {
            capture_time: capture_time.to_owned(),
            pic_url: pic_url.map(str::to_owned),
            ..DoorLogEntry::default()
        }
    }

    #[test]
    fn first_sighting_is_adopted_silently() {
        let new = entry("100", Some("https://cdn/1.jpg"));
        assert_eq!(evaluate_entry(None, &new, true), LogDecision::AdoptSilently);
    }

    #[test]
    fn identical_capture_time_is_a_duplicate() {
        let last = entry("100", Some("https://cdn/1.jpg"));
        let new = entry("100", Some("https://cdn/1.jpg"));
        assert_eq!(
            evaluate_entry(Some(&last), &new, false),
            LogDecision::Duplicate
        );
    }

    #[test]
    fn new_capture_time_emits() {
        let last = entry("100", Some("https://cdn/1.jpg"));
        let new = entry("101", Some("https://cdn/2.jpg"));
        assert_eq!(evaluate_entry(Some(&last), &new, true), LogDecision::Emit);
    }

    #[test]
    fn empty_picture_defers_only_while_waiting() {
        let last = entry("100", Some("https://cdn/1.jpg"));
        let new = entry("101", Some(""));
        assert_eq!(evaluate_entry(Some(&last), &new, true), LogDecision::Defer);
        assert_eq!(evaluate_entry(Some(&last), &new, false), LogDecision::Emit);
    }

    #[test]
    fn absent_picture_field_never_defers() {
        let last = entry("100", None);
        let new = entry("101", None);
        assert_eq!(evaluate_entry(Some(&last), &new, true), LogDecision::Emit);
    }

    #[test]
    fn entry_without_capture_time_is_adopted_not_compared() {
        let last = entry("100", Some("https://cdn/1.jpg"));
        let new = entry("", Some(""));
        assert_eq!(
            evaluate_entry(Some(&last), &new, true),
            LogDecision::AdoptSilently
        );
        assert_eq!(
            evaluate_entry(Some(&entry("", None)), &entry("101", None), true),
            LogDecision::AdoptSilently
        );
    }

    #[test]
    fn heartbeat_freshness_window() {
        let guard = Duration::from_secs(15);
        assert!(heartbeat_is_fresh(100.0, Some(90.0), guard));
        assert!(!heartbeat_is_fresh(100.0, Some(84.0), guard));
        assert!(!heartbeat_is_fresh(100.0, None, guard));
    }

    // Spawning tests point the client at an unroutable local port; the
    // loop's fetch failures are swallowed per iteration.
    fn test_poller(dir: &TempDir) -> DoorLogPoller {
        let client = CloudClient::with_bases(
            &TransportConfig::default(),
            "http://127.0.0.1:9",
            "http://127.0.0.1:9/web/app",
        )
        .expect("client");
        let (events, _) = door_event_channel();
        DoorLogPoller::new(
            Arc::new(client),
            AccountStore::new(dir.path()),
            events,
            Duration::from_millis(20),
            WATCHER_START_GUARD,
        )
    }

    #[tokio::test]
    async fn start_twice_spawns_only_one_task() {
        let dir = TempDir::new().expect("temp dir");
        let poller = test_poller(&dir);
        assert!(poller.start().await);
        assert!(!poller.start().await);
        assert!(poller.is_polling());
        poller.stop().await;
        assert!(!poller.is_polling());
    }

    #[tokio::test]
    async fn fresh_heartbeat_skips_the_start() {
        let dir = TempDir::new().expect("temp dir");
        let store = AccountStore::new(dir.path());
        store
            .record_polling_heartbeat(epoch_now())
            .await
            .expect("save");
        let poller = test_poller(&dir);
        assert!(!poller.start().await);
        assert!(!poller.is_polling());
    }

    #[tokio::test]
    async fn stale_heartbeat_allows_a_start() {
        let dir = TempDir::new().expect("temp dir");
        let store = AccountStore::new(dir.path());
        store
            .record_polling_heartbeat(epoch_now() - 20.0)
            .await
            .expect("save");
        let poller = test_poller(&dir);
        assert!(poller.start().await);
        poller.stop().await;
    }
}
