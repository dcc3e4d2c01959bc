// ── Dashboard controller ──
//
// Owns the synchronization engine for one pump controller: the push
// source, the poll fallback, the single ingestion task that replaces the
// current snapshot, and the pump command dispatcher.

use std::sync::Arc;

use binasa_api::{
    DeviceClient, HistoryPoint, PumpAction, PushEvent, PushSource, PushState, StatusPayload,
};
use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::command::{
    CommandOutcome, Confirmation, GENERIC_COMMAND_FAILURE, PendingCommand, PendingSlot,
};
use crate::config::DashboardConfig;
use crate::device::DeviceApi;
use crate::error::CoreError;
use crate::model::{Connectivity, Notification, SnapshotSource, StatusSnapshot};
use crate::store::{IngestOutcome, SnapshotStore};
use crate::stream::SnapshotStream;

const FEED_CHANNEL_SIZE: usize = 32;
const NOTIFICATION_CHANNEL_SIZE: usize = 64;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing runs until
/// [`start()`](Self::start); a stopped controller can be started again.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: DashboardConfig,
    api: Arc<dyn DeviceApi>,
    store: SnapshotStore,
    connectivity: watch::Sender<Connectivity>,
    notifications: broadcast::Sender<Arc<Notification>>,
    pending: PendingSlot,
    session: Mutex<Option<Session>>,
}

/// Background tasks of one `start()`..`stop()` cycle.
struct Session {
    cancel: CancellationToken,
    feed: mpsc::Sender<Fetched>,
    push: Option<Arc<PushSource>>,
    handles: Vec<JoinHandle<()>>,
}

/// Push-side inputs of the ingestion and poll tasks.
pub(crate) struct PushFeed {
    pub(crate) events: broadcast::Receiver<PushEvent>,
    pub(crate) state: watch::Receiver<PushState>,
}

/// A pulled payload queued for the ingestion task.
struct Fetched {
    payload: StatusPayload,
    source: SnapshotSource,
    requested_at: Instant,
    reply: oneshot::Sender<IngestOutcome>,
}

impl Controller {
    /// Create a controller talking HTTP to `config.url`. Does not start
    /// anything; call [`start()`](Self::start).
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let client = DeviceClient::new(config.url.clone(), &config.transport())?
            .with_control_path(config.control_path.clone());
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Create a controller over any [`DeviceApi`] implementation.
    pub fn with_api(config: DashboardConfig, api: Arc<dyn DeviceApi>) -> Self {
        let (connectivity, _) = watch::channel(Connectivity::default());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                store: SnapshotStore::new(),
                connectivity,
                notifications,
                pending: PendingSlot::default(),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the push source (unless disabled), the poll task and the
    /// ingestion task.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.inner.config.validate()?;
        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            return Err(CoreError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let (push, feed) = match self.inner.config.push_config()? {
            Some(push_config) => {
                info!(url = %push_config.url, "starting push stream");
                let source = Arc::new(PushSource::new(push_config));
                let feed = PushFeed {
                    events: source.subscribe(),
                    state: source.state(),
                };
                source.start(cancel.clone());
                (Some(source), Some(feed))
            }
            None => {
                info!("push stream disabled, polling only");
                (None, None)
            }
        };

        *session = Some(self.spawn_session(cancel, push, feed));
        info!(
            device = %self.inner.config.url,
            poll_ms = u64::try_from(self.inner.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "dashboard controller started"
        );
        Ok(())
    }

    /// Start with caller-provided push channels instead of a live socket.
    #[cfg(test)]
    pub(crate) async fn start_with_push_feed(&self, feed: PushFeed) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            return Err(CoreError::AlreadyRunning);
        }
        *session = Some(self.spawn_session(CancellationToken::new(), None, Some(feed)));
        Ok(())
    }

    fn spawn_session(
        &self,
        cancel: CancellationToken,
        push: Option<Arc<PushSource>>,
        feed: Option<PushFeed>,
    ) -> Session {
        let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_SIZE);
        let (events, state) = match feed {
            Some(PushFeed { events, state }) => (Some(events), Some(state)),
            None => (None, None),
        };

        let handles = vec![
            tokio::spawn(ingest_task(self.clone(), events, feed_rx, cancel.clone())),
            tokio::spawn(poll_task(self.clone(), feed_tx.clone(), state, cancel.clone())),
        ];

        Session {
            cancel,
            feed: feed_tx,
            push,
            handles,
        }
    }

    /// Cancel and join every background task, then park the push state at
    /// `Disconnected`. A no-op when not running.
    pub async fn stop(&self) {
        let Some(session) = self.inner.session.lock().await.take() else {
            return;
        };

        session.cancel.cancel();
        for handle in session.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        if let Some(push) = session.push {
            push.join().await;
        }

        self.inner
            .connectivity
            .send_modify(|c| c.push = PushState::Disconnected);
        info!("dashboard controller stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    // ── Ingestion ────────────────────────────────────────────────

    /// Normalize `payload` and make it the current snapshot.
    ///
    /// Every snapshot replacement goes through here. While the controller
    /// runs, the ingestion task takes the same path for each push message
    /// and fetched payload, in arrival order.
    pub fn ingest(&self, payload: &StatusPayload, source: SnapshotSource) -> IngestOutcome {
        self.apply(payload, source, Instant::now())
    }

    /// Parse and ingest a raw status document.
    pub fn ingest_json(&self, text: &str, source: SnapshotSource) -> Result<IngestOutcome, CoreError> {
        let payload = StatusPayload::from_json(text)?;
        Ok(self.ingest(&payload, source))
    }

    fn apply(
        &self,
        payload: &StatusPayload,
        source: SnapshotSource,
        requested_at: Instant,
    ) -> IngestOutcome {
        let snapshot = StatusSnapshot::from_payload(payload, source, Utc::now());
        let outcome = self.inner.store.apply(snapshot, requested_at);
        if let IngestOutcome::Applied(snap) = &outcome {
            debug!(
                %source,
                level = snap.water_level_percent,
                foam = snap.foam_percent,
                pump = snap.pump_on,
                "snapshot applied"
            );
        }
        outcome
    }

    /// Fetch `/status` and hand the payload to the ingestion task, or
    /// apply it directly when the controller is not running.
    async fn fetch_and_ingest(
        &self,
        source: SnapshotSource,
        feed: Option<&mpsc::Sender<Fetched>>,
    ) -> Result<IngestOutcome, CoreError> {
        let requested_at = Instant::now();
        let payload = self.inner.api.fetch_status().await?;

        let Some(feed) = feed else {
            return Ok(self.apply(&payload, source, requested_at));
        };

        let (reply, outcome) = oneshot::channel();
        feed.send(Fetched {
            payload,
            source,
            requested_at,
            reply,
        })
        .await
        .map_err(|_| CoreError::Internal("ingestion task stopped".into()))?;
        outcome
            .await
            .map_err(|_| CoreError::Internal("ingestion task dropped the payload".into()))
    }

    async fn session_feed(&self) -> Option<mpsc::Sender<Fetched>> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.feed.clone())
    }

    /// Fetch the status immediately and make it current.
    pub async fn refresh(&self) -> Result<Arc<StatusSnapshot>, CoreError> {
        let feed = self.session_feed().await;
        match self.fetch_and_ingest(SnapshotSource::Poll, feed.as_ref()).await? {
            IngestOutcome::Applied(snap) => Ok(snap),
            // A newer push snapshot won; that one is the answer.
            IngestOutcome::Stale => self.current_snapshot().ok_or(CoreError::NoSnapshot),
        }
    }

    /// One-shot: fetch a single snapshot without starting any task.
    pub async fn fetch_once(config: DashboardConfig) -> Result<Arc<StatusSnapshot>, CoreError> {
        config.validate()?;
        Self::new(config)?.refresh().await
    }

    // ── Connectivity ─────────────────────────────────────────────

    fn on_push_state(&self, state: PushState) {
        let mut previous = PushState::Disconnected;
        self.inner.connectivity.send_if_modified(|c| {
            previous = c.push;
            if c.push == state {
                return false;
            }
            c.push = state;
            if state.is_open() {
                c.poll_degraded = false;
                c.last_error = None;
            }
            true
        });

        match (previous, state) {
            (PushState::Open, PushState::ClosedPendingRetry) => {
                warn!("push stream lost, falling back to polling");
                self.notify(Notification::warning(
                    "Connection lost",
                    "Live updates interrupted; polling until the device is back",
                ));
            }
            (PushState::ClosedPendingRetry | PushState::Connecting, PushState::Open) => {
                info!("push stream open");
                self.notify(Notification::info("Live updates", "Connected to the device"));
            }
            _ => {}
        }
    }

    fn on_poll_ok(&self) {
        let recovered = self.inner.connectivity.send_if_modified(|c| {
            let was_degraded = c.poll_degraded;
            c.poll_degraded = false;
            c.last_error = None;
            was_degraded
        });
        if recovered {
            info!("status polling recovered");
        }
    }

    fn on_poll_failed(&self, err: &CoreError) {
        let message = err.to_string();
        let newly_degraded = {
            let mut newly = false;
            self.inner.connectivity.send_modify(|c| {
                newly = !c.poll_degraded;
                c.poll_degraded = true;
                c.last_error = Some(message.clone());
            });
            newly
        };
        if newly_degraded {
            self.notify(Notification::warning("Device unreachable", message));
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Toggle the pump.
    ///
    /// The action is the opposite of the current snapshot's `pump_on`.
    /// After confirmation the command is sent; on success a re-sync is
    /// scheduled after `resync_delay` and the snapshot changes only when
    /// that (or any later) update arrives.
    pub async fn issue_command(
        &self,
        confirm: &dyn Confirmation,
    ) -> Result<CommandOutcome, CoreError> {
        if let Some(pending) = self.inner.pending.get() {
            return Err(CoreError::CommandPending {
                action: pending.action,
                since: pending.issued_at,
            });
        }
        let current = self.current_snapshot().ok_or(CoreError::NoSnapshot)?;
        let action = PumpAction::toggle_from(current.pump_on);

        if !confirm.confirm(action).await {
            info!(%action, "pump command cancelled");
            return Ok(CommandOutcome::Cancelled);
        }

        let guard = self.inner.pending.claim(action)?;
        info!(%action, "sending pump command");
        let result = self.inner.api.send_control(action).await;
        drop(guard);

        match result {
            Ok(reply) => {
                self.schedule_resync().await;
                let title = match action {
                    PumpAction::On => "Pump switched on",
                    PumpAction::Off => "Pump switched off",
                };
                self.notify(Notification::success(
                    title,
                    reply
                        .message
                        .clone()
                        .unwrap_or_else(|| "Waiting for the device to confirm".into()),
                ));
                Ok(CommandOutcome::Sent {
                    action,
                    message: reply.message,
                })
            }
            Err(e) => {
                warn!(%action, error = %e, "pump command failed");
                let message = e
                    .device_message()
                    .map_or_else(|| GENERIC_COMMAND_FAILURE.to_owned(), str::to_owned);
                self.notify(Notification::error("Pump command failed", message.clone()));
                Err(match e {
                    binasa_api::Error::Device { .. } | binasa_api::Error::Http { .. } => {
                        CoreError::CommandRejected { action, message }
                    }
                    other => other.into(),
                })
            }
        }
    }

    /// Queue the confirmatory fetch that follows a successful command.
    async fn schedule_resync(&self) {
        let delay = self.inner.config.resync_delay;
        let mut session = self.inner.session.lock().await;
        let (feed, cancel) = match session.as_ref() {
            Some(s) => (Some(s.feed.clone()), s.cancel.clone()),
            None => (None, CancellationToken::new()),
        };

        let ctrl = self.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            match ctrl.fetch_and_ingest(SnapshotSource::Resync, feed.as_ref()).await {
                Ok(outcome) => debug!(applied = outcome.applied().is_some(), "re-sync complete"),
                Err(e) => warn!(error = %e, "re-sync after pump command failed"),
            }
        });

        if let Some(s) = session.as_mut() {
            s.handles.retain(|h| !h.is_finished());
            s.handles.push(handle);
        }
    }

    pub fn pending_command(&self) -> Option<PendingCommand> {
        self.inner.pending.get()
    }

    // ── History ──────────────────────────────────────────────────

    pub async fn history(&self, date: NaiveDate) -> Result<Vec<HistoryPoint>, CoreError> {
        Ok(self.inner.api.fetch_history(date).await?)
    }

    // ── State observation ────────────────────────────────────────

    pub fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.inner.store.current()
    }

    pub fn snapshots(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    pub fn connectivity(&self) -> watch::Receiver<Connectivity> {
        self.inner.connectivity.subscribe()
    }

    pub fn current_connectivity(&self) -> Connectivity {
        self.inner.connectivity.borrow().clone()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.notifications.subscribe()
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.inner.notifications.send(Arc::new(notification));
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply push messages and fetched payloads one at a time, in the order
/// they arrive.
async fn ingest_task(
    controller: Controller,
    mut events: Option<broadcast::Receiver<PushEvent>>,
    mut feed: mpsc::Receiver<Fetched>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = next_push_event(&mut events) => match event {
                Ok(PushEvent::SnapshotReceived(payload)) => {
                    controller.apply(&payload, SnapshotSource::Push, Instant::now());
                }
                Ok(PushEvent::ConnectivityChanged(state)) => controller.on_push_state(state),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ingestion fell behind the push stream");
                }
                Err(RecvError::Closed) => {
                    debug!("push event channel closed");
                    events = None;
                }
            },
            fetched = feed.recv() => {
                let Some(fetched) = fetched else { break };
                let outcome = controller.apply(&fetched.payload, fetched.source, fetched.requested_at);
                // The requester may have given up.
                let _ = fetched.reply.send(outcome);
            }
        }
    }
    debug!("ingestion task exiting");
}

async fn next_push_event(
    events: &mut Option<broadcast::Receiver<PushEvent>>,
) -> Result<PushEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Poll `/status` on a fixed period while the push stream is not open.
async fn poll_task(
    controller: Controller,
    feed: mpsc::Sender<Fetched>,
    push_state: Option<watch::Receiver<PushState>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(controller.inner.config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if push_state.as_ref().is_some_and(|s| s.borrow().is_open()) {
                    trace!("push stream open, skipping poll");
                    continue;
                }

                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = controller.fetch_and_ingest(SnapshotSource::Poll, Some(&feed)) => result,
                };

                match result {
                    Ok(_) => controller.on_poll_ok(),
                    Err(e) => {
                        warn!(error = %e, "status poll failed");
                        controller.on_poll_failed(&e);
                    }
                }
            }
        }
    }
    debug!("poll task exiting");
}
