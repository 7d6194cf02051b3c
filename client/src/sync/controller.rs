//! Single-flight fetch-and-reconcile pipeline.
//!
//! The controller owns the view. A refresh takes the view lock before it
//! fetches and keeps it until the merge is done, so the watermark read and
//! the mutation form one step and two refreshes never interleave.

use super::trigger::{Trigger, TriggerHandle};
use crate::auth::AuthSignal;
use crate::cache::ViewCache;
use crate::error::Result;
use crate::source::RecordSource;
use feedsync_engine::{OrderedSyncView, ReconcileResult, Record, Timestamp};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

/// What happens to a refresh requested while another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Wait for the in-flight refresh, then run against the updated view
    #[default]
    Queue,
    /// Drop the request; the in-flight refresh will pick up the same data
    Coalesce,
}

/// Outcome of a refresh that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A snapshot was fetched and merged
    Reconciled(ReconcileResult),
    /// Another refresh was in flight and this one was dropped
    Coalesced,
}

/// What the presentation layer renders.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Incremented on every mutation of the view
    pub revision: u64,
    /// Records, newest first
    pub records: Arc<[Record]>,
    /// Timestamp of the newest record
    pub watermark: Option<Timestamp>,
}

impl ViewState {
    fn capture(view: &OrderedSyncView, revision: u64) -> Self {
        Self {
            revision,
            records: view.iter().cloned().collect(),
            watermark: view.watermark(),
        }
    }
}

/// Counters over the controller's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Completed fetch-and-reconcile cycles
    pub cycles: u64,
    /// Records added to the view
    pub records_inserted: u64,
    /// Entries skipped for missing a timestamp
    pub records_malformed: u64,
    /// Fetches that failed
    pub failures: u64,
    /// Refresh requests dropped or folded into another refresh
    pub coalesced: u64,
    /// Message of the most recent failure, cleared by the next success
    pub last_error: Option<String>,
}

struct ViewSlot {
    view: OrderedSyncView,
    revision: u64,
}

/// Keeps an [`OrderedSyncView`] in sync with a [`RecordSource`].
pub struct SyncController<S> {
    source: S,
    slot: tokio::sync::Mutex<ViewSlot>,
    overlap: OverlapPolicy,
    updates: watch::Sender<ViewState>,
    stats: Mutex<SyncStats>,
    cache: Option<ViewCache>,
}

impl<S: RecordSource> SyncController<S> {
    /// Create a controller around an existing (possibly restored) view.
    pub fn new(source: S, view: OrderedSyncView) -> Self {
        let (updates, _) = watch::channel(ViewState::capture(&view, 0));
        Self {
            source,
            slot: tokio::sync::Mutex::new(ViewSlot { view, revision: 0 }),
            overlap: OverlapPolicy::default(),
            updates,
            stats: Mutex::new(SyncStats::default()),
            cache: None,
        }
    }

    /// Set the overlap policy.
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Persist the view to `cache` after every change.
    pub fn with_cache(mut self, cache: ViewCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Get the record source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the overlap policy.
    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.updates.subscribe()
    }

    /// Get the most recently published view state.
    pub fn current(&self) -> ViewState {
        self.updates.borrow().clone()
    }

    /// Get a copy of the counters.
    pub fn stats(&self) -> SyncStats {
        self.stats_mut().clone()
    }

    fn stats_mut(&self) -> MutexGuard<'_, SyncStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn note_coalesced(&self, trigger: Trigger) {
        tracing::debug!(%trigger, "Refresh already in flight, coalescing");
        self.stats_mut().coalesced += 1;
    }

    /// Fetch a snapshot and merge it into the view.
    ///
    /// On fetch failure the view is untouched and the error is returned.
    pub async fn refresh(&self, trigger: Trigger) -> Result<RefreshOutcome> {
        let mut slot = match self.overlap {
            OverlapPolicy::Queue => self.slot.lock().await,
            OverlapPolicy::Coalesce => match self.slot.try_lock() {
                Ok(slot) => slot,
                Err(_) => {
                    self.note_coalesced(trigger);
                    return Ok(RefreshOutcome::Coalesced);
                }
            },
        };

        tracing::debug!(%trigger, watermark = ?slot.view.watermark(), "Fetching snapshot");

        let batch = match self.source.fetch_all().await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(%trigger, error = %e, "Fetch failed, view left unchanged");
                let mut stats = self.stats_mut();
                stats.failures += 1;
                stats.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let fetched = batch.len();
        let result = slot.view.reconcile(batch);

        if result.malformed > 0 {
            tracing::warn!(
                malformed = result.malformed,
                "Skipped records without a timestamp"
            );
        }

        {
            let mut stats = self.stats_mut();
            stats.cycles += 1;
            stats.records_inserted += result.inserted as u64;
            stats.records_malformed += result.malformed as u64;
            stats.last_error = None;
        }

        if result.changed() {
            slot.revision += 1;
            let state = ViewState::capture(&slot.view, slot.revision);
            tracing::info!(
                %trigger,
                fetched,
                inserted = result.inserted,
                watermark = ?result.watermark_after,
                revision = slot.revision,
                "View updated"
            );
            self.updates.send_replace(state);

            if let Some(cache) = &self.cache {
                if let Err(e) = cache.save(&slot.view).await {
                    tracing::warn!(
                        path = %cache.path().display(),
                        error = %e,
                        "Failed to write view cache"
                    );
                }
            }
        } else {
            tracing::debug!(
                %trigger,
                fetched,
                ignored = result.ignored,
                "No new records"
            );
        }

        Ok(RefreshOutcome::Reconciled(result))
    }
}

impl<S: RecordSource + 'static> SyncController<S> {
    /// Process triggers until the queue closes or `shutdown` resolves.
    ///
    /// At most one refresh runs at a time. Under [`OverlapPolicy::Queue`]
    /// triggers arriving meanwhile collapse into a single pending refresh
    /// that starts when the running one finishes; under
    /// [`OverlapPolicy::Coalesce`] they are dropped. Failures are logged;
    /// the next trigger is the retry.
    pub async fn run(
        self: Arc<Self>,
        mut triggers: mpsc::Receiver<Trigger>,
        shutdown: impl Future<Output = ()>,
    ) {
        let mut in_flight = JoinSet::new();
        let mut pending: Option<Trigger> = None;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping sync");
                    break;
                }
                trigger = triggers.recv() => {
                    let Some(trigger) = trigger else {
                        tracing::info!("Trigger queue closed, stopping sync");
                        break;
                    };
                    if in_flight.is_empty() {
                        self.spawn_refresh(&mut in_flight, trigger);
                    } else if self.overlap == OverlapPolicy::Coalesce {
                        self.note_coalesced(trigger);
                    } else if let Some(queued) = pending {
                        self.note_coalesced(trigger);
                        // Keep the authenticated label if either carries it.
                        if queued != Trigger::Authenticated {
                            pending = Some(trigger);
                        }
                    } else {
                        pending = Some(trigger);
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Refresh task failed");
                    }
                    if let Some(next) = pending.take() {
                        self.spawn_refresh(&mut in_flight, next);
                    }
                }
            }
        }

        in_flight.shutdown().await;
    }

    fn spawn_refresh(self: &Arc<Self>, in_flight: &mut JoinSet<()>, trigger: Trigger) {
        let controller = Arc::clone(self);
        in_flight.spawn(async move {
            // Errors are already logged by refresh.
            let _ = controller.refresh(trigger).await;
        });
    }

    /// React once to the login completing.
    ///
    /// Installs the session on the source, then queues an
    /// [`Trigger::Authenticated`] refresh.
    pub fn forward_auth(
        self: &Arc<Self>,
        signal: AuthSignal,
        triggers: TriggerHandle,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            match signal.wait().await {
                Some(session) => {
                    controller.source.authorize(&session).await;
                    tracing::info!("Session established, requesting refresh");
                    if !triggers.authenticated().await {
                        tracing::warn!("Trigger queue closed before authenticated refresh");
                    }
                }
                None => tracing::debug!("Auth signal dropped without a session"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, SyncError};
    use feedsync_engine::RemoteRecord;
    use futures::future::BoxFuture;
    use serde_json::json;

    /// Serves a fixed list, or fails when it is `None`.
    struct FixedSource(Option<Vec<Record>>);

    impl RecordSource for FixedSource {
        fn fetch_all(&self) -> BoxFuture<'_, std::result::Result<Vec<RemoteRecord>, FetchError>> {
            let result = match &self.0 {
                Some(records) => Ok(records.iter().cloned().map(Into::into).collect()),
                None => Err(FetchError::Unavailable("offline".into())),
            };
            Box::pin(async move { result })
        }
    }

    fn photos(timestamps: &[Timestamp]) -> Vec<Record> {
        timestamps
            .iter()
            .map(|ts| Record::new(*ts, json!({"caption": format!("photo {ts}")})))
            .collect()
    }

    #[tokio::test]
    async fn refresh_loads_and_publishes() {
        let controller = SyncController::new(
            FixedSource(Some(photos(&[2, 9, 5]))),
            OrderedSyncView::new(),
        );
        let mut updates = controller.subscribe();

        let outcome = controller.refresh(Trigger::Refresh).await.unwrap();

        let RefreshOutcome::Reconciled(result) = outcome else {
            panic!("expected a reconcile");
        };
        assert_eq!(result.inserted, 3);
        assert!(updates.has_changed().unwrap());

        let state = updates.borrow_and_update().clone();
        assert_eq!(state.revision, 1);
        assert_eq!(state.watermark, Some(9));
        let order: Vec<_> = state.records.iter().map(|r| r.timestamp).collect();
        assert_eq!(order, vec![9, 5, 2]);
    }

    #[tokio::test]
    async fn unchanged_refresh_does_not_publish() {
        let controller =
            SyncController::new(FixedSource(Some(photos(&[1, 2]))), OrderedSyncView::new());
        controller.refresh(Trigger::Refresh).await.unwrap();

        let mut updates = controller.subscribe();
        let _ = updates.borrow_and_update();
        controller.refresh(Trigger::Refresh).await.unwrap();

        assert!(!updates.has_changed().unwrap());
        assert_eq!(controller.current().revision, 1);
        assert_eq!(controller.stats().cycles, 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_view_untouched() {
        let mut view = OrderedSyncView::new();
        view.reconcile(photos(&[3, 4]));
        let controller = SyncController::new(FixedSource(None), view);

        let err = controller.refresh(Trigger::Refresh).await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(FetchError::Unavailable(_))));
        let state = controller.current();
        assert_eq!(state.revision, 0);
        assert_eq!(state.records.len(), 2);

        let stats = controller.stats();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.cycles, 0);
        assert_eq!(
            stats.last_error.as_deref(),
            Some("Source unavailable: offline")
        );
    }

    #[test]
    fn initial_state_reflects_restored_view() {
        let mut view = OrderedSyncView::new();
        view.reconcile(photos(&[7]));
        let controller = SyncController::new(FixedSource(None), view);

        let state = controller.current();
        assert_eq!(state.revision, 0);
        assert_eq!(state.watermark, Some(7));
        assert_eq!(controller.overlap(), OverlapPolicy::Queue);
    }
}
