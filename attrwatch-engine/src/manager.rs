//! Snapshot manager - the active query set and its periodic refresh.
//!
//! The manager owns one lifecycle per active query, reconciles that set
//! against configuration updates, and drives discovery refresh from an
//! optional background task. Refresh, configuration update, and teardown
//! are mutually exclusive within one manager (one coarse lock) and
//! independent across managers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::QueryEngine;
use crate::instance::Instance;
use crate::lifecycle::{InstanceLifecycle, SnapshotRegistry};
use crate::query::Query;
use crate::source::ComponentSource;

pub struct SnapshotManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    source: Arc<dyn ComponentSource>,
    registry: Arc<dyn SnapshotRegistry>,
    active: Mutex<HashMap<u64, InstanceLifecycle>>,
}

impl ManagerInner {
    fn refresh_all(&self) {
        let active = self.active.lock();
        for lifecycle in active.values() {
            lifecycle.refresh();
        }
    }
}

impl SnapshotManager {
    pub fn new(source: Arc<dyn ComponentSource>, registry: Arc<dyn SnapshotRegistry>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                source,
                registry,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Reconcile the active set against the complete new desired set.
    ///
    /// Lifecycles for queries absent from the new set are torn down and
    /// removed; unchanged queries (same signature) are left untouched;
    /// new queries get a fresh lifecycle that is refreshed immediately.
    pub fn apply_config(&self, queries: Vec<Query>) {
        let mut active = self.inner.active.lock();

        let desired: HashSet<u64> = queries.iter().map(Query::signature).collect();
        active.retain(|signature, lifecycle| {
            if desired.contains(signature) {
                true
            } else {
                lifecycle.teardown();
                false
            }
        });

        for query in queries {
            if !active.contains_key(&query.signature()) {
                let lifecycle = InstanceLifecycle::new(
                    query.clone(),
                    QueryEngine::new(self.inner.source.clone()),
                    self.inner.registry.clone(),
                );
                lifecycle.refresh();
                active.insert(query.signature(), lifecycle);
            }
        }
    }

    /// Refresh every active lifecycle once.
    pub fn refresh_all(&self) {
        self.inner.refresh_all();
    }

    /// Tear down every lifecycle, deregistering all tracked instances.
    /// The manager stays usable for a later `apply_config`.
    pub fn teardown(&self) {
        let mut active = self.inner.active.lock();
        for lifecycle in active.values() {
            lifecycle.teardown();
        }
        active.clear();
    }

    pub fn active_queries(&self) -> Vec<Query> {
        let active = self.inner.active.lock();
        active.values().map(|l| l.query().clone()).collect()
    }

    /// Every instance currently tracked across all lifecycles.
    pub fn instances(&self) -> Vec<Instance> {
        let active = self.inner.active.lock();
        active.values().flat_map(|l| l.instances()).collect()
    }

    /// Start the periodic background refresh.
    ///
    /// The task holds only a weak reference to the manager state: it
    /// self-terminates at the first tick after the manager is dropped, or
    /// earlier through the returned handle. An in-flight refresh always
    /// runs to completion.
    #[cfg(feature = "tokio")]
    pub fn start(&self, interval: std::time::Duration) -> RefreshHandle {
        use tokio::sync::watch;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick fires immediately
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match weak.upgrade() {
                            Some(inner) => inner.refresh_all(),
                            None => break,
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        RefreshHandle { stop_tx }
    }
}

/// Handle for the background refresh task.
///
/// Call `stop()` to end it explicitly; dropping the owning manager ends
/// it at the next tick either way.
#[cfg(feature = "tokio")]
pub struct RefreshHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
}

#[cfg(feature = "tokio")]
impl RefreshHandle {
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}
