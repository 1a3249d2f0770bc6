//! Entitlement resolution for one identity.
//!
//! The resolver owns the current [`EntitlementSnapshot`] and replaces it
//! wholesale through a `watch` channel, so readers always see either the
//! previous or the new snapshot in full. Resolution never fails from the
//! caller's point of view: any error yields the safe default snapshot with
//! `is_initialized = true`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::connectors::UserServiceConnector;
use crate::models::EntitlementSnapshot;
use crate::services::SessionStore;

/// What happens to a resolve that is still running when a newer one starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Abort the older task; only the newest resolve may publish
    #[default]
    CancelSuperseded,
    /// Let every resolve run; the last one to finish is kept
    LastWriteWins,
}

struct InFlight {
    generation: u64,
    handle: AbortHandle,
}

struct Shared {
    policy: ResolvePolicy,
    snapshot: watch::Sender<Arc<EntitlementSnapshot>>,
    /// Generation of the most recently started resolve
    started: AtomicU64,
    /// Results at or below this generation are discarded (set by teardown)
    floor: Mutex<u64>,
}

impl Shared {
    /// Publish a finished resolve if it is still wanted
    fn publish(&self, generation: u64, snapshot: EntitlementSnapshot) -> Option<Arc<EntitlementSnapshot>> {
        let floor = lock(&self.floor);
        if generation <= *floor {
            tracing::debug!(generation, "Discarding entitlement result after teardown");
            return None;
        }
        if self.policy == ResolvePolicy::CancelSuperseded
            && generation != self.started.load(Ordering::SeqCst)
        {
            tracing::debug!(generation, "Discarding superseded entitlement result");
            return None;
        }

        let snapshot = Arc::new(snapshot);
        self.snapshot.send_replace(snapshot.clone());
        Some(snapshot)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct EntitlementResolver {
    connector: Arc<dyn UserServiceConnector>,
    sessions: Arc<dyn SessionStore>,
    shared: Arc<Shared>,
    inflight: Mutex<Vec<InFlight>>,
}

impl EntitlementResolver {
    pub fn new(
        connector: Arc<dyn UserServiceConnector>,
        sessions: Arc<dyn SessionStore>,
        policy: ResolvePolicy,
    ) -> Self {
        let (sender, _) = watch::channel(Arc::new(EntitlementSnapshot::uninitialized()));
        Self {
            connector,
            sessions,
            shared: Arc::new(Shared {
                policy,
                snapshot: sender,
                started: AtomicU64::new(0),
                floor: Mutex::new(0),
            }),
            inflight: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.shared.policy
    }

    /// Snapshot as of now; may be uninitialized or loading
    pub fn current(&self) -> Arc<EntitlementSnapshot> {
        self.shared.snapshot.borrow().clone()
    }

    /// Stream of snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<Arc<EntitlementSnapshot>> {
        self.shared.snapshot.subscribe()
    }

    /// Wait until no resolve is pending and return the snapshot
    pub async fn settled(&self) -> Arc<EntitlementSnapshot> {
        let mut receiver = self.shared.snapshot.subscribe();
        loop {
            let snapshot = receiver.borrow_and_update().clone();
            if !snapshot.is_loading {
                return snapshot;
            }
            if receiver.changed().await.is_err() {
                return self.current();
            }
        }
    }

    /// Fetch entitlements for the current session and replace the snapshot.
    ///
    /// Returns the snapshot that ended up published. If this resolve was
    /// superseded, that is the newer resolve's snapshot.
    #[tracing::instrument(name = "Resolve entitlements", skip(self))]
    pub async fn resolve(&self) -> Arc<EntitlementSnapshot> {
        let generation = self.shared.started.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared
            .snapshot
            .send_modify(|current| *current = Arc::new(current.as_loading()));

        let connector = self.connector.clone();
        let sessions = self.sessions.clone();
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let snapshot = fetch_snapshot(connector.as_ref(), sessions.as_ref()).await;
            shared.publish(generation, snapshot)
        });
        self.track(generation, task.abort_handle());

        match task.await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => self.settled().await,
            Err(err) if err.is_cancelled() => self.settled().await,
            Err(err) => {
                tracing::error!("Entitlement resolve task failed: {:?}", err);
                self.shared
                    .publish(generation, EntitlementSnapshot::safe_default())
                    .unwrap_or_else(|| self.current())
            }
        }
    }

    /// Re-resolve after a state-changing action such as a plan purchase
    pub async fn refresh(&self) -> Arc<EntitlementSnapshot> {
        tracing::info!("Refreshing entitlements");
        self.resolve().await
    }

    /// Cancel pending work and forget the snapshot (sign-out)
    pub fn teardown(&self) {
        let generation = self.shared.started.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.shared.floor) = generation;

        for pending in lock(&self.inflight).drain(..) {
            pending.handle.abort();
        }
        self.shared
            .snapshot
            .send_replace(Arc::new(EntitlementSnapshot::uninitialized()));
        tracing::debug!("Entitlement snapshot discarded");
    }

    fn track(&self, generation: u64, handle: AbortHandle) {
        let mut inflight = lock(&self.inflight);
        inflight.retain(|pending| !pending.handle.is_finished());

        if self.shared.policy == ResolvePolicy::CancelSuperseded {
            if inflight.iter().any(|pending| pending.generation > generation) {
                // A newer resolve registered first
                handle.abort();
                return;
            }
            for pending in inflight.drain(..) {
                tracing::debug!(
                    superseded = pending.generation,
                    by = generation,
                    "Cancelling superseded entitlement resolve"
                );
                pending.handle.abort();
            }
        }
        inflight.push(InFlight { generation, handle });
    }
}

impl Drop for EntitlementResolver {
    fn drop(&mut self) {
        for pending in lock(&self.inflight).drain(..) {
            pending.handle.abort();
        }
    }
}

async fn fetch_snapshot(
    connector: &dyn UserServiceConnector,
    sessions: &dyn SessionStore,
) -> EntitlementSnapshot {
    let session = match sessions.current().await {
        Some(session) => session,
        None => {
            tracing::debug!("No active session, using safe default entitlements");
            return EntitlementSnapshot::safe_default();
        }
    };

    match connector.fetch_entitlements(&session).await {
        Ok(payload) => payload.into(),
        Err(err) if err.is_session_problem() => {
            tracing::debug!("Session rejected by entitlement service, using safe default");
            EntitlementSnapshot::safe_default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Entitlement fetch failed, using safe default");
            EntitlementSnapshot::safe_default()
        }
    }
}
