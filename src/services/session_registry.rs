use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::connectors::UserServiceConnector;
use crate::models::{EntitlementSnapshot, Session};
use crate::services::onboarding_gate::OnboardingGateConfig;
use crate::services::route_guard::RouteGuard;
use crate::services::{AccessContext, ResolvePolicy};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Builds an `AccessContext` for each new session
#[derive(Clone)]
pub struct AccessContextFactory {
    pub connector: Arc<dyn UserServiceConnector>,
    pub guard: Arc<RouteGuard>,
    pub gate_config: OnboardingGateConfig,
    pub resolve_policy: ResolvePolicy,
}

impl AccessContextFactory {
    pub fn build(&self) -> AccessContext {
        AccessContext::new(
            self.connector.clone(),
            self.guard.clone(),
            self.gate_config.clone(),
            self.resolve_policy,
        )
    }
}

/// How long an unused context lives and how many may exist at once
#[derive(Debug, Clone, Copy)]
pub struct RegistryLimits {
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

struct Entry {
    context: Arc<AccessContext>,
    last_seen: Mutex<Instant>,
}

impl Entry {
    fn new(context: Arc<AccessContext>) -> Self {
        Self {
            context,
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }
}

/// Access contexts keyed by bearer token.
///
/// Contexts unused for longer than the idle timeout are signed out by
/// [`SessionRegistry::sweep_idle`]. When the registry is full, opening a new
/// token evicts the least recently used context.
pub struct SessionRegistry {
    factory: AccessContextFactory,
    limits: RegistryLimits,
    contexts: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(factory: AccessContextFactory) -> Self {
        Self {
            factory,
            limits: RegistryLimits::default(),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, limits: RegistryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn factory(&self) -> &AccessContextFactory {
        &self.factory
    }

    pub fn limits(&self) -> RegistryLimits {
        self.limits
    }

    /// Establish a session for `token`, reusing the context already bound to it
    pub async fn open(
        &self,
        token: &str,
        user_id: &str,
        tenant_id: Option<String>,
    ) -> (Arc<AccessContext>, Arc<EntitlementSnapshot>) {
        let (context, evicted) = {
            let mut contexts = self.write();
            let evicted = if contexts.contains_key(token) {
                None
            } else {
                self.evict_for_insert(&mut contexts)
            };
            let entry = contexts
                .entry(token.to_string())
                .or_insert_with(|| Entry::new(Arc::new(self.factory.build())));
            entry.touch();
            (entry.context.clone(), evicted)
        };
        if let Some(evicted) = evicted {
            tracing::warn!("Session registry full, evicting least recently used context");
            evicted.sign_out().await;
        }
        let snapshot = context
            .establish(Session::new(user_id, token, tenant_id))
            .await;
        (context, snapshot)
    }

    /// Context bound to `token`; marks it as used
    pub fn get(&self, token: &str) -> Option<Arc<AccessContext>> {
        let contexts = self.read();
        let entry = contexts.get(token)?;
        entry.touch();
        Some(entry.context.clone())
    }

    /// Sign out and drop the context; `false` when no session was bound
    pub async fn close(&self, token: &str) -> bool {
        let removed = self.write().remove(token);
        match removed {
            Some(entry) => {
                entry.context.sign_out().await;
                true
            }
            None => false,
        }
    }

    /// Sign out every context idle for at least the idle timeout.
    /// Returns the number of contexts removed.
    pub async fn sweep_idle(&self) -> usize {
        let expired: Vec<Entry> = {
            let mut contexts = self.write();
            let tokens: Vec<String> = contexts
                .iter()
                .filter(|(_, entry)| entry.idle_for() >= self.limits.idle_timeout)
                .map(|(token, _)| token.clone())
                .collect();
            tokens
                .iter()
                .filter_map(|token| contexts.remove(token))
                .collect()
        };
        for entry in &expired {
            entry.context.sign_out().await;
        }
        if !expired.is_empty() {
            tracing::info!(expired = expired.len(), "Idle sessions expired");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn evict_for_insert(&self, contexts: &mut HashMap<String, Entry>) -> Option<Arc<AccessContext>> {
        if contexts.len() < self.limits.max_sessions {
            return None;
        }
        let oldest = contexts
            .iter()
            .max_by_key(|(_, entry)| entry.idle_for())
            .map(|(token, _)| token.clone())?;
        contexts.remove(&oldest).map(|entry| entry.context)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.contexts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.contexts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
