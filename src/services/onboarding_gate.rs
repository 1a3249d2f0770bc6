//! Onboarding checkpoint.
//!
//! A finite-state machine driven by path changes. Every navigation to a
//! protected path re-reads the profile and, when onboarding is incomplete,
//! replaces the current history entry with the onboarding destination.
//! Failures fail open: the gate never traps a user in a redirect or spinner
//! loop because the profile could not be read.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::connectors::UserServiceConnector;
use crate::services::route_guard::strip_query;
use crate::services::SessionStore;

/// Default delay before the single session re-read
pub const SESSION_RETRY_DELAY: Duration = Duration::from_millis(200);

pub const DEFAULT_ONBOARDING_PATH: &str = "/onboarding";

pub const DEFAULT_PUBLIC_ROUTES: [&str; 7] = [
    "/",
    "/login",
    "/signup",
    "/forgot-password",
    "/reset-password",
    "/auth/callback",
    "/pricing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    Push,
    Replace,
}

/// Performs client-side navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &str, mode: NavigationMode);
}

/// Why the gate let a navigation through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatisfiedReason {
    PublicRoute,
    OnboardingDestination,
    NoSession,
    OnboardingComplete,
    CheckFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Idle,
    Checking { path: String },
    Satisfied { path: String, reason: SatisfiedReason },
    Redirecting { from: String, to: String },
}

/// Result of one `on_navigate` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Proceed { reason: SatisfiedReason },
    Redirected { to: String, mode: NavigationMode },
    /// Same path as the last evaluated one; nothing was checked
    Duplicate { state: GateState },
    /// A newer navigation started while this one was being checked
    Superseded,
}

#[derive(Debug, Clone)]
pub struct OnboardingGateConfig {
    pub public_routes: HashSet<String>,
    pub onboarding_path: String,
    pub session_retry_delay: Duration,
}

impl OnboardingGateConfig {
    /// Exact match only; sub-paths of a public route are protected
    pub fn is_exempt(&self, path: &str) -> Option<SatisfiedReason> {
        if path == self.onboarding_path {
            Some(SatisfiedReason::OnboardingDestination)
        } else if self.public_routes.contains(path) {
            Some(SatisfiedReason::PublicRoute)
        } else {
            None
        }
    }
}

impl Default for OnboardingGateConfig {
    fn default() -> Self {
        Self {
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
            onboarding_path: DEFAULT_ONBOARDING_PATH.to_string(),
            session_retry_delay: SESSION_RETRY_DELAY,
        }
    }
}

#[derive(Clone, Copy)]
enum Verdict {
    Satisfied(SatisfiedReason),
    Redirect,
}

struct GateInner {
    state: GateState,
    last_path: Option<String>,
    epoch: u64,
}

pub struct OnboardingGate {
    config: OnboardingGateConfig,
    sessions: Arc<dyn SessionStore>,
    connector: Arc<dyn UserServiceConnector>,
    navigator: Arc<dyn Navigator>,
    inner: Mutex<GateInner>,
}

impl OnboardingGate {
    pub fn new(
        config: OnboardingGateConfig,
        sessions: Arc<dyn SessionStore>,
        connector: Arc<dyn UserServiceConnector>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            sessions,
            connector,
            navigator,
            inner: Mutex::new(GateInner {
                state: GateState::Idle,
                last_path: None,
                epoch: 0,
            }),
        }
    }

    pub fn config(&self) -> &OnboardingGateConfig {
        &self.config
    }

    pub fn state(&self) -> GateState {
        self.lock().state.clone()
    }

    /// Back to `Idle`, forgetting the last evaluated path
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = GateState::Idle;
        inner.last_path = None;
        inner.epoch += 1;
    }

    /// Handle a navigation to `path`; query string and fragment are ignored
    #[tracing::instrument(name = "Onboarding gate", skip(self))]
    pub async fn on_navigate(&self, path: &str) -> NavigationOutcome {
        let path = strip_query(path);
        let epoch = {
            let mut inner = self.lock();
            if inner.last_path.as_deref() == Some(path) {
                return NavigationOutcome::Duplicate {
                    state: inner.state.clone(),
                };
            }
            inner.last_path = Some(path.to_string());
            inner.epoch += 1;

            if let Some(reason) = self.config.is_exempt(path) {
                inner.state = GateState::Satisfied {
                    path: path.to_string(),
                    reason,
                };
                return NavigationOutcome::Proceed { reason };
            }

            inner.state = GateState::Checking {
                path: path.to_string(),
            };
            inner.epoch
        };

        let verdict = self.check().await;

        {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                tracing::debug!("Onboarding check superseded by a newer navigation");
                return NavigationOutcome::Superseded;
            }
            inner.state = match verdict {
                Verdict::Satisfied(reason) => GateState::Satisfied {
                    path: path.to_string(),
                    reason,
                },
                Verdict::Redirect => GateState::Redirecting {
                    from: path.to_string(),
                    to: self.config.onboarding_path.clone(),
                },
            };
        }

        match verdict {
            Verdict::Satisfied(reason) => NavigationOutcome::Proceed { reason },
            Verdict::Redirect => {
                tracing::info!(
                    from = %path,
                    to = %self.config.onboarding_path,
                    "Onboarding incomplete, redirecting"
                );
                self.navigator
                    .navigate(&self.config.onboarding_path, NavigationMode::Replace);
                NavigationOutcome::Redirected {
                    to: self.config.onboarding_path.clone(),
                    mode: NavigationMode::Replace,
                }
            }
        }
    }

    async fn check(&self) -> Verdict {
        let session = match self.sessions.current().await {
            Some(session) => Some(session),
            None => {
                // Session store may still be hydrating after a sign-in redirect
                tokio::time::sleep(self.config.session_retry_delay).await;
                self.sessions.current().await
            }
        };
        let session = match session {
            Some(session) => session,
            None => {
                tracing::debug!("No session after retry, deferring to identity layer");
                return Verdict::Satisfied(SatisfiedReason::NoSession);
            }
        };

        match self.connector.get_user_profile(&session).await {
            Ok(profile) if profile.is_onboarded() => {
                Verdict::Satisfied(SatisfiedReason::OnboardingComplete)
            }
            Ok(_) => Verdict::Redirect,
            Err(err) if err.is_not_found() => {
                if let Err(err) = self.connector.provision_profile(&session).await {
                    tracing::warn!(error = %err, "Profile provisioning failed");
                }
                Verdict::Redirect
            }
            Err(err) if err.is_session_problem() => {
                tracing::debug!("Session rejected while reading profile, deferring to identity layer");
                Verdict::Satisfied(SatisfiedReason::NoSession)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Onboarding check failed, letting navigation through");
                Verdict::Satisfied(SatisfiedReason::CheckFailed)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Navigator that remembers the commands it was given.
/// Used by the HTTP surface to hand the command back to the client shell.
#[derive(Default)]
pub struct RecordingNavigator {
    commands: Mutex<Vec<(String, NavigationMode)>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<(String, NavigationMode)> {
        self.commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, to: &str, mode: NavigationMode) {
        self.commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((to.to_string(), mode));
    }
}
