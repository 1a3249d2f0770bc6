//! Per-identity wiring of the access components.
//!
//! One `AccessContext` exists per signed-in session. It owns the session
//! store, the entitlement resolver and the onboarding gate, and shares the
//! route guard with every other context.

use serde::Serialize;
use std::sync::Arc;

use crate::connectors::{ConnectorError, UserServiceConnector};
use crate::models::{EntitlementSnapshot, FeatureKey, Requirement, Session};
use crate::services::gating::{self, AccessDecision, Affordance};
use crate::services::onboarding_gate::{
    GateState, NavigationMode, NavigationOutcome, OnboardingGate, OnboardingGateConfig,
    RecordingNavigator,
};
use crate::services::route_guard::{GuardOutcome, RouteGuard};
use crate::services::tenant_diagnostics::{RepairOutcome, TenantDiagnostics, TenantReport};
use crate::services::{EntitlementResolver, InMemorySessionStore, ResolvePolicy, SessionStore};

/// Result of a requirement check
#[derive(Debug, Clone, Serialize)]
pub struct AccessCheck {
    pub decision: AccessDecision,
    pub affordance: Affordance,
}

pub struct AccessContext {
    sessions: Arc<InMemorySessionStore>,
    resolver: EntitlementResolver,
    gate: OnboardingGate,
    guard: Arc<RouteGuard>,
    diagnostics: TenantDiagnostics,
    navigator: Arc<RecordingNavigator>,
}

impl AccessContext {
    pub fn new(
        connector: Arc<dyn UserServiceConnector>,
        guard: Arc<RouteGuard>,
        gate_config: OnboardingGateConfig,
        resolve_policy: ResolvePolicy,
    ) -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        Self {
            resolver: EntitlementResolver::new(connector.clone(), sessions.clone(), resolve_policy),
            gate: OnboardingGate::new(
                gate_config,
                sessions.clone(),
                connector.clone(),
                navigator.clone(),
            ),
            diagnostics: TenantDiagnostics::new(connector),
            sessions,
            guard,
            navigator,
        }
    }

    /// Install `session` and resolve its entitlements.
    ///
    /// A different identity or tenant never sees the previous snapshot:
    /// readers get an uninitialized one until the new resolve lands.
    #[tracing::instrument(name = "Establish access context", skip_all, fields(user_id = %session.user_id))]
    pub async fn establish(&self, session: Session) -> Arc<EntitlementSnapshot> {
        let same_identity = self.sessions.current().await.map_or(false, |previous| {
            previous.user_id == session.user_id && previous.tenant_id == session.tenant_id
        });
        if !same_identity {
            self.resolver.teardown();
        }
        self.sessions.set(session).await;
        self.gate.reset();
        self.resolver.resolve().await
    }

    /// Forget the session, cancel pending resolves and drop the snapshot
    #[tracing::instrument(name = "Sign out", skip_all)]
    pub async fn sign_out(&self) {
        if let Some(session) = self.sessions.clear().await {
            tracing::info!(user_id = %session.user_id, "Session closed");
        }
        self.resolver.teardown();
        self.gate.reset();
    }

    pub async fn session(&self) -> Option<Session> {
        self.sessions.current().await
    }

    pub fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    pub fn snapshot(&self) -> Arc<EntitlementSnapshot> {
        self.resolver.current()
    }

    pub async fn refresh(&self) -> Arc<EntitlementSnapshot> {
        self.resolver.refresh().await
    }

    pub fn check(&self, requirement: &Requirement) -> AccessCheck {
        let snapshot = self.snapshot();
        let policy = self.guard.policy();
        AccessCheck {
            decision: gating::evaluate(&snapshot, policy, requirement),
            affordance: gating::access_check(&snapshot, policy, requirement),
        }
    }

    /// Authored features unlocked by the current plan; empty until resolved
    pub fn plan_features(&self) -> Vec<FeatureKey> {
        let snapshot = self.snapshot();
        if !snapshot.is_initialized {
            return Vec::new();
        }
        self.guard.policy().features_for_plan(snapshot.plan)
    }

    pub fn route(&self, path: &str) -> GuardOutcome {
        self.guard.evaluate(&self.snapshot(), path)
    }

    pub async fn navigate(&self, path: &str) -> NavigationOutcome {
        self.gate.on_navigate(path).await
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Navigation commands issued by the onboarding gate so far
    pub fn navigations(&self) -> Vec<(String, NavigationMode)> {
        self.navigator.commands()
    }

    pub async fn tenant_report(&self) -> Result<TenantReport, ConnectorError> {
        let session = self.require_session().await?;
        self.diagnostics.inspect(&session).await
    }

    pub async fn repair_tenant(&self) -> Result<RepairOutcome, ConnectorError> {
        let session = self.require_session().await?;
        self.diagnostics.repair(&session, &self.resolver).await
    }

    async fn require_session(&self) -> Result<Session, ConnectorError> {
        self.sessions
            .current()
            .await
            .ok_or(ConnectorError::NoActiveSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::user_service::mock::MockUserServiceConnector;
    use crate::models::{OnboardingStatus, PlanTier};
    use crate::policy::PolicyTable;
    use crate::services::onboarding_gate::SatisfiedReason;
    use crate::services::route_guard::RouteTable;
    use std::time::Duration;

    fn context(connector: Arc<MockUserServiceConnector>) -> AccessContext {
        let guard = Arc::new(RouteGuard::new(
            RouteTable::new(),
            Arc::new(PolicyTable::standard().clone()),
        ));
        AccessContext::new(
            connector,
            guard,
            OnboardingGateConfig::default(),
            ResolvePolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_establish_resolves_and_sign_out_discards() {
        let context = context(Arc::new(MockUserServiceConnector::new()));
        let snapshot = context
            .establish(Session::new("test_user_id", "token", None))
            .await;
        assert_eq!(snapshot.plan, PlanTier::Growth);
        assert!(context.check(&Requirement::feature(FeatureKey::AnalyticsView)).decision.allowed);
        assert!(context.plan_features().contains(&FeatureKey::ReportsExport));
        assert!(!context.plan_features().contains(&FeatureKey::AuditLog));

        context.sign_out().await;
        assert!(context.session().await.is_none());
        assert!(!context.snapshot().is_initialized);
        assert_eq!(
            context.check(&Requirement::feature(FeatureKey::AnalyticsView)).affordance,
            Affordance::Pending
        );
        assert_eq!(context.gate_state(), GateState::Idle);
        assert!(context.plan_features().is_empty());
    }

    #[tokio::test]
    async fn test_same_identity_keeps_snapshot_while_resolving() {
        let connector = Arc::new(
            MockUserServiceConnector::new()
                .push_entitlement_reply(Duration::ZERO, Ok(MockUserServiceConnector::growth_entitlements()))
                .push_entitlement_reply(
                    Duration::from_millis(100),
                    Ok(MockUserServiceConnector::growth_entitlements()),
                ),
        );
        let context = context(connector);
        context
            .establish(Session::new("test_user_id", "token", None))
            .await;

        let (_, during) = tokio::join!(
            context.establish(Session::new("test_user_id", "token", None)),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                context.snapshot()
            }
        );
        assert!(during.is_initialized);
        assert_eq!(during.plan, PlanTier::Growth);
    }

    #[tokio::test]
    async fn test_diagnostics_require_session() {
        let context = context(Arc::new(MockUserServiceConnector::new()));
        assert_eq!(
            context.tenant_report().await.unwrap_err(),
            ConnectorError::NoActiveSession
        );
    }

    #[tokio::test]
    async fn test_completing_onboarding_stops_redirects() {
        let connector = Arc::new(MockUserServiceConnector::new().with_profile(Ok(
            MockUserServiceConnector::profile_with_status(OnboardingStatus::Pending),
        )));
        let context = context(connector.clone());
        context
            .establish(Session::new("test_user_id", "token", None))
            .await;

        let outcome = context.navigate("/students").await;
        assert!(matches!(outcome, NavigationOutcome::Redirected { .. }));

        connector.set_onboarding_status(OnboardingStatus::Complete);
        context.navigate("/onboarding").await;
        let outcome = context.navigate("/students").await;
        assert_eq!(
            outcome,
            NavigationOutcome::Proceed {
                reason: SatisfiedReason::OnboardingComplete
            }
        );
        assert_eq!(context.navigations().len(), 1);
    }
}
