use serde::Serialize;
use std::sync::Arc;

use crate::connectors::{ConnectorError, TenantRepairResponse, UserServiceConnector};
use crate::models::{EntitlementSnapshot, Session, TenantMembership};
use crate::services::EntitlementResolver;

/// Membership state of the signed-in identity
#[derive(Debug, Clone, Serialize)]
pub struct TenantReport {
    pub memberships: Vec<TenantMembership>,
    pub active: Option<TenantMembership>,
    /// No active membership; the repair remediation applies
    pub needs_repair: bool,
}

impl TenantReport {
    fn from_memberships(memberships: Vec<TenantMembership>) -> Self {
        let active = memberships.iter().find(|m| m.is_active()).cloned();
        Self {
            needs_repair: active.is_none(),
            active,
            memberships,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub repair: TenantRepairResponse,
    pub snapshot: EntitlementSnapshot,
}

/// Diagnostic path for broken tenant membership. Gating never reads memberships.
pub struct TenantDiagnostics {
    connector: Arc<dyn UserServiceConnector>,
}

impl TenantDiagnostics {
    pub fn new(connector: Arc<dyn UserServiceConnector>) -> Self {
        Self { connector }
    }

    #[tracing::instrument(name = "Inspect tenant memberships", skip_all, fields(user_id = %session.user_id))]
    pub async fn inspect(&self, session: &Session) -> Result<TenantReport, ConnectorError> {
        let memberships = self.connector.list_tenant_memberships(session).await?;
        let report = TenantReport::from_memberships(memberships);
        if report.needs_repair {
            tracing::warn!(
                memberships = report.memberships.len(),
                "No active tenant membership"
            );
        }
        Ok(report)
    }

    /// Run the repair remediation; a successful repair refreshes entitlements
    #[tracing::instrument(name = "Repair tenant", skip_all, fields(user_id = %session.user_id))]
    pub async fn repair(
        &self,
        session: &Session,
        resolver: &EntitlementResolver,
    ) -> Result<RepairOutcome, ConnectorError> {
        let repair = self.connector.repair_tenant(session).await?;
        let snapshot = if repair.repaired {
            tracing::info!(tenant_id = ?repair.tenant_id, "Tenant repaired");
            resolver.refresh().await
        } else {
            tracing::warn!(message = ?repair.message, "Tenant repair reported no change");
            resolver.current()
        };
        Ok(RepairOutcome {
            repair,
            snapshot: snapshot.as_ref().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::user_service::mock::MockUserServiceConnector;
    use crate::models::{PlanTier, RoleKey, Tenant};
    use crate::services::{InMemorySessionStore, ResolvePolicy};
    use std::sync::atomic::Ordering;

    fn membership(status: &str) -> TenantMembership {
        TenantMembership {
            user_id: "test_user_id".to_string(),
            tenant_id: "tenant-9".to_string(),
            role: RoleKey::Owner,
            status: status.to_string(),
            tenant: Tenant {
                plan: PlanTier::Starter,
                status: "active".to_string(),
            },
        }
    }

    fn session() -> Session {
        Session::new("test_user_id", "token", None)
    }

    #[tokio::test]
    async fn test_active_membership_needs_no_repair() {
        let diagnostics = TenantDiagnostics::new(Arc::new(MockUserServiceConnector::new()));
        let report = diagnostics.inspect(&session()).await.unwrap();
        assert!(!report.needs_repair);
        assert_eq!(report.active.unwrap().tenant_id, "tenant-1");
    }

    #[tokio::test]
    async fn test_inactive_memberships_need_repair() {
        let connector = MockUserServiceConnector::new()
            .with_memberships(Ok(vec![membership("suspended"), membership("invited")]));
        let report = TenantDiagnostics::new(Arc::new(connector))
            .inspect(&session())
            .await
            .unwrap();
        assert!(report.needs_repair);
        assert!(report.active.is_none());
        assert_eq!(report.memberships.len(), 2);
    }

    #[tokio::test]
    async fn test_inspect_propagates_backend_error() {
        let connector = MockUserServiceConnector::new()
            .with_memberships(Err(ConnectorError::ServiceUnavailable("down".into())));
        let result = TenantDiagnostics::new(Arc::new(connector))
            .inspect(&session())
            .await;
        assert!(matches!(result, Err(ConnectorError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_successful_repair_refreshes_entitlements() {
        let connector = Arc::new(MockUserServiceConnector::new());
        let sessions = Arc::new(InMemorySessionStore::with_session(session()));
        let resolver =
            EntitlementResolver::new(connector.clone(), sessions, ResolvePolicy::default());

        let outcome = TenantDiagnostics::new(connector.clone())
            .repair(&session(), &resolver)
            .await
            .unwrap();

        assert!(outcome.repair.repaired);
        assert!(outcome.snapshot.is_initialized);
        assert_eq!(outcome.snapshot.plan, PlanTier::Growth);
        assert_eq!(connector.calls.entitlements.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrepaired_tenant_skips_refresh() {
        let connector = Arc::new(MockUserServiceConnector::new().with_repair(Ok(
            TenantRepairResponse {
                repaired: false,
                tenant_id: None,
                message: Some("membership already present".to_string()),
            },
        )));
        let sessions = Arc::new(InMemorySessionStore::with_session(session()));
        let resolver =
            EntitlementResolver::new(connector.clone(), sessions, ResolvePolicy::default());

        let outcome = TenantDiagnostics::new(connector.clone())
            .repair(&session(), &resolver)
            .await
            .unwrap();

        assert!(!outcome.repair.repaired);
        assert!(!outcome.snapshot.is_initialized);
        assert_eq!(connector.calls.entitlements.load(Ordering::SeqCst), 0);
    }
}
