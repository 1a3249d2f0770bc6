use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::connectors::errors::ConnectorError;
use crate::models::{
    CapabilityKey, FeatureKey, OnboardingStatus, PlanTier, RoleKey, Session, Tenant,
    TenantMembership, UserProfile,
};

use super::{EntitlementPayload, TenantRepairResponse, UserServiceConnector};

/// Scripted reply: wait `delay`, then return `result`
pub type MockReply<T> = (Duration, Result<T, ConnectorError>);

/// Number of calls made per operation
#[derive(Debug, Default)]
pub struct MockCalls {
    pub entitlements: AtomicUsize,
    pub profile: AtomicUsize,
    pub provision: AtomicUsize,
    pub memberships: AtomicUsize,
    pub repair: AtomicUsize,
}

/// In-memory User Service.
///
/// Defaults describe an onboarded growth-plan admin with one active tenant.
/// Builders replace individual replies; entitlement replies can be queued so
/// that consecutive resolves see different results and delays.
pub struct MockUserServiceConnector {
    entitlement_queue: Mutex<VecDeque<MockReply<EntitlementPayload>>>,
    entitlements: Mutex<Result<EntitlementPayload, ConnectorError>>,
    profile: Mutex<Result<UserProfile, ConnectorError>>,
    memberships: Mutex<Result<Vec<TenantMembership>, ConnectorError>>,
    repair: Mutex<Result<TenantRepairResponse, ConnectorError>>,
    profile_delay: Duration,
    pub calls: MockCalls,
}

impl MockUserServiceConnector {
    pub fn new() -> Self {
        Self {
            entitlement_queue: Mutex::new(VecDeque::new()),
            entitlements: Mutex::new(Ok(Self::growth_entitlements())),
            profile: Mutex::new(Ok(Self::profile_with_status(OnboardingStatus::Complete))),
            memberships: Mutex::new(Ok(vec![TenantMembership {
                user_id: "test_user_id".to_string(),
                tenant_id: "tenant-1".to_string(),
                role: RoleKey::Admin,
                status: "active".to_string(),
                tenant: Tenant {
                    plan: PlanTier::Growth,
                    status: "active".to_string(),
                },
            }])),
            repair: Mutex::new(Ok(TenantRepairResponse {
                repaired: true,
                tenant_id: Some("tenant-1".to_string()),
                message: None,
            })),
            profile_delay: Duration::ZERO,
            calls: MockCalls::default(),
        }
    }

    pub fn growth_entitlements() -> EntitlementPayload {
        EntitlementPayload {
            plan: "growth".to_string(),
            role: RoleKey::Admin,
            features: vec![FeatureKey::DashboardView, FeatureKey::AnalyticsView],
            capabilities: vec![
                CapabilityKey::ProfileEdit,
                CapabilityKey::StudentsCreate,
                CapabilityKey::FeesCollect,
            ],
        }
    }

    pub fn profile_with_status(status: OnboardingStatus) -> UserProfile {
        UserProfile {
            id: "test_user_id".to_string(),
            email: "test@example.com".to_string(),
            role: RoleKey::Admin,
            onboarding_status: status,
            tenant_ref: Some("tenant-1".to_string()),
        }
    }

    /// Reply used once the queue is empty
    pub fn with_entitlements(self, result: Result<EntitlementPayload, ConnectorError>) -> Self {
        *self.entitlements.lock().unwrap_or_else(PoisonError::into_inner) = result;
        self
    }

    /// Queue a one-off entitlement reply
    pub fn push_entitlement_reply(
        self,
        delay: Duration,
        result: Result<EntitlementPayload, ConnectorError>,
    ) -> Self {
        self.entitlement_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((delay, result));
        self
    }

    pub fn with_profile(self, result: Result<UserProfile, ConnectorError>) -> Self {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = result;
        self
    }

    pub fn with_profile_delay(mut self, delay: Duration) -> Self {
        self.profile_delay = delay;
        self
    }

    pub fn with_memberships(self, result: Result<Vec<TenantMembership>, ConnectorError>) -> Self {
        *self.memberships.lock().unwrap_or_else(PoisonError::into_inner) = result;
        self
    }

    pub fn with_repair(self, result: Result<TenantRepairResponse, ConnectorError>) -> Self {
        *self.repair.lock().unwrap_or_else(PoisonError::into_inner) = result;
        self
    }

    /// Change the onboarding status served from now on
    pub fn set_onboarding_status(&self, status: OnboardingStatus) {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = Ok(Self::profile_with_status(status));
    }

    /// Change the entitlements served from now on
    pub fn set_entitlements(&self, payload: EntitlementPayload) {
        *self.entitlements.lock().unwrap_or_else(PoisonError::into_inner) = Ok(payload);
    }

    pub fn backend_calls(&self) -> usize {
        self.calls.entitlements.load(Ordering::SeqCst)
            + self.calls.profile.load(Ordering::SeqCst)
            + self.calls.provision.load(Ordering::SeqCst)
            + self.calls.memberships.load(Ordering::SeqCst)
            + self.calls.repair.load(Ordering::SeqCst)
    }
}

impl Default for MockUserServiceConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserServiceConnector for MockUserServiceConnector {
    async fn fetch_entitlements(
        &self,
        _session: &Session,
    ) -> Result<EntitlementPayload, ConnectorError> {
        self.calls.entitlements.fetch_add(1, Ordering::SeqCst);
        let scripted = self.entitlement_queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match scripted {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => self.entitlements.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }

    async fn get_user_profile(&self, _session: &Session) -> Result<UserProfile, ConnectorError> {
        self.calls.profile.fetch_add(1, Ordering::SeqCst);
        if !self.profile_delay.is_zero() {
            tokio::time::sleep(self.profile_delay).await;
        }
        self.profile.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn provision_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError> {
        self.calls.provision.fetch_add(1, Ordering::SeqCst);
        let mut profile = Self::profile_with_status(OnboardingStatus::Pending);
        profile.id = session.user_id.clone();
        profile.tenant_ref = session.tenant_id.clone();
        Ok(profile)
    }

    async fn list_tenant_memberships(
        &self,
        _session: &Session,
    ) -> Result<Vec<TenantMembership>, ConnectorError> {
        self.calls.memberships.fetch_add(1, Ordering::SeqCst);
        self.memberships.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn repair_tenant(
        &self,
        _session: &Session,
    ) -> Result<TenantRepairResponse, ConnectorError> {
        self.calls.repair.fetch_add(1, Ordering::SeqCst);
        self.repair.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
