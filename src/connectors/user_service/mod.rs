pub mod entitlements;
pub mod init;
pub mod mock;
pub mod profile;
pub mod tenant;


pub use init::init;

use super::config::UserServiceConfig;
use super::errors::ConnectorError;
use crate::models::{
    CapabilityKey, EntitlementSnapshot, FeatureKey, PlanTier, RoleKey, Session, TenantMembership,
    UserProfile,
};
use serde::{Deserialize, Serialize};

/// Entitlements as returned by the entitlement endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementPayload {
    pub plan: String,
    #[serde(default)]
    pub role: RoleKey,
    #[serde(default)]
    pub features: Vec<FeatureKey>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityKey>,
}

impl From<EntitlementPayload> for EntitlementSnapshot {
    fn from(payload: EntitlementPayload) -> Self {
        EntitlementSnapshot::resolved(
            PlanTier::from_backend(&payload.plan),
            payload.role,
            payload.features,
            payload.capabilities,
        )
    }
}

/// Body of a profile provisioning request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionProfileRequest {
    pub user_id: String,
    pub tenant_id: Option<String>,
}

/// Result of the tenant repair remediation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRepairResponse {
    pub repaired: bool,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Trait for User Service integration
/// Allows mocking in tests and swapping implementations
#[async_trait::async_trait]
pub trait UserServiceConnector: Send + Sync {
    /// Resolve plan, role, features and capabilities of the session identity
    /// Calls GET /api/1.0/entitlements
    async fn fetch_entitlements(
        &self,
        session: &Session,
    ) -> Result<EntitlementPayload, ConnectorError>;

    /// Read the profile of the session identity
    /// Calls GET /api/1.0/profiles/{user_id}; a missing profile is `ConnectorError::NotFound`
    async fn get_user_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError>;

    /// Create the profile row of an identity that has none yet
    /// Calls POST /api/1.0/profiles
    async fn provision_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError>;

    /// List tenant memberships of the session identity
    /// Calls GET /api/1.0/tenant_memberships?user_id={user_id}
    async fn list_tenant_memberships(
        &self,
        session: &Session,
    ) -> Result<Vec<TenantMembership>, ConnectorError>;

    /// Recreate a missing tenant membership
    /// Calls POST /api/1.0/tenants/repair
    async fn repair_tenant(&self, session: &Session)
        -> Result<TenantRepairResponse, ConnectorError>;
}

/// HTTP-based User Service client
pub struct UserServiceClient {
    base_url: String,
    http_client: reqwest::Client,
    auth_token: Option<String>,
}

impl UserServiceClient {
    /// Create new User Service client
    pub fn new(config: UserServiceConfig) -> Result<Self, ConnectorError> {
        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            auth_token: config.auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Service-level authorization header, falling back to the user's bearer token
    fn service_auth_header(&self, session: &Session) -> String {
        self.auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
            .unwrap_or_else(|| session.bearer())
    }

    /// Turn a non-success response into the matching `ConnectorError`
    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ConnectorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ConnectorError::from_status(status.as_u16(), body))
    }
}

#[async_trait::async_trait]
impl UserServiceConnector for UserServiceClient {
    async fn fetch_entitlements(
        &self,
        session: &Session,
    ) -> Result<EntitlementPayload, ConnectorError> {
        self.get_entitlements(session).await
    }

    async fn get_user_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError> {
        self.get_profile(session).await
    }

    async fn provision_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError> {
        self.create_profile(session).await
    }

    async fn list_tenant_memberships(
        &self,
        session: &Session,
    ) -> Result<Vec<TenantMembership>, ConnectorError> {
        self.get_tenant_memberships(session).await
    }

    async fn repair_tenant(
        &self,
        session: &Session,
    ) -> Result<TenantRepairResponse, ConnectorError> {
        self.post_tenant_repair(session).await
    }
}
