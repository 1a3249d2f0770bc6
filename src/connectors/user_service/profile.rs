use tracing::Instrument;

use crate::connectors::errors::ConnectorError;
use crate::models::{Session, UserProfile};

use super::{ProvisionProfileRequest, UserServiceClient};

impl UserServiceClient {
    /// Get the profile of the session identity
    pub async fn get_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError> {
        let span = tracing::info_span!("user_service_get_profile", user_id = %session.user_id);
        let url = self.url(&format!("/api/1.0/profiles/{}", session.user_id));

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", session.bearer())
            .send()
            .instrument(span)
            .await
            .map_err(ConnectorError::from)?;

        if response.status() == 404 {
            return Err(ConnectorError::NotFound(format!(
                "Profile {} not found",
                session.user_id
            )));
        }

        Self::check_status(response)
            .await?
            .json::<UserProfile>()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))
    }

    /// Provision an empty profile (onboarding pending) for the session identity
    pub async fn create_profile(&self, session: &Session) -> Result<UserProfile, ConnectorError> {
        let span = tracing::info_span!("user_service_provision_profile", user_id = %session.user_id);
        let payload = ProvisionProfileRequest {
            user_id: session.user_id.clone(),
            tenant_id: session.tenant_id.clone(),
        };

        let response = self
            .http_client
            .post(self.url("/api/1.0/profiles"))
            .header("Authorization", self.service_auth_header(session))
            .json(&payload)
            .send()
            .instrument(span)
            .await
            .map_err(|e| {
                tracing::error!("provision_profile error: {:?}", e);
                ConnectorError::from(e)
            })?;

        Self::check_status(response)
            .await?
            .json::<UserProfile>()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))
    }
}
