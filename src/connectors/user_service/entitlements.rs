use tracing::Instrument;

use crate::connectors::errors::ConnectorError;
use crate::models::Session;

use super::{EntitlementPayload, UserServiceClient};

impl UserServiceClient {
    /// Fetch the entitlements of the session identity.
    ///
    /// A 401 maps to `ConnectorError::NoActiveSession` so the resolver can
    /// tell an expired session apart from a broken backend.
    pub async fn get_entitlements(
        &self,
        session: &Session,
    ) -> Result<EntitlementPayload, ConnectorError> {
        let span = tracing::info_span!("user_service_get_entitlements", user_id = %session.user_id);

        if session.access_token.is_empty() {
            return Err(ConnectorError::NoActiveSession);
        }

        let response = self
            .http_client
            .get(self.url("/api/1.0/entitlements"))
            .header("Authorization", session.bearer())
            .send()
            .instrument(span)
            .await
            .map_err(ConnectorError::from)?;

        let response = Self::check_status(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ConnectorError::HttpError(e.to_string()))?;
        serde_json::from_str::<EntitlementPayload>(&text)
            .map_err(|e| ConnectorError::InvalidResponse(format!("Failed to parse entitlements: {}", e)))
    }
}
