use serde::Deserialize;
use tracing::Instrument;

use crate::connectors::errors::ConnectorError;
use crate::models::{Session, TenantMembership};

use super::{TenantRepairResponse, UserServiceClient};

/// Eve-style list envelope
#[derive(Deserialize)]
struct EveResponse {
    #[serde(default)]
    _items: Vec<TenantMembership>,
}

impl UserServiceClient {
    /// List tenant memberships of the session identity. Never cached.
    pub async fn get_tenant_memberships(
        &self,
        session: &Session,
    ) -> Result<Vec<TenantMembership>, ConnectorError> {
        let span = tracing::info_span!("user_service_list_memberships", user_id = %session.user_id);

        let response = self
            .http_client
            .get(self.url("/api/1.0/tenant_memberships"))
            .query(&[("user_id", session.user_id.as_str())])
            .header("Authorization", session.bearer())
            .send()
            .instrument(span)
            .await
            .map_err(ConnectorError::from)?;

        let text = Self::check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| ConnectorError::HttpError(e.to_string()))?;

        // Try Eve format first, fallback to direct array
        if let Ok(eve) = serde_json::from_str::<EveResponse>(&text) {
            Ok(eve._items)
        } else {
            serde_json::from_str::<Vec<TenantMembership>>(&text)
                .map_err(|_| ConnectorError::InvalidResponse(text))
        }
    }

    /// Ask the user service to recreate the tenant membership row
    pub async fn post_tenant_repair(
        &self,
        session: &Session,
    ) -> Result<TenantRepairResponse, ConnectorError> {
        let span = tracing::info_span!("user_service_repair_tenant", user_id = %session.user_id);

        let response = self
            .http_client
            .post(self.url("/api/1.0/tenants/repair"))
            .header("Authorization", session.bearer())
            .json(&serde_json::json!({
                "user_id": session.user_id,
                "tenant_id": session.tenant_id,
            }))
            .send()
            .instrument(span)
            .await
            .map_err(|e| {
                tracing::error!("repair_tenant error: {:?}", e);
                ConnectorError::from(e)
            })?;

        let text = Self::check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| ConnectorError::HttpError(e.to_string()))?;
        serde_json::from_str::<TenantRepairResponse>(&text)
            .map_err(|_| ConnectorError::InvalidResponse(text))
    }
}
