use std::sync::Arc;

use crate::connectors::config::ConnectorConfig;
use crate::connectors::errors::ConnectorError;
use crate::connectors::user_service::{mock, UserServiceClient, UserServiceConnector};

/// Initialize User Service connector with config from Settings
///
/// Falls back to the in-memory mock when the connector is disabled.
///
/// # Example
/// ```ignore
/// // In main.rs
/// let user_service = connectors::user_service::init(&settings.connectors)?;
/// startup::run(listener, settings, user_service).await?
/// ```
pub fn init(
    connector_config: &ConnectorConfig,
) -> Result<Arc<dyn UserServiceConnector>, ConnectorError> {
    let connector: Arc<dyn UserServiceConnector> = if let Some(user_service_config) =
        connector_config.user_service.as_ref().filter(|c| c.enabled)
    {
        let mut config = user_service_config.clone();
        // Load auth token from environment if not set in config
        if config.auth_token.is_none() {
            config.auth_token = std::env::var("USER_SERVICE_AUTH_TOKEN").ok();
        }
        tracing::info!("Initializing User Service connector: {}", config.base_url);
        Arc::new(UserServiceClient::new(config)?)
    } else {
        tracing::warn!("User Service connector disabled - using mock");
        Arc::new(mock::MockUserServiceConnector::new())
    };

    Ok(connector)
}
