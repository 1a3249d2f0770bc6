use serde::{Deserialize, Serialize};

/// Configuration for external service connectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub user_service: Option<UserServiceConfig>,
}

/// User Service connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserServiceConfig {
    /// Enable/disable User Service integration
    pub enabled: bool,
    /// Base URL for User Service API (e.g., http://localhost:4100/server/user)
    pub base_url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Token for inter-service calls that have no user session (from env: USER_SERVICE_AUTH_TOKEN)
    #[serde(skip)]
    pub auth_token: Option<String>,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:4100/server/user".to_string(),
            timeout_secs: 10,
            auth_token: None,
        }
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            user_service: Some(UserServiceConfig::default()),
        }
    }
}
