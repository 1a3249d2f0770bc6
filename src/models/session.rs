use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Credentials of an established session.
/// Produced by the identity layer; this crate only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub tenant_id: Option<String>,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        access_token: impl Into<String>,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            access_token: access_token.into(),
            tenant_id,
            established_at: Utc::now(),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
