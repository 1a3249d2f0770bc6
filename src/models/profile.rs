use serde::{Deserialize, Serialize};

use super::RoleKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingStatus {
    Pending,
    Complete,
}

/// Profile of the signed-in identity, owned by the user service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: RoleKey,
    /// Required: a body without a status is a shape error, not a pending profile
    #[serde(alias = "onboardingStatus")]
    pub onboarding_status: OnboardingStatus,
    #[serde(default, alias = "tenantRef")]
    pub tenant_ref: Option<String>,
}

impl UserProfile {
    pub fn is_onboarded(&self) -> bool {
        self.onboarding_status == OnboardingStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_status_is_read() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "id": "u",
            "email": "e@x",
            "onboardingStatus": "complete"
        }))
        .unwrap();
        assert!(profile.is_onboarded());
    }

    #[test]
    fn test_missing_status_is_rejected() {
        let result = serde_json::from_value::<UserProfile>(serde_json::json!({
            "id": "u",
            "email": "e@x"
        }));
        assert!(result.is_err());
    }
}
