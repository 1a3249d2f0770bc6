use serde::{Deserialize, Serialize};

use super::{PlanTier, RoleKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub plan: PlanTier,
    pub status: String,
}

/// Association of an identity with an organisation account.
/// Only the diagnostic path reads memberships; gating never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub user_id: String,
    pub tenant_id: String,
    pub role: RoleKey,
    pub status: String,
    pub tenant: Tenant,
}

impl TenantMembership {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}
