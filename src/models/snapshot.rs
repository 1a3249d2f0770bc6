use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{CapabilityKey, FeatureKey, PlanTier, RoleKey};

/// Where the current snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Nothing resolved yet
    Pending,
    /// Resolved from the entitlement service
    Backend,
    /// Safe default substituted after a failed resolve
    Fallback,
}

/// Resolved entitlements of the current identity.
///
/// Snapshots are immutable values. The resolver replaces the whole snapshot
/// on every resolve and never edits one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSnapshot {
    pub plan: PlanTier,
    pub role: RoleKey,
    pub features: BTreeSet<FeatureKey>,
    pub capabilities: BTreeSet<CapabilityKey>,
    pub is_loading: bool,
    pub is_initialized: bool,
    pub source: SnapshotSource,
}

/// Features granted by the safe default snapshot
pub const BASELINE_FEATURES: [FeatureKey; 3] = [
    FeatureKey::DashboardView,
    FeatureKey::StudentsView,
    FeatureKey::CoursesView,
];

/// Capabilities granted by the safe default snapshot
pub const BASELINE_CAPABILITIES: [CapabilityKey; 1] = [CapabilityKey::ProfileEdit];

impl EntitlementSnapshot {
    /// State before the first resolve has finished
    pub fn uninitialized() -> Self {
        Self {
            plan: PlanTier::lowest(),
            role: RoleKey::default(),
            features: BTreeSet::new(),
            capabilities: BTreeSet::new(),
            is_loading: false,
            is_initialized: false,
            source: SnapshotSource::Pending,
        }
    }

    /// Minimal snapshot used whenever resolution fails
    pub fn safe_default() -> Self {
        Self {
            plan: PlanTier::lowest(),
            role: RoleKey::Member,
            features: BASELINE_FEATURES.into_iter().collect(),
            capabilities: BASELINE_CAPABILITIES.into_iter().collect(),
            is_loading: false,
            is_initialized: true,
            source: SnapshotSource::Fallback,
        }
    }

    pub fn resolved(
        plan: PlanTier,
        role: RoleKey,
        features: impl IntoIterator<Item = FeatureKey>,
        capabilities: impl IntoIterator<Item = CapabilityKey>,
    ) -> Self {
        Self {
            plan,
            role,
            features: features.into_iter().collect(),
            capabilities: capabilities.into_iter().collect(),
            is_loading: false,
            is_initialized: true,
            source: SnapshotSource::Backend,
        }
    }

    /// Copy of this snapshot flagged as loading, published while a resolve is in flight
    pub fn as_loading(&self) -> Self {
        Self {
            is_loading: true,
            ..self.clone()
        }
    }

    pub fn has_feature(&self, feature: &FeatureKey) -> bool {
        self.features.contains(feature)
    }

    pub fn has_capability(&self, capability: &CapabilityKey) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SnapshotSource::Fallback
    }
}

impl Default for EntitlementSnapshot {
    fn default() -> Self {
        Self::uninitialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_default_is_initialized_free() {
        let snapshot = EntitlementSnapshot::safe_default();
        assert!(snapshot.is_initialized);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.plan, PlanTier::Free);
        assert!(snapshot.has_feature(&FeatureKey::DashboardView));
        assert!(snapshot.has_capability(&CapabilityKey::ProfileEdit));
        assert!(snapshot.is_fallback());
    }

    #[test]
    fn test_loading_copy_keeps_grants() {
        let snapshot = EntitlementSnapshot::resolved(
            PlanTier::Scale,
            RoleKey::Admin,
            vec![FeatureKey::AnalyticsView],
            vec![CapabilityKey::FeesRefund],
        );
        let loading = snapshot.as_loading();
        assert!(loading.is_loading);
        assert_eq!(loading.plan, PlanTier::Scale);
        assert_eq!(loading.features, snapshot.features);
        assert!(!snapshot.is_loading);
    }
}
