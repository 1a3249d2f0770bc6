//! Gating primitives.
//!
//! Pure decisions over an [`EntitlementSnapshot`] and a [`PolicyTable`].
//! A denial is a value describing how to render the locked affordance, never
//! an error.

use serde::Serialize;

use crate::models::{CapabilityKey, EntitlementSnapshot, FeatureKey, PlanTier, Requirement};
use crate::policy::PolicyTable;

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    Feature {
        feature: FeatureKey,
        min_plan: PlanTier,
    },
    Capability {
        capability: CapabilityKey,
    },
    Plan {
        needed_plan: PlanTier,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub denials: Vec<Denial>,
    /// Lowest plan that would clear every plan-related denial
    pub upgrade_to: Option<PlanTier>,
    pub hint: Option<String>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            denials: Vec::new(),
            upgrade_to: None,
            hint: None,
        }
    }

    fn deny(denials: Vec<Denial>) -> Self {
        let upgrade_to = denials
            .iter()
            .filter_map(|denial| match denial {
                Denial::Feature { min_plan, .. } => Some(*min_plan),
                Denial::Plan { needed_plan } => Some(*needed_plan),
                Denial::Capability { .. } => None,
            })
            .max();

        let hint = match upgrade_to {
            Some(plan) => upgrade_hint(plan),
            None => denials
                .iter()
                .find_map(|denial| match denial {
                    Denial::Capability { capability } => Some(permission_hint(capability)),
                    _ => None,
                })
                .unwrap_or_else(|| "Not available".to_string()),
        };

        Self {
            allowed: false,
            denials,
            upgrade_to,
            hint: Some(hint),
        }
    }
}

pub fn upgrade_hint(plan: PlanTier) -> String {
    format!("Requires {} plan", plan.label())
}

pub fn permission_hint(capability: &CapabilityKey) -> String {
    format!("Requires the {} permission", capability)
}

/// Explicit grant or plan-derived grant, either suffices
pub fn feature_allowed(
    snapshot: &EntitlementSnapshot,
    policy: &PolicyTable,
    feature: &FeatureKey,
) -> bool {
    snapshot.has_feature(feature) || snapshot.plan >= policy.min_plan_for_feature(feature)
}

/// Capabilities are never inferred from the plan
pub fn capability_allowed(snapshot: &EntitlementSnapshot, capability: &CapabilityKey) -> bool {
    snapshot.has_capability(capability)
}

/// Evaluate every field of `requirement` against the snapshot (AND).
///
/// Does not look at `is_initialized`; callers that may hold an
/// uninitialized snapshot go through [`access_check`] or the route guard.
pub fn evaluate(
    snapshot: &EntitlementSnapshot,
    policy: &PolicyTable,
    requirement: &Requirement,
) -> AccessDecision {
    let mut denials = Vec::new();

    if let Some(feature) = &requirement.feature {
        if !feature_allowed(snapshot, policy, feature) {
            denials.push(Denial::Feature {
                feature: feature.clone(),
                min_plan: policy.min_plan_for_feature(feature),
            });
        }
    }

    if let Some(capability) = &requirement.capability {
        if !capability_allowed(snapshot, capability) {
            denials.push(Denial::Capability {
                capability: capability.clone(),
            });
        }
    }

    if let Some(needed_plan) = requirement.needed_plan {
        if !snapshot.plan.satisfies(needed_plan) {
            denials.push(Denial::Plan { needed_plan });
        }
    }

    if denials.is_empty() {
        AccessDecision::allow()
    } else {
        AccessDecision::deny(denials)
    }
}

/// How a gated control should render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Affordance {
    /// Snapshot not resolved yet; render a placeholder, not a lock
    Pending,
    Enabled,
    Disabled {
        hint: String,
        upgrade_to: Option<PlanTier>,
    },
}

impl Affordance {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Affordance::Enabled)
    }

    /// Pick what to render: `content` when enabled, `locked(hint)` when disabled,
    /// `None` while pending
    pub fn render<T>(
        &self,
        content: impl FnOnce() -> T,
        locked: impl FnOnce(&str) -> T,
    ) -> Option<T> {
        match self {
            Affordance::Pending => None,
            Affordance::Enabled => Some(content()),
            Affordance::Disabled { hint, .. } => Some(locked(hint)),
        }
    }
}

impl From<AccessDecision> for Affordance {
    fn from(decision: AccessDecision) -> Self {
        if decision.allowed {
            Affordance::Enabled
        } else {
            Affordance::Disabled {
                hint: decision.hint.unwrap_or_default(),
                upgrade_to: decision.upgrade_to,
            }
        }
    }
}

/// Generic access check with deferral for an uninitialized snapshot
pub fn access_check(
    snapshot: &EntitlementSnapshot,
    policy: &PolicyTable,
    requirement: &Requirement,
) -> Affordance {
    if !snapshot.is_initialized {
        return Affordance::Pending;
    }
    evaluate(snapshot, policy, requirement).into()
}

pub fn feature_gate(
    snapshot: &EntitlementSnapshot,
    policy: &PolicyTable,
    feature: &FeatureKey,
) -> Affordance {
    access_check(snapshot, policy, &Requirement::feature(feature.clone()))
}

pub fn capability_gate(
    snapshot: &EntitlementSnapshot,
    policy: &PolicyTable,
    capability: &CapabilityKey,
) -> Affordance {
    access_check(snapshot, policy, &Requirement::capability(capability.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoleKey;

    fn snapshot(
        plan: PlanTier,
        features: Vec<FeatureKey>,
        capabilities: Vec<CapabilityKey>,
    ) -> EntitlementSnapshot {
        EntitlementSnapshot::resolved(plan, RoleKey::Member, features, capabilities)
    }

    #[test]
    fn test_empty_requirement_is_allowed() {
        let snapshot = snapshot(PlanTier::Free, vec![], vec![]);
        let decision = evaluate(&snapshot, PolicyTable::standard(), &Requirement::none());
        assert!(decision.allowed);
        assert!(decision.hint.is_none());
    }

    #[test]
    fn test_free_plan_denied_analytics_with_growth_hint() {
        let snapshot = snapshot(PlanTier::Free, vec![], vec![]);
        let requirement = Requirement::feature(FeatureKey::AnalyticsView).and_plan(PlanTier::Growth);

        let decision = evaluate(&snapshot, PolicyTable::standard(), &requirement);

        assert!(!decision.allowed);
        assert_eq!(decision.denials.len(), 2);
        assert_eq!(decision.upgrade_to, Some(PlanTier::Growth));
        assert!(decision.hint.as_deref().unwrap().contains("GROWTH"));
    }

    #[test]
    fn test_plan_derived_grant_without_explicit_feature() {
        let snapshot = snapshot(PlanTier::Growth, vec![], vec![]);
        let decision = evaluate(
            &snapshot,
            PolicyTable::standard(),
            &Requirement::feature(FeatureKey::AnalyticsView),
        );
        assert!(decision.allowed);
    }

    #[test]
    fn test_plan_derived_grant_holds_for_every_higher_tier() {
        let policy = PolicyTable::standard();
        for feature in FeatureKey::known() {
            let min = policy.min_plan_for_feature(&feature);
            for plan in PlanTier::ALL.into_iter().filter(|plan| *plan >= min) {
                let snapshot = snapshot(plan, vec![], vec![]);
                assert!(feature_allowed(&snapshot, policy, &feature), "{} on {}", feature, plan);
            }
        }
    }

    #[test]
    fn test_explicit_feature_grant_below_min_plan() {
        let snapshot = snapshot(PlanTier::Free, vec![FeatureKey::AuditLog], vec![]);
        assert!(feature_allowed(&snapshot, PolicyTable::standard(), &FeatureKey::AuditLog));
    }

    #[test]
    fn test_capability_ignores_plan() {
        let policy = PolicyTable::standard();
        for plan in PlanTier::ALL {
            let without = snapshot(plan, vec![], vec![]);
            let with = snapshot(plan, vec![], vec![CapabilityKey::FeesRefund]);
            let requirement = Requirement::capability(CapabilityKey::FeesRefund);

            assert!(!evaluate(&without, policy, &requirement).allowed);
            assert!(evaluate(&with, policy, &requirement).allowed);
        }
    }

    #[test]
    fn test_capability_only_denial_has_permission_hint() {
        let snapshot = snapshot(PlanTier::Enterprise, vec![], vec![]);
        let decision = evaluate(
            &snapshot,
            PolicyTable::standard(),
            &Requirement::capability(CapabilityKey::RolesAssign),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.upgrade_to, None);
        assert_eq!(
            decision.hint.as_deref(),
            Some("Requires the roles.assign permission")
        );
    }

    #[test]
    fn test_fields_combine_with_and() {
        let snapshot = snapshot(PlanTier::Scale, vec![], vec![]);
        let requirement = Requirement::feature(FeatureKey::AnalyticsView)
            .and_capability(CapabilityKey::ReportsExport);
        let decision = evaluate(&snapshot, PolicyTable::standard(), &requirement);

        assert!(!decision.allowed);
        assert_eq!(
            decision.denials,
            vec![Denial::Capability {
                capability: CapabilityKey::ReportsExport
            }]
        );
    }

    #[test]
    fn test_hint_uses_highest_failed_tier() {
        let snapshot = snapshot(PlanTier::Free, vec![], vec![]);
        let requirement = Requirement::feature(FeatureKey::FeesManage).and_plan(PlanTier::Scale);
        let decision = evaluate(&snapshot, PolicyTable::standard(), &requirement);
        assert_eq!(decision.hint.as_deref(), Some("Requires SCALE plan"));
    }

    #[test]
    fn test_unknown_feature_is_allowed_on_free() {
        let snapshot = snapshot(PlanTier::Free, vec![], vec![]);
        let affordance = feature_gate(
            &snapshot,
            PolicyTable::standard(),
            &FeatureKey::from("library.loans"),
        );
        assert!(affordance.is_enabled());
    }

    #[test]
    fn test_uninitialized_snapshot_is_pending_not_denied() {
        let snapshot = EntitlementSnapshot::uninitialized();
        let policy = PolicyTable::standard();

        assert_eq!(feature_gate(&snapshot, policy, &FeatureKey::SsoSaml), Affordance::Pending);
        assert_eq!(
            capability_gate(&snapshot, policy, &CapabilityKey::FeesRefund),
            Affordance::Pending
        );
    }

    #[test]
    fn test_disabled_affordance_renders_locked_content() {
        let snapshot = snapshot(PlanTier::Starter, vec![], vec![]);
        let affordance = feature_gate(&snapshot, PolicyTable::standard(), &FeatureKey::AuditLog);

        let rendered = affordance.render(|| "audit table".to_string(), |hint| format!("locked: {}", hint));
        assert_eq!(rendered.as_deref(), Some("locked: Requires ENTERPRISE plan"));
        assert_eq!(Affordance::Pending.render(|| 1, |_| 0), None);
    }
}
