//! Feature to minimum plan policy.
//!
//! Keys with no authored entry resolve to the fallback tier, which is the
//! lowest tier unless configured otherwise. A feature nobody has written a
//! policy for is therefore visible on every plan.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::models::{FeatureKey, PlanTier};

lazy_static! {
    static ref STANDARD_POLICY: PolicyTable = PolicyTable::new(vec![
        (FeatureKey::DashboardView, PlanTier::Free),
        (FeatureKey::StudentsView, PlanTier::Free),
        (FeatureKey::StudentsManage, PlanTier::Free),
        (FeatureKey::CoursesView, PlanTier::Free),
        (FeatureKey::CoursesManage, PlanTier::Starter),
        (FeatureKey::AttendanceTrack, PlanTier::Starter),
        (FeatureKey::FeesManage, PlanTier::Starter),
        (FeatureKey::AdmissionsManage, PlanTier::Growth),
        (FeatureKey::AnalyticsView, PlanTier::Growth),
        (FeatureKey::ReportsExport, PlanTier::Growth),
        (FeatureKey::CommunicationsBulk, PlanTier::Growth),
        (FeatureKey::TimetableAuto, PlanTier::Scale),
        (FeatureKey::IntegrationsApi, PlanTier::Scale),
        (FeatureKey::BrandingCustom, PlanTier::Scale),
        (FeatureKey::AuditLog, PlanTier::Enterprise),
        (FeatureKey::SsoSaml, PlanTier::Enterprise),
        (FeatureKey::MultiCampus, PlanTier::Enterprise),
    ]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    min_plan: HashMap<FeatureKey, PlanTier>,
    fallback: PlanTier,
}

impl PolicyTable {
    pub fn new(entries: impl IntoIterator<Item = (FeatureKey, PlanTier)>) -> Self {
        Self {
            min_plan: entries.into_iter().collect(),
            fallback: PlanTier::lowest(),
        }
    }

    /// Built-in policy of the application
    pub fn standard() -> &'static PolicyTable {
        &STANDARD_POLICY
    }

    /// Tier used for keys without an authored entry
    pub fn with_fallback(mut self, fallback: PlanTier) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replace or add entries on top of this table
    pub fn with_overrides(
        mut self,
        overrides: impl IntoIterator<Item = (FeatureKey, PlanTier)>,
    ) -> Self {
        self.min_plan.extend(overrides);
        self
    }

    pub fn fallback(&self) -> PlanTier {
        self.fallback
    }

    pub fn min_plan_for_feature(&self, feature: &FeatureKey) -> PlanTier {
        match self.min_plan.get(feature) {
            Some(plan) => *plan,
            None => {
                tracing::debug!(
                    feature = %feature,
                    fallback = %self.fallback,
                    "No policy entry for feature, using fallback tier"
                );
                self.fallback
            }
        }
    }

    pub fn is_authored(&self, feature: &FeatureKey) -> bool {
        self.min_plan.contains_key(feature)
    }

    /// Authored features available on `plan`, ordered by tier then key
    pub fn features_for_plan(&self, plan: PlanTier) -> Vec<FeatureKey> {
        self.sorted_entries()
            .into_iter()
            .filter(|(_, min)| *min <= plan)
            .map(|(feature, _)| feature)
            .collect()
    }

    /// Authored features whose minimum tier is exactly `plan`
    pub fn features_introduced_at(&self, plan: PlanTier) -> Vec<FeatureKey> {
        self.sorted_entries()
            .into_iter()
            .filter(|(_, min)| *min == plan)
            .map(|(feature, _)| feature)
            .collect()
    }

    fn sorted_entries(&self) -> Vec<(FeatureKey, PlanTier)> {
        let mut entries: Vec<(FeatureKey, PlanTier)> = self
            .min_plan
            .iter()
            .map(|(feature, plan)| (feature.clone(), *plan))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard().clone()
    }
}
