use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::fmt;

use super::{CapabilityKey, FeatureKey, PlanTier};

/// Gating requirement. Every field that is set must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<FeatureKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityKey>,
    // config-rs lowercases keys read from configuration files
    #[serde(default, alias = "neededplan", skip_serializing_if = "Option::is_none")]
    pub needed_plan: Option<PlanTier>,
}

impl Requirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn feature(feature: impl Into<FeatureKey>) -> Self {
        Self::none().and_feature(feature)
    }

    pub fn capability(capability: impl Into<CapabilityKey>) -> Self {
        Self::none().and_capability(capability)
    }

    pub fn plan(plan: PlanTier) -> Self {
        Self::none().and_plan(plan)
    }

    pub fn and_feature(mut self, feature: impl Into<FeatureKey>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn and_capability(mut self, capability: impl Into<CapabilityKey>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn and_plan(mut self, plan: PlanTier) -> Self {
        self.needed_plan = Some(plan);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.feature.is_none() && self.capability.is_none() && self.needed_plan.is_none()
    }
}

/// Identifier of a lazily loaded page bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(pub String);

impl ModuleKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requirement bundle attached to a protected route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequirement {
    #[serde(default, alias = "modulekey", skip_serializing_if = "Option::is_none")]
    pub module_key: Option<ModuleKey>,
    #[serde(flatten)]
    pub requirement: Requirement,
}

impl RouteRequirement {
    pub fn module(module_key: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            module_key: Some(ModuleKey::new(module_key)),
            requirement,
        }
    }
}

/// Route registration as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RouteDeclaration {
    #[validate(min_length = 1)]
    #[validate(pattern = r"^/")]
    pub path: String,
    #[serde(flatten)]
    pub requirement: RouteRequirement,
}
