use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription plan tier.
///
/// Variant order is the tier order, so the derived `Ord` is the plan ordering
/// used everywhere a minimum plan is compared (`free < starter < growth <
/// scale < enterprise`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Growth,
    Scale,
    Enterprise,
}

impl PlanTier {
    pub const ALL: [PlanTier; 5] = [
        PlanTier::Free,
        PlanTier::Starter,
        PlanTier::Growth,
        PlanTier::Scale,
        PlanTier::Enterprise,
    ];

    pub const fn lowest() -> Self {
        PlanTier::Free
    }

    pub const fn highest() -> Self {
        PlanTier::Enterprise
    }

    /// Position of the tier in [`PlanTier::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Growth => "growth",
            PlanTier::Scale => "scale",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// Uppercase label used in upgrade hints ("Requires GROWTH plan")
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// True when this tier is at or above `needed`
    pub fn satisfies(self, needed: PlanTier) -> bool {
        self >= needed
    }

    /// Parse a plan name coming from the backend.
    /// Unrecognised names fall back to the lowest tier.
    pub fn from_backend(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(plan = %value, "Unknown plan tier from backend, using free");
            PlanTier::lowest()
        })
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan tier: {0}")]
pub struct UnknownPlanTier(pub String);

impl FromStr for PlanTier {
    type Err = UnknownPlanTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "starter" => Ok(PlanTier::Starter),
            "growth" => Ok(PlanTier::Growth),
            "scale" => Ok(PlanTier::Scale),
            "enterprise" => Ok(PlanTier::Enterprise),
            _ => Err(UnknownPlanTier(s.to_string())),
        }
    }
}
