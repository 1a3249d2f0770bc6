//! Per-page authorization.
//!
//! The guard decides whether a routed module may mount. It defers while the
//! snapshot is uninitialized and soft-locks on denial; it never sends anyone
//! to the login page.

use serde::Serialize;
use serde_valid::Validate;
use std::sync::Arc;

use crate::models::{EntitlementSnapshot, ModuleKey, PlanTier, RouteDeclaration, RouteRequirement};
use crate::policy::PolicyTable;
use crate::services::gating;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteTableError {
    #[error("route pattern must start with '/': {0}")]
    InvalidPattern(String),
    #[error("route pattern registered twice: {0}")]
    Duplicate(String),
    #[error("invalid route declaration {path}: {reason}")]
    InvalidDeclaration { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param,
}

/// Path pattern such as `/students/:id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, RouteTableError> {
        if !raw.starts_with('/') {
            return Err(RouteTableError::InvalidPattern(raw.to_string()));
        }
        let segments = split(raw)
            .map(|segment| match segment.strip_prefix(':') {
                Some(_) => Segment::Param,
                None => Segment::Static(segment.to_string()),
            })
            .collect();
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split(path).collect();
        parts.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(parts)
                .all(|(segment, part)| match segment {
                    Segment::Static(expected) => expected == part,
                    Segment::Param => !part.is_empty(),
                })
    }

    /// Number of static segments; more specific patterns win
    fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Static(_)))
            .count()
    }

    fn same_shape(&self, other: &RoutePattern) -> bool {
        self.segments == other.segments
    }
}

/// Location path without its query string or fragment
pub(crate) fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or_default()
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    strip_query(path)
        .split('/')
        .filter(|segment| !segment.is_empty())
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: RoutePattern,
    pub requirement: RouteRequirement,
}

/// Requirements registered per protected route
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_declarations(declarations: &[RouteDeclaration]) -> Result<Self, RouteTableError> {
        let mut table = Self::new();
        for declaration in declarations {
            declaration
                .validate()
                .map_err(|err| RouteTableError::InvalidDeclaration {
                    path: declaration.path.clone(),
                    reason: err.to_string(),
                })?;
            table.register(&declaration.path, declaration.requirement.clone())?;
        }
        Ok(table)
    }

    pub fn register(
        &mut self,
        pattern: &str,
        requirement: RouteRequirement,
    ) -> Result<(), RouteTableError> {
        let pattern = RoutePattern::parse(pattern)?;
        if self
            .entries
            .iter()
            .any(|entry| entry.pattern.same_shape(&pattern))
        {
            return Err(RouteTableError::Duplicate(pattern.raw));
        }
        self.entries.push(RouteEntry {
            pattern,
            requirement,
        });
        Ok(())
    }

    /// Most specific entry matching `path`
    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.pattern.matches(path))
            .max_by_key(|entry| entry.pattern.specificity())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What to mount for a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Snapshot not initialized yet: show a loading placeholder
    Loading { module_key: Option<ModuleKey> },
    /// Denied: the page stays reachable but the module is replaced by an upgrade placeholder
    Locked {
        module_key: Option<ModuleKey>,
        hint: String,
        upgrade_to: Option<PlanTier>,
    },
    Render { module_key: Option<ModuleKey> },
}

impl GuardOutcome {
    pub fn module_key(&self) -> Option<&ModuleKey> {
        match self {
            GuardOutcome::Loading { module_key }
            | GuardOutcome::Locked { module_key, .. }
            | GuardOutcome::Render { module_key } => module_key.as_ref(),
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render { .. })
    }
}

pub struct RouteGuard {
    table: RouteTable,
    policy: Arc<PolicyTable>,
}

impl RouteGuard {
    pub fn new(table: RouteTable, policy: Arc<PolicyTable>) -> Self {
        Self { table, policy }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Guard the route registered for `path`; unregistered paths render freely
    pub fn evaluate(&self, snapshot: &EntitlementSnapshot, path: &str) -> GuardOutcome {
        match self.table.lookup(path) {
            Some(entry) => self.evaluate_requirement(snapshot, &entry.requirement),
            None => self.evaluate_requirement(snapshot, &RouteRequirement::default()),
        }
    }

    pub fn evaluate_requirement(
        &self,
        snapshot: &EntitlementSnapshot,
        route: &RouteRequirement,
    ) -> GuardOutcome {
        let module_key = route.module_key.clone();
        if !snapshot.is_initialized {
            return GuardOutcome::Loading { module_key };
        }

        let decision = gating::evaluate(snapshot, &self.policy, &route.requirement);
        if decision.allowed {
            GuardOutcome::Render { module_key }
        } else {
            tracing::debug!(
                module = ?module_key,
                hint = ?decision.hint,
                "Route module locked"
            );
            GuardOutcome::Locked {
                module_key,
                hint: decision.hint.unwrap_or_default(),
                upgrade_to: decision.upgrade_to,
            }
        }
    }
}
