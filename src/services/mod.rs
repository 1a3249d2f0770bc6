pub mod access_context;
pub mod entitlement_resolver;
pub mod gating;
pub mod onboarding_gate;
pub mod route_guard;
pub mod session_registry;
pub mod session_store;
pub mod tenant_diagnostics;

pub use access_context::{AccessCheck, AccessContext};
pub use entitlement_resolver::{EntitlementResolver, ResolvePolicy};
pub use gating::{AccessDecision, Affordance, Denial};
pub use onboarding_gate::{
    GateState, NavigationMode, NavigationOutcome, Navigator, OnboardingGate, OnboardingGateConfig,
    RecordingNavigator, SatisfiedReason,
};
pub use route_guard::{GuardOutcome, RouteGuard, RouteTable, RouteTableError};
pub use session_registry::{AccessContextFactory, SessionRegistry};
pub use session_store::{InMemorySessionStore, SessionStore};
pub use tenant_diagnostics::{RepairOutcome, TenantDiagnostics, TenantReport};
