//! External Service Connectors
//!
//! All calls to the user service (entitlements, profiles, tenant memberships)
//! go through the `UserServiceConnector` trait so that the gating services
//! never depend on HTTP details and can run against the in-memory mock.
//!
//! ## Testing
//!
//! ```ignore
//! #[tokio::test]
//! async fn test_resolve_without_http() {
//!     let connector = Arc::new(MockUserServiceConnector::new());
//!     let resolver = EntitlementResolver::new(connector, sessions, ResolvePolicy::default());
//! }
//! ```

pub mod config;
pub mod errors;
pub mod user_service;

pub use config::{ConnectorConfig, UserServiceConfig};
pub use errors::ConnectorError;
pub use user_service::{
    EntitlementPayload, TenantRepairResponse, UserServiceClient, UserServiceConnector,
};

pub use user_service::init as init_user_service;
