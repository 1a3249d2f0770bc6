pub mod access;
pub mod health_checks;
pub mod onboarding;
pub mod session;
pub mod tenant;

pub use health_checks::*;
