pub mod auth;
pub(crate) mod json;

pub use auth::{extract_bearer_token, Authorized, BearerToken};
pub(crate) use json::JsonResponse;
