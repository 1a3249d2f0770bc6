use actix_web::dev::Payload;
use actix_web::{http::header, web, Error, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::helpers::JsonResponse;
use crate::services::{AccessContext, SessionRegistry};

pub const NO_SESSION: &str = "Session is not established";

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Result<&str, String> {
    let parts: Vec<&str> = authorization.split_whitespace().collect();
    if parts.len() != 2 {
        return Err("Invalid Authorization header format".to_string());
    }
    if parts[0] != "Bearer" {
        return Err("Expected Bearer scheme in Authorization header".to_string());
    }
    Ok(parts[1])
}

fn token_from_request(req: &HttpRequest) -> Result<String, String> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?
        .to_str()
        .map_err(|err| err.to_string())?;
    extract_bearer_token(authorization).map(str::to_string)
}

/// Bearer token issued by the identity layer
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl FromRequest for BearerToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(token_from_request(req).map(BearerToken).map_err(|err| {
            tracing::debug!("Rejecting request without bearer token: {}", err);
            JsonResponse::<()>::build().unauthorized(&err)
        }))
    }
}

/// Access context bound to the request's bearer token
pub struct Authorized {
    pub token: String,
    pub context: Arc<AccessContext>,
}

impl FromRequest for Authorized {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let unauthorized = || JsonResponse::<()>::build().unauthorized(NO_SESSION);

        let result = token_from_request(req)
            .map_err(|_| unauthorized())
            .and_then(|token| {
                let registry = req
                    .app_data::<web::Data<SessionRegistry>>()
                    .ok_or_else(|| {
                        tracing::error!("SessionRegistry is not registered as app data");
                        JsonResponse::<()>::build()
                            .error(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, "")
                    })?;
                registry
                    .get(&token)
                    .map(|context| Authorized { token, context })
                    .ok_or_else(unauthorized)
            });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Ok("abc.def"));
        assert!(extract_bearer_token("Basic abc").is_err());
        assert!(extract_bearer_token("Bearer").is_err());
        assert!(extract_bearer_token("Bearer a b").is_err());
    }
}
