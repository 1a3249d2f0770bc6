use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;

/// Errors that can occur while talking to the user service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    /// No session credentials, or the backend rejected them as expired/invalid (401)
    #[error("No active session")]
    NoActiveSession,
    /// Credentials valid but the call is forbidden (403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Service unreachable or timeout
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Invalid response format from external service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Internal error in connector
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    /// Expired, invalid or missing credentials. Callers treat these as "no session".
    pub fn is_session_problem(&self) -> bool {
        matches!(self, Self::NoActiveSession | Self::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Map a non-success status code from the user service
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::NoActiveSession,
            403 => Self::Unauthorized(body),
            404 => Self::NotFound(body),
            502..=504 => Self::ServiceUnavailable(format!("User Service error ({}): {}", status, body)),
            _ => Self::HttpError(format!("User Service error ({}): {}", status, body)),
        }
    }
}

impl ResponseError for ConnectorError {
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::NoActiveSession => "Session is not established",
            Self::Unauthorized(_) => "Unauthorized",
            Self::NotFound(_) => "Resource not found",
            Self::HttpError(_) => "External service error",
            Self::ServiceUnavailable(_) => "Service unavailable",
            Self::InvalidResponse(_) => "Invalid external service response",
            Self::Internal(_) => "Internal error",
        };

        HttpResponse::build(self.status_code()).json(json!({
            "status": "Error",
            "code": self.status_code().as_u16(),
            "message": message,
            "details": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoActiveSession => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::HttpError(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ServiceUnavailable(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Self::ServiceUnavailable(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}
