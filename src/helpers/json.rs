use actix_web::error::{Error, InternalError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::Serialize;

/// Response envelope shared by every endpoint
#[derive(Serialize)]
pub(crate) struct JsonResponse<T> {
    pub(crate) status: String,
    pub(crate) message: String,
    pub(crate) code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) list: Option<Vec<T>>,
}

pub(crate) struct JsonResponseBuilder<T> {
    item: Option<T>,
    list: Option<Vec<T>>,
}

impl<T: Serialize> JsonResponse<T> {
    pub(crate) fn build() -> JsonResponseBuilder<T> {
        JsonResponseBuilder {
            item: None,
            list: None,
        }
    }
}

impl<T: Serialize> JsonResponseBuilder<T> {
    pub(crate) fn set_item(mut self, item: T) -> Self {
        self.item = Some(item);
        self
    }

    pub(crate) fn set_list(mut self, list: Vec<T>) -> Self {
        self.list = Some(list);
        self
    }

    fn envelope(self, msg: &str, code: StatusCode) -> JsonResponse<T> {
        JsonResponse {
            status: if code.is_success() { "OK" } else { "Error" }.to_string(),
            message: msg.to_string(),
            code: code.as_u16(),
            item: self.item,
            list: self.list,
        }
    }

    pub(crate) fn ok(self, msg: &str) -> web::Json<JsonResponse<T>> {
        web::Json(self.envelope(msg, StatusCode::OK))
    }

    /// Error carrying the envelope as its response body
    pub(crate) fn error(self, code: StatusCode, msg: &str) -> Error {
        let response = HttpResponse::build(code).json(self.envelope(msg, code));
        InternalError::from_response(msg.to_string(), response).into()
    }

    pub(crate) fn bad_request(self, msg: &str) -> Error {
        self.error(StatusCode::BAD_REQUEST, msg)
    }

    pub(crate) fn unauthorized(self, msg: &str) -> Error {
        self.error(StatusCode::UNAUTHORIZED, msg)
    }
}
