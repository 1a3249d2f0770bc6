use crate::helpers::{BearerToken, JsonResponse};
use crate::models::EntitlementSnapshot;
use crate::services::SessionRegistry;
use actix_web::{delete, post, web, Responder, Result};
use serde::Deserialize;
use serde_valid::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SessionForm {
    #[validate(min_length = 1)]
    pub user_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[tracing::instrument(name = "Establish session.", skip(token, registry))]
#[post("")]
pub async fn establish_handler(
    token: BearerToken,
    form: web::Json<SessionForm>,
    registry: web::Data<SessionRegistry>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<EntitlementSnapshot>::build().bad_request(&errors.to_string()));
    }

    let form = form.into_inner();
    let (_, snapshot) = registry
        .open(&token.0, &form.user_id, form.tenant_id)
        .await;

    Ok(JsonResponse::build()
        .set_item(snapshot.as_ref().clone())
        .ok("Session established"))
}

#[tracing::instrument(name = "Sign out.", skip(token, registry))]
#[delete("")]
pub async fn sign_out_handler(
    token: BearerToken,
    registry: web::Data<SessionRegistry>,
) -> Result<impl Responder> {
    if registry.close(&token.0).await {
        Ok(JsonResponse::<()>::build().ok("Signed out"))
    } else {
        Err(JsonResponse::<()>::build().unauthorized(crate::helpers::auth::NO_SESSION))
    }
}
