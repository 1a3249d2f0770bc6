use crate::helpers::{Authorized, JsonResponse};
use crate::services::{GateState, NavigationOutcome};
use actix_web::{get, post, web, Responder, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct NavigateForm {
    pub path: String,
}

/// Gate outcome plus the state the gate settled in
#[derive(Debug, Serialize)]
pub struct NavigationView {
    pub outcome: NavigationOutcome,
    pub state: GateState,
}

#[tracing::instrument(name = "Onboarding navigation.", skip(auth))]
#[post("/navigate")]
pub async fn navigate_handler(
    auth: Authorized,
    form: web::Json<NavigateForm>,
) -> Result<impl Responder> {
    if !form.path.starts_with('/') {
        return Err(JsonResponse::<NavigationView>::build().bad_request("path must start with '/'"));
    }

    let outcome = auth.context.navigate(&form.path).await;
    let view = NavigationView {
        outcome,
        state: auth.context.gate_state(),
    };
    Ok(JsonResponse::build().set_item(view).ok("OK"))
}

#[tracing::instrument(name = "Onboarding gate state.", skip(auth))]
#[get("/state")]
pub async fn state_handler(auth: Authorized) -> Result<impl Responder> {
    Ok(JsonResponse::build()
        .set_item(auth.context.gate_state())
        .ok("OK"))
}
