use crate::helpers::{Authorized, JsonResponse};
use crate::models::{EntitlementSnapshot, FeatureKey, Requirement};
use crate::services::GuardOutcome;
use actix_web::{get, post, web, Responder, Result};
use serde::Deserialize;

#[tracing::instrument(name = "Get entitlement snapshot.", skip(auth))]
#[get("/snapshot")]
pub async fn snapshot_handler(auth: Authorized) -> Result<impl Responder> {
    let snapshot = auth.context.snapshot();
    Ok(JsonResponse::<EntitlementSnapshot>::build()
        .set_item(snapshot.as_ref().clone())
        .ok("OK"))
}

#[tracing::instrument(name = "Refresh entitlements.", skip(auth))]
#[post("/refresh")]
pub async fn refresh_handler(auth: Authorized) -> Result<impl Responder> {
    auth.context.refresh().await;
    let snapshot = auth.context.resolver().settled().await;
    Ok(JsonResponse::<EntitlementSnapshot>::build()
        .set_item(snapshot.as_ref().clone())
        .ok("Entitlements refreshed"))
}

#[tracing::instrument(name = "Check access requirement.", skip(auth))]
#[post("/check")]
pub async fn check_handler(
    auth: Authorized,
    requirement: web::Json<Requirement>,
) -> Result<impl Responder> {
    let check = auth.context.check(&requirement);
    Ok(JsonResponse::build().set_item(check).ok("OK"))
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub path: String,
}

#[tracing::instrument(name = "Guard route.", skip(auth))]
#[get("/route")]
pub async fn route_handler(
    auth: Authorized,
    query: web::Query<RouteQuery>,
) -> Result<impl Responder> {
    if !query.path.starts_with('/') {
        return Err(JsonResponse::<GuardOutcome>::build().bad_request("path must start with '/'"));
    }
    let outcome = auth.context.route(&query.path);
    Ok(JsonResponse::build().set_item(outcome).ok("OK"))
}

#[tracing::instrument(name = "List plan features.", skip(auth))]
#[get("/features")]
pub async fn features_handler(auth: Authorized) -> Result<impl Responder> {
    let features = auth.context.plan_features();
    Ok(JsonResponse::<FeatureKey>::build()
        .set_list(features)
        .ok("OK"))
}
