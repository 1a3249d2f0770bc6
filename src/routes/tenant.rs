use crate::helpers::{Authorized, JsonResponse};
use crate::services::{RepairOutcome, TenantReport};
use actix_web::{get, post, Responder, ResponseError, Result};

#[tracing::instrument(name = "Tenant membership diagnostics.", skip(auth))]
#[get("/memberships")]
pub async fn memberships_handler(auth: Authorized) -> Result<impl Responder> {
    let report = auth.context.tenant_report().await.map_err(|err| {
        JsonResponse::<TenantReport>::build().error(err.status_code(), &err.to_string())
    })?;

    let message = if report.needs_repair {
        "No active tenant membership"
    } else {
        "OK"
    };
    Ok(JsonResponse::build().set_item(report).ok(message))
}

#[tracing::instrument(name = "Repair tenant membership.", skip(auth))]
#[post("/repair")]
pub async fn repair_handler(auth: Authorized) -> Result<impl Responder> {
    let outcome = auth.context.repair_tenant().await.map_err(|err| {
        JsonResponse::<RepairOutcome>::build().error(err.status_code(), &err.to_string())
    })?;

    Ok(JsonResponse::build().set_item(outcome).ok("Tenant repair finished"))
}
