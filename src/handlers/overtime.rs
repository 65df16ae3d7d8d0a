use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{OvertimeDecision, OvertimeInput, OvertimeStatus};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeQuery {
    pub doctor_id: Option<Uuid>,
    pub status: Option<OvertimeStatus>,
}

#[derive(Debug, Deserialize)]
pub struct OvertimeStatusRequest {
    pub status: OvertimeDecision,
    pub comment: Option<String>,
}

pub async fn create_overtime(
    actor: Actor,
    state: web::Data<AppState>,
    input: web::Json<OvertimeInput>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.overtime.create(&actor, input.into_inner()).await?;
    let overtime = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::created(overtime))
}

pub async fn get_overtime_requests(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<OvertimeQuery>,
) -> Result<HttpResponse, AppError> {
    let requests = state
        .overtime
        .list(&actor, query.doctor_id, query.status)
        .await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn get_overtime_request(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let overtime = state.overtime.get(&actor, path.into_inner()).await?;
    Ok(ApiResponse::ok(overtime))
}

pub async fn update_overtime_status(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<OvertimeStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let OvertimeStatusRequest { status, comment } = body.into_inner();
    let outcome = state
        .overtime
        .update_status(&actor, path.into_inner(), status, comment)
        .await?;
    let decided = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::ok(decided))
}
