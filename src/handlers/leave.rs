use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{LeaveDecision, LeaveRequestInput, LeaveStatus};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQuery {
    pub staff_id: Option<Uuid>,
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveVerdict {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessLeaveRequest {
    pub decision: LeaveVerdict,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelLeaveRequest {
    pub reason: Option<String>,
}

pub async fn submit_leave(
    actor: Actor,
    state: web::Data<AppState>,
    input: web::Json<LeaveRequestInput>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.leave.submit(&actor, input.into_inner()).await?;
    let request = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::created(request))
}

pub async fn get_leave_requests(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<LeaveQuery>,
) -> Result<HttpResponse, AppError> {
    let requests = state
        .leave
        .list(&actor, query.staff_id, query.status)
        .await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn get_leave_request(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let request = state.leave.get(&actor, path.into_inner()).await?;
    Ok(ApiResponse::ok(request))
}

pub async fn process_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ProcessLeaveRequest>,
) -> Result<HttpResponse, AppError> {
    let ProcessLeaveRequest {
        decision,
        rejection_reason,
    } = body.into_inner();
    let decision = match decision {
        LeaveVerdict::Approved => LeaveDecision::Approve,
        LeaveVerdict::Rejected => LeaveDecision::Reject {
            reason: rejection_reason,
        },
    };

    let outcome = state
        .leave
        .process(&actor, path.into_inner(), decision)
        .await?;
    let processed = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::ok(processed))
}

pub async fn cancel_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: Option<web::Json<CancelLeaveRequest>>,
) -> Result<HttpResponse, AppError> {
    let reason = body.and_then(|b| b.into_inner().reason);
    let outcome = state
        .leave
        .cancel(&actor, path.into_inner(), reason)
        .await?;
    let cancelled = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::ok(cancelled))
}
