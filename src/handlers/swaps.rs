use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{AdminDecision, PartnerResponse, ShiftSwapInput, SwapStatus};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuery {
    pub staff_id: Option<Uuid>,
    pub status: Option<SwapStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SwapResponseRequest {
    pub decision: PartnerResponse,
}

#[derive(Debug, Deserialize)]
pub struct SwapDecisionRequest {
    pub decision: AdminDecision,
    pub comment: Option<String>,
}

pub async fn create_swap(
    actor: Actor,
    state: web::Data<AppState>,
    input: web::Json<ShiftSwapInput>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.swaps.create(&actor, input.into_inner()).await?;
    let swap = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::created(swap))
}

pub async fn get_swaps(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<SwapQuery>,
) -> Result<HttpResponse, AppError> {
    let swaps = state
        .swaps
        .list(&actor, query.staff_id, query.status)
        .await?;
    Ok(ApiResponse::ok(swaps))
}

pub async fn get_swap(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let swap = state.swaps.get(&actor, path.into_inner()).await?;
    Ok(ApiResponse::ok(swap))
}

pub async fn respond_to_swap(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SwapResponseRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .swaps
        .partner_respond(&actor, path.into_inner(), body.decision)
        .await?;
    let swap = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::ok(swap))
}

pub async fn decide_swap(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SwapDecisionRequest>,
) -> Result<HttpResponse, AppError> {
    let SwapDecisionRequest { decision, comment } = body.into_inner();
    let outcome = state
        .swaps
        .admin_decide(&actor, path.into_inner(), decision, comment)
        .await?;
    let decided = state.notifier.deliver(outcome).await;
    Ok(ApiResponse::ok(decided))
}
