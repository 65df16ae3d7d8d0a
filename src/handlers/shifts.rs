use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{ShiftInput, ShiftPatch};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftQuery {
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateForShiftRequest {
    pub date: NaiveDate,
}

pub async fn create_shift(
    actor: Actor,
    state: web::Data<AppState>,
    input: web::Json<ShiftInput>,
) -> Result<HttpResponse, AppError> {
    let shift = state.shifts.create(&actor, input.into_inner()).await?;
    Ok(ApiResponse::created(shift))
}

pub async fn get_shifts(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<ShiftQuery>,
) -> Result<HttpResponse, AppError> {
    let shifts = state.shifts.list(&actor, query.staff_id).await?;
    Ok(ApiResponse::ok(shifts))
}

pub async fn get_shift(
    _actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shift = state.shifts.get(path.into_inner()).await?;
    Ok(ApiResponse::ok(shift))
}

pub async fn update_shift(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    patch: web::Json<ShiftPatch>,
) -> Result<HttpResponse, AppError> {
    let shift = state
        .shifts
        .update(&actor, path.into_inner(), patch.into_inner())
        .await?;
    Ok(ApiResponse::ok(shift))
}

pub async fn delete_shift(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shift = state.shifts.delete(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(shift),
        "Shift deleted and its future slots blocked",
    )))
}

/// Generates (or returns the existing) slots of one shift on a date.
pub async fn generate_shift_slots(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<GenerateForShiftRequest>,
) -> Result<HttpResponse, AppError> {
    let shift = state.shifts.get(path.into_inner()).await?;
    actor.requires_owner_or_admin(shift.staff_id)?;
    let slots = state.generator.generate_for_shift(shift.id, body.date).await?;
    Ok(ApiResponse::ok(slots))
}
