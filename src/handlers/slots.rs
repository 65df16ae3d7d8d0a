use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateForDoctorRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub appointment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub blocked: bool,
    pub reason: Option<String>,
}

pub async fn get_slots(
    _actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<SlotQuery>,
) -> Result<HttpResponse, AppError> {
    let slots = state
        .slots
        .list_for_doctor(query.doctor_id, query.date)
        .await?;
    Ok(ApiResponse::ok(slots))
}

pub async fn generate_slots(
    actor: Actor,
    state: web::Data<AppState>,
    body: web::Json<GenerateForDoctorRequest>,
) -> Result<HttpResponse, AppError> {
    actor.requires_owner_or_admin(body.doctor_id)?;
    let slots = state
        .generator
        .generate_for_doctor(body.doctor_id, body.date)
        .await?;
    Ok(ApiResponse::ok(slots))
}

pub async fn book_slot(
    _actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let slot = state
        .slots
        .book(path.into_inner(), body.appointment_id)
        .await?;
    Ok(ApiResponse::ok(slot))
}

pub async fn cancel_booking(
    _actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let slot = state
        .slots
        .cancel_booking(path.into_inner(), body.appointment_id)
        .await?;
    Ok(ApiResponse::ok(slot))
}

pub async fn toggle_block(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<BlockRequest>,
) -> Result<HttpResponse, AppError> {
    let BlockRequest { blocked, reason } = body.into_inner();
    let slot = state
        .slots
        .toggle_block(&actor, path.into_inner(), blocked, reason)
        .await?;
    Ok(ApiResponse::ok(slot))
}
