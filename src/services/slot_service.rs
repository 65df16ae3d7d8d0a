use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::TimeSlot;
use crate::database::repositories::SlotRepository;
use crate::error::AppError;
use crate::services::auth::Actor;

/// Entry points of the slot booking state machine. The appointment module
/// couples to the schedule only through `book` and `cancel_booking`.
#[derive(Clone)]
pub struct SlotService {
    slots: Arc<dyn SlotRepository>,
}

impl SlotService {
    pub fn new(slots: Arc<dyn SlotRepository>) -> Self {
        Self { slots }
    }

    pub async fn get(&self, slot_id: Uuid) -> Result<TimeSlot, AppError> {
        self.slots
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppError> {
        Ok(self.slots.find_by_doctor_and_date(doctor_id, date).await?)
    }

    /// Books one place on the slot. Fails if the slot is blocked, full, or
    /// already holds the appointment.
    pub async fn book(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<TimeSlot, AppError> {
        if let Some(slot) = self.slots.book(slot_id, appointment_id).await? {
            log::info!(
                "Appointment {} booked on slot {} ({}/{})",
                appointment_id,
                slot.id,
                slot.booked_count,
                slot.max_patients
            );
            return Ok(slot);
        }

        // The conditional update refused; replay it locally to report why
        let mut probe = self.get(slot_id).await?;
        probe.book(appointment_id, Utc::now())?;
        Err(AppError::BusinessRule(format!(
            "Slot {} changed while booking; retry",
            slot_id
        )))
    }

    /// Releases the appointment's place. Cancelling an appointment that is
    /// not booked on the slot leaves it unchanged.
    pub async fn cancel_booking(
        &self,
        slot_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<TimeSlot, AppError> {
        let slot = self
            .slots
            .cancel_booking(slot_id, appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        log::info!(
            "Appointment {} released from slot {} ({}/{})",
            appointment_id,
            slot.id,
            slot.booked_count,
            slot.max_patients
        );
        Ok(slot)
    }

    /// Manual block or unblock by the staff member who owns the slot.
    pub async fn toggle_block(
        &self,
        actor: &Actor,
        slot_id: Uuid,
        blocked: bool,
        reason: Option<String>,
    ) -> Result<TimeSlot, AppError> {
        let slot = self.get(slot_id).await?;
        actor.requires_owner(slot.doctor_id)?;

        let reason = if blocked {
            let reason = reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "Blocked by staff".to_string());
            Some(reason)
        } else {
            None
        };
        let slot = self
            .slots
            .set_block(slot_id, reason)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        log::info!(
            "Slot {} {} by {}",
            slot.id,
            if slot.is_blocked { "blocked" } else { "unblocked" },
            actor.id
        );
        Ok(slot)
    }
}
