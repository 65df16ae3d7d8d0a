use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Shift, ShiftInput, ShiftPatch};
use crate::database::repositories::{ShiftRepository, SlotRepository};
use crate::error::AppError;
use crate::services::auth::Actor;

pub const SHIFT_DELETED_REASON: &str = "Shift deleted";

/// Owns shift definitions. Only the owning staff member may change a shift.
#[derive(Clone)]
pub struct ShiftRegistry {
    shifts: Arc<dyn ShiftRepository>,
    slots: Arc<dyn SlotRepository>,
}

impl ShiftRegistry {
    pub fn new(shifts: Arc<dyn ShiftRepository>, slots: Arc<dyn SlotRepository>) -> Self {
        Self { shifts, slots }
    }

    pub async fn create(&self, actor: &Actor, input: ShiftInput) -> Result<Shift, AppError> {
        actor.requires_staff()?;
        let definition = input.validate()?;
        let shift = self.shifts.create(actor.id, &definition).await?;
        log::info!("Shift {} created for staff {}", shift.id, shift.staff_id);
        Ok(shift)
    }

    pub async fn get(&self, shift_id: Uuid) -> Result<Shift, AppError> {
        self.shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", shift_id)))
    }

    /// Active shifts of one staff member, or every active shift when no
    /// staff id is given. Staff without the admin role always see their own.
    pub async fn list(&self, actor: &Actor, staff_id: Option<Uuid>) -> Result<Vec<Shift>, AppError> {
        let scope = match staff_id {
            Some(id) => Some(id),
            None if actor.is_admin() => None,
            None => Some(actor.id),
        };
        let shifts = match scope {
            Some(id) => self.shifts.find_by_staff(id).await?,
            None => self.shifts.find_active().await?,
        };
        Ok(shifts)
    }

    /// Applies a patch and re-validates the whole definition. Slots already
    /// generated keep their times.
    pub async fn update(
        &self,
        actor: &Actor,
        shift_id: Uuid,
        patch: ShiftPatch,
    ) -> Result<Shift, AppError> {
        let shift = self.get(shift_id).await?;
        actor.requires_owner(shift.staff_id)?;
        if !shift.is_active {
            return Err(AppError::BusinessRule(format!(
                "Shift {} has been deleted",
                shift.id
            )));
        }

        let definition = patch.apply_to(&shift)?;
        let updated = self
            .shifts
            .update(shift.id, &definition)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", shift_id)))?;
        log::info!("Shift {} updated", updated.id);
        Ok(updated)
    }

    /// Soft-deletes the shift and blocks its slots from today onwards.
    pub async fn delete(&self, actor: &Actor, shift_id: Uuid) -> Result<Shift, AppError> {
        let shift = self.get(shift_id).await?;
        actor.requires_owner(shift.staff_id)?;
        if !shift.is_active {
            return Err(AppError::BusinessRule(format!(
                "Shift {} has already been deleted",
                shift.id
            )));
        }

        // Blocking first keeps a retry after a failed deactivate harmless
        let today = Utc::now().date_naive();
        let blocked = self
            .slots
            .block_from_date(shift.id, today, SHIFT_DELETED_REASON)
            .await?;

        let deleted = self
            .shifts
            .deactivate(shift.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", shift_id)))?;
        log::info!(
            "Shift {} deleted; {} slots from {} blocked",
            deleted.id,
            blocked,
            today
        );
        Ok(deleted)
    }
}
