use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    Notification, Overtime, OvertimeDecision, OvertimeInput, OvertimeStatus, TimeSlot,
};
use crate::database::repositories::{OvertimeRepository, ShiftRepository, SlotRepository};
use crate::error::AppError;
use crate::services::auth::Actor;
use crate::services::notifier::Outcome;
use crate::services::slot_generator::SlotGenerator;

const WITHDRAWN_EXTENSION_REASON: &str = "Overtime not approved";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeDecided {
    pub overtime: Overtime,
    pub created_slots: Vec<TimeSlot>,
}

#[derive(Clone)]
pub struct OvertimeCoordinator {
    overtime: Arc<dyn OvertimeRepository>,
    shifts: Arc<dyn ShiftRepository>,
    slots: Arc<dyn SlotRepository>,
    generator: SlotGenerator,
}

impl OvertimeCoordinator {
    pub fn new(
        overtime: Arc<dyn OvertimeRepository>,
        shifts: Arc<dyn ShiftRepository>,
        slots: Arc<dyn SlotRepository>,
    ) -> Self {
        let generator = SlotGenerator::new(shifts.clone(), slots.clone());
        Self {
            overtime,
            shifts,
            slots,
            generator,
        }
    }

    async fn load(&self, overtime_id: Uuid) -> Result<Overtime, AppError> {
        self.overtime.find_by_id(overtime_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Overtime request {} not found", overtime_id))
        })
    }

    pub async fn create(
        &self,
        actor: &Actor,
        input: OvertimeInput,
    ) -> Result<Outcome<Overtime>, AppError> {
        actor.requires_staff()?;
        input.validate()?;

        let shift = self
            .shifts
            .find_by_id(input.shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", input.shift_id)))?;
        if shift.staff_id != actor.id {
            return Err(AppError::PermissionDenied(
                "Overtime can only be requested on your own shift".to_string(),
            ));
        }
        if !shift.is_active {
            return Err(AppError::BusinessRule(format!(
                "Shift {} is no longer active",
                shift.id
            )));
        }
        if !shift.runs_on(input.date) {
            return Err(AppError::BusinessRule(format!(
                "Shift {} does not run on {}",
                shift.id, input.date
            )));
        }

        let overtime = self.overtime.create(actor.id, &input).await?;
        log::info!(
            "Overtime {} requested by {}: {}h on {}",
            overtime.id,
            overtime.doctor_id,
            overtime.hours,
            overtime.overtime_date
        );

        let notifications = vec![Notification::new(
            overtime.doctor_id,
            format!(
                "Your request for {}h overtime on {} was submitted",
                overtime.hours, overtime.overtime_date
            ),
        )];
        Ok(Outcome::new(overtime, notifications))
    }

    /// Approval appends extension slots after the shift's end on the
    /// overtime date; slots that already exist are left alone.
    pub async fn update_status(
        &self,
        actor: &Actor,
        overtime_id: Uuid,
        decision: OvertimeDecision,
        comment: Option<String>,
    ) -> Result<Outcome<OvertimeDecided>, AppError> {
        actor.requires_admin()?;
        let overtime = self.load(overtime_id).await?;
        let next = overtime.decide(decision, actor.id, comment, Utc::now())?;

        let mut created_slots = Vec::new();
        if next.status == OvertimeStatus::Approved {
            let shift = self
                .shifts
                .find_by_id(next.shift_id)
                .await?
                .filter(|shift| shift.is_active)
                .ok_or_else(|| {
                    AppError::BusinessRule(format!(
                        "Shift {} is no longer active",
                        next.shift_id
                    ))
                })?;
            created_slots = self
                .generator
                .append_extension(&shift, next.overtime_date, next.extension_minutes())
                .await?;
            log::info!(
                "Overtime {}: {} extension slots added on {}",
                next.id,
                created_slots.len(),
                next.overtime_date
            );
        }

        let Some(stored) = self
            .overtime
            .update_status(&next, OvertimeStatus::Pending)
            .await?
        else {
            self.withdraw(&created_slots).await?;
            return Err(AppError::BusinessRule(format!(
                "Overtime request {} was changed by someone else",
                overtime_id
            )));
        };
        log::info!("Overtime {} {}", stored.id, stored.status);

        let notifications = vec![Notification::new(
            stored.doctor_id,
            format!(
                "Your {}h overtime on {} was {}{}",
                stored.hours,
                stored.overtime_date,
                stored.status,
                stored
                    .decision_comment
                    .as_ref()
                    .map_or(String::new(), |comment| format!(": {}", comment))
            ),
        )];
        Ok(Outcome::new(
            OvertimeDecided {
                overtime: stored,
                created_slots,
            },
            notifications,
        ))
    }

    /// Slots are never deleted, so extension slots of a lost approval are blocked.
    async fn withdraw(&self, slots: &[TimeSlot]) -> Result<(), AppError> {
        for slot in slots {
            self.slots
                .set_block(slot.id, Some(WITHDRAWN_EXTENSION_REASON.to_string()))
                .await?;
        }
        Ok(())
    }

    pub async fn get(&self, actor: &Actor, overtime_id: Uuid) -> Result<Overtime, AppError> {
        let overtime = self.load(overtime_id).await?;
        actor.requires_owner_or_admin(overtime.doctor_id)?;
        Ok(overtime)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        doctor_id: Option<Uuid>,
        status: Option<OvertimeStatus>,
    ) -> Result<Vec<Overtime>, AppError> {
        let scope = if actor.is_admin() {
            doctor_id
        } else {
            Some(actor.id)
        };
        Ok(self.overtime.list(scope, status).await?)
    }
}
