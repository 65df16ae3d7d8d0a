use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    CoverageStatus, CoveringStaff, LeaveDecision, LeaveRequest, LeaveRequestInput, LeaveStatus,
    Notification,
};
use crate::database::repositories::{
    BlockOutcome, DateOutcome, LeaveRepository, SlotRepository, StaffDirectory,
};
use crate::error::AppError;
use crate::services::auth::Actor;
use crate::services::notifier::Outcome;

/// How approval treats slots that already carry bookings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeavePolicy {
    /// Block booked slots too. When off, booked slots stay open and are
    /// reported back so the patients can be rescheduled first.
    pub block_booked_slots: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveProcessed {
    pub request: LeaveRequest,
    pub blocked_slots: Vec<BlockOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveCancelled {
    pub request: LeaveRequest,
    pub unblocked_slots: Vec<DateOutcome>,
}

#[derive(Clone)]
pub struct LeaveCoordinator {
    leave: Arc<dyn LeaveRepository>,
    slots: Arc<dyn SlotRepository>,
    staff: Arc<dyn StaffDirectory>,
    policy: LeavePolicy,
}

impl LeaveCoordinator {
    pub fn new(
        leave: Arc<dyn LeaveRepository>,
        slots: Arc<dyn SlotRepository>,
        staff: Arc<dyn StaffDirectory>,
        policy: LeavePolicy,
    ) -> Self {
        Self {
            leave,
            slots,
            staff,
            policy,
        }
    }

    async fn load(&self, request_id: Uuid) -> Result<LeaveRequest, AppError> {
        self.leave
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave request {} not found", request_id)))
    }

    async fn notify_admins(&self, content: &str) -> Result<Vec<Notification>, AppError> {
        Ok(self
            .staff
            .list_admins()
            .await?
            .into_iter()
            .map(|admin| Notification::new(admin.id, content))
            .collect())
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        input: LeaveRequestInput,
    ) -> Result<Outcome<LeaveRequest>, AppError> {
        actor.requires_staff()?;
        input.validate()?;

        let request = self
            .leave
            .create_if_no_overlap(actor.id, &input)
            .await?
            .ok_or_else(|| {
                AppError::BusinessRule(format!(
                    "A pending or approved leave request already covers part of {} to {}",
                    input.start_date, input.end_date
                ))
            })?;
        log::info!(
            "Leave request {} submitted by {} for {} to {}",
            request.id,
            request.staff_id,
            request.start_date,
            request.end_date
        );

        let notifications = self
            .notify_admins(&format!(
                "{}{} leave requested from {} to {}",
                if request.is_emergency { "Emergency: " } else { "" },
                request.leave_type,
                request.start_date,
                request.end_date
            ))
            .await?;
        Ok(Outcome::new(request, notifications))
    }

    /// Approves or rejects a pending request. Approval blocks the
    /// requester's slots on every date of the leave before the status is
    /// stored, so a failed call can simply be repeated.
    pub async fn process(
        &self,
        actor: &Actor,
        request_id: Uuid,
        decision: LeaveDecision,
    ) -> Result<Outcome<LeaveProcessed>, AppError> {
        actor.requires_admin()?;
        let request = self.load(request_id).await?;
        let next = request.clone().decide(decision, actor.id, Utc::now())?;

        let mut blocked_slots = Vec::new();
        if next.status == LeaveStatus::Approved {
            blocked_slots = self
                .slots
                .block_range(
                    next.staff_id,
                    &next.dates(),
                    &next.block_reason(),
                    self.policy.block_booked_slots,
                )
                .await?;
            for outcome in &blocked_slots {
                log::info!(
                    "Leave {}: blocked {} slots of {} on {}",
                    next.id,
                    outcome.blocked,
                    next.staff_id,
                    outcome.date
                );
                if !outcome.skipped_booked.is_empty() {
                    log::warn!(
                        "Leave {}: {} booked slots on {} left open: {:?}",
                        next.id,
                        outcome.skipped_booked.len(),
                        outcome.date,
                        outcome.skipped_booked
                    );
                }
            }
        }

        let Some(stored) = self.leave.update_status(&next, LeaveStatus::Pending).await? else {
            self.undo_lost_approval(&next).await?;
            return Err(AppError::BusinessRule(format!(
                "Leave request {} was changed by someone else",
                request_id
            )));
        };
        log::info!("Leave request {} {}", stored.id, stored.status);

        let content = match stored.status {
            LeaveStatus::Approved => format!(
                "Your {} leave from {} to {} was approved",
                stored.leave_type, stored.start_date, stored.end_date
            ),
            _ => format!(
                "Your {} leave from {} to {} was rejected{}",
                stored.leave_type,
                stored.start_date,
                stored.end_date,
                stored
                    .rejection_reason
                    .as_ref()
                    .map_or(String::new(), |reason| format!(": {}", reason))
            ),
        };
        let notifications = vec![Notification::new(stored.staff_id, content)];
        Ok(Outcome::new(
            LeaveProcessed {
                request: stored,
                blocked_slots,
            },
            notifications,
        ))
    }

    /// Releases blocks placed by an approval whose status write lost a race,
    /// unless a concurrent approval now owns them.
    async fn undo_lost_approval(&self, attempted: &LeaveRequest) -> Result<(), AppError> {
        if attempted.status != LeaveStatus::Approved {
            return Ok(());
        }
        let current = self.load(attempted.id).await?;
        if current.status != LeaveStatus::Approved {
            self.slots
                .unblock_range(
                    attempted.staff_id,
                    &attempted.dates(),
                    &attempted.block_reason(),
                )
                .await?;
        }
        Ok(())
    }

    /// Cancels a pending or approved request. Cancelling an approved request
    /// unblocks exactly the slots its approval blocked.
    pub async fn cancel(
        &self,
        actor: &Actor,
        request_id: Uuid,
        reason: Option<String>,
    ) -> Result<Outcome<LeaveCancelled>, AppError> {
        let request = self.load(request_id).await?;
        actor.requires_owner_or_admin(request.staff_id)?;
        let next = request.clone().cancel(actor.id, reason, Utc::now())?;

        let mut unblocked_slots = Vec::new();
        if request.status == LeaveStatus::Approved {
            unblocked_slots = self
                .slots
                .unblock_range(request.staff_id, &request.dates(), &request.block_reason())
                .await?;
            for outcome in &unblocked_slots {
                log::info!(
                    "Leave {}: unblocked {} slots of {} on {}",
                    request.id,
                    outcome.affected,
                    request.staff_id,
                    outcome.date
                );
            }
        }

        // Approved only ever moves to cancelled, so a lost race here means
        // another cancel already released the same slots
        let stored = self
            .leave
            .update_status(&next, request.status)
            .await?
            .ok_or_else(|| {
                AppError::BusinessRule(format!(
                    "Leave request {} was changed by someone else",
                    request_id
                ))
            })?;
        log::info!("Leave request {} cancelled by {}", stored.id, actor.id);

        let content = format!(
            "{} leave from {} to {} was cancelled",
            stored.leave_type, stored.start_date, stored.end_date
        );
        let notifications = if actor.id == stored.staff_id {
            match stored.approver_id {
                Some(approver) => vec![Notification::new(approver, content)],
                None => self.notify_admins(&content).await?,
            }
        } else {
            vec![Notification::new(stored.staff_id, content)]
        };

        Ok(Outcome::new(
            LeaveCancelled {
                request: stored,
                unblocked_slots,
            },
            notifications,
        ))
    }

    pub async fn get(&self, actor: &Actor, request_id: Uuid) -> Result<LeaveRequest, AppError> {
        let request = self.load(request_id).await?;
        actor.requires_owner_or_admin(request.staff_id)?;
        Ok(request)
    }

    /// Staff see their own requests; admins see everyone's, optionally
    /// narrowed to one staff member.
    pub async fn list(
        &self,
        actor: &Actor,
        staff_id: Option<Uuid>,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let scope = if actor.is_admin() {
            staff_id
        } else {
            Some(actor.id)
        };
        Ok(self.leave.list(scope, status).await?)
    }

    /// Block reason of the staff member's approved leave covering `date`,
    /// if any.
    pub async fn approved_block_reason(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<String>, AppError> {
        let approved = self
            .leave
            .find_overlapping(staff_id, date, date, LeaveStatus::Approved)
            .await?;
        Ok(approved.first().map(LeaveRequest::block_reason))
    }

    /// Records `covering_id` as accepted cover on every approved leave of
    /// `staff_id` that includes `date`. Returns the number of requests touched.
    pub async fn record_cover(
        &self,
        staff_id: Uuid,
        covering_id: Uuid,
        date: NaiveDate,
    ) -> Result<usize, AppError> {
        let approved = self
            .leave
            .find_overlapping(staff_id, date, date, LeaveStatus::Approved)
            .await?;
        let entry = CoveringStaff {
            staff_id: covering_id,
            date,
            status: CoverageStatus::Accepted,
        };
        for request in &approved {
            self.leave.add_cover(request.id, &entry).await?;
            log::info!(
                "Leave {}: {} covers {} on {}",
                request.id,
                covering_id,
                staff_id,
                date
            );
        }
        Ok(approved.len())
    }
}
