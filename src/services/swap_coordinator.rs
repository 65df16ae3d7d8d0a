use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    AdminDecision, Notification, PartnerDecision, PartnerResponse, Shift, ShiftSwap,
    ShiftSwapInput, StaffProfile, SwapStatus, SwapType,
};
use crate::database::repositories::{
    DateOutcome, ShiftRepository, SlotRepository, StaffDirectory, SwapRepository,
};
use crate::error::AppError;
use crate::services::auth::Actor;
use crate::services::leave_coordinator::LeaveCoordinator;
use crate::services::notifier::Outcome;
use crate::services::slot_generator::SlotGenerator;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapDecided {
    pub swap: ShiftSwap,
    /// Original-shift slots moved from requester to partner, per date.
    pub reassigned: Vec<DateOutcome>,
    /// Requested-shift slots moved from partner to requester, per date (trades only).
    pub reassigned_back: Vec<DateOutcome>,
    /// Leave blocks lifted from slots the other party now covers.
    pub released_blocks: u64,
    pub covers_recorded: usize,
}

/// Negotiates shift swaps between two staff members and, on approval,
/// moves slot ownership across the swap's dates.
#[derive(Clone)]
pub struct SwapCoordinator {
    swaps: Arc<dyn SwapRepository>,
    shifts: Arc<dyn ShiftRepository>,
    slots: Arc<dyn SlotRepository>,
    staff: Arc<dyn StaffDirectory>,
    generator: SlotGenerator,
    leave: LeaveCoordinator,
}

impl SwapCoordinator {
    pub fn new(
        swaps: Arc<dyn SwapRepository>,
        shifts: Arc<dyn ShiftRepository>,
        slots: Arc<dyn SlotRepository>,
        staff: Arc<dyn StaffDirectory>,
        leave: LeaveCoordinator,
    ) -> Self {
        let generator = SlotGenerator::new(shifts.clone(), slots.clone());
        Self {
            swaps,
            shifts,
            slots,
            staff,
            generator,
            leave,
        }
    }

    async fn load(&self, swap_id: Uuid) -> Result<ShiftSwap, AppError> {
        self.swaps
            .find_by_id(swap_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift swap {} not found", swap_id)))
    }

    async fn profile(&self, staff_id: Uuid) -> Result<StaffProfile, AppError> {
        self.staff
            .find_by_id(staff_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", staff_id)))
    }

    async fn active_shift(&self, shift_id: Uuid) -> Result<Shift, AppError> {
        let shift = self
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", shift_id)))?;
        if !shift.is_active {
            return Err(AppError::BusinessRule(format!(
                "Shift {} is no longer active",
                shift.id
            )));
        }
        Ok(shift)
    }

    fn both_parties(swap: &ShiftSwap, content: &str) -> Vec<Notification> {
        vec![
            Notification::new(swap.requester_id, content),
            Notification::new(swap.partner_id, content),
        ]
    }

    /// Validates eligibility, ownership and the partner's availability on
    /// every date, then stores the swap with both decisions pending.
    pub async fn create(
        &self,
        actor: &Actor,
        input: ShiftSwapInput,
    ) -> Result<Outcome<ShiftSwap>, AppError> {
        actor.requires_staff()?;
        if input.reason.trim().is_empty() {
            return Err(AppError::validation("reason", "a reason is required"));
        }
        if input.partner_id == actor.id {
            return Err(AppError::validation(
                "partnerId",
                "a swap needs two different staff members",
            ));
        }
        let dates = input.date_set()?;

        let requester = self.profile(actor.id).await?;
        let partner = self.profile(input.partner_id).await?;
        if !requester.shares_unit_with(&partner) {
            return Err(AppError::BusinessRule(format!(
                "{} and {} share neither department nor specialization",
                requester.name, partner.name
            )));
        }

        let original = self.active_shift(input.original_shift_id).await?;
        if original.staff_id != requester.id {
            return Err(AppError::PermissionDenied(
                "The original shift must be your own".to_string(),
            ));
        }

        let requested = match input.swap_type {
            SwapType::Cover => None,
            SwapType::Trade => {
                let shift_id = input.requested_shift_id.ok_or_else(|| {
                    AppError::validation("requestedShiftId", "a trade needs a requested shift")
                })?;
                let shift = self.active_shift(shift_id).await?;
                if shift.staff_id != partner.id {
                    return Err(AppError::BusinessRule(format!(
                        "Shift {} does not belong to {}",
                        shift.id, partner.name
                    )));
                }
                Some(shift)
            }
        };

        let partner_shifts = self.shifts.find_by_staff(partner.id).await?;
        for date in &dates {
            if !original.runs_on(date) {
                return Err(AppError::BusinessRule(format!(
                    "Shift {} does not run on {}",
                    original.id, date
                )));
            }
            // The partner takes on the original shift that day unless it is
            // traded for the requested one
            let partner_works_requested = requested.as_ref().is_some_and(|s| s.runs_on(date));
            if !partner_works_requested {
                if let Some(clash) = partner_shifts
                    .iter()
                    .find(|shift| shift.runs_on(date) && shift.overlaps_window(&original))
                {
                    return Err(AppError::BusinessRule(format!(
                        "{} already works shift {} overlapping {} on {}",
                        partner.name, clash.id, original.id, date
                    )));
                }
            }
        }

        let swap = self.swaps.create(requester.id, &input, &dates).await?;
        log::info!(
            "Swap {} ({}) proposed by {} to {} for {} date(s)",
            swap.id,
            swap.swap_type,
            swap.requester_id,
            swap.partner_id,
            dates.len()
        );

        let notifications = vec![
            Notification::new(
                swap.partner_id,
                format!(
                    "{} proposed a {} swap of {} from {} to {}",
                    requester.name,
                    swap.swap_type,
                    original.title,
                    dates.first(),
                    dates.last()
                ),
            ),
            Notification::new(
                swap.requester_id,
                format!("Your swap proposal to {} was sent", partner.name),
            ),
        ];
        Ok(Outcome::new(swap, notifications))
    }

    /// The partner's one-time accept or decline.
    pub async fn partner_respond(
        &self,
        actor: &Actor,
        swap_id: Uuid,
        response: PartnerResponse,
    ) -> Result<Outcome<ShiftSwap>, AppError> {
        let swap = self.load(swap_id).await?;
        let next = swap.respond(actor.id, response, Utc::now())?;
        let stored = self
            .swaps
            .update_state(&next, PartnerDecision::Pending, SwapStatus::Pending)
            .await?
            .ok_or_else(|| {
                AppError::BusinessRule(format!("Shift swap {} was changed by someone else", swap_id))
            })?;
        log::info!("Swap {} {} by partner", stored.id, stored.partner_decision);

        let mut notifications = Self::both_parties(
            &stored,
            &format!("Swap {} was {} by the partner", stored.id, stored.partner_decision),
        );
        if stored.partner_decision == PartnerDecision::Accepted {
            notifications.extend(self.staff.list_admins().await?.into_iter().map(|admin| {
                Notification::new(admin.id, format!("Swap {} awaits approval", stored.id))
            }));
        }
        Ok(Outcome::new(stored, notifications))
    }

    /// Admin ruling. Approval requires the partner's acceptance and moves
    /// slot ownership before the status is stored; every step is idempotent
    /// per date, so a failed approval can be repeated.
    pub async fn admin_decide(
        &self,
        actor: &Actor,
        swap_id: Uuid,
        decision: AdminDecision,
        comment: Option<String>,
    ) -> Result<Outcome<SwapDecided>, AppError> {
        actor.requires_admin()?;
        let swap = self.load(swap_id).await?;
        let expected_partner = swap.partner_decision;
        let next = swap.decide(decision, actor.id, comment, Utc::now())?;

        let mut decided = SwapDecided {
            swap: next.clone(),
            reassigned: Vec::new(),
            reassigned_back: Vec::new(),
            released_blocks: 0,
            covers_recorded: 0,
        };
        if next.status == SwapStatus::Approved {
            self.reassign(&next, &mut decided).await?;
        }

        let Some(stored) = self
            .swaps
            .update_state(&next, expected_partner, SwapStatus::Pending)
            .await?
        else {
            self.undo_lost_approval(&next).await?;
            return Err(AppError::BusinessRule(format!(
                "Shift swap {} was changed by someone else",
                swap_id
            )));
        };
        log::info!("Swap {} {} by {}", stored.id, stored.status, actor.id);

        let notifications = Self::both_parties(
            &stored,
            &format!(
                "Swap {} was {}{}",
                stored.id,
                stored.status,
                stored
                    .decision_comment
                    .as_ref()
                    .map_or(String::new(), |comment| format!(": {}", comment))
            ),
        );
        decided.swap = stored;
        Ok(Outcome::new(decided, notifications))
    }

    async fn reassign(&self, swap: &ShiftSwap, decided: &mut SwapDecided) -> Result<(), AppError> {
        let original = self.active_shift(swap.original_shift_id).await?;
        let requested = match swap.requested_shift_id {
            Some(shift_id) if swap.swap_type == SwapType::Trade => {
                Some(self.active_shift(shift_id).await?)
            }
            _ => None,
        };

        let dates: Vec<NaiveDate> = swap.dates.iter().collect();
        for &date in &dates {
            self.generator.ensure(&original, date).await?;
            decided.released_blocks += self
                .release_leave_blocks(&original, date, swap.requester_id)
                .await?;
        }
        decided.reassigned = self
            .slots
            .reassign_range(original.id, &dates, swap.requester_id, swap.partner_id)
            .await?;
        for outcome in &decided.reassigned {
            log::info!(
                "Swap {}: {} slots of shift {} moved to {} on {}",
                swap.id,
                outcome.affected,
                original.id,
                swap.partner_id,
                outcome.date
            );
        }

        if let Some(requested) = requested {
            let trade_dates: Vec<NaiveDate> = dates
                .iter()
                .copied()
                .filter(|date| requested.runs_on(*date))
                .collect();
            for &date in &trade_dates {
                self.generator.ensure(&requested, date).await?;
                decided.released_blocks += self
                    .release_leave_blocks(&requested, date, swap.partner_id)
                    .await?;
            }
            decided.reassigned_back = self
                .slots
                .reassign_range(requested.id, &trade_dates, swap.partner_id, swap.requester_id)
                .await?;
            for outcome in &decided.reassigned_back {
                log::info!(
                    "Swap {}: {} slots of shift {} moved to {} on {}",
                    swap.id,
                    outcome.affected,
                    requested.id,
                    swap.requester_id,
                    outcome.date
                );
            }
        }

        for &date in &dates {
            decided.covers_recorded += self
                .leave
                .record_cover(swap.requester_id, swap.partner_id, date)
                .await?;
            decided.covers_recorded += self
                .leave
                .record_cover(swap.partner_id, swap.requester_id, date)
                .await?;
        }
        Ok(())
    }

    /// Lifts the block the owner's approved leave placed on the shift's slots
    /// on `date`.
    async fn release_leave_blocks(
        &self,
        shift: &Shift,
        date: NaiveDate,
        owner: Uuid,
    ) -> Result<u64, AppError> {
        let Some(reason) = self.leave.approved_block_reason(owner, date).await? else {
            return Ok(0);
        };
        let released = self
            .slots
            .release_blocks(shift.id, date, owner, &reason)
            .await?;
        if released > 0 {
            log::info!(
                "Released {} '{}' blocks of shift {} on {} for cover",
                released,
                reason,
                shift.id,
                date
            );
        }
        Ok(released)
    }

    /// Hands slots back when the approval's status write lost to a
    /// concurrent rejection or cancellation.
    async fn undo_lost_approval(&self, attempted: &ShiftSwap) -> Result<(), AppError> {
        if attempted.status != SwapStatus::Approved {
            return Ok(());
        }
        let current = self.load(attempted.id).await?;
        if current.status == SwapStatus::Approved {
            return Ok(());
        }

        log::warn!(
            "Swap {} became {} during approval; returning slots",
            attempted.id,
            current.status
        );
        let dates: Vec<NaiveDate> = attempted.dates.iter().collect();
        self.slots
            .reassign_range(
                attempted.original_shift_id,
                &dates,
                attempted.partner_id,
                attempted.requester_id,
            )
            .await?;
        if let (SwapType::Trade, Some(requested)) =
            (attempted.swap_type, attempted.requested_shift_id)
        {
            self.slots
                .reassign_range(requested, &dates, attempted.requester_id, attempted.partner_id)
                .await?;
        }
        Ok(())
    }

    pub async fn get(&self, actor: &Actor, swap_id: Uuid) -> Result<ShiftSwap, AppError> {
        let swap = self.load(swap_id).await?;
        if !actor.is_admin() && !swap.involves(actor.id) {
            return Err(AppError::PermissionDenied(
                "Only the parties to a swap can view it".to_string(),
            ));
        }
        Ok(swap)
    }

    /// Swaps the actor is party to; admins see all, optionally narrowed to
    /// one staff member.
    pub async fn list(
        &self,
        actor: &Actor,
        staff_id: Option<Uuid>,
        status: Option<SwapStatus>,
    ) -> Result<Vec<ShiftSwap>, AppError> {
        let scope = if actor.is_admin() {
            staff_id
        } else {
            Some(actor.id)
        };
        Ok(self.swaps.list(scope, status).await?)
    }
}
