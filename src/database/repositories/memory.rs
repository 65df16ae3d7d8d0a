use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BlockOutcome, DateOutcome, GeneratedSlots, LeaveRepository, OvertimeRepository,
    ShiftRepository, SlotRepository, StaffDirectory, SwapRepository,
};
use crate::database::models::{
    CoveringStaff, DateSet, LeaveRequest, LeaveRequestInput, LeaveStatus, NewTimeSlot, Overtime,
    OvertimeInput, OvertimeStatus, PartnerDecision, Role, Shift, ShiftDefinition, ShiftSwap,
    ShiftSwapInput, StaffProfile, SwapStatus, TimeSlot,
};

#[derive(Default)]
struct Tables {
    shifts: HashMap<Uuid, Shift>,
    slots: HashMap<Uuid, TimeSlot>,
    generated: HashSet<(Uuid, NaiveDate)>,
    leave: HashMap<Uuid, LeaveRequest>,
    overtime: HashMap<Uuid, Overtime>,
    swaps: HashMap<Uuid, ShiftSwap>,
    staff: HashMap<Uuid, StaffProfile>,
}

impl Tables {
    fn slots_where(&self, predicate: impl Fn(&TimeSlot) -> bool) -> Vec<TimeSlot> {
        let mut slots: Vec<TimeSlot> = self
            .slots
            .values()
            .filter(|slot| predicate(slot))
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.slot_date, slot.start_time, slot.shift_id));
        slots
    }

    fn window_exists(&self, draft: &NewTimeSlot) -> bool {
        self.slots.values().any(|slot| {
            slot.shift_id == draft.shift_id
                && slot.slot_date == draft.slot_date
                && slot.start_time == draft.start_time
        })
    }
}

/// Process-local store backing every repository trait. Each operation holds
/// the write lock for its whole unit of work.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[async_trait]
impl ShiftRepository for MemoryStore {
    async fn create(&self, staff_id: Uuid, definition: &ShiftDefinition) -> Result<Shift> {
        let now = Utc::now();
        let shift = Shift {
            id: Uuid::new_v4(),
            staff_id,
            title: definition.title.clone(),
            start_time: definition.start_time,
            end_time: definition.end_time,
            days_of_week: definition.days_of_week.clone(),
            max_patients_per_hour: definition.max_patients_per_hour,
            slot_duration: definition.slot_duration,
            department: definition.department.clone(),
            break_window: definition.break_window,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .shifts
            .insert(shift.id, shift.clone());
        Ok(shift)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shift>> {
        Ok(self.tables.read().await.shifts.get(&id).cloned())
    }

    async fn find_by_staff(&self, staff_id: Uuid) -> Result<Vec<Shift>> {
        let tables = self.tables.read().await;
        let mut shifts: Vec<Shift> = tables
            .shifts
            .values()
            .filter(|shift| shift.staff_id == staff_id && shift.is_active)
            .cloned()
            .collect();
        shifts.sort_by_key(|shift| (shift.start_time, shift.created_at));
        Ok(shifts)
    }

    async fn find_active(&self) -> Result<Vec<Shift>> {
        let tables = self.tables.read().await;
        let mut shifts: Vec<Shift> = tables
            .shifts
            .values()
            .filter(|shift| shift.is_active)
            .cloned()
            .collect();
        shifts.sort_by_key(|shift| (shift.start_time, shift.created_at));
        Ok(shifts)
    }

    async fn update(&self, id: Uuid, definition: &ShiftDefinition) -> Result<Option<Shift>> {
        let mut tables = self.tables.write().await;
        let Some(shift) = tables.shifts.get_mut(&id) else {
            return Ok(None);
        };
        shift.title = definition.title.clone();
        shift.start_time = definition.start_time;
        shift.end_time = definition.end_time;
        shift.days_of_week = definition.days_of_week.clone();
        shift.max_patients_per_hour = definition.max_patients_per_hour;
        shift.slot_duration = definition.slot_duration;
        shift.department = definition.department.clone();
        shift.break_window = definition.break_window;
        shift.updated_at = Utc::now();
        Ok(Some(shift.clone()))
    }

    async fn deactivate(&self, id: Uuid) -> Result<Option<Shift>> {
        let mut tables = self.tables.write().await;
        Ok(tables.shifts.get_mut(&id).map(|shift| {
            shift.is_active = false;
            shift.updated_at = Utc::now();
            shift.clone()
        }))
    }
}

#[async_trait]
impl SlotRepository for MemoryStore {
    async fn insert_generated(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
        drafts: Vec<NewTimeSlot>,
    ) -> Result<GeneratedSlots> {
        let mut tables = self.tables.write().await;
        if !tables.generated.insert((shift_id, date)) {
            let slots = tables.slots_where(|slot| slot.shift_id == shift_id && slot.slot_date == date);
            return Ok(GeneratedSlots {
                slots,
                created: false,
            });
        }

        let now = Utc::now();
        for draft in drafts {
            if tables.window_exists(&draft) {
                continue;
            }
            let slot = draft.into_slot(now);
            tables.slots.insert(slot.id, slot);
        }
        let slots = tables.slots_where(|slot| slot.shift_id == shift_id && slot.slot_date == date);
        Ok(GeneratedSlots {
            slots,
            created: true,
        })
    }

    async fn append(&self, drafts: Vec<NewTimeSlot>) -> Result<Vec<TimeSlot>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut inserted = Vec::new();
        for draft in drafts {
            if tables.window_exists(&draft) {
                continue;
            }
            let slot = draft.into_slot(now);
            tables.slots.insert(slot.id, slot.clone());
            inserted.push(slot);
        }
        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeSlot>> {
        Ok(self.tables.read().await.slots.get(&id).cloned())
    }

    async fn find_by_shift_and_date(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        Ok(self
            .tables
            .read()
            .await
            .slots_where(|slot| slot.shift_id == shift_id && slot.slot_date == date))
    }

    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        Ok(self
            .tables
            .read()
            .await
            .slots_where(|slot| slot.doctor_id == doctor_id && slot.slot_date == date))
    }

    async fn book(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Option<TimeSlot>> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.slots.get_mut(&slot_id) else {
            return Ok(None);
        };
        match slot.book(appointment_id, Utc::now()) {
            Ok(()) => Ok(Some(slot.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn cancel_booking(
        &self,
        slot_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Option<TimeSlot>> {
        let mut tables = self.tables.write().await;
        Ok(tables.slots.get_mut(&slot_id).map(|slot| {
            slot.cancel_booking(appointment_id, Utc::now());
            slot.clone()
        }))
    }

    async fn set_block(&self, slot_id: Uuid, reason: Option<String>) -> Result<Option<TimeSlot>> {
        let mut tables = self.tables.write().await;
        Ok(tables.slots.get_mut(&slot_id).map(|slot| {
            match reason {
                Some(reason) => slot.block(reason, Utc::now()),
                None => slot.unblock(Utc::now()),
            }
            slot.clone()
        }))
    }

    async fn block_range(
        &self,
        doctor_id: Uuid,
        dates: &DateSet,
        reason: &str,
        include_booked: bool,
    ) -> Result<Vec<BlockOutcome>> {
        let mut outcomes = Vec::with_capacity(dates.len());
        for date in dates {
            let mut tables = self.tables.write().await;
            let now = Utc::now();
            let mut outcome = BlockOutcome {
                date,
                blocked: 0,
                skipped_booked: Vec::new(),
            };
            for slot in tables
                .slots
                .values_mut()
                .filter(|slot| slot.doctor_id == doctor_id && slot.slot_date == date)
            {
                if slot.is_blocked {
                    continue;
                }
                if slot.booked_count > 0 && !include_booked {
                    outcome.skipped_booked.push(slot.id);
                    continue;
                }
                slot.block(reason, now);
                outcome.blocked += 1;
            }
            outcome.skipped_booked.sort();
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn unblock_range(
        &self,
        doctor_id: Uuid,
        dates: &DateSet,
        reason: &str,
    ) -> Result<Vec<DateOutcome>> {
        let mut outcomes = Vec::with_capacity(dates.len());
        for date in dates {
            let mut tables = self.tables.write().await;
            let now = Utc::now();
            let mut affected = 0;
            for slot in tables.slots.values_mut().filter(|slot| {
                slot.doctor_id == doctor_id && slot.slot_date == date && slot.is_blocked_for(reason)
            }) {
                slot.unblock(now);
                affected += 1;
            }
            outcomes.push(DateOutcome { date, affected });
        }
        Ok(outcomes)
    }

    async fn release_blocks(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
        owner: Uuid,
        reason: &str,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut affected = 0;
        for slot in tables.slots.values_mut().filter(|slot| {
            slot.shift_id == shift_id
                && slot.slot_date == date
                && slot.doctor_id == owner
                && slot.is_blocked_for(reason)
        }) {
            slot.unblock(now);
            affected += 1;
        }
        Ok(affected)
    }

    async fn reassign_range(
        &self,
        shift_id: Uuid,
        dates: &[NaiveDate],
        from: Uuid,
        to: Uuid,
    ) -> Result<Vec<DateOutcome>> {
        let mut outcomes = Vec::with_capacity(dates.len());
        for &date in dates {
            let mut tables = self.tables.write().await;
            let now = Utc::now();
            let mut affected = 0;
            for slot in tables.slots.values_mut().filter(|slot| {
                slot.shift_id == shift_id && slot.slot_date == date && slot.doctor_id == from
            }) {
                slot.doctor_id = to;
                slot.updated_at = now;
                affected += 1;
            }
            outcomes.push(DateOutcome { date, affected });
        }
        Ok(outcomes)
    }

    async fn block_from_date(
        &self,
        shift_id: Uuid,
        from: NaiveDate,
        reason: &str,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut affected = 0;
        for slot in tables
            .slots
            .values_mut()
            .filter(|slot| slot.shift_id == shift_id && slot.slot_date >= from)
        {
            slot.block(reason, now);
            affected += 1;
        }
        Ok(affected)
    }
}

#[async_trait]
impl LeaveRepository for MemoryStore {
    async fn create_if_no_overlap(
        &self,
        staff_id: Uuid,
        input: &LeaveRequestInput,
    ) -> Result<Option<LeaveRequest>> {
        let mut tables = self.tables.write().await;
        let clash = tables.leave.values().any(|existing| {
            existing.staff_id == staff_id
                && existing.status.holds_dates()
                && existing.overlaps(input.start_date, input.end_date)
        });
        if clash {
            return Ok(None);
        }

        let now = Utc::now();
        let request = LeaveRequest {
            id: Uuid::new_v4(),
            staff_id,
            leave_type: input.leave_type,
            start_date: input.start_date,
            end_date: input.end_date,
            reason: input.reason.clone(),
            is_emergency: input.is_emergency,
            status: LeaveStatus::Pending,
            approver_id: None,
            decided_at: None,
            rejection_reason: None,
            cancelled_by: None,
            cancellation_reason: None,
            covering_staff: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.leave.insert(request.id, request.clone());
        Ok(Some(request))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>> {
        Ok(self.tables.read().await.leave.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        staff_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: LeaveStatus,
    ) -> Result<Vec<LeaveRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<LeaveRequest> = tables
            .leave
            .values()
            .filter(|request| {
                request.staff_id == staff_id
                    && request.status == status
                    && request.overlaps(start, end)
            })
            .cloned()
            .collect();
        requests.sort_by_key(|request| request.start_date);
        Ok(requests)
    }

    async fn list(
        &self,
        staff_id: Option<Uuid>,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<LeaveRequest> = tables
            .leave
            .values()
            .filter(|request| staff_id.is_none_or(|id| request.staff_id == id))
            .filter(|request| status.is_none_or(|s| request.status == s))
            .cloned()
            .collect();
        newest_first(&mut requests, |request| request.created_at);
        Ok(requests)
    }

    async fn update_status(
        &self,
        request: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<Option<LeaveRequest>> {
        let mut tables = self.tables.write().await;
        match tables.leave.get_mut(&request.id) {
            Some(stored) if stored.status == expected => {
                // Coverage entries are owned by add_cover and survive status changes
                let covering_staff = std::mem::take(&mut stored.covering_staff);
                *stored = LeaveRequest {
                    covering_staff,
                    ..request.clone()
                };
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn add_cover(&self, id: Uuid, entry: &CoveringStaff) -> Result<Option<LeaveRequest>> {
        let mut tables = self.tables.write().await;
        Ok(tables.leave.get_mut(&id).map(|request| {
            request.add_cover(entry, Utc::now());
            request.clone()
        }))
    }
}

#[async_trait]
impl OvertimeRepository for MemoryStore {
    async fn create(&self, doctor_id: Uuid, input: &OvertimeInput) -> Result<Overtime> {
        let now = Utc::now();
        let overtime = Overtime {
            id: Uuid::new_v4(),
            doctor_id,
            shift_id: input.shift_id,
            overtime_date: input.date,
            hours: input.hours,
            reason: input.reason.clone(),
            status: OvertimeStatus::Pending,
            decided_by: None,
            decision_comment: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .overtime
            .insert(overtime.id, overtime.clone());
        Ok(overtime)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Overtime>> {
        Ok(self.tables.read().await.overtime.get(&id).cloned())
    }

    async fn list(
        &self,
        doctor_id: Option<Uuid>,
        status: Option<OvertimeStatus>,
    ) -> Result<Vec<Overtime>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<Overtime> = tables
            .overtime
            .values()
            .filter(|overtime| doctor_id.is_none_or(|id| overtime.doctor_id == id))
            .filter(|overtime| status.is_none_or(|s| overtime.status == s))
            .cloned()
            .collect();
        newest_first(&mut requests, |overtime| overtime.created_at);
        Ok(requests)
    }

    async fn update_status(
        &self,
        overtime: &Overtime,
        expected: OvertimeStatus,
    ) -> Result<Option<Overtime>> {
        let mut tables = self.tables.write().await;
        match tables.overtime.get_mut(&overtime.id) {
            Some(stored) if stored.status == expected => {
                *stored = overtime.clone();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl SwapRepository for MemoryStore {
    async fn create(
        &self,
        requester_id: Uuid,
        input: &ShiftSwapInput,
        dates: &DateSet,
    ) -> Result<ShiftSwap> {
        let now = Utc::now();
        let swap = ShiftSwap {
            id: Uuid::new_v4(),
            requester_id,
            partner_id: input.partner_id,
            original_shift_id: input.original_shift_id,
            requested_shift_id: input.effective_requested_shift(),
            swap_type: input.swap_type,
            dates: *dates,
            partner_decision: PartnerDecision::Pending,
            status: SwapStatus::Pending,
            reason: input.reason.clone(),
            partner_responded_at: None,
            decided_by: None,
            decision_comment: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.swaps.insert(swap.id, swap.clone());
        Ok(swap)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ShiftSwap>> {
        Ok(self.tables.read().await.swaps.get(&id).cloned())
    }

    async fn list(
        &self,
        staff_id: Option<Uuid>,
        status: Option<SwapStatus>,
    ) -> Result<Vec<ShiftSwap>> {
        let tables = self.tables.read().await;
        let mut swaps: Vec<ShiftSwap> = tables
            .swaps
            .values()
            .filter(|swap| staff_id.is_none_or(|id| swap.involves(id)))
            .filter(|swap| status.is_none_or(|s| swap.status == s))
            .cloned()
            .collect();
        newest_first(&mut swaps, |swap| swap.created_at);
        Ok(swaps)
    }

    async fn update_state(
        &self,
        swap: &ShiftSwap,
        expected_partner: PartnerDecision,
        expected_status: SwapStatus,
    ) -> Result<Option<ShiftSwap>> {
        let mut tables = self.tables.write().await;
        match tables.swaps.get_mut(&swap.id) {
            Some(stored)
                if stored.partner_decision == expected_partner
                    && stored.status == expected_status =>
            {
                *stored = swap.clone();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl StaffDirectory for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffProfile>> {
        Ok(self.tables.read().await.staff.get(&id).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<StaffProfile>> {
        let tables = self.tables.read().await;
        let mut admins: Vec<StaffProfile> = tables
            .staff
            .values()
            .filter(|profile| profile.role == Role::Admin)
            .cloned()
            .collect();
        admins.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(admins)
    }

    async fn upsert(&self, profile: &StaffProfile) -> Result<StaffProfile> {
        self.tables
            .write()
            .await
            .staff
            .insert(profile.id, profile.clone());
        Ok(profile.clone())
    }
}
