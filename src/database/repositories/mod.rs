//! Repository interfaces, one per entity, with a Postgres and an in-memory
//! implementation of each.
//!
//! Every mutating method is a single atomic unit of work: booking and blocking
//! are conditional updates, generation is insert-if-absent, and status
//! changes are compare-and-swap against the status the caller read. Range
//! operations run one independent, idempotent statement per date.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    CoveringStaff, DateSet, LeaveRequest, LeaveRequestInput, LeaveStatus, NewTimeSlot, Overtime,
    OvertimeInput, OvertimeStatus, PartnerDecision, Shift, ShiftDefinition, ShiftSwap,
    ShiftSwapInput, StaffProfile, SwapStatus, TimeSlot,
};

pub mod leave;
pub mod memory;
pub mod overtime;
pub mod shift;
pub mod slot;
pub mod staff;
pub mod swap;

pub use leave::PgLeaveRepository;
pub use memory::MemoryStore;
pub use overtime::PgOvertimeRepository;
pub use shift::PgShiftRepository;
pub use slot::PgSlotRepository;
pub use staff::PgStaffDirectory;
pub use swap::PgSwapRepository;

/// Number of slots touched on one date of a range operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOutcome {
    pub date: NaiveDate,
    pub affected: u64,
}

/// Result of blocking one date: slots blocked, and booked slots left open
/// because the caller did not allow blocking them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOutcome {
    pub date: NaiveDate,
    pub blocked: u64,
    pub skipped_booked: Vec<Uuid>,
}

/// Slots for a (shift, date) pair and whether this call created them.
#[derive(Debug, Clone)]
pub struct GeneratedSlots {
    pub slots: Vec<TimeSlot>,
    pub created: bool,
}

#[async_trait]
pub trait ShiftRepository: Send + Sync {
    async fn create(&self, staff_id: Uuid, definition: &ShiftDefinition) -> Result<Shift>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shift>>;
    /// Active shifts owned by `staff_id`.
    async fn find_by_staff(&self, staff_id: Uuid) -> Result<Vec<Shift>>;
    async fn find_active(&self) -> Result<Vec<Shift>>;
    async fn update(&self, id: Uuid, definition: &ShiftDefinition) -> Result<Option<Shift>>;
    async fn deactivate(&self, id: Uuid) -> Result<Option<Shift>>;
}

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Persists `drafts` as the slots of (shift, date) unless that pair was
    /// already generated, in which case the existing slots are returned.
    /// The first writer wins.
    async fn insert_generated(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
        drafts: Vec<NewTimeSlot>,
    ) -> Result<GeneratedSlots>;
    /// Inserts extra slots, skipping any whose (shift, date, start) already
    /// exists. Returns only the newly inserted slots.
    async fn append(&self, drafts: Vec<NewTimeSlot>) -> Result<Vec<TimeSlot>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeSlot>>;
    async fn find_by_shift_and_date(&self, shift_id: Uuid, date: NaiveDate)
    -> Result<Vec<TimeSlot>>;
    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>>;
    /// Atomically books the slot. `None` when the slot is missing, blocked,
    /// full or already holds the appointment.
    async fn book(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Option<TimeSlot>>;
    /// Releases the appointment if it is booked on the slot. `None` when the
    /// slot does not exist.
    async fn cancel_booking(&self, slot_id: Uuid, appointment_id: Uuid)
    -> Result<Option<TimeSlot>>;
    /// `Some(reason)` blocks the slot, `None` unblocks it.
    async fn set_block(&self, slot_id: Uuid, reason: Option<String>) -> Result<Option<TimeSlot>>;
    /// Blocks the doctor's open slots on each date. Slots already blocked,
    /// for any reason, keep their block and are not counted.
    async fn block_range(
        &self,
        doctor_id: Uuid,
        dates: &DateSet,
        reason: &str,
        include_booked: bool,
    ) -> Result<Vec<BlockOutcome>>;
    /// Unblocks only slots whose block reason equals `reason`.
    async fn unblock_range(
        &self,
        doctor_id: Uuid,
        dates: &DateSet,
        reason: &str,
    ) -> Result<Vec<DateOutcome>>;
    /// Unblocks the shift's slots held by `owner` on `date` whose block
    /// reason equals `reason`.
    async fn release_blocks(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
        owner: Uuid,
        reason: &str,
    ) -> Result<u64>;
    /// Moves ownership of the shift's slots from `from` to `to` on each date.
    async fn reassign_range(
        &self,
        shift_id: Uuid,
        dates: &[NaiveDate],
        from: Uuid,
        to: Uuid,
    ) -> Result<Vec<DateOutcome>>;
    /// Blocks every slot of the shift dated on or after `from`.
    async fn block_from_date(&self, shift_id: Uuid, from: NaiveDate, reason: &str)
    -> Result<u64>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    /// Inserts a pending request unless the staff member already holds a
    /// pending or approved request overlapping the dates (`None`).
    async fn create_if_no_overlap(
        &self,
        staff_id: Uuid,
        input: &LeaveRequestInput,
    ) -> Result<Option<LeaveRequest>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>>;
    async fn find_overlapping(
        &self,
        staff_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: LeaveStatus,
    ) -> Result<Vec<LeaveRequest>>;
    async fn list(
        &self,
        staff_id: Option<Uuid>,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>>;
    /// Stores the request's new state if its status is still `expected`.
    async fn update_status(
        &self,
        request: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<Option<LeaveRequest>>;
    async fn add_cover(&self, id: Uuid, entry: &CoveringStaff) -> Result<Option<LeaveRequest>>;
}

#[async_trait]
pub trait OvertimeRepository: Send + Sync {
    async fn create(&self, doctor_id: Uuid, input: &OvertimeInput) -> Result<Overtime>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Overtime>>;
    async fn list(
        &self,
        doctor_id: Option<Uuid>,
        status: Option<OvertimeStatus>,
    ) -> Result<Vec<Overtime>>;
    async fn update_status(
        &self,
        overtime: &Overtime,
        expected: OvertimeStatus,
    ) -> Result<Option<Overtime>>;
}

#[async_trait]
pub trait SwapRepository: Send + Sync {
    async fn create(
        &self,
        requester_id: Uuid,
        input: &ShiftSwapInput,
        dates: &DateSet,
    ) -> Result<ShiftSwap>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ShiftSwap>>;
    /// Swaps where `staff_id` is requester or partner; all swaps when `None`.
    async fn list(
        &self,
        staff_id: Option<Uuid>,
        status: Option<SwapStatus>,
    ) -> Result<Vec<ShiftSwap>>;
    /// Stores the swap's new state if both decisions still hold the expected values.
    async fn update_state(
        &self,
        swap: &ShiftSwap,
        expected_partner: PartnerDecision,
        expected_status: SwapStatus,
    ) -> Result<Option<ShiftSwap>>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffProfile>>;
    async fn list_admins(&self) -> Result<Vec<StaffProfile>>;
    async fn upsert(&self, profile: &StaffProfile) -> Result<StaffProfile>;
}

/// One handle per entity store, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub shifts: Arc<dyn ShiftRepository>,
    pub slots: Arc<dyn SlotRepository>,
    pub leave: Arc<dyn LeaveRepository>,
    pub overtime: Arc<dyn OvertimeRepository>,
    pub swaps: Arc<dyn SwapRepository>,
    pub staff: Arc<dyn StaffDirectory>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            shifts: Arc::new(PgShiftRepository::new(pool.clone())),
            slots: Arc::new(PgSlotRepository::new(pool.clone())),
            leave: Arc::new(PgLeaveRepository::new(pool.clone())),
            overtime: Arc::new(PgOvertimeRepository::new(pool.clone())),
            swaps: Arc::new(PgSwapRepository::new(pool.clone())),
            staff: Arc::new(PgStaffDirectory::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(MemoryStore::default())
    }

    pub fn from_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            shifts: store.clone(),
            slots: store.clone(),
            leave: store.clone(),
            overtime: store.clone(),
            swaps: store.clone(),
            staff: store,
        }
    }
}
