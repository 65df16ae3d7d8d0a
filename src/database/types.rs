use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use sqlx::types::Json;
use uuid::Uuid;

use super::models::{
    BreakWindow, CoveringStaff, DateSet, LeaveRequest, LeaveStatus, LeaveType, PartnerDecision,
    Shift, ShiftSwap, SwapStatus, SwapType,
};

// Database row types that match the Postgres schema
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShiftRow {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub days_of_week: Vec<String>,
    pub max_patients_per_hour: i32,
    pub slot_duration: i32,
    pub department: String,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub is_emergency: bool,
    pub status: LeaveStatus,
    pub approver_id: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub covering_staff: Json<Vec<CoveringStaff>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShiftSwapRow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub partner_id: Uuid,
    pub original_shift_id: Uuid,
    pub requested_shift_id: Option<Uuid>,
    pub swap_type: SwapType,
    pub swap_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub partner_decision: PartnerDecision,
    pub status: SwapStatus,
    pub reason: String,
    pub partner_responded_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub decision_comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values for a date set: `(swap_date, start_date, end_date)`.
pub fn date_set_columns(dates: &DateSet) -> (Option<NaiveDate>, Option<NaiveDate>, Option<NaiveDate>) {
    match *dates {
        DateSet::Single { date } => (Some(date), None, None),
        DateSet::Range { start, end } => (None, Some(start), Some(end)),
    }
}

pub fn weekday_columns(days: &[Weekday]) -> Vec<String> {
    days.iter().map(|day| day.to_string()).collect()
}

// Conversion functions
impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        let break_window = match (row.break_start, row.break_end) {
            (Some(start), Some(end)) => Some(BreakWindow { start, end }),
            _ => None,
        };
        Self {
            id: row.id,
            staff_id: row.staff_id,
            title: row.title,
            start_time: row.start_time,
            end_time: row.end_time,
            days_of_week: row
                .days_of_week
                .iter()
                .filter_map(|day| day.parse::<Weekday>().ok())
                .collect(),
            max_patients_per_hour: row.max_patients_per_hour,
            slot_duration: row.slot_duration,
            department: row.department,
            break_window,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<LeaveRequestRow> for LeaveRequest {
    fn from(row: LeaveRequestRow) -> Self {
        Self {
            id: row.id,
            staff_id: row.staff_id,
            leave_type: row.leave_type,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            is_emergency: row.is_emergency,
            status: row.status,
            approver_id: row.approver_id,
            decided_at: row.decided_at,
            rejection_reason: row.rejection_reason,
            cancelled_by: row.cancelled_by,
            cancellation_reason: row.cancellation_reason,
            covering_staff: row.covering_staff.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ShiftSwapRow> for ShiftSwap {
    fn from(row: ShiftSwapRow) -> Self {
        // The schema's CHECK constraint guarantees one of the two shapes
        let dates = match (row.swap_date, row.start_date, row.end_date) {
            (_, Some(start), Some(end)) => DateSet::Range { start, end },
            (Some(date), _, _) => DateSet::Single { date },
            (None, Some(date), None) | (None, None, Some(date)) => DateSet::Single { date },
            (None, None, None) => DateSet::Single {
                date: row.created_at.date_naive(),
            },
        };
        Self {
            id: row.id,
            requester_id: row.requester_id,
            partner_id: row.partner_id,
            original_shift_id: row.original_shift_id,
            requested_shift_id: row.requested_shift_id,
            swap_type: row.swap_type,
            dates,
            partner_decision: row.partner_decision,
            status: row.status,
            reason: row.reason,
            partner_responded_at: row.partner_responded_at,
            decided_by: row.decided_by,
            decision_comment: row.decision_comment,
            decided_at: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
