use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::date_set::DateSet;
use super::macros::string_enum;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
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
    pub covering_staff: Vec<CoveringStaff>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestInput {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub is_emergency: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoveringStaff {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub status: CoverageStatus,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum LeaveType {
        Sick => "sick",
        Vacation => "vacation",
        Personal => "personal",
        Emergency => "emergency",
        Maternity => "maternity",
        Paternity => "paternity",
        Bereavement => "bereavement",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum CoverageStatus {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
    }
}

/// Admin decision on a pending leave request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveDecision {
    Approve,
    Reject { reason: Option<String> },
}

impl LeaveType {
    /// Block reason written onto slots while this kind of leave is approved.
    pub fn block_reason(&self) -> String {
        format!("{} leave", self.as_str())
    }
}

impl LeaveStatus {
    /// Pending and approved requests hold their dates against new requests.
    pub fn holds_dates(&self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Approved)
    }
}

impl LeaveRequestInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.end_date < self.start_date {
            return Err(AppError::validation(
                "endDate",
                "end date must not be before start date",
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(AppError::validation("reason", "a reason is required"));
        }
        Ok(())
    }
}

impl LeaveRequest {
    pub fn dates(&self) -> DateSet {
        DateSet::Range {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.dates().overlaps(start, end)
    }

    pub fn block_reason(&self) -> String {
        self.leave_type.block_reason()
    }

    pub fn decide(
        mut self,
        decision: LeaveDecision,
        admin_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if self.status != LeaveStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Leave request {} is already {}",
                self.id, self.status
            )));
        }

        match decision {
            LeaveDecision::Approve => {
                self.status = LeaveStatus::Approved;
            }
            LeaveDecision::Reject { reason } => {
                self.status = LeaveStatus::Rejected;
                self.rejection_reason = reason;
            }
        }
        self.approver_id = Some(admin_id);
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(self)
    }

    pub fn cancel(
        mut self,
        actor_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        match self.status {
            LeaveStatus::Pending | LeaveStatus::Approved => {
                self.status = LeaveStatus::Cancelled;
                self.cancelled_by = Some(actor_id);
                self.cancellation_reason = reason;
                self.updated_at = now;
                Ok(self)
            }
            status => Err(AppError::BusinessRule(format!(
                "Leave request {} is already {}",
                self.id, status
            ))),
        }
    }

    /// Appends a cover entry; repeating an existing entry is a no-op.
    pub fn add_cover(&mut self, entry: &CoveringStaff, now: DateTime<Utc>) -> bool {
        if self.covering_staff.contains(entry) {
            return false;
        }
        self.covering_staff.push(entry.clone());
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(status: LeaveStatus) -> LeaveRequest {
        let now = Utc::now();
        LeaveRequest {
            id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            leave_type: LeaveType::Sick,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            reason: "flu".to_string(),
            is_emergency: false,
            status,
            approver_id: None,
            decided_at: None,
            rejection_reason: None,
            cancelled_by: None,
            cancellation_reason: None,
            covering_staff: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn block_reason_names_the_leave_type() {
        assert_eq!(LeaveType::Sick.block_reason(), "sick leave");
        assert_eq!(LeaveType::Bereavement.block_reason(), "bereavement leave");
    }

    #[test]
    fn only_pending_requests_can_be_decided() {
        let admin = Uuid::new_v4();
        let approved = request(LeaveStatus::Pending)
            .decide(LeaveDecision::Approve, admin, Utc::now())
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approver_id, Some(admin));

        let err = approved
            .decide(LeaveDecision::Reject { reason: None }, admin, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn rejection_records_reason() {
        let rejected = request(LeaveStatus::Pending)
            .decide(
                LeaveDecision::Reject {
                    reason: Some("short staffed".to_string()),
                },
                Uuid::new_v4(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("short staffed"));
    }

    #[test]
    fn cancelled_and_rejected_are_terminal() {
        for status in [LeaveStatus::Cancelled, LeaveStatus::Rejected] {
            let err = request(status)
                .cancel(Uuid::new_v4(), None, Utc::now())
                .unwrap_err();
            assert!(matches!(err, AppError::BusinessRule(_)));
        }
    }

    #[test]
    fn cover_entries_are_not_duplicated() {
        let mut leave = request(LeaveStatus::Approved);
        let entry = CoveringStaff {
            staff_id: Uuid::new_v4(),
            date: leave.start_date,
            status: CoverageStatus::Accepted,
        };

        assert!(leave.add_cover(&entry, Utc::now()));
        assert!(!leave.add_cover(&entry, Utc::now()));
        assert_eq!(leave.covering_staff.len(), 1);
    }
}
