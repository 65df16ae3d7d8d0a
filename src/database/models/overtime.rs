use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::error::AppError;

pub const MIN_OVERTIME_HOURS: f64 = 0.25;
pub const MAX_OVERTIME_HOURS: f64 = 24.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Overtime {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub shift_id: Uuid,
    pub overtime_date: NaiveDate,
    pub hours: f64,
    pub reason: String,
    pub status: OvertimeStatus,
    pub decided_by: Option<Uuid>,
    pub decision_comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeInput {
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub hours: f64,
    pub reason: String,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum OvertimeStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OvertimeDecision {
    Approved,
    Rejected,
}

impl OvertimeInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.hours.is_finite()
            || self.hours < MIN_OVERTIME_HOURS
            || self.hours > MAX_OVERTIME_HOURS
        {
            return Err(AppError::validation(
                "hours",
                format!(
                    "hours must be between {} and {}",
                    MIN_OVERTIME_HOURS, MAX_OVERTIME_HOURS
                ),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(AppError::validation("reason", "a reason is required"));
        }
        Ok(())
    }
}

impl Overtime {
    /// Length of the extension window in minutes, rounded up.
    pub fn extension_minutes(&self) -> u32 {
        (self.hours * 60.0).ceil() as u32
    }

    pub fn decide(
        mut self,
        decision: OvertimeDecision,
        admin_id: Uuid,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if self.status != OvertimeStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Overtime request {} is already {}",
                self.id, self.status
            )));
        }
        self.status = match decision {
            OvertimeDecision::Approved => OvertimeStatus::Approved,
            OvertimeDecision::Rejected => OvertimeStatus::Rejected,
        };
        self.decided_by = Some(admin_id);
        self.decision_comment = comment;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(self)
    }
}
