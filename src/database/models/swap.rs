use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::date_set::DateSet;
use super::macros::string_enum;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSwap {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub partner_id: Uuid,
    pub original_shift_id: Uuid,
    pub requested_shift_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub swap_type: SwapType,
    pub dates: DateSet,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSwapInput {
    pub partner_id: Uuid,
    pub original_shift_id: Uuid,
    pub requested_shift_id: Option<Uuid>,
    pub swap_type: SwapType,
    pub swap_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: String,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum SwapType {
        Trade => "trade", // reciprocal exchange of shifts
        Cover => "cover", // partner takes the shift, nothing given back
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum PartnerDecision {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum SwapStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

/// The partner's answer to a swap proposal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartnerResponse {
    Accepted,
    Declined,
}

/// The admin's ruling on a swap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdminDecision {
    Approved,
    Rejected,
    Cancelled,
}

impl ShiftSwapInput {
    pub fn date_set(&self) -> Result<DateSet, AppError> {
        DateSet::from_parts(self.swap_date, self.start_date, self.end_date)
    }

    /// The requested shift only matters for trades.
    pub fn effective_requested_shift(&self) -> Option<Uuid> {
        match self.swap_type {
            SwapType::Trade => self.requested_shift_id,
            SwapType::Cover => None,
        }
    }
}

impl ShiftSwap {
    pub fn involves(&self, staff_id: Uuid) -> bool {
        self.requester_id == staff_id || self.partner_id == staff_id
    }

    pub fn respond(
        mut self,
        partner_id: Uuid,
        response: PartnerResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if partner_id != self.partner_id {
            return Err(AppError::PermissionDenied(
                "Only the swap partner can respond to this swap".to_string(),
            ));
        }
        if self.partner_decision != PartnerDecision::Pending {
            return Err(AppError::BusinessRule(format!(
                "Swap {} was already {} by the partner",
                self.id, self.partner_decision
            )));
        }
        if self.status != SwapStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Swap {} is already {}",
                self.id, self.status
            )));
        }

        self.partner_decision = match response {
            PartnerResponse::Accepted => PartnerDecision::Accepted,
            PartnerResponse::Declined => PartnerDecision::Declined,
        };
        self.partner_responded_at = Some(now);
        self.updated_at = now;
        Ok(self)
    }

    pub fn decide(
        mut self,
        decision: AdminDecision,
        admin_id: Uuid,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if self.status != SwapStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Swap {} is already {}",
                self.id, self.status
            )));
        }

        self.status = match decision {
            AdminDecision::Approved => {
                if self.partner_decision != PartnerDecision::Accepted {
                    return Err(AppError::BusinessRule(format!(
                        "Swap {} cannot be approved: partner decision is {}",
                        self.id, self.partner_decision
                    )));
                }
                SwapStatus::Approved
            }
            AdminDecision::Rejected => SwapStatus::Rejected,
            AdminDecision::Cancelled => SwapStatus::Cancelled,
        };
        self.decided_by = Some(admin_id);
        self.decision_comment = comment;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(self)
    }
}
