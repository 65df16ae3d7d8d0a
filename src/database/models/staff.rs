use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        Staff => "staff",
        Admin => "admin",
    }
}

/// Directory entry for a staff member, as supplied by the staff directory.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StaffProfile {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub department: String,
    pub specialization: Option<String>,
}

impl StaffProfile {
    /// Swap eligibility: same department, or the same (non-empty) specialization.
    pub fn shares_unit_with(&self, other: &StaffProfile) -> bool {
        if self.department.eq_ignore_ascii_case(&other.department) {
            return true;
        }
        match (&self.specialization, &other.specialization) {
            (Some(a), Some(b)) => !a.trim().is_empty() && a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}
