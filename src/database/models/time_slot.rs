use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// One bookable unit of a shift on a specific date.
///
/// Capacity and blocking are independent axes; `is_available` is always
/// `!is_blocked && booked_count < max_patients`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: Uuid,
    pub shift_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_patients: i32,
    pub booked_count: i32,
    pub is_available: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub appointment_ids: Vec<Uuid>,
    pub is_overtime: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Slot draft produced by the generator before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimeSlot {
    pub shift_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_patients: i32,
    pub is_overtime: bool,
}

impl NewTimeSlot {
    pub fn into_slot(self, now: DateTime<Utc>) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            shift_id: self.shift_id,
            doctor_id: self.doctor_id,
            slot_date: self.slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
            max_patients: self.max_patients,
            booked_count: 0,
            is_available: true,
            is_blocked: false,
            block_reason: None,
            appointment_ids: Vec::new(),
            is_overtime: self.is_overtime,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TimeSlot {
    pub fn is_full(&self) -> bool {
        self.booked_count >= self.max_patients
    }

    fn refresh_availability(&mut self) {
        self.is_available = !self.is_blocked && self.booked_count < self.max_patients;
    }

    pub fn book(&mut self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_blocked {
            return Err(AppError::BusinessRule(format!(
                "Slot {} is blocked{}",
                self.id,
                self.block_reason
                    .as_ref()
                    .map_or(String::new(), |reason| format!(" ({})", reason))
            )));
        }
        if !self.is_available || self.is_full() {
            return Err(AppError::BusinessRule(format!(
                "Slot {} is fully booked",
                self.id
            )));
        }
        if self.appointment_ids.contains(&appointment_id) {
            return Err(AppError::BusinessRule(format!(
                "Appointment {} is already booked on slot {}",
                appointment_id, self.id
            )));
        }

        self.booked_count += 1;
        self.appointment_ids.push(appointment_id);
        self.refresh_availability();
        self.updated_at = now;
        Ok(())
    }

    /// Releases the appointment's place. Returns false when the appointment
    /// was not booked on this slot, leaving it untouched.
    pub fn cancel_booking(&mut self, appointment_id: Uuid, now: DateTime<Utc>) -> bool {
        let before = self.appointment_ids.len();
        self.appointment_ids.retain(|id| *id != appointment_id);
        if self.appointment_ids.len() == before {
            return false;
        }

        self.booked_count = (self.booked_count - 1).max(0);
        self.refresh_availability();
        self.updated_at = now;
        true
    }

    pub fn block(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.is_blocked = true;
        self.block_reason = Some(reason.into());
        self.refresh_availability();
        self.updated_at = now;
    }

    pub fn unblock(&mut self, now: DateTime<Utc>) {
        self.is_blocked = false;
        self.block_reason = None;
        self.refresh_availability();
        self.updated_at = now;
    }

    pub fn is_blocked_for(&self, reason: &str) -> bool {
        self.is_blocked && self.block_reason.as_deref() == Some(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slot(max_patients: i32) -> TimeSlot {
        NewTimeSlot {
            shift_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            max_patients,
            is_overtime: false,
        }
        .into_slot(Utc::now())
    }

    #[test]
    fn booking_to_capacity_flips_availability() {
        let mut slot = slot(2);
        slot.book(Uuid::new_v4(), Utc::now()).unwrap();
        assert!(slot.is_available);

        slot.book(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(slot.booked_count, 2);
        assert!(!slot.is_available);

        let err = slot.book(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(slot.booked_count, 2);
    }

    #[test]
    fn blocked_slot_rejects_bookings() {
        let mut slot = slot(1);
        slot.block("Shift deleted", Utc::now());
        assert!(slot.book(Uuid::new_v4(), Utc::now()).is_err());
        assert_eq!(slot.booked_count, 0);
    }

    #[test]
    fn cancel_restores_availability_only_when_unblocked() {
        let mut slot = slot(1);
        let appointment = Uuid::new_v4();
        slot.book(appointment, Utc::now()).unwrap();
        slot.block("sick leave", Utc::now());

        assert!(slot.cancel_booking(appointment, Utc::now()));
        assert_eq!(slot.booked_count, 0);
        assert!(slot.appointment_ids.is_empty());
        assert!(!slot.is_available);

        slot.unblock(Utc::now());
        assert!(slot.is_available);
    }

    #[test]
    fn cancel_of_unknown_appointment_changes_nothing() {
        let mut slot = slot(1);
        assert!(!slot.cancel_booking(Uuid::new_v4(), Utc::now()));
        assert_eq!(slot.booked_count, 0);
        assert!(slot.is_available);
    }

    #[test]
    fn unblocking_a_full_slot_keeps_it_unavailable() {
        let mut slot = slot(1);
        slot.book(Uuid::new_v4(), Utc::now()).unwrap();
        slot.block("sick leave", Utc::now());
        slot.unblock(Utc::now());

        assert!(!slot.is_blocked);
        assert!(!slot.is_available);
    }
}
