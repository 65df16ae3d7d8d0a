//! Expansion of shifts into bookable slots.
//!
//! The partitioning functions are pure; [`SlotGenerator`] persists their
//! output through the slot repository, which makes generation idempotent per
//! (shift, date).

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::models::{
    MINUTES_PER_DAY, NewTimeSlot, Shift, TimeSlot, minute_of_day, time_from_minute,
};
use crate::database::repositories::{ShiftRepository, SlotRepository};
use crate::error::AppError;

/// Half-open minute-of-day interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    pub start: u32,
    pub end: u32,
}

impl MinuteWindow {
    fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start < end && start < self.end
    }
}

/// Cuts `[start, end)` into consecutive windows of `duration` minutes,
/// skipping any window that overlaps the break. A trailing window that would
/// run past `end` is dropped.
pub fn partition(
    start: u32,
    end: u32,
    duration: u32,
    break_window: Option<(u32, u32)>,
) -> Vec<MinuteWindow> {
    if duration == 0 {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor + duration <= end {
        let window = MinuteWindow {
            start: cursor,
            end: cursor + duration,
        };
        let in_break = break_window.is_some_and(|(bs, be)| window.overlaps(bs, be));
        if !in_break {
            windows.push(window);
        }
        cursor += duration;
    }
    windows
}

fn drafts(
    shift: &Shift,
    date: NaiveDate,
    windows: Vec<MinuteWindow>,
    is_overtime: bool,
) -> Vec<NewTimeSlot> {
    let max_patients = shift.max_patients_per_slot();
    windows
        .into_iter()
        .map(|window| NewTimeSlot {
            shift_id: shift.id,
            doctor_id: shift.staff_id,
            slot_date: date,
            start_time: time_from_minute(window.start),
            end_time: time_from_minute(window.end),
            max_patients,
            is_overtime,
        })
        .collect()
}

/// Slot drafts for a shift's regular hours on `date`; empty when the shift
/// does not run that weekday.
pub fn expand(shift: &Shift, date: NaiveDate) -> Vec<NewTimeSlot> {
    if !shift.runs_on(date) {
        return Vec::new();
    }
    let windows = partition(
        shift.start_minute(),
        shift.end_minute(),
        shift.slot_duration as u32,
        shift.break_minutes(),
    );
    drafts(shift, date, windows, false)
}

/// Slot drafts for `minutes` of overtime starting at the shift's end, capped
/// at the end of the day.
pub fn extension(shift: &Shift, date: NaiveDate, minutes: u32) -> Vec<NewTimeSlot> {
    let start = minute_of_day(shift.end_time);
    let end = start.saturating_add(minutes).min(MINUTES_PER_DAY);
    let windows = partition(
        start,
        end,
        shift.slot_duration as u32,
        shift.break_minutes(),
    );
    drafts(shift, date, windows, true)
}

/// Persists generated slots. Safe to call repeatedly and concurrently: the
/// first generation for a (shift, date) wins and later calls return its slots.
#[derive(Clone)]
pub struct SlotGenerator {
    shifts: Arc<dyn ShiftRepository>,
    slots: Arc<dyn SlotRepository>,
}

impl SlotGenerator {
    pub fn new(shifts: Arc<dyn ShiftRepository>, slots: Arc<dyn SlotRepository>) -> Self {
        Self { shifts, slots }
    }

    pub async fn generate_for_shift(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppError> {
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
        self.ensure(&shift, date).await
    }

    /// Generates slots for every active shift of the doctor running on `date`
    /// and returns the slots the doctor holds that day. Slots handed over by
    /// an approved swap belong to whoever holds them now.
    pub async fn generate_for_doctor(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppError> {
        for shift in self.shifts.find_by_staff(doctor_id).await? {
            if shift.runs_on(date) {
                self.ensure(&shift, date).await?;
            }
        }
        let mut slots = self.slots.find_by_doctor_and_date(doctor_id, date).await?;
        slots.sort_by_key(|slot| (slot.start_time, slot.shift_id));
        Ok(slots)
    }

    /// Returns the shift's slots on `date`, generating them first if needed.
    pub async fn ensure(&self, shift: &Shift, date: NaiveDate) -> Result<Vec<TimeSlot>, AppError> {
        let drafts = expand(shift, date);
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let generated = self.slots.insert_generated(shift.id, date, drafts).await?;
        if generated.created {
            log::info!(
                "Generated {} slots for shift {} on {}",
                generated.slots.len(),
                shift.id,
                date
            );
        }
        Ok(generated.slots)
    }

    /// Appends overtime slots after the shift's end, skipping windows that
    /// already exist. Returns only the new slots.
    pub async fn append_extension(
        &self,
        shift: &Shift,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<Vec<TimeSlot>, AppError> {
        let drafts = extension(shift, date, minutes);
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.slots.append(drafts).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc, Weekday};
    use pretty_assertions::assert_eq;

    use crate::database::models::BreakWindow;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn clinic_shift() -> Shift {
        let now = Utc::now();
        Shift {
            id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            title: "Outpatients".to_string(),
            start_time: hm(9, 0),
            end_time: hm(17, 0),
            days_of_week: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            max_patients_per_hour: 2,
            slot_duration: 30,
            department: "General".to_string(),
            break_window: Some(BreakWindow {
                start: hm(12, 0),
                end: hm(13, 0),
            }),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn working_day_with_lunch_break_yields_fourteen_slots() {
        let drafts = expand(&clinic_shift(), monday());
        assert_eq!(drafts.len(), 14);
        assert!(
            drafts
                .iter()
                .all(|slot| slot.end_time <= hm(12, 0) || slot.start_time >= hm(13, 0))
        );
        assert_eq!(drafts[0].start_time, hm(9, 0));
        assert_eq!(drafts[13].end_time, hm(17, 0));
        assert!(drafts.iter().all(|slot| slot.max_patients == 1));
    }

    #[test]
    fn partial_break_overlap_excludes_the_window() {
        let windows = partition(540, 660, 45, Some((600, 615)));
        // 09:00-09:45 kept, 09:45-10:30 touches the break, 10:30-11:15 exceeds the end
        assert_eq!(windows, vec![MinuteWindow { start: 540, end: 585 }]);
    }

    #[test]
    fn no_slots_on_days_off() {
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert!(expand(&clinic_shift(), sunday).is_empty());
    }

    #[test]
    fn two_hours_of_overtime_after_five_gives_four_slots() {
        let drafts = extension(&clinic_shift(), monday(), 120);
        let times: Vec<_> = drafts.iter().map(|s| (s.start_time, s.end_time)).collect();
        assert_eq!(
            times,
            vec![
                (hm(17, 0), hm(17, 30)),
                (hm(17, 30), hm(18, 0)),
                (hm(18, 0), hm(18, 30)),
                (hm(18, 30), hm(19, 0)),
            ]
        );
        assert!(drafts.iter().all(|slot| slot.is_overtime));
    }

    #[test]
    fn extension_is_capped_at_end_of_day() {
        let mut shift = clinic_shift();
        shift.start_time = hm(14, 0);
        shift.end_time = hm(23, 0);
        shift.break_window = None;
        shift.slot_duration = 60;

        let drafts = extension(&shift, monday(), 180);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].start_time, hm(23, 0));
        assert_eq!(drafts[0].end_time, NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }
}
