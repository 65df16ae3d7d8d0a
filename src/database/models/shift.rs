use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const ALLOWED_SLOT_DURATIONS: [i32; 4] = [15, 30, 45, 60];
pub const MINUTES_PER_DAY: u32 = 24 * 60;

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid time regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub days_of_week: Vec<Weekday>,
    pub max_patients_per_hour: i32,
    pub slot_duration: i32,
    pub department: String,
    pub break_window: Option<BreakWindow>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.start_time)
    }

    pub fn end_minute(&self) -> u32 {
        minute_of_day(self.end_time)
    }

    pub fn break_minutes(&self) -> Option<(u32, u32)> {
        self.break_window
            .map(|window| (minute_of_day(window.start), minute_of_day(window.end)))
    }

    pub fn runs_on(&self, date: NaiveDate) -> bool {
        self.days_of_week.contains(&date.weekday())
    }

    /// Whether the two shifts' time-of-day windows intersect, ignoring weekdays.
    pub fn overlaps_window(&self, other: &Shift) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    /// Capacity of a single slot cut from this shift; never below one patient.
    pub fn max_patients_per_slot(&self) -> i32 {
        (self.max_patients_per_hour * self.slot_duration / 60).max(1)
    }
}

/// Shift definition as submitted by a staff member; times are `HH:MM` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftInput {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub days_of_week: Vec<String>,
    pub max_patients_per_hour: i32,
    pub slot_duration: i32,
    pub department: String,
    pub break_start: Option<String>,
    pub break_end: Option<String>,
}

/// Partial update of a shift. `clear_break` removes an existing break window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPatch {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub days_of_week: Option<Vec<String>>,
    pub max_patients_per_hour: Option<i32>,
    pub slot_duration: Option<i32>,
    pub department: Option<String>,
    pub break_start: Option<String>,
    pub break_end: Option<String>,
    #[serde(default)]
    pub clear_break: bool,
}

/// A validated shift definition, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftDefinition {
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub days_of_week: Vec<Weekday>,
    pub max_patients_per_hour: i32,
    pub slot_duration: i32,
    pub department: String,
    pub break_window: Option<BreakWindow>,
}

impl ShiftInput {
    pub fn validate(self) -> Result<ShiftDefinition, AppError> {
        let break_window = parse_break(self.break_start.as_deref(), self.break_end.as_deref())?;
        let definition = ShiftDefinition {
            title: self.title.trim().to_string(),
            start_time: parse_time_of_day("startTime", &self.start_time)?,
            end_time: parse_time_of_day("endTime", &self.end_time)?,
            days_of_week: parse_weekdays(&self.days_of_week)?,
            max_patients_per_hour: self.max_patients_per_hour,
            slot_duration: self.slot_duration,
            department: self.department.trim().to_string(),
            break_window,
        };
        definition.check_invariants()?;
        Ok(definition)
    }
}

impl ShiftPatch {
    /// Overlays the patch on an existing shift and re-validates the result.
    pub fn apply_to(self, shift: &Shift) -> Result<ShiftDefinition, AppError> {
        let break_window = if self.clear_break {
            None
        } else if self.break_start.is_some() || self.break_end.is_some() {
            parse_break(self.break_start.as_deref(), self.break_end.as_deref())?
        } else {
            shift.break_window
        };

        let definition = ShiftDefinition {
            title: self
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| shift.title.clone()),
            start_time: match self.start_time {
                Some(ref raw) => parse_time_of_day("startTime", raw)?,
                None => shift.start_time,
            },
            end_time: match self.end_time {
                Some(ref raw) => parse_time_of_day("endTime", raw)?,
                None => shift.end_time,
            },
            days_of_week: match self.days_of_week {
                Some(ref raw) => parse_weekdays(raw)?,
                None => shift.days_of_week.clone(),
            },
            max_patients_per_hour: self
                .max_patients_per_hour
                .unwrap_or(shift.max_patients_per_hour),
            slot_duration: self.slot_duration.unwrap_or(shift.slot_duration),
            department: self
                .department
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| shift.department.clone()),
            break_window,
        };
        definition.check_invariants()?;
        Ok(definition)
    }
}

impl ShiftDefinition {
    pub fn check_invariants(&self) -> Result<(), AppError> {
        if self.title.is_empty() {
            return Err(AppError::validation("title", "title is required"));
        }
        if self.department.is_empty() {
            return Err(AppError::validation("department", "department is required"));
        }
        if self.end_time <= self.start_time {
            return Err(AppError::validation(
                "endTime",
                "end time must be after start time",
            ));
        }
        if !ALLOWED_SLOT_DURATIONS.contains(&self.slot_duration) {
            return Err(AppError::validation(
                "slotDuration",
                format!("slot duration must be one of {:?} minutes", ALLOWED_SLOT_DURATIONS),
            ));
        }
        if self.max_patients_per_hour < 1 {
            return Err(AppError::validation(
                "maxPatientsPerHour",
                "at least one patient per hour is required",
            ));
        }
        if self.days_of_week.is_empty() {
            return Err(AppError::validation(
                "daysOfWeek",
                "at least one weekday is required",
            ));
        }
        if let Some(window) = self.break_window {
            if window.end <= window.start {
                return Err(AppError::validation(
                    "breakEnd",
                    "break end must be after break start",
                ));
            }
            if window.start < self.start_time || window.end > self.end_time {
                return Err(AppError::validation(
                    "breakStart",
                    "break must lie within the shift",
                ));
            }
        }
        Ok(())
    }
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Converts a minute offset back to a time of day. Minute 1440 (end of day)
/// saturates to 23:59:59.
pub fn time_from_minute(minute: u32) -> NaiveTime {
    if minute >= MINUTES_PER_DAY {
        return NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    }
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap_or(NaiveTime::MIN)
}

pub fn parse_time_of_day(field: &str, raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    if !TIME_OF_DAY.is_match(raw) {
        return Err(AppError::validation(field, format!("'{}' is not a HH:MM time", raw)));
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| AppError::validation(field, format!("'{}' is not a HH:MM time", raw)))
}

fn parse_break(start: Option<&str>, end: Option<&str>) -> Result<Option<BreakWindow>, AppError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some(BreakWindow {
            start: parse_time_of_day("breakStart", start)?,
            end: parse_time_of_day("breakEnd", end)?,
        })),
        (Some(_), None) => Err(AppError::validation(
            "breakEnd",
            "break end is required with a break start",
        )),
        (None, Some(_)) => Err(AppError::validation(
            "breakStart",
            "break start is required with a break end",
        )),
    }
}

fn parse_weekdays(raw: &[String]) -> Result<Vec<Weekday>, AppError> {
    let mut days = raw
        .iter()
        .map(|day| {
            day.trim()
                .parse::<Weekday>()
                .map_err(|_| AppError::validation("daysOfWeek", format!("'{}' is not a weekday", day)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    days.sort_by_key(|day| day.num_days_from_monday());
    days.dedup();
    Ok(days)
}
