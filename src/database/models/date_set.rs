use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A single calendar date or an inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DateSet {
    Single { date: NaiveDate },
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateSet {
    pub fn single(date: NaiveDate) -> Self {
        DateSet::Single { date }
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::validation(
                "endDate",
                "end date must not be before start date",
            ));
        }
        Ok(DateSet::Range { start, end })
    }

    /// Builds a date set from the two request shapes: either `date` alone, or
    /// `start` and `end` together.
    pub fn from_parts(
        date: Option<NaiveDate>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, AppError> {
        match (date, start, end) {
            (Some(date), None, None) => Ok(Self::single(date)),
            (None, Some(start), Some(end)) => Self::range(start, end),
            (None, Some(_), None) => Err(AppError::validation("endDate", "end date is required")),
            (None, None, Some(_)) => {
                Err(AppError::validation("startDate", "start date is required"))
            }
            (None, None, None) => Err(AppError::validation(
                "swapDate",
                "either a date or a start/end range is required",
            )),
            (Some(_), _, _) => Err(AppError::validation(
                "swapDate",
                "a single date cannot be combined with a date range",
            )),
        }
    }

    pub fn first(&self) -> NaiveDate {
        match *self {
            DateSet::Single { date } => date,
            DateSet::Range { start, .. } => start,
        }
    }

    pub fn last(&self) -> NaiveDate {
        match *self {
            DateSet::Single { date } => date,
            DateSet::Range { end, .. } => end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first() <= date && date <= self.last()
    }

    /// True when the inclusive range [start, end] shares at least one day with this set.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.first() <= end && start <= self.last()
    }

    pub fn len(&self) -> usize {
        ((self.last() - self.first()).num_days() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> DateSetIter {
        DateSetIter {
            next: Some(self.first()),
            last: self.last(),
        }
    }
}

impl IntoIterator for &DateSet {
    type Item = NaiveDate;
    type IntoIter = DateSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct DateSetIter {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for DateSetIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|date| *date <= self.last)?;
        self.next = current.succ_opt();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_iterates_inclusively_across_month_end() {
        let set = DateSet::range(date(2025, 1, 30), date(2025, 2, 2)).unwrap();
        let dates: Vec<_> = set.iter().collect();

        assert_eq!(
            dates,
            vec![
                date(2025, 1, 30),
                date(2025, 1, 31),
                date(2025, 2, 1),
                date(2025, 2, 2)
            ]
        );
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn single_yields_one_date() {
        let set = DateSet::single(date(2025, 3, 3));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![date(2025, 3, 3)]);
        assert!(set.contains(date(2025, 3, 3)));
        assert!(!set.contains(date(2025, 3, 4)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = DateSet::range(date(2025, 3, 5), date(2025, 3, 4)).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "endDate"));
    }

    #[test]
    fn from_parts_requires_exactly_one_shape() {
        assert!(DateSet::from_parts(Some(date(2025, 3, 3)), None, None).is_ok());
        assert!(
            DateSet::from_parts(None, Some(date(2025, 3, 3)), Some(date(2025, 3, 4))).is_ok()
        );
        assert!(DateSet::from_parts(None, None, None).is_err());
        assert!(DateSet::from_parts(None, Some(date(2025, 3, 3)), None).is_err());
        assert!(
            DateSet::from_parts(Some(date(2025, 3, 3)), Some(date(2025, 3, 3)), None).is_err()
        );
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let set = DateSet::range(date(2025, 3, 3), date(2025, 3, 7)).unwrap();
        assert!(set.overlaps(date(2025, 3, 7), date(2025, 3, 9)));
        assert!(set.overlaps(date(2025, 3, 1), date(2025, 3, 3)));
        assert!(!set.overlaps(date(2025, 3, 8), date(2025, 3, 9)));
    }
}
