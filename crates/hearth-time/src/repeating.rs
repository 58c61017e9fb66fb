//! Repetition descriptors for calendar and time-event items.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{TimeError, TimeResult};

/// How a time item repeats.
///
/// Week days count Monday=1 through Sunday=7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatingMode {
    /// No repetition declared. Calendar items anchored on a start time treat
    /// this as daily.
    #[default]
    None,
    /// Every hour.
    Hourly,
    /// Every day.
    Daily,
    /// On the listed week days.
    Weekly,
    /// On the listed month days.
    Monthly,
    /// Every year.
    Yearly,
}

/// A repetition with its day filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatingOption {
    /// The repetition mode.
    pub mode: RepeatingMode,
    /// Week-day filter, Monday=1..Sunday=7. Only valid for weekly mode.
    #[serde(default)]
    pub week_days: Vec<u8>,
    /// Month-day filter, `1..=31`. Only valid for monthly mode.
    #[serde(default)]
    pub month_days: Vec<u8>,
}

impl RepeatingOption {
    /// A non-repeating option.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A weekly option over the given days.
    #[must_use]
    pub fn weekly(week_days: Vec<u8>) -> Self {
        Self {
            mode: RepeatingMode::Weekly,
            week_days,
            month_days: Vec::new(),
        }
    }

    /// A monthly option over the given days.
    #[must_use]
    pub fn monthly(month_days: Vec<u8>) -> Self {
        Self {
            mode: RepeatingMode::Monthly,
            week_days: Vec::new(),
            month_days,
        }
    }

    /// An option with just a mode and no day lists.
    #[must_use]
    pub fn with_mode(mode: RepeatingMode) -> Self {
        Self {
            mode,
            week_days: Vec::new(),
            month_days: Vec::new(),
        }
    }

    /// Whether nothing at all is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mode == RepeatingMode::None && self.week_days.is_empty() && self.month_days.is_empty()
    }

    /// Check the mode/day-list table.
    ///
    /// | mode | weekDays | monthDays |
    /// |---|---|---|
    /// | None, Hourly, Daily, Yearly | empty | empty |
    /// | Weekly | non-empty | empty |
    /// | Monthly | empty | non-empty |
    ///
    /// # Errors
    ///
    /// Returns a [`TimeError`] naming the violated constraint.
    pub fn validate(&self) -> TimeResult<()> {
        if let Some(day) = self.week_days.iter().find(|d| **d < 1 || **d > 7) {
            return Err(TimeError::WeekDayOutOfRange(*day));
        }
        if let Some(day) = self.month_days.iter().find(|d| **d < 1 || **d > 31) {
            return Err(TimeError::MonthDayOutOfRange(*day));
        }
        let lists_ok = match self.mode {
            RepeatingMode::None
            | RepeatingMode::Hourly
            | RepeatingMode::Daily
            | RepeatingMode::Yearly => self.week_days.is_empty() && self.month_days.is_empty(),
            RepeatingMode::Weekly => !self.week_days.is_empty() && self.month_days.is_empty(),
            RepeatingMode::Monthly => self.week_days.is_empty() && !self.month_days.is_empty(),
        };
        if lists_ok {
            Ok(())
        } else {
            Err(TimeError::DayListMismatch { mode: self.mode })
        }
    }

    /// Whether the week-day filter admits the given instant.
    ///
    /// Vacuously true on an empty list.
    #[must_use]
    pub fn evaluate_week_day(&self, date_time: NaiveDateTime) -> bool {
        let day = u8::try_from(date_time.weekday().number_from_monday()).unwrap_or(0);
        self.week_days.is_empty() || self.week_days.contains(&day)
    }

    /// Whether the month-day filter admits the given instant.
    ///
    /// Vacuously true on an empty list.
    #[must_use]
    pub fn evaluate_month_day(&self, date_time: NaiveDateTime) -> bool {
        let day = u8::try_from(date_time.day()).unwrap_or(0);
        self.month_days.is_empty() || self.month_days.contains(&day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_validity_table() {
        assert!(RepeatingOption::none().validate().is_ok());
        assert!(RepeatingOption::with_mode(RepeatingMode::Hourly).validate().is_ok());
        assert!(RepeatingOption::weekly(vec![1, 5]).validate().is_ok());
        assert!(RepeatingOption::monthly(vec![1, 15, 31]).validate().is_ok());

        // Weekly without days, daily with days, monthly with week days.
        assert!(RepeatingOption::weekly(vec![]).validate().is_err());
        let mut daily = RepeatingOption::with_mode(RepeatingMode::Daily);
        daily.week_days = vec![1];
        assert!(daily.validate().is_err());
        let mut monthly = RepeatingOption::monthly(vec![1]);
        monthly.week_days = vec![2];
        assert!(monthly.validate().is_err());
    }

    #[test]
    fn test_day_ranges() {
        assert_eq!(
            RepeatingOption::weekly(vec![8]).validate(),
            Err(TimeError::WeekDayOutOfRange(8))
        );
        assert_eq!(
            RepeatingOption::monthly(vec![0]).validate(),
            Err(TimeError::MonthDayOutOfRange(0))
        );
        assert_eq!(
            RepeatingOption::monthly(vec![32]).validate(),
            Err(TimeError::MonthDayOutOfRange(32))
        );
    }

    #[test]
    fn test_week_day_filter() {
        // 2026-01-05 is a Monday.
        let monday = at(2026, 1, 5);
        let saturday = at(2026, 1, 10);
        let option = RepeatingOption::weekly(vec![1, 2, 3, 4, 5]);
        assert!(option.evaluate_week_day(monday));
        assert!(!option.evaluate_week_day(saturday));
        assert!(RepeatingOption::none().evaluate_week_day(saturday));
    }

    #[test]
    fn test_month_day_filter() {
        let fifth = at(2026, 3, 5);
        let option = RepeatingOption::monthly(vec![1, 5]);
        assert!(option.evaluate_month_day(fifth));
        assert!(!option.evaluate_month_day(at(2026, 3, 6)));
        assert!(RepeatingOption::none().evaluate_month_day(fifth));
    }
}
