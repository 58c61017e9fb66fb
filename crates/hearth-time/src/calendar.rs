//! Calendar items: recurring or one-shot time windows.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use hearth_types::CalendarItemId;

use crate::error::{TimeError, TimeResult};
use crate::repeating::{RepeatingMode, RepeatingOption};

/// Minutes in an hour.
const HOUR_MINUTES: u32 = 60;
/// Minutes in a day.
const DAY_MINUTES: u32 = 1440;
/// Minutes in a week.
const WEEK_MINUTES: u32 = 10080;

/// A time window that rules in calendar mode stay active within.
///
/// Anchored either on a concrete `date_time` (one-shot, or yearly when
/// repeating) or on a `start_time` of day (recurring). Exactly one anchor is
/// set; the window extends `duration_minutes` from the anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    /// Unique id of this item.
    pub id: CalendarItemId,
    /// Concrete anchor for one-shot and yearly windows.
    #[serde(default)]
    pub date_time: Option<NaiveDateTime>,
    /// Time-of-day anchor for recurring windows.
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    /// Window length in minutes; must be positive.
    pub duration_minutes: u32,
    /// Repetition and day filters.
    #[serde(default)]
    pub repeating: RepeatingOption,
}

impl CalendarItem {
    /// A recurring window starting at a time of day.
    #[must_use]
    pub fn starting_at(start_time: NaiveTime, duration_minutes: u32) -> Self {
        Self {
            id: CalendarItemId::new(),
            date_time: None,
            start_time: Some(start_time),
            duration_minutes,
            repeating: RepeatingOption::none(),
        }
    }

    /// A window anchored on a concrete instant.
    #[must_use]
    pub fn at(date_time: NaiveDateTime, duration_minutes: u32) -> Self {
        Self {
            id: CalendarItemId::new(),
            date_time: Some(date_time),
            start_time: None,
            duration_minutes,
            repeating: RepeatingOption::none(),
        }
    }

    /// Set the repetition.
    #[must_use]
    pub fn repeating(mut self, repeating: RepeatingOption) -> Self {
        self.repeating = repeating;
        self
    }

    /// Check structural validity.
    ///
    /// Exactly one anchor must be set, the duration must be positive, the
    /// repeating option must satisfy its table, a `date_time` anchor admits
    /// only `None`/`Yearly` repetition, and yearly repetition requires a
    /// `date_time` anchor.
    ///
    /// # Errors
    ///
    /// Returns a [`TimeError`] naming the violated constraint.
    pub fn validate(&self) -> TimeResult<()> {
        if self.date_time.is_some() == self.start_time.is_some() {
            return Err(TimeError::AmbiguousAnchor);
        }
        if self.duration_minutes == 0 {
            return Err(TimeError::ZeroDuration);
        }
        self.repeating.validate()?;
        if self.date_time.is_some()
            && !self.repeating.is_empty()
            && self.repeating.mode != RepeatingMode::Yearly
        {
            return Err(TimeError::DateTimeRepetition {
                mode: self.repeating.mode,
            });
        }
        if self.start_time.is_some() && self.repeating.mode == RepeatingMode::Yearly {
            return Err(TimeError::YearlyWithoutDateTime);
        }
        Ok(())
    }

    /// Whether `now` lies within this item's window.
    #[must_use]
    pub fn evaluate(&self, now: NaiveDateTime) -> bool {
        if let Some(start_time) = self.start_time {
            return match self.repeating.mode {
                // An undeclared repetition on a start time means daily.
                RepeatingMode::None | RepeatingMode::Daily => self.evaluate_daily(now, start_time),
                RepeatingMode::Hourly => self.evaluate_hourly(now, start_time),
                RepeatingMode::Weekly => self.evaluate_weekly(now, start_time),
                RepeatingMode::Monthly => self.evaluate_monthly(now, start_time),
                // Rejected by validate(); a yearly window needs a date.
                RepeatingMode::Yearly => false,
            };
        }
        let Some(date_time) = self.date_time else {
            return false;
        };
        if self.repeating.mode == RepeatingMode::Yearly {
            return self.evaluate_yearly(now, date_time);
        }
        self.in_window(now, date_time)
    }

    fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    fn in_window(&self, now: NaiveDateTime, start: NaiveDateTime) -> bool {
        now >= start && now < start + self.duration()
    }

    fn evaluate_hourly(&self, now: NaiveDateTime, start_time: NaiveTime) -> bool {
        if self.duration_minutes >= HOUR_MINUTES {
            return true;
        }
        // Anchor on this hour; the window may wrap into the next hour, so the
        // previous hour's occurrence is tested as well.
        let Some(anchor_time) = NaiveTime::from_hms_opt(now.hour(), start_time.minute(), 0) else {
            return false;
        };
        let start = now.date().and_time(anchor_time);
        let time_ok = self.in_window(now, start) || self.in_window(now, start - Duration::hours(1));
        time_ok && self.repeating.evaluate_week_day(now) && self.repeating.evaluate_month_day(now)
    }

    fn evaluate_daily(&self, now: NaiveDateTime, start_time: NaiveTime) -> bool {
        if self.duration_minutes >= DAY_MINUTES {
            return true;
        }
        let start_today = now.date().and_time(start_time);
        // Yesterday's occurrence covers windows spanning midnight.
        self.in_window(now, start_today) || self.in_window(now, start_today - Duration::days(1))
    }

    fn evaluate_weekly(&self, now: NaiveDateTime, start_time: NaiveTime) -> bool {
        if self.duration_minutes >= WEEK_MINUTES {
            return true;
        }
        let day_of_week = i64::from(now.weekday().number_from_monday());
        let week_base = (now.date() - Duration::days(day_of_week)).and_time(start_time);
        for &week_day in &self.repeating.week_days {
            let start = week_base + Duration::days(i64::from(week_day));
            if self.in_window(now, start) {
                return true;
            }
            // Windows spilling into the next ISO week also occur one week
            // earlier relative to a request from that following week.
            let end = start + self.duration();
            if start.date().iso_week() != end.date().iso_week()
                && self.in_window(now, start - Duration::days(7))
            {
                return true;
            }
        }
        false
    }

    fn evaluate_monthly(&self, now: NaiveDateTime, start_time: NaiveTime) -> bool {
        let Some(first_of_month) = now.date().with_day(1) else {
            return false;
        };
        for &month_day in &self.repeating.month_days {
            let offset = Duration::days(i64::from(month_day) - 1);
            let mut start = first_of_month.and_time(start_time) + offset;
            // An occurrence still ahead of us cannot contain now; the
            // previous month's occurrence may. That one is recomputed from
            // the previous month's first day so a day-31 window lands on the
            // last day of a shorter month's successor, not on a clamped date.
            if start > now {
                match first_of_month.checked_sub_months(Months::new(1)) {
                    Some(previous_first) => start = previous_first.and_time(start_time) + offset,
                    None => continue,
                }
            }
            if self.in_window(now, start) {
                return true;
            }
        }
        false
    }

    fn evaluate_yearly(&self, now: NaiveDateTime, date_time: NaiveDateTime) -> bool {
        // Anchor the stored month/day/time to the current year. A Feb 29
        // anchor does not resolve in non-leap years; the item is inactive
        // for that year.
        let Some(date) = NaiveDate::from_ymd_opt(now.year(), date_time.month(), date_time.day())
        else {
            return false;
        };
        let start = date.and_time(date_time.time());
        if self.in_window(now, start) {
            return true;
        }
        let end = start + self.duration();
        if start.year() != end.year()
            && let Some(previous_date) =
                NaiveDate::from_ymd_opt(now.year() - 1, date_time.month(), date_time.day())
        {
            return self.in_window(now, previous_date.and_time(date_time.time()));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date_time(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_validate_anchors() {
        let both = CalendarItem {
            id: CalendarItemId::new(),
            date_time: Some(date_time(2026, 1, 1, 0, 0)),
            start_time: Some(time(8, 0)),
            duration_minutes: 10,
            repeating: RepeatingOption::none(),
        };
        assert_eq!(both.validate(), Err(TimeError::AmbiguousAnchor));

        let neither = CalendarItem {
            id: CalendarItemId::new(),
            date_time: None,
            start_time: None,
            duration_minutes: 10,
            repeating: RepeatingOption::none(),
        };
        assert_eq!(neither.validate(), Err(TimeError::AmbiguousAnchor));

        let zero = CalendarItem::starting_at(time(8, 0), 0);
        assert_eq!(zero.validate(), Err(TimeError::ZeroDuration));
    }

    #[test]
    fn test_validate_date_time_repetition() {
        let daily_on_date = CalendarItem::at(date_time(2026, 1, 1, 8, 0), 60)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Daily));
        assert!(matches!(
            daily_on_date.validate(),
            Err(TimeError::DateTimeRepetition { .. })
        ));

        let yearly_on_date = CalendarItem::at(date_time(2026, 1, 1, 8, 0), 60)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Yearly));
        assert!(yearly_on_date.validate().is_ok());

        let yearly_on_start_time = CalendarItem::starting_at(time(8, 0), 60)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Yearly));
        assert_eq!(
            yearly_on_start_time.validate(),
            Err(TimeError::YearlyWithoutDateTime)
        );
    }

    #[test]
    fn test_one_shot_window() {
        let item = CalendarItem::at(date_time(2026, 3, 10, 20, 0), 90);
        assert!(!item.evaluate(date_time(2026, 3, 10, 19, 59)));
        assert!(item.evaluate(date_time(2026, 3, 10, 20, 0)));
        assert!(item.evaluate(date_time(2026, 3, 10, 21, 29)));
        assert!(!item.evaluate(date_time(2026, 3, 10, 21, 30)));
    }

    #[test]
    fn test_none_mode_on_start_time_means_daily() {
        let item = CalendarItem::starting_at(time(8, 0), 60);
        assert!(item.evaluate(date_time(2026, 3, 10, 8, 30)));
        assert!(item.evaluate(date_time(2026, 3, 11, 8, 30)));
        assert!(!item.evaluate(date_time(2026, 3, 11, 9, 30)));
    }

    #[test]
    fn test_daily_full_day_is_always_active() {
        let item = CalendarItem::starting_at(time(8, 0), 1440)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Daily));
        assert!(item.evaluate(date_time(2026, 3, 10, 0, 0)));
        assert!(item.evaluate(date_time(2026, 3, 10, 7, 59)));
        assert!(item.evaluate(date_time(2026, 3, 10, 23, 59)));
    }

    #[test]
    fn test_daily_overnight_span() {
        // 22:00 for 6 hours, into the next morning.
        let item = CalendarItem::starting_at(time(22, 0), 360)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Daily));
        assert!(item.evaluate(date_time(2026, 3, 10, 23, 0)));
        assert!(item.evaluate(date_time(2026, 3, 11, 3, 0)));
        assert!(!item.evaluate(date_time(2026, 3, 11, 4, 0)));
    }

    #[test]
    fn test_hourly_window() {
        let item = CalendarItem::starting_at(time(0, 10), 20)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Hourly));
        assert!(item.evaluate(date_time(2026, 3, 10, 14, 10)));
        assert!(item.evaluate(date_time(2026, 3, 10, 14, 29)));
        assert!(!item.evaluate(date_time(2026, 3, 10, 14, 30)));
        assert!(!item.evaluate(date_time(2026, 3, 10, 14, 9)));
    }

    #[test]
    fn test_hourly_window_wraps_hour_boundary() {
        let item = CalendarItem::starting_at(time(0, 50), 20)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Hourly));
        assert!(item.evaluate(date_time(2026, 3, 10, 14, 55)));
        assert!(item.evaluate(date_time(2026, 3, 10, 15, 5)));
        assert!(!item.evaluate(date_time(2026, 3, 10, 15, 10)));
    }

    #[test]
    fn test_hourly_full_hour_is_always_active() {
        let item = CalendarItem::starting_at(time(0, 30), 60)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Hourly));
        assert!(item.evaluate(date_time(2026, 3, 10, 14, 0)));
    }

    #[test]
    fn test_weekly_working_hours() {
        // 08:00 + 480 minutes on Monday..Friday. 2026-03-09 is a Monday.
        let item = CalendarItem::starting_at(time(8, 0), 480)
            .repeating(RepeatingOption::weekly(vec![1, 2, 3, 4, 5]));
        assert!(item.evaluate(date_time(2026, 3, 9, 9, 30)));
        assert!(!item.evaluate(date_time(2026, 3, 14, 9, 30)));
        assert!(!item.evaluate(date_time(2026, 3, 9, 7, 59)));
        assert!(!item.evaluate(date_time(2026, 3, 13, 16, 0)));

        let longer = CalendarItem::starting_at(time(8, 0), 600)
            .repeating(RepeatingOption::weekly(vec![1, 2, 3, 4, 5]));
        assert!(longer.evaluate(date_time(2026, 3, 13, 15, 59)));
    }

    #[test]
    fn test_weekly_window_crossing_week_boundary() {
        // Sunday 22:00 + 6 hours runs into Monday of the next ISO week.
        let item = CalendarItem::starting_at(time(22, 0), 360)
            .repeating(RepeatingOption::weekly(vec![7]));
        // 2026-03-08 is a Sunday; 2026-03-09 the following Monday.
        assert!(item.evaluate(date_time(2026, 3, 8, 23, 0)));
        assert!(item.evaluate(date_time(2026, 3, 9, 3, 0)));
        assert!(!item.evaluate(date_time(2026, 3, 9, 4, 0)));
    }

    #[test]
    fn test_weekly_saturday_window_reaches_sunday() {
        // Saturday 22:00 + 6 hours, queried on Sunday 03:00.
        let item = CalendarItem::starting_at(time(22, 0), 360)
            .repeating(RepeatingOption::weekly(vec![6]));
        // 2026-03-07 is a Saturday, 2026-03-08 the Sunday after.
        assert!(item.evaluate(date_time(2026, 3, 8, 3, 0)));
        assert!(!item.evaluate(date_time(2026, 3, 8, 4, 0)));
    }

    #[test]
    fn test_weekly_full_week_is_always_active() {
        let item = CalendarItem::starting_at(time(8, 0), 10080)
            .repeating(RepeatingOption::weekly(vec![3]));
        assert!(item.evaluate(date_time(2026, 3, 14, 2, 0)));
    }

    #[test]
    fn test_monthly_window() {
        let item = CalendarItem::starting_at(time(10, 0), 60)
            .repeating(RepeatingOption::monthly(vec![15]));
        assert!(item.evaluate(date_time(2026, 3, 15, 10, 30)));
        assert!(!item.evaluate(date_time(2026, 3, 15, 11, 0)));
        assert!(!item.evaluate(date_time(2026, 3, 14, 10, 30)));
        // Early in the month the occurrence is still ahead; the previous
        // month's window does not contain now either.
        assert!(!item.evaluate(date_time(2026, 3, 3, 10, 30)));
    }

    #[test]
    fn test_monthly_window_spanning_month_start() {
        // Last day of March 23:00 + 2 hours reaches into April 1st.
        let item = CalendarItem::starting_at(time(23, 0), 120)
            .repeating(RepeatingOption::monthly(vec![31]));
        assert!(item.evaluate(date_time(2026, 3, 31, 23, 30)));
        assert!(item.evaluate(date_time(2026, 4, 1, 0, 30)));
    }

    #[test]
    fn test_yearly_window() {
        let item = CalendarItem::at(date_time(2024, 6, 1, 12, 0), 120)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Yearly));
        assert!(item.evaluate(date_time(2026, 6, 1, 12, 30)));
        assert!(!item.evaluate(date_time(2026, 6, 1, 14, 0)));
        assert!(item.evaluate(date_time(2027, 6, 1, 13, 59)));
    }

    #[test]
    fn test_yearly_window_crossing_year_boundary() {
        let item = CalendarItem::at(date_time(2024, 12, 31, 23, 0), 120)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Yearly));
        assert!(item.evaluate(date_time(2026, 12, 31, 23, 30)));
        assert!(item.evaluate(date_time(2027, 1, 1, 0, 30)));
        assert!(!item.evaluate(date_time(2027, 1, 1, 1, 0)));
    }

    #[test]
    fn test_yearly_feb_29_skips_non_leap_years() {
        let item = CalendarItem::at(date_time(2024, 2, 29, 8, 0), 60)
            .repeating(RepeatingOption::with_mode(RepeatingMode::Yearly));
        assert!(item.evaluate(date_time(2024, 2, 29, 8, 30)));
        assert!(item.evaluate(date_time(2028, 2, 29, 8, 30)));
        // 2026 has no Feb 29; the anchor does not resolve and the item
        // stays inactive the whole year.
        assert!(!item.evaluate(date_time(2026, 2, 28, 8, 30)));
        assert!(!item.evaluate(date_time(2026, 3, 1, 8, 30)));
    }
}
