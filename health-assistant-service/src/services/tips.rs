//! Daily health tip selection.

use chrono::{Datelike, NaiveDate, Utc};

/// Index of the tip shown on `date`: day of month modulo the list length.
pub fn daily_tip_index(date: NaiveDate, tip_count: usize) -> Option<usize> {
    (tip_count > 0).then(|| date.day() as usize % tip_count)
}

/// The tip for `date`, or `None` for an empty list.
pub fn tip_for_date(tips: &[String], date: NaiveDate) -> Option<&str> {
    daily_tip_index(date, tips.len()).map(|idx| tips[idx].as_str())
}

/// Today's date in UTC, the calendar used for daily tips.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
