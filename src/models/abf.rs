use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One credential block of a batch file, with its timesheet rows in file order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub username: String,
    pub password: String,
    pub timesheet_rows: Vec<TimesheetRow>,
}

/// A single `year;month;day;task;hours` line.
///
/// No range checks happen here, the remote service decides what a valid
/// day or task is.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimesheetRow {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub task_id: i64,
    pub hours: i32,
}

impl TimesheetRow {
    /// The calendar date of this row, or `None` if it does not exist.
    pub fn date(&self) -> Option<NaiveDate> {
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        NaiveDate::from_ymd_opt(self.year, month, day)
    }

    /// Date as sent to actiTIME: month and day zero-padded, year as written.
    pub fn date_query(&self) -> String {
        format!("{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl BatchEntry {
    pub fn total_hours(&self) -> i64 {
        self.timesheet_rows.iter().map(|row| i64::from(row.hours)).sum()
    }
}

// Keeps the password out of logs.
impl fmt::Display for BatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} rows, {} hours)",
            self.username,
            self.timesheet_rows.len(),
            self.total_hours()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32, month: i32, day: i32) -> TimesheetRow {
        TimesheetRow {
            year,
            month,
            day,
            task_id: 558,
            hours: 1,
        }
    }

    #[test]
    fn date_query_pads_month_and_day() {
        assert_eq!(row(2019, 8, 9).date_query(), "2019-08-09");
        assert_eq!(row(2019, 12, 19).date_query(), "2019-12-19");
    }

    #[test]
    fn date_rejects_impossible_days() {
        assert_eq!(row(2019, 2, 29).date(), None);
        assert_eq!(
            row(2020, 2, 29).date(),
            NaiveDate::from_ymd_opt(2020, 2, 29)
        );
        assert_eq!(row(2020, -2, 29).date(), None);
    }

    #[test]
    fn display_hides_password() {
        let entry = BatchEntry {
            username: "john.doe".to_string(),
            password: "FooBar18".to_string(),
            timesheet_rows: vec![row(2019, 8, 19), row(2019, 8, 20)],
        };
        let shown = entry.to_string();
        assert_eq!(shown, "john.doe (2 rows, 2 hours)");
        assert!(!shown.contains("FooBar18"));
    }
}
