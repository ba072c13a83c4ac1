//! Dated, column-oriented dataset files.
//!
//! Each fetch run writes one [`Snapshot`] named `<prefix>_<YYYYMMDD>.json`.
//! The file stores one array per column, all of the same length, plus a small
//! header. Rerunning on the same day replaces that day's file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::category::Category;
use crate::event::{CategorizedEvent, NormalizedEvent};
use crate::time::EventTime;

/// Default file-name prefix.
pub const DEFAULT_PREFIX: &str = "calendar_db";

const EXTENSION: &str = "json";

/// Errors reading or writing snapshot files.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("no snapshot found in {0}")]
    NotFound(PathBuf),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Column arrays, one entry per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotColumns {
    pub event_id: Vec<String>,
    pub summary: Vec<String>,
    pub description: Vec<Option<String>>,
    pub location: Vec<Option<String>>,
    pub calendar_name: Vec<String>,
    pub calendar_id: Vec<String>,
    pub start_time: Vec<EventTime>,
    pub end_time: Vec<EventTime>,
    pub all_day: Vec<bool>,
    pub duration_minutes: Vec<Option<f64>>,
    pub attendees: Vec<Vec<String>>,
    pub attendee_count: Vec<usize>,
    pub day_of_week: Vec<String>,
    pub week_number: Vec<u32>,
    pub day: Vec<u32>,
    pub month: Vec<String>,
    pub year: Vec<i32>,
    pub hour_of_day: Vec<Option<u32>>,
    pub event_category: Vec<Category>,
}

impl SnapshotColumns {
    fn push(&mut self, row: CategorizedEvent) {
        let CategorizedEvent {
            event,
            event_category,
        } = row;
        self.event_id.push(event.event_id);
        self.summary.push(event.summary);
        self.description.push(event.description);
        self.location.push(event.location);
        self.calendar_name.push(event.calendar_name);
        self.calendar_id.push(event.calendar_id);
        self.start_time.push(event.start_time);
        self.end_time.push(event.end_time);
        self.all_day.push(event.all_day);
        self.duration_minutes.push(event.duration_minutes);
        self.attendees.push(event.attendees);
        self.attendee_count.push(event.attendee_count);
        self.day_of_week.push(event.day_of_week);
        self.week_number.push(event.week_number);
        self.day.push(event.day);
        self.month.push(event.month);
        self.year.push(event.year);
        self.hour_of_day.push(event.hour_of_day);
        self.event_category.push(event_category);
    }

    fn check_lengths(&self, expected: usize) -> SnapshotResult<()> {
        let lengths = [
            ("event_id", self.event_id.len()),
            ("summary", self.summary.len()),
            ("description", self.description.len()),
            ("location", self.location.len()),
            ("calendar_name", self.calendar_name.len()),
            ("calendar_id", self.calendar_id.len()),
            ("start_time", self.start_time.len()),
            ("end_time", self.end_time.len()),
            ("all_day", self.all_day.len()),
            ("duration_minutes", self.duration_minutes.len()),
            ("attendees", self.attendees.len()),
            ("attendee_count", self.attendee_count.len()),
            ("day_of_week", self.day_of_week.len()),
            ("week_number", self.week_number.len()),
            ("day", self.day.len()),
            ("month", self.month.len()),
            ("year", self.year.len()),
            ("hour_of_day", self.hour_of_day.len()),
            ("event_category", self.event_category.len()),
        ];

        match lengths.iter().find(|(_, len)| *len != expected) {
            Some(&(column, found)) => Err(SnapshotError::ColumnLength {
                column,
                expected,
                found,
            }),
            None => Ok(()),
        }
    }
}

/// One run's categorized dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the run produced the dataset.
    pub generated_at: DateTime<Utc>,
    /// Lookback window of the run, in days.
    pub window_days: u32,
    /// Number of rows in every column.
    pub row_count: usize,
    pub columns: SnapshotColumns,
}

impl Snapshot {
    /// Builds a snapshot from rows, keeping their order.
    pub fn from_rows(
        rows: Vec<CategorizedEvent>,
        generated_at: DateTime<Utc>,
        window_days: u32,
    ) -> Self {
        let row_count = rows.len();
        let mut columns = SnapshotColumns::default();
        for row in rows {
            columns.push(row);
        }
        Self {
            generated_at,
            window_days,
            row_count,
            columns,
        }
    }

    /// Reassembles the rows.
    ///
    /// Fails if any column length disagrees with `row_count`.
    pub fn rows(&self) -> SnapshotResult<Vec<CategorizedEvent>> {
        let c = &self.columns;
        c.check_lengths(self.row_count)?;

        let rows = (0..self.row_count)
            .map(|i| {
                let event = NormalizedEvent {
                    event_id: c.event_id[i].clone(),
                    summary: c.summary[i].clone(),
                    description: c.description[i].clone(),
                    location: c.location[i].clone(),
                    calendar_name: c.calendar_name[i].clone(),
                    calendar_id: c.calendar_id[i].clone(),
                    start_time: c.start_time[i].clone(),
                    end_time: c.end_time[i].clone(),
                    all_day: c.all_day[i],
                    duration_minutes: c.duration_minutes[i],
                    attendees: c.attendees[i].clone(),
                    attendee_count: c.attendee_count[i],
                    day_of_week: c.day_of_week[i].clone(),
                    week_number: c.week_number[i],
                    day: c.day[i],
                    month: c.month[i].clone(),
                    year: c.year[i],
                    hour_of_day: c.hour_of_day[i],
                };
                CategorizedEvent::new(event, c.event_category[i])
            })
            .collect();
        Ok(rows)
    }

    /// File name for a run on `date`, e.g. `calendar_db_20250506.json`.
    pub fn file_name(prefix: &str, date: NaiveDate) -> String {
        format!("{}_{}.{}", prefix, date.format("%Y%m%d"), EXTENSION)
    }

    /// Writes the snapshot into `dir`, named after the `generated_at` date.
    ///
    /// The file is written to a temporary path first and renamed into
    /// place.
    pub fn write(&self, dir: &Path, prefix: &str) -> SnapshotResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|source| SnapshotError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(Self::file_name(prefix, self.generated_at.date_naive()));
        let temp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string(self).map_err(|source| SnapshotError::Json {
            path: path.clone(),
            source,
        })?;

        fs::write(&temp_path, content).map_err(|source| SnapshotError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;

        info!(rows = self.row_count, "wrote snapshot to {:?}", path);
        Ok(path)
    }

    /// Reads a snapshot file.
    pub fn read(path: &Path) -> SnapshotResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Self = serde_json::from_str(&content).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        snapshot.columns.check_lengths(snapshot.row_count)?;
        debug!(rows = snapshot.row_count, "read snapshot {:?}", path);
        Ok(snapshot)
    }

    /// Finds the most recent snapshot file in `dir` for `prefix`.
    ///
    /// The date stamp sorts lexically, so the greatest matching name is the
    /// newest. Returns `Ok(None)` when the directory is missing or holds no
    /// matching file.
    pub fn latest_in(dir: &Path, prefix: &str) -> SnapshotResult<Option<PathBuf>> {
        if !dir.exists() {
            return Ok(None);
        }

        let entries = fs::read_dir(dir).map_err(|source| SnapshotError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let latest = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| is_snapshot_name(name, prefix))
            })
            .max();

        Ok(latest)
    }

    /// Like [`Snapshot::latest_in`], but reads the file and fails when none
    /// exists.
    pub fn load_latest(dir: &Path, prefix: &str) -> SnapshotResult<Self> {
        let path =
            Self::latest_in(dir, prefix)?.ok_or_else(|| SnapshotError::NotFound(dir.to_path_buf()))?;
        Self::read(&path)
    }
}

fn is_snapshot_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name.strip_prefix(prefix).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    let Some(stamp) = rest.strip_suffix(".json") else {
        return false;
    };
    stamp.len() == 8 && stamp.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rows() -> Vec<CategorizedEvent> {
        let start = DateTime::parse_from_rfc3339("2025-01-06T09:00:00+01:00").unwrap();
        let end = DateTime::parse_from_rfc3339("2025-01-06T10:30:00+01:00").unwrap();
        let timed = NormalizedEvent::timed("e1", "Team meeting", start, end)
            .with_calendar("Lavoro", "work@example.com")
            .with_description("weekly")
            .with_attendees(vec!["a@example.com".into(), String::new()]);

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let all_day = NormalizedEvent::all_day("e2", "Compleanno", day, day.succ_opt().unwrap())
            .with_location("Casa");

        vec![
            CategorizedEvent::new(timed, Category::Meeting),
            CategorizedEvent::new(all_day, Category::PersonalEvent),
        ]
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 18, 0, 0).unwrap()
    }

    #[test]
    fn file_name_has_date_stamp() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        assert_eq!(
            Snapshot::file_name(DEFAULT_PREFIX, date),
            "calendar_db_20250506.json"
        );
    }

    #[test]
    fn columns_keep_row_order() {
        let snapshot = Snapshot::from_rows(rows(), generated_at(), 30);
        assert_eq!(snapshot.row_count, 2);
        assert_eq!(snapshot.columns.event_id, vec!["e1", "e2"]);
        assert_eq!(snapshot.columns.all_day, vec![false, true]);
        assert_eq!(snapshot.columns.duration_minutes, vec![Some(90.0), None]);
        assert_eq!(snapshot.rows().unwrap(), rows());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::from_rows(rows(), generated_at(), 90);

        let path = snapshot.write(dir.path(), DEFAULT_PREFIX).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "calendar_db_20250506.json"
        );
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = Snapshot::read(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.rows().unwrap(), rows());
    }

    #[test]
    fn same_day_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        Snapshot::from_rows(rows(), generated_at(), 30)
            .write(dir.path(), DEFAULT_PREFIX)
            .unwrap();
        let path = Snapshot::from_rows(Vec::new(), generated_at(), 30)
            .write(dir.path(), DEFAULT_PREFIX)
            .unwrap();

        assert_eq!(Snapshot::read(&path).unwrap().row_count, 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn latest_picks_newest_stamp() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "calendar_db_20250101.json",
            "calendar_db_20250506.json",
            "calendar_db_20250302.json",
            "other_20991231.json",
            "calendar_db_notes.json",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }

        let latest = Snapshot::latest_in(dir.path(), DEFAULT_PREFIX)
            .unwrap()
            .unwrap();
        assert_eq!(
            latest.file_name().unwrap().to_str().unwrap(),
            "calendar_db_20250506.json"
        );
    }

    #[test]
    fn latest_in_missing_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(Snapshot::latest_in(&missing, DEFAULT_PREFIX).unwrap().is_none());
        assert!(matches!(
            Snapshot::load_latest(&missing, DEFAULT_PREFIX),
            Err(SnapshotError::NotFound(_))
        ));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let mut snapshot = Snapshot::from_rows(rows(), generated_at(), 30);
        snapshot.columns.summary.pop();
        let err = snapshot.rows().unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::ColumnLength {
                column: "summary",
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn invalid_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar_db_20250506.json");
        fs::write(&path, "not json").unwrap();
        let err = Snapshot::read(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Json { .. }));
        assert!(err.to_string().contains("calendar_db_20250506.json"));
    }
}
