//! Event records produced by the pipeline.
//!
//! - [`NormalizedEvent`]: one flat row per calendar event, with the derived
//!   calendar fields used for charting
//! - [`CategorizedEvent`]: a normalized row plus its keyword category

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::time::EventTime;

/// Summary used when the source event has no title.
pub const DEFAULT_SUMMARY: &str = "Evento senza titolo";

/// Calendar name and id used for events fetched from the primary calendar
/// without a source-calendar tag.
pub const PRIMARY_CALENDAR: &str = "primary";

/// A flattened calendar event.
///
/// Built only through [`NormalizedEvent::timed`] or
/// [`NormalizedEvent::all_day`], so `all_day`, `duration_minutes` and
/// `hour_of_day` always agree: an all-day event has neither a duration nor an
/// hour, a timed event has both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Provider identifier of the event.
    pub event_id: String,
    /// Event title.
    pub summary: String,
    /// Free-text description, if any.
    pub description: Option<String>,
    /// Location, if any.
    pub location: Option<String>,
    /// Display name of the source calendar.
    pub calendar_name: String,
    /// Identifier of the source calendar.
    pub calendar_id: String,
    /// When the event starts.
    pub start_time: EventTime,
    /// When the event ends.
    pub end_time: EventTime,
    /// Whether the event is specified by date only.
    pub all_day: bool,
    /// Elapsed minutes between start and end; `None` for all-day events.
    pub duration_minutes: Option<f64>,
    /// Attendee contact addresses.
    pub attendees: Vec<String>,
    /// Number of attendees.
    pub attendee_count: usize,
    /// English weekday name of the start date.
    pub day_of_week: String,
    /// ISO week number of the start date.
    pub week_number: u32,
    /// Day of month of the start date.
    pub day: u32,
    /// English month name of the start date.
    pub month: String,
    /// Year of the start date.
    pub year: i32,
    /// Hour of the start time; `None` for all-day events.
    pub hour_of_day: Option<u32>,
}

impl NormalizedEvent {
    /// Creates a timed event. Calendar fields are taken from `start` in its
    /// own offset.
    pub fn timed(
        event_id: impl Into<String>,
        summary: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        let elapsed = end.signed_duration_since(start);
        let duration_minutes = elapsed.num_milliseconds() as f64 / 60_000.0;

        Self::build(
            event_id.into(),
            summary.into(),
            EventTime::from_datetime(start),
            EventTime::from_datetime(end),
            Some(duration_minutes),
            Some(start.hour()),
        )
    }

    /// Creates an all-day event spanning `start` to `end` (end exclusive, as
    /// calendar providers report it).
    pub fn all_day(
        event_id: impl Into<String>,
        summary: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self::build(
            event_id.into(),
            summary.into(),
            EventTime::from_date(start),
            EventTime::from_date(end),
            None,
            None,
        )
    }

    fn build(
        event_id: String,
        summary: String,
        start_time: EventTime,
        end_time: EventTime,
        duration_minutes: Option<f64>,
        hour_of_day: Option<u32>,
    ) -> Self {
        let date = start_time.date();
        Self {
            event_id,
            summary,
            description: None,
            location: None,
            calendar_name: PRIMARY_CALENDAR.to_string(),
            calendar_id: PRIMARY_CALENDAR.to_string(),
            all_day: start_time.is_all_day(),
            start_time,
            end_time,
            duration_minutes,
            attendees: Vec::new(),
            attendee_count: 0,
            day_of_week: date.format("%A").to_string(),
            week_number: date.iso_week().week(),
            day: date.day(),
            month: date.format("%B").to_string(),
            year: date.year(),
            hour_of_day,
        }
    }

    /// Builder method to set the source calendar.
    pub fn with_calendar(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self.calendar_id = id.into();
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the attendee addresses; also updates the count.
    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendee_count = attendees.len();
        self.attendees = attendees;
        self
    }

    /// Returns the start date in the event's own offset.
    pub fn start_date(&self) -> NaiveDate {
        self.start_time.date()
    }
}

/// A normalized event with its keyword category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedEvent {
    /// The normalized row.
    #[serde(flatten)]
    pub event: NormalizedEvent,
    /// Category assigned by the categorizer.
    pub event_category: Category,
}

impl CategorizedEvent {
    /// Pairs an event with its category.
    pub fn new(event: NormalizedEvent, event_category: Category) -> Self {
        Self {
            event,
            event_category,
        }
    }
}
