//! Raw event records as a provider returns them.
//!
//! [`RawEvent`] mirrors the Google Calendar `events` resource (camelCase on
//! the wire). Start and end markers stay unparsed strings here; the
//! normalizer validates them and reports the offending event when they are
//! missing or malformed.

use serde::{Deserialize, Serialize};

/// Start or end marker of a raw event.
///
/// A timed event carries `dateTime` (RFC 3339); an all-day event carries
/// `date` (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// IANA zone the event was created in, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    pub fn date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Self::default()
        }
    }

    /// Returns true when only a date is given.
    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}

/// An event attendee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttendee {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// `accepted`, `declined`, `tentative` or `needsAction`.
    #[serde(default)]
    pub response_status: Option<String>,
    #[serde(default)]
    pub organizer: Option<bool>,
    #[serde(default, rename = "self")]
    pub is_self: Option<bool>,
}

impl RawAttendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

/// A calendar event before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// `confirmed`, `tentative` or `cancelled`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub recurring_event_id: Option<String>,
    #[serde(default)]
    pub start: Option<RawEventTime>,
    #[serde(default)]
    pub end: Option<RawEventTime>,
    #[serde(default)]
    pub attendees: Option<Vec<RawAttendee>>,

    /// Source calendar name, set by the fetcher on multi-calendar fetches.
    #[serde(default)]
    pub calendar_name: Option<String>,
    /// Source calendar id, set alongside `calendar_name`.
    #[serde(default)]
    pub calendar_id: Option<String>,
}

impl RawEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builder method to set RFC 3339 start and end.
    pub fn timed(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = Some(RawEventTime::date_time(start));
        self.end = Some(RawEventTime::date_time(end));
        self
    }

    /// Builder method to set `YYYY-MM-DD` start and end.
    pub fn all_day(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = Some(RawEventTime::date(start));
        self.end = Some(RawEventTime::date(end));
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder method to append an attendee, creating the list if needed.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.get_or_insert_with(Vec::new).push(attendee);
        self
    }

    /// Builder method to tag the source calendar.
    pub fn with_calendar(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.calendar_name = Some(name.into());
        self.calendar_id = Some(id.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }
}
