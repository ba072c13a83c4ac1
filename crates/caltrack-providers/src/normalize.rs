//! RawEvent to NormalizedEvent conversion.
//!
//! Normalization is one-to-one: every raw event yields exactly one
//! [`NormalizedEvent`] or a [`MalformedEventError`] naming the event. Nothing
//! is skipped, since a silently dropped record would skew every aggregate
//! computed downstream.
//!
//! The time representation is chosen from the start marker: a `dateTime`
//! makes both ends RFC 3339 timestamps, otherwise both ends must be plain
//! dates and the event is all-day.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;
use tracing::debug;

use caltrack_core::{DEFAULT_SUMMARY, NormalizedEvent, PRIMARY_CALENDAR};

use crate::raw_event::{RawEvent, RawEventTime};

/// Which end of the event a problem refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Start,
    End,
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeField::Start => f.write_str("start"),
            TimeField::End => f.write_str("end"),
        }
    }
}

/// What is wrong with a malformed event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEventKind {
    #[error("{field} has neither a timestamp nor a date")]
    MissingTime { field: TimeField },

    #[error("start is a timestamp but end is a date")]
    MixedRepresentation,

    #[error("invalid {field} timestamp '{value}': {reason}")]
    InvalidTimestamp {
        field: TimeField,
        value: String,
        reason: String,
    },

    #[error("invalid {field} date '{value}': {reason}")]
    InvalidDate {
        field: TimeField,
        value: String,
        reason: String,
    },
}

/// A raw event that cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed event '{event_id}': {kind}")]
pub struct MalformedEventError {
    pub event_id: String,
    #[source]
    pub kind: MalformedEventKind,
}

impl MalformedEventError {
    fn new(raw: &RawEvent, kind: MalformedEventKind) -> Self {
        Self {
            event_id: raw.id.clone(),
            kind,
        }
    }
}

/// Converts one raw event.
pub fn normalize_event(raw: &RawEvent) -> Result<NormalizedEvent, MalformedEventError> {
    let summary = raw.summary.as_deref().unwrap_or(DEFAULT_SUMMARY);
    let start = raw.start.as_ref();
    let end = raw.end.as_ref();

    let event = match start.and_then(|s| s.date_time.as_deref()) {
        Some(start_value) => {
            let end_value = match end {
                Some(RawEventTime {
                    date_time: Some(v), ..
                }) => v.as_str(),
                Some(RawEventTime { date: Some(_), .. }) => {
                    return Err(MalformedEventError::new(
                        raw,
                        MalformedEventKind::MixedRepresentation,
                    ));
                }
                _ => return Err(missing(raw, TimeField::End)),
            };
            let start_dt = parse_timestamp(raw, TimeField::Start, start_value)?;
            let end_dt = parse_timestamp(raw, TimeField::End, end_value)?;
            NormalizedEvent::timed(&raw.id, summary, start_dt, end_dt)
        }
        None => {
            let start_value = start
                .and_then(|s| s.date.as_deref())
                .ok_or_else(|| missing(raw, TimeField::Start))?;
            let end_value = match end {
                Some(RawEventTime { date: Some(v), .. }) => v.as_str(),
                Some(RawEventTime {
                    date_time: Some(_), ..
                }) => {
                    return Err(MalformedEventError::new(
                        raw,
                        MalformedEventKind::MixedRepresentation,
                    ));
                }
                _ => return Err(missing(raw, TimeField::End)),
            };
            let start_date = parse_date(raw, TimeField::Start, start_value)?;
            let end_date = parse_date(raw, TimeField::End, end_value)?;
            NormalizedEvent::all_day(&raw.id, summary, start_date, end_date)
        }
    };

    let mut event = event
        .with_calendar(
            raw.calendar_name.as_deref().unwrap_or(PRIMARY_CALENDAR),
            raw.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR),
        )
        .with_attendees(attendee_addresses(raw));

    if let Some(ref description) = raw.description {
        event = event.with_description(description);
    }
    if let Some(ref location) = raw.location {
        event = event.with_location(location);
    }

    Ok(event)
}

/// Converts a batch, keeping order. The first malformed event aborts the
/// batch.
pub fn normalize_events(raw_events: &[RawEvent]) -> Result<Vec<NormalizedEvent>, MalformedEventError> {
    let events = raw_events
        .iter()
        .map(normalize_event)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = events.len(), "normalized events");
    Ok(events)
}

fn missing(raw: &RawEvent, field: TimeField) -> MalformedEventError {
    MalformedEventError::new(raw, MalformedEventKind::MissingTime { field })
}

/// Parses RFC 3339; a trailing `Z` becomes an explicit `+00:00` offset.
fn parse_timestamp(
    raw: &RawEvent,
    field: TimeField,
    value: &str,
) -> Result<DateTime<FixedOffset>, MalformedEventError> {
    DateTime::parse_from_rfc3339(value).map_err(|e| {
        MalformedEventError::new(
            raw,
            MalformedEventKind::InvalidTimestamp {
                field,
                value: value.to_string(),
                reason: e.to_string(),
            },
        )
    })
}

fn parse_date(raw: &RawEvent, field: TimeField, value: &str) -> Result<NaiveDate, MalformedEventError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        MalformedEventError::new(
            raw,
            MalformedEventKind::InvalidDate {
                field,
                value: value.to_string(),
                reason: e.to_string(),
            },
        )
    })
}

/// Attendee addresses; an attendee without an address contributes an empty
/// string so the count still matches the list.
fn attendee_addresses(raw: &RawEvent) -> Vec<String> {
    raw.attendees
        .iter()
        .flatten()
        .map(|a| a.email.clone().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::RawAttendee;
    use caltrack_core::{Categorizer, Category, EventTime};

    fn team_meeting() -> RawEvent {
        RawEvent::new("e1")
            .with_summary("Team meeting")
            .timed("2025-01-06T09:00:00Z", "2025-01-06T10:30:00Z")
    }

    mod timed {
        use super::*;

        #[test]
        fn team_meeting_scenario() {
            let event = normalize_event(&team_meeting()).unwrap();

            assert_eq!(event.event_id, "e1");
            assert_eq!(event.summary, "Team meeting");
            assert!(!event.all_day);
            assert_eq!(event.duration_minutes, Some(90.0));
            assert_eq!(event.day_of_week, "Monday");
            assert_eq!(event.hour_of_day, Some(9));

            let categorized = Categorizer::default().categorize(event);
            assert_eq!(categorized.event_category, Category::Meeting);
        }

        #[test]
        fn utc_marker_becomes_zero_offset() {
            let event = normalize_event(&team_meeting()).unwrap();
            let start = event.start_time.as_datetime().unwrap();
            assert_eq!(start.offset().local_minus_utc(), 0);
            assert_eq!(start.to_rfc3339(), "2025-01-06T09:00:00+00:00");
        }

        #[test]
        fn keeps_source_offset() {
            let raw = RawEvent::new("e2")
                .timed("2025-01-06T18:00:00+01:00", "2025-01-06T18:45:00+01:00");
            let event = normalize_event(&raw).unwrap();
            assert_eq!(event.hour_of_day, Some(18));
            assert_eq!(event.duration_minutes, Some(45.0));
        }

        #[test]
        fn duration_matches_end_minus_start() {
            let raw = RawEvent::new("e3")
                .timed("2025-01-06T09:00:00Z", "2025-01-06T09:20:30Z");
            let event = normalize_event(&raw).unwrap();
            let (EventTime::DateTime(start), EventTime::DateTime(end)) =
                (&event.start_time, &event.end_time)
            else {
                panic!("expected timed event");
            };
            let expected = (*end - *start).num_milliseconds() as f64 / 60_000.0;
            assert_eq!(event.duration_minutes, Some(expected));
            assert_eq!(event.duration_minutes, Some(20.5));
        }
    }

    mod all_day {
        use super::*;

        #[test]
        fn date_only_scenario() {
            let raw = RawEvent::new("d1").all_day("2025-03-10", "2025-03-11");
            let event = normalize_event(&raw).unwrap();
            assert!(event.all_day);
            assert_eq!(event.duration_minutes, None);
            assert_eq!(event.hour_of_day, None);
            assert_eq!(event.start_time, EventTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()));
        }
    }

    mod defaults {
        use super::*;

        #[test]
        fn missing_title_gets_placeholder() {
            let raw = RawEvent::new("x").all_day("2025-03-10", "2025-03-11");
            assert_eq!(normalize_event(&raw).unwrap().summary, "Evento senza titolo");
        }

        #[test]
        fn untagged_event_uses_primary() {
            let event = normalize_event(&team_meeting()).unwrap();
            assert_eq!(event.calendar_name, "primary");
            assert_eq!(event.calendar_id, "primary");
        }

        #[test]
        fn tagged_event_keeps_calendar() {
            let raw = team_meeting().with_calendar("Lavoro", "work@group.calendar.google.com");
            let event = normalize_event(&raw).unwrap();
            assert_eq!(event.calendar_name, "Lavoro");
            assert_eq!(event.calendar_id, "work@group.calendar.google.com");
        }

        #[test]
        fn no_attendee_list() {
            let event = normalize_event(&team_meeting()).unwrap();
            assert_eq!(event.attendee_count, 0);
            assert!(event.attendees.is_empty());
        }

        #[test]
        fn attendee_without_address() {
            let raw = team_meeting()
                .with_attendee(RawAttendee::new("a@example.com"))
                .with_attendee(RawAttendee::default());
            let event = normalize_event(&raw).unwrap();
            assert_eq!(event.attendee_count, 2);
            assert_eq!(event.attendees, vec!["a@example.com".to_string(), String::new()]);
        }

        #[test]
        fn description_and_location_carried() {
            let raw = team_meeting().with_description("agenda").with_location("Sala 2");
            let event = normalize_event(&raw).unwrap();
            assert_eq!(event.description.as_deref(), Some("agenda"));
            assert_eq!(event.location.as_deref(), Some("Sala 2"));
        }
    }

    mod malformed {
        use super::*;

        #[test]
        fn no_start_marker() {
            let raw = RawEvent::new("bad1");
            let err = normalize_event(&raw).unwrap_err();
            assert_eq!(err.event_id, "bad1");
            assert_eq!(
                err.kind,
                MalformedEventKind::MissingTime {
                    field: TimeField::Start
                }
            );
            assert!(err.to_string().contains("bad1"));
        }

        #[test]
        fn empty_start_marker() {
            let mut raw = RawEvent::new("bad2");
            raw.start = Some(RawEventTime::default());
            raw.end = Some(RawEventTime::date("2025-03-11"));
            let err = normalize_event(&raw).unwrap_err();
            assert_eq!(
                err.kind,
                MalformedEventKind::MissingTime {
                    field: TimeField::Start
                }
            );
        }

        #[test]
        fn missing_end() {
            let mut raw = RawEvent::new("bad3");
            raw.start = Some(RawEventTime::date_time("2025-01-06T09:00:00Z"));
            let err = normalize_event(&raw).unwrap_err();
            assert_eq!(
                err.kind,
                MalformedEventKind::MissingTime {
                    field: TimeField::End
                }
            );
        }

        #[test]
        fn mixed_representation() {
            let mut raw = RawEvent::new("bad4");
            raw.start = Some(RawEventTime::date_time("2025-01-06T09:00:00Z"));
            raw.end = Some(RawEventTime::date("2025-01-07"));
            let err = normalize_event(&raw).unwrap_err();
            assert_eq!(err.kind, MalformedEventKind::MixedRepresentation);
        }

        #[test]
        fn invalid_timestamp() {
            let raw = RawEvent::new("bad5").timed("yesterday", "2025-01-06T10:00:00Z");
            let err = normalize_event(&raw).unwrap_err();
            assert!(matches!(
                err.kind,
                MalformedEventKind::InvalidTimestamp {
                    field: TimeField::Start,
                    ..
                }
            ));
        }

        #[test]
        fn invalid_date() {
            let raw = RawEvent::new("bad6").all_day("2025-03-10", "2025-13-01");
            let err = normalize_event(&raw).unwrap_err();
            assert!(matches!(
                err.kind,
                MalformedEventKind::InvalidDate {
                    field: TimeField::End,
                    ..
                }
            ));
        }
    }

    mod batch {
        use super::*;

        #[test]
        fn keeps_length_and_order() {
            let raws = vec![
                RawEvent::new("a").all_day("2025-03-10", "2025-03-11"),
                team_meeting(),
                RawEvent::new("c").timed("2025-01-01T08:00:00Z", "2025-01-01T08:15:00Z"),
            ];
            let events = normalize_events(&raws).unwrap();
            let ids: Vec<_> = events.iter().map(|e| e.event_id.as_str()).collect();
            assert_eq!(ids, vec!["a", "e1", "c"]);
        }

        #[test]
        fn idempotent() {
            let raws = vec![team_meeting(), RawEvent::new("a").all_day("2025-03-10", "2025-03-11")];
            assert_eq!(normalize_events(&raws).unwrap(), normalize_events(&raws).unwrap());
        }

        #[test]
        fn exclusivity_invariant() {
            let raws = vec![team_meeting(), RawEvent::new("a").all_day("2025-03-10", "2025-03-11")];
            for event in normalize_events(&raws).unwrap() {
                assert_eq!(event.all_day, event.duration_minutes.is_none());
                assert_eq!(event.all_day, event.hour_of_day.is_none());
            }
        }

        #[test]
        fn first_malformed_event_aborts() {
            let raws = vec![team_meeting(), RawEvent::new("broken"), RawEvent::new("also-broken")];
            let err = normalize_events(&raws).unwrap_err();
            assert_eq!(err.event_id, "broken");
        }
    }
}
