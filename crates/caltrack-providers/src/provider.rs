//! CalendarProvider trait definition.
//!
//! A provider supplies the raw side of the pipeline: it enumerates the
//! user's calendars and fetches raw events within a time window, tagging each
//! event with the calendar it came from.

use std::future::Future;
use std::pin::Pin;

use caltrack_core::TimeWindow;

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// A calendar the user can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    pub id: String,
    /// Display name, matched against the calendar allow-list.
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,
    /// IANA zone of the calendar.
    pub timezone: Option<String>,
    pub background_color: Option<String>,
}

impl CalendarInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            is_primary: false,
            timezone: None,
            background_color: None,
        }
    }

    /// Builder method to mark as primary.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Builder method to set timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Keeps the calendars whose display name is in `allow_list`, in provider
/// order. No list, or an empty one, keeps every calendar.
pub fn select_calendars(calendars: Vec<CalendarInfo>, allow_list: Option<&[String]>) -> Vec<CalendarInfo> {
    match allow_list {
        Some(names) if !names.is_empty() => calendars
            .into_iter()
            .filter(|c| names.iter().any(|n| *n == c.name))
            .collect(),
        _ => calendars,
    }
}

/// Events returned by a fetch.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Raw events, calendar by calendar, in provider order.
    pub events: Vec<RawEvent>,
    /// Calendars that were queried.
    pub calendars_queried: usize,
}

impl FetchResult {
    pub fn with_events(events: Vec<RawEvent>) -> Self {
        Self {
            events,
            calendars_queried: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// What to fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub time_window: TimeWindow,
    /// Calendars to query. Empty means the primary calendar only, and events
    /// are left without a calendar tag.
    pub calendars: Vec<CalendarInfo>,
    /// Page size hint; the provider still follows every page.
    pub max_results: Option<usize>,
}

impl FetchOptions {
    pub fn new(time_window: TimeWindow) -> Self {
        Self {
            time_window,
            calendars: Vec::new(),
            max_results: None,
        }
    }

    /// Builder method to fetch from specific calendars.
    pub fn with_calendars(mut self, calendars: Vec<CalendarInfo>) -> Self {
        self.calendars = calendars;
        self
    }

    /// Builder method to set the page size.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}

/// A boxed future, so the trait stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of calendars and raw events.
///
/// Implementations handle authentication and pagination internally and
/// report every failure as a [`ProviderError`](crate::ProviderError).
pub trait CalendarProvider: Send + Sync {
    /// Short provider name, e.g. `"google"`.
    fn name(&self) -> &str;

    /// Fetches raw events within `options.time_window`.
    ///
    /// Recurring events are expanded into instances and cancelled entries
    /// are dropped. With calendars given, each returned event carries the
    /// name and id of its calendar.
    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<FetchResult>>;

    /// Lists the calendars the user can read.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>>;

    /// Refreshes the access credentials.
    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>>;

    /// Returns true when usable credentials are loaded.
    fn is_authenticated(&self) -> bool;
}
