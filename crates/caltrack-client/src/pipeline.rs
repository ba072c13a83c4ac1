//! Fetch pipeline: enumerate, fetch, normalize, categorize.
//!
//! The run is all or nothing. A provider failure or a malformed event aborts
//! it and nothing is written; an empty window is reported as
//! [`PipelineOutcome::NoEvents`], not as an error.

use tracing::{debug, info, warn};

use caltrack_core::{Categorizer, CategorizedEvent, TimeWindow};
use caltrack_providers::{CalendarProvider, FetchOptions, normalize_events, select_calendars};

use crate::error::ClientResult;

/// Message shown when a run finds nothing.
pub const NO_EVENTS_MESSAGE: &str = "No events found in the selected period.";

/// One fetch run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub window: TimeWindow,
    /// Calendar names to keep; `None` or empty keeps every calendar.
    pub allow_list: Option<Vec<String>>,
    /// Skip enumeration and read the primary calendar, untagged.
    pub primary_only: bool,
    /// Page size hint passed to the provider.
    pub page_size: Option<usize>,
}

impl PipelineRequest {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            allow_list: None,
            primary_only: false,
            page_size: None,
        }
    }

    pub fn with_allow_list(mut self, names: Vec<String>) -> Self {
        self.allow_list = Some(names);
        self
    }

    pub fn with_primary_only(mut self, primary_only: bool) -> Self {
        self.primary_only = primary_only;
        self
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Nothing in the window; no dataset is produced.
    NoEvents,
    /// Categorized rows, in fetch order.
    Dataset(Vec<CategorizedEvent>),
}

/// Runs the pipeline once.
pub async fn run(
    provider: &dyn CalendarProvider,
    request: &PipelineRequest,
    categorizer: &Categorizer,
) -> ClientResult<PipelineOutcome> {
    let mut options = FetchOptions::new(request.window);
    if let Some(size) = request.page_size {
        options = options.with_max_results(size);
    }

    if !request.primary_only {
        let calendars = provider.list_calendars().await?;
        let available = calendars.len();
        let selected = select_calendars(calendars, request.allow_list.as_deref());
        debug!(
            available,
            selected = selected.len(),
            "selected calendars"
        );

        if selected.is_empty() {
            warn!("no calendar matched the allow-list");
            return Ok(PipelineOutcome::NoEvents);
        }
        options = options.with_calendars(selected);
    }

    let fetched = provider.fetch_events(options).await?;
    info!(
        events = fetched.events.len(),
        calendars = fetched.calendars_queried,
        provider = provider.name(),
        "fetched events"
    );

    if fetched.is_empty() {
        return Ok(PipelineOutcome::NoEvents);
    }

    let normalized = normalize_events(&fetched.events)?;
    Ok(PipelineOutcome::Dataset(categorizer.categorize_all(normalized)))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use caltrack_core::{Category, PRIMARY_CALENDAR};
    use caltrack_providers::{
        BoxFuture, CalendarInfo, FetchResult, ProviderError, ProviderErrorCode, ProviderResult,
        RawEvent,
    };

    use super::*;
    use crate::error::ClientError;

    /// In-memory provider. Events are keyed by calendar id; `"primary"`
    /// serves primary-only fetches.
    struct FakeProvider {
        calendars: Vec<CalendarInfo>,
        events: Vec<(String, RawEvent)>,
        fail_with: Option<(ProviderErrorCode, &'static str)>,
        seen: Mutex<Vec<FetchOptions>>,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                calendars: vec![
                    CalendarInfo::new("me@example.com", "Personale").with_primary(true),
                    CalendarInfo::new("work@group", "Lavoro"),
                ],
                events: Vec::new(),
                fail_with: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn with_event(mut self, calendar_id: &str, event: RawEvent) -> Self {
            self.events.push((calendar_id.to_string(), event));
            self
        }

        fn failing(mut self, code: ProviderErrorCode, message: &'static str) -> Self {
            self.fail_with = Some((code, message));
            self
        }

        fn last_options(&self) -> FetchOptions {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl CalendarProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<FetchResult>> {
            Box::pin(async move {
                self.seen.lock().unwrap().push(options.clone());
                if let Some((code, message)) = self.fail_with {
                    return Err(ProviderError::new(code, message).with_provider("fake"));
                }

                let events = if options.calendars.is_empty() {
                    self.events
                        .iter()
                        .filter(|(id, _)| id == "primary")
                        .map(|(_, e)| e.clone())
                        .collect()
                } else {
                    options
                        .calendars
                        .iter()
                        .flat_map(|cal| {
                            self.events
                                .iter()
                                .filter(move |(id, _)| *id == cal.id)
                                .map(move |(_, e)| e.clone().with_calendar(&cal.name, &cal.id))
                        })
                        .collect()
                };
                Ok(FetchResult {
                    events,
                    calendars_queried: options.calendars.len().max(1),
                })
            })
        }

        fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
            Box::pin(async move { Ok(self.calendars.clone()) })
        }

        fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn is_authenticated(&self) -> bool {
            true
        }
    }

    fn request() -> PipelineRequest {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        PipelineRequest::new(TimeWindow::lookback(now, 30))
    }

    fn meeting(id: &str) -> RawEvent {
        RawEvent::new(id)
            .with_summary("Riunione di progetto")
            .timed("2025-01-06T09:00:00+01:00", "2025-01-06T10:30:00+01:00")
    }

    fn birthday(id: &str) -> RawEvent {
        RawEvent::new(id)
            .with_summary("Compleanno di Anna")
            .all_day("2025-01-20", "2025-01-21")
    }

    #[tokio::test]
    async fn zero_events_is_not_an_error() {
        let provider = FakeProvider::new();
        let outcome = run(&provider, &request(), &Categorizer::default())
            .await
            .unwrap();
        assert_eq!(outcome, PipelineOutcome::NoEvents);
    }

    #[tokio::test]
    async fn every_calendar_by_default() {
        let provider = FakeProvider::new()
            .with_event("me@example.com", birthday("b1"))
            .with_event("work@group", meeting("m1"));

        let outcome = run(&provider, &request(), &Categorizer::default())
            .await
            .unwrap();
        let PipelineOutcome::Dataset(rows) = outcome else {
            panic!("expected a dataset");
        };

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event.event_id, "b1");
        assert_eq!(rows[0].event.calendar_name, "Personale");
        assert_eq!(rows[0].event_category, Category::PersonalEvent);
        assert!(rows[0].event.all_day);

        assert_eq!(rows[1].event.calendar_id, "work@group");
        assert_eq!(rows[1].event_category, Category::Meeting);
        assert_eq!(rows[1].event.duration_minutes, Some(90.0));

        assert_eq!(provider.last_options().calendars.len(), 2);
    }

    #[tokio::test]
    async fn allow_list_limits_fetched_calendars() {
        let provider = FakeProvider::new()
            .with_event("me@example.com", birthday("b1"))
            .with_event("work@group", meeting("m1"));

        let req = request().with_allow_list(vec!["Lavoro".to_string()]);
        let PipelineOutcome::Dataset(rows) =
            run(&provider, &req, &Categorizer::default()).await.unwrap()
        else {
            panic!("expected a dataset");
        };

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event.calendar_name, "Lavoro");
        let queried: Vec<_> = provider
            .last_options()
            .calendars
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(queried, vec!["Lavoro"]);
    }

    #[tokio::test]
    async fn allow_list_matching_nothing() {
        let provider = FakeProvider::new().with_event("work@group", meeting("m1"));
        let req = request().with_allow_list(vec!["Sport".to_string()]);
        let outcome = run(&provider, &req, &Categorizer::default()).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::NoEvents);
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn primary_only_leaves_events_untagged() {
        let provider = FakeProvider::new().with_event("primary", meeting("m1"));
        let req = request().with_primary_only(true);

        let PipelineOutcome::Dataset(rows) =
            run(&provider, &req, &Categorizer::default()).await.unwrap()
        else {
            panic!("expected a dataset");
        };
        assert_eq!(rows[0].event.calendar_name, PRIMARY_CALENDAR);
        assert_eq!(rows[0].event.calendar_id, PRIMARY_CALENDAR);
        assert!(provider.last_options().calendars.is_empty());
    }

    #[tokio::test]
    async fn window_is_passed_through() {
        let provider = FakeProvider::new();
        let req = request();
        run(&provider, &req, &Categorizer::default()).await.unwrap();
        assert_eq!(provider.last_options().time_window, req.window);
    }

    #[tokio::test]
    async fn malformed_event_aborts_the_run() {
        let broken = RawEvent::new("broken-1")
            .with_summary("Riunione")
            .timed("2025-01-06T09:00:00+01:00", "not a time");
        let provider = FakeProvider::new()
            .with_event("work@group", meeting("m1"))
            .with_event("work@group", broken);

        let err = run(&provider, &request(), &Categorizer::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedEvent(_)));
        assert!(err.to_string().contains("broken-1"));
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced() {
        let provider = FakeProvider::new()
            .with_event("work@group", meeting("m1"))
            .failing(ProviderErrorCode::AuthenticationFailed, "token revoked");

        let err = run(&provider, &request(), &Categorizer::default())
            .await
            .unwrap_err();
        let ClientError::Provider(inner) = err else {
            panic!("expected a provider error");
        };
        assert!(inner.message().contains("token revoked"));
        assert_eq!(inner.provider(), Some("fake"));
    }

    #[tokio::test]
    async fn custom_rules_are_used() {
        use caltrack_core::{CategoryRule, CategoryRules};

        let provider = FakeProvider::new().with_event("work@group", meeting("m1"));
        let categorizer = Categorizer::new(CategoryRules::new(vec![CategoryRule::new(
            Category::Training,
            ["progetto"],
        )]));
        let PipelineOutcome::Dataset(rows) = run(&provider, &request(), &categorizer).await.unwrap()
        else {
            panic!("expected a dataset");
        };
        assert_eq!(rows[0].event_category, Category::Training);
    }
}
