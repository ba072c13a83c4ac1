//! Google Calendar API v3 client.
//!
//! Thin wrapper around the `events.list` and `calendarList.list` endpoints.
//! Event items deserialize straight into [`RawEvent`]; validation is left to
//! the normalizer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_SIZE: usize = 250;

/// Largest page Google accepts.
const MAX_PAGE_SIZE: usize = 2500;

#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to build HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Lists the events of one calendar overlapping `[time_min, time_max]`,
    /// following every page.
    ///
    /// Recurring events come back expanded into instances, ordered by start
    /// time. Cancelled entries are dropped.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_size: Option<usize>,
    ) -> ProviderResult<Vec<RawEvent>> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut query = vec![
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", page_size.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: EventListResponse = self.get_json(&url, &query).await?;
            pages += 1;

            let before = page.items.len();
            events.extend(page.items.into_iter().filter(|e| !e.is_cancelled()));
            debug!(
                "calendar {} page {}: {} items",
                calendar_id, pages, before
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {} in {} page(s)",
            events.len(),
            calendar_id,
            pages
        );
        Ok(events)
    }

    /// Lists the calendars on the user's calendar list, following every page.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = Vec::new();
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: CalendarListResponse = self.get_json(&url, &query).await?;
            entries.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("calendar list has {} entries", entries.len());
        Ok(entries)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                ProviderError::network(message).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), retry_after, &body));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network("failed to read response body").with_source(e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// Turns a non-success status into a classified error.
fn status_error(status: u16, retry_after: Option<u64>, body: &str) -> ProviderError {
    match status {
        401 => ProviderError::authentication("access token expired or invalid"),
        403 => ProviderError::authorization(format!("access denied: {}", api_message(body))),
        429 => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        _ => ProviderError::from_status(
            status,
            format!("API error ({}): {}", status, api_message(body)),
        ),
    }
}

/// Pulls `error.message` out of a Google error body, falling back to the raw
/// text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// An entry of the user's calendar list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    /// Calendar name.
    #[serde(default)]
    pub summary: String,
    /// Name the user gave the calendar locally, if any.
    pub summary_override: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub primary: bool,
    pub time_zone: Option<String>,
    pub background_color: Option<String>,
}

impl CalendarListEntry {
    pub fn display_name(&self) -> &str {
        self.summary_override.as_deref().unwrap_or(&self.summary)
    }
}
