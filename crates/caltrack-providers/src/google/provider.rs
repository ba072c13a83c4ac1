//! [`CalendarProvider`] backed by Google Calendar.

use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider, FetchOptions, FetchResult};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

const PROVIDER_NAME: &str = "google";

/// Calendar id Google resolves to the authenticated user's main calendar.
pub const PRIMARY_CALENDAR_ID: &str = "primary";

/// Google Calendar provider.
///
/// Loads stored tokens on construction; an unparsable token file is removed.
/// When no tokens exist, call [`GoogleProvider::authenticate`] to run the
/// browser flow.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: TokioRwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;

        let token_storage = TokenStorage::new(&config.token_path);
        if let Err(e) = token_storage.load() {
            warn!("discarding unusable token file: {}", e);
            token_storage.clear()?;
        }

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(None),
        })
    }

    /// Runs the OAuth consent flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.token_storage.set(tokens.clone())?;

        let client = self.new_client(&tokens.access_token)?;
        *self.api_client.write().await = Some(client);

        info!("authenticated, tokens stored at {}", self.token_storage.path().display());
        Ok(())
    }

    /// True when no tokens are stored or they miss a configured scope.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    pub fn token_path(&self) -> &std::path::Path {
        self.token_storage.path()
    }

    fn new_client(&self, access_token: &str) -> ProviderResult<GoogleCalendarClient> {
        GoogleCalendarClient::new(access_token, self.config.timeout, &self.config.user_agent)
    }

    /// Makes sure an API client with a live access token exists, refreshing
    /// the token when it has expired.
    async fn ensure_authenticated(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authenticated, run 'caltrack auth google'")
                .with_provider(PROVIDER_NAME)
        })?;

        if !tokens.is_expired() {
            let mut client = self.api_client.write().await;
            if client.is_none() {
                *client = Some(self.new_client(&tokens.access_token)?);
            }
            return Ok(());
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication(
                "access token expired and no refresh token, run 'caltrack auth google'",
            )
            .with_provider(PROVIDER_NAME)
        })?;

        debug!("refreshing expired access token");
        let (access_token, expires_in) = self
            .oauth_client
            .refresh_token(refresh_token)
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;
        self.token_storage
            .update_access_token(&access_token, expires_in)?;

        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(access_token),
            None => *client = Some(self.new_client(&access_token)?),
        }
        Ok(())
    }

    async fn fetch_all_calendars(&self, options: &FetchOptions) -> ProviderResult<FetchResult> {
        self.ensure_authenticated().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let window = &options.time_window;

        if options.calendars.is_empty() {
            debug!("fetching primary calendar only");
            let events = client
                .list_events(PRIMARY_CALENDAR_ID, window.start, window.end, options.max_results)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))?;
            return Ok(FetchResult::with_events(events));
        }

        let mut events = Vec::new();
        for calendar in &options.calendars {
            debug!("fetching calendar {} ({})", calendar.name, calendar.id);
            let batch = client
                .list_events(&calendar.id, window.start, window.end, options.max_results)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))?;

            events.extend(
                batch
                    .into_iter()
                    .map(|event| event.with_calendar(&calendar.name, &calendar.id)),
            );
        }

        info!(
            "fetched {} events from {} calendar(s)",
            events.len(),
            options.calendars.len()
        );
        Ok(FetchResult {
            events,
            calendars_queried: options.calendars.len(),
        })
    }

    async fn list_calendars_impl(&self) -> ProviderResult<Vec<CalendarInfo>> {
        self.ensure_authenticated().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let entries = client
            .list_calendars()
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let mut info =
                    CalendarInfo::new(&entry.id, entry.display_name()).with_primary(entry.primary);
                if let Some(tz) = entry.time_zone {
                    info = info.with_timezone(tz);
                }
                info.description = entry.description;
                info.background_color = entry.background_color;
                info
            })
            .collect())
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<FetchResult>> {
        Box::pin(async move { self.fetch_all_calendars(&options).await })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(async move { self.list_calendars_impl().await })
    }

    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move { self.ensure_authenticated().await })
    }

    fn is_authenticated(&self) -> bool {
        self.token_storage
            .get()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }
}
