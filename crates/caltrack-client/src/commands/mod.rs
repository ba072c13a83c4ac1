//! Subcommand implementations.

pub mod auth;
pub mod calendars;
pub mod config;
pub mod fetch;
pub mod report;

use caltrack_providers::CalendarProvider;
use caltrack_providers::google::GoogleProvider;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Fails with every problem `validate` reports.
pub(crate) fn ensure_valid(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(|problems| {
        ClientError::Config(format!("invalid configuration:\n  - {}", problems.join("\n  - ")))
    })
}

/// Builds the Google provider from `[google]`, requiring stored tokens.
pub(crate) fn authenticated_provider(config: &ClientConfig) -> ClientResult<GoogleProvider> {
    let settings = config.google.as_ref().ok_or_else(|| {
        ClientError::Config(format!(
            "no [google] section in {}, run 'caltrack auth google' first",
            ClientConfig::default_path().display()
        ))
    })?;

    let google_config = settings.to_provider_config().map_err(ClientError::Config)?;
    let provider = GoogleProvider::new(google_config)?;

    if !provider.is_authenticated() {
        return Err(ClientError::AuthRequired(
            "no usable Google tokens, run 'caltrack auth google'".to_string(),
        ));
    }
    Ok(provider)
}
