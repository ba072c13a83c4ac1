//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret;

const REDACTED: &str = "********";

/// Prints the effective configuration. Plain-text secrets are masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&redacted(config))
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

fn redacted(config: &ClientConfig) -> ClientConfig {
    let mut config = config.clone();
    if let Some(google) = config.google.as_mut()
        && let Some(value) = google.client_secret.as_mut()
        && !secret::is_reference(value)
    {
        *value = REDACTED.to_string();
    }
    config
}

pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    super::ensure_valid(config)?;

    if config.google.is_some() {
        println!("Google credentials are valid.");
    }
    println!("Configuration is valid.");
    Ok(())
}

pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    println!("data: {}", ClientConfig::default_data_dir().display());
    Ok(())
}
