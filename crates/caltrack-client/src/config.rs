//! Client configuration.
//!
//! Everything lives in one `config.toml`, by default
//! `~/.config/caltrack/config.toml`. Every section is optional.
//!
//! ```toml
//! [google]
//! client_id = "env::GOOGLE_CLIENT_ID"
//! client_secret = "pass::google/caltrack"
//!
//! [fetch]
//! days = 90
//! calendars = ["Lavoro", "Personale"]
//!
//! [[categorizer.rules]]
//! category = "meeting"
//! keywords = ["riunione", "call"]
//!
//! [dashboard]
//! locale = "it"
//! time_scale = "weekly"
//! calendar_colors = { Lavoro = "#FFB6C1" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use caltrack_core::{
    Categorizer, CategoryRule, CategoryRules, Locale, TimeScale, TimeWindow,
    snapshot::DEFAULT_PREFIX,
};
use caltrack_providers::google::{GoogleConfig, OAuthCredentials};

/// Configuration for the caltrack client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug logging, same as `--debug`.
    pub debug: bool,

    pub google: Option<GoogleSettings>,
    pub fetch: FetchSettings,
    pub categorizer: CategorizerSettings,
    pub dashboard: DashboardSettings,
}

/// What to fetch and where snapshots go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Lookback window in days.
    pub days: u32,
    /// Calendar names to fetch; empty means all.
    pub calendars: Vec<String>,
    /// Snapshot directory; defaults to `~/.local/share/caltrack/raw`.
    pub data_dir: Option<PathBuf>,
    /// Snapshot file name prefix.
    pub file_prefix: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            days: TimeWindow::DEFAULT_LOOKBACK_DAYS,
            calendars: Vec::new(),
            data_dir: None,
            file_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl FetchSettings {
    /// Longest accepted lookback, ten years.
    pub const MAX_DAYS: u32 = 3660;

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("raw"))
    }
}

/// Keyword rules. Absent or empty means the built-in table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<CategoryRule>>,
}

impl CategorizerSettings {
    pub fn categorizer(&self) -> Categorizer {
        match &self.rules {
            Some(rules) if !rules.is_empty() => {
                Categorizer::new(CategoryRules::new(rules.clone()))
            }
            _ => Categorizer::default(),
        }
    }
}

/// Report defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub locale: Locale,
    pub time_scale: TimeScale,
    /// Calendar name to `#RRGGBB`.
    pub calendar_colors: BTreeMap<String, String>,
    /// ANSI colors in text reports.
    pub color: bool,
    /// Number of events listed under the report.
    pub events: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            time_scale: TimeScale::default(),
            calendar_colors: BTreeMap::new(),
            color: true,
            events: 10,
        }
    }
}

impl ClientConfig {
    /// Loads the file at `path`, or the default file. A missing default
    /// file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Checks values serde cannot, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if !(1..=FetchSettings::MAX_DAYS).contains(&self.fetch.days) {
            problems.push(format!(
                "fetch.days must be between 1 and {}, got {}",
                FetchSettings::MAX_DAYS,
                self.fetch.days
            ));
        }
        let prefix = &self.fetch.file_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            problems.push(format!(
                "fetch.file_prefix '{}' must be a non-empty file name",
                prefix
            ));
        }

        if let Some(rules) = &self.categorizer.rules {
            for rule in rules {
                if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                    problems.push(format!(
                        "categorizer rule for {} has no keywords",
                        rule.category
                    ));
                }
            }
        }

        for (calendar, color) in &self.dashboard.calendar_colors {
            if !is_hex_color(color) {
                problems.push(format!(
                    "dashboard.calendar_colors.{} = '{}' is not a #RRGGBB color",
                    calendar, color
                ));
            }
        }

        if let Some(google) = &self.google
            && let Err(e) = google.to_provider_config()
        {
            problems.push(format!("google: {}", e));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caltrack")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caltrack")
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `[google]` section.
///
/// Credentials come either inline (`client_id` and `client_secret`, both
/// accepting `pass::` and `env::` references) or from a credentials file
/// downloaded from the Google Cloud Console.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
}

impl GoogleSettings {
    /// Resolves credentials and builds the provider configuration.
    pub fn to_provider_config(&self) -> Result<GoogleConfig, String> {
        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(str::to_string)?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(path) = &self.token_path {
            config = config.with_token_path(path);
        }
        Ok(config)
    }

    /// Inline values win over the credentials file.
    pub(crate) fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        match (&self.client_id, &self.client_secret, &self.credentials_file) {
            (Some(id), Some(secret), _) => {
                let id = crate::secret::resolve(id)
                    .map_err(|e| format!("failed to resolve client_id: {}", e))?;
                let secret = crate::secret::resolve(secret)
                    .map_err(|e| format!("failed to resolve client_secret: {}", e))?;
                Ok(OAuthCredentials::new(id, secret))
            }
            (Some(_), None, None) => {
                Err("client_secret is missing from the [google] section".to_string())
            }
            (None, Some(_), None) => {
                Err("client_id is missing from the [google] section".to_string())
            }
            (_, _, Some(path)) => {
                OAuthCredentials::from_file(path).map_err(|e| e.message().to_string())
            }
            (None, None, None) => Err(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: caltrack auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            )),
        }
    }
}
