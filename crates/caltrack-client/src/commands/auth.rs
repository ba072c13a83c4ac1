//! Authentication commands.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use caltrack_providers::CalendarProvider;
use caltrack_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Runs the Google OAuth flow.
///
/// Credentials given on the command line are written to `config_path` so
/// later `fetch` runs find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) =
        resolve_google_credentials(client_id, client_secret, credentials_file, config.google.as_ref())?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let mut google_config = GoogleConfig::new(credentials);
    if let Some(path) = config.google.as_ref().and_then(|g| g.token_path.as_ref()) {
        google_config = google_config.with_token_path(path);
    }

    let provider = GoogleProvider::new(google_config)?;

    if provider.is_authenticated() && !provider.needs_reauth() && !force {
        save_credentials(config_path, &source);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize read-only access.");
    println!("If it doesn't, copy the URL printed below into your browser.");
    println!();

    provider.authenticate().await?;
    save_credentials(config_path, &source);

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Tokens saved to {}", provider.token_path().display());
    println!();
    println!("Run 'caltrack fetch' to take your first snapshot.");
    Ok(())
}

/// Where the credentials came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CredentialSource {
    /// `--client-id` and `--client-secret`.
    Flags { client_id: String, client_secret: String },
    /// `--credentials-file`.
    File(PathBuf),
    /// Already in the config file.
    Config,
}

/// Resolves credentials, highest priority first:
/// 1. `--client-id` with `--client-secret`
/// 2. `--credentials-file`
/// 3. the `[google]` section
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    match (cli_client_id, cli_client_secret) {
        (Some(id), Some(secret)) => {
            let creds = OAuthCredentials::new(&id, &secret);
            return Ok((
                creds,
                CredentialSource::Flags {
                    client_id: id,
                    client_secret: secret,
                },
            ));
        }
        (None, None) => {}
        _ => {
            return Err(ClientError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
    }

    if let Some(path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(&path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e.message()
            ))
        })?;
        return Ok((creds, CredentialSource::File(path)));
    }

    if let Some(google) = config_google {
        let creds = google.resolve_credentials().map_err(ClientError::Config)?;
        return Ok((creds, CredentialSource::Config));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide them via:\n  \
         - client_id + client_secret in the [google] section of {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to the Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}

fn save_credentials(config_path: &Path, source: &CredentialSource) {
    match persist_credentials(config_path, source) {
        Ok(true) => println!("Credentials saved to {}", config_path.display()),
        Ok(false) => {}
        Err(e) => warn!("could not save credentials: {}", e),
    }
}

/// Writes the credentials into `[google]`, keeping the rest of the file and
/// its formatting. Returns `Ok(false)` when there was nothing to write.
fn persist_credentials(config_path: &Path, source: &CredentialSource) -> Result<bool, String> {
    if *source == CredentialSource::Config {
        return Ok(false);
    }

    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)
            .map_err(|e| format!("failed to read {}: {}", config_path.display(), e))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("failed to parse {}: {}", config_path.display(), e))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"]
        .as_table_mut()
        .ok_or_else(|| "[google] in the config file is not a table".to_string())?;

    match source {
        CredentialSource::Flags {
            client_id,
            client_secret,
        } => {
            google["client_id"] = toml_edit::value(client_id.as_str());
            google["client_secret"] = toml_edit::value(client_secret.as_str());
            google.remove("credentials_file");
        }
        CredentialSource::File(path) => {
            let path = path.canonicalize().unwrap_or_else(|_| path.clone());
            google["credentials_file"] = toml_edit::value(path.display().to_string());
            google.remove("client_id");
            google.remove("client_secret");
        }
        CredentialSource::Config => {}
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(config_path, doc.to_string())
        .map_err(|e| format!("failed to write {}: {}", config_path.display(), e))?;

    info!("credentials saved to {}", config_path.display());
    Ok(true)
}
