//! caltrack CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use caltrack_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use caltrack_client::commands;
use caltrack_client::config::ClientConfig;
use caltrack_client::error::{ClientError, ClientResult};
use caltrack_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref());

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let mut tracing_config = if debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if cli.log_json {
        tracing_config = tracing_config.with_format(TracingOutputFormat::Json);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(ClientError::Config(e)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    match cli.command {
        Command::Auth { provider } => match provider {
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    &config,
                    &config_path,
                )
                .await
            }
        },
        Command::Calendars => commands::calendars::list(&config).await,
        Command::Fetch(args) => commands::fetch::run(args, &config).await,
        Command::Report(args) => commands::report::run(args, &config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
