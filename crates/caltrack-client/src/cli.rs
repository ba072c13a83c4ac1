//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use caltrack_core::{Locale, TimeScale};

/// caltrack - where your calendar time goes
#[derive(Debug, Parser)]
#[command(name = "caltrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALTRACK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// List the calendars the account can read
    Calendars,

    /// Fetch events, categorize them and write a snapshot
    Fetch(FetchArgs),

    /// Show the dashboard for the latest snapshot
    Report(ReportArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to a Google Cloud Console credentials JSON file
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// Lookback window in days [default: from config, else 30]
    #[arg(long, short)]
    pub days: Option<u32>,

    /// Only fetch this calendar, by name (can be repeated)
    #[arg(
        long = "calendar",
        env = "CALTRACK_CALENDARS",
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    pub calendars: Vec<String>,

    /// Fetch the primary calendar only, without listing calendars
    #[arg(long, conflicts_with = "calendars")]
    pub primary_only: bool,

    /// Directory for the snapshot [default: from config]
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ReportArgs {
    /// Snapshot file to read instead of the latest one
    #[arg(long, short)]
    pub snapshot: Option<PathBuf>,

    /// Year to show [default: most recent in the data]
    #[arg(long, short)]
    pub year: Option<i32>,

    /// Only show this calendar, by name (can be repeated)
    #[arg(long = "calendar", action = clap::ArgAction::Append)]
    pub calendars: Vec<String>,

    /// Contribution period: weekly, monthly or yearly
    #[arg(long)]
    pub scale: Option<TimeScale>,

    /// Number of events to list, most recent first
    #[arg(long, short)]
    pub events: Option<usize>,

    /// Report language: en or it
    #[arg(long, short)]
    pub locale: Option<Locale>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Disable ANSI colors (also when NO_COLOR is set)
    #[arg(long)]
    pub no_color: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
