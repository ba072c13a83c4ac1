//! The `caltrack` command-line interface.
//!
//! Fetches Google Calendar events, categorizes them, stores dated snapshots
//! and renders dashboard reports from them.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use pipeline::{PipelineOutcome, PipelineRequest};
