//! Google Calendar provider.
//!
//! Google requires every installation to register its own OAuth client in
//! the Cloud Console. With those credentials the provider:
//!
//! 1. binds a listener on a free loopback port,
//! 2. opens the consent page with a PKCE challenge,
//! 3. exchanges the returned code for access and refresh tokens,
//! 4. stores the tokens and refreshes them when they expire.
//!
//! Events are fetched with recurring series expanded into instances.

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{CalendarListEntry, DEFAULT_PAGE_SIZE};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::{GoogleProvider, PRIMARY_CALENDAR_ID};
pub use tokens::{TokenInfo, TokenStorage};
