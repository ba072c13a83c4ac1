//! Calendar providers and the raw-to-normalized event pipeline.
//!
//! ```text
//!  Google Calendar API
//!          │
//!          ▼
//!  ┌────────────────┐   CalendarProvider
//!  │ GoogleProvider │ ─────────────────── list_calendars / fetch_events
//!  └───────┬────────┘
//!          ▼
//!     Vec<RawEvent>
//!          │ normalize_events()
//!          ▼
//!  Vec<NormalizedEvent>   (caltrack-core)
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod normalize;
pub mod provider;
pub mod raw_event;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{
    MalformedEventError, MalformedEventKind, TimeField, normalize_event, normalize_events,
};
pub use provider::{
    BoxFuture, CalendarInfo, CalendarProvider, FetchOptions, FetchResult, select_calendars,
};
pub use raw_event::{RawAttendee, RawEvent, RawEventTime};
