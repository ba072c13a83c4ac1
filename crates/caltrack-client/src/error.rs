//! Client error types.

use std::fmt;

use caltrack_core::SnapshotError;
use caltrack_providers::{MalformedEventError, ProviderError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a command.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Calendar provider failure, surfaced as reported.
    Provider(ProviderError),
    /// A fetched event could not be normalized; the run is aborted.
    MalformedEvent(MalformedEventError),
    /// Snapshot could not be written, found or read.
    Snapshot(SnapshotError),
    /// Authentication required.
    AuthRequired(String),
    /// Rendering failed.
    Output(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(err) if err.is_retryable() => {
                write!(f, "provider error: {} (temporary, try again later)", err)
            }
            Self::Provider(err) => write!(f, "provider error: {}", err),
            Self::MalformedEvent(err) => write!(f, "{}", err),
            Self::Snapshot(err) => write!(f, "snapshot error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Output(msg) => write!(f, "output error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::MalformedEvent(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<MalformedEventError> for ClientError {
    fn from(err: MalformedEventError) -> Self {
        Self::MalformedEvent(err)
    }
}

impl From<SnapshotError> for ClientError {
    fn from(err: SnapshotError) -> Self {
        Self::Snapshot(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caltrack_providers::{RawEvent, normalize_event};

    #[test]
    fn malformed_event_names_the_record() {
        let err = normalize_event(&RawEvent::new("evt-42")).unwrap_err();
        let msg = ClientError::from(err).to_string();
        assert!(msg.contains("evt-42"), "{msg}");
    }

    #[test]
    fn provider_error_keeps_its_source() {
        use std::error::Error;
        let err = ClientError::from(ProviderError::rate_limited("slow down"));
        assert!(err.to_string().starts_with("provider error:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn temporary_provider_failures_say_so() {
        let transient = ClientError::from(ProviderError::network("connection reset"));
        assert!(transient.to_string().ends_with("(temporary, try again later)"));

        let fatal = ClientError::from(ProviderError::authentication("token revoked"));
        assert!(!fatal.to_string().contains("try again"));
    }
}
