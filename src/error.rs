//! Error type shared by the whole crate.
//!
//! The variants follow the failure kinds a caller has to tell apart:
//!
//! - **`ServiceUnavailable`**: the web service could not be reached or answered with a server
//!   side failure (5xx, 429). Never conflated with an empty result.
//! - **`Authentication`**: the service refused the credentials (401/403).
//! - **`NoData`**: the request succeeded but no waveform data matched it.
//! - **`Validation`**: malformed query parameters, rejected before or by the service.
//! - **`Format`**: malformed or unsupported miniSEED / StationXML content.
//! - **`Precondition`**: a processing operation cannot run on the given input (corner frequency
//!   above Nyquist, merging traces with different sampling rates, ...). The input is left as is.
//! - **`CapabilityUnavailable`**: an optional backend (plotting, map projection) is missing.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ExplorerResult<T> = std::result::Result<T, ExplorerError>;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("No data available for request: {0}")]
    NoData(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Processing precondition failed: {0}")]
    Precondition(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences error: {0}")]
    Preferences(String),

    #[error("Plotting error: {0}")]
    Plot(String),
}

impl ExplorerError {
    /// True for failures caused by the remote side or the connection, as opposed to the content
    /// of the request or of the returned data.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ExplorerError::ServiceUnavailable(_) | ExplorerError::Authentication(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExplorerError::Precondition("corner frequency above Nyquist".to_string());
        assert_eq!(
            err.to_string(),
            "Processing precondition failed: corner frequency above Nyquist"
        );
    }

    #[test]
    fn test_connectivity_kinds() {
        assert!(ExplorerError::ServiceUnavailable("503".into()).is_connectivity());
        assert!(ExplorerError::Authentication("401".into()).is_connectivity());
        assert!(!ExplorerError::NoData("OO.AXAS1".into()).is_connectivity());
        assert!(!ExplorerError::Validation("end before start".into()).is_connectivity());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.mseed");
        let err: ExplorerError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
