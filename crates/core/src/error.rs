//! Unified error types for dimts-gw.
//!
//! The strategies only distinguish two classes: failures that degrade to
//! the cached shell (transport, store) and failures that abort an
//! operation outright (manifest population, invalid input).

use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty manifest).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network unreachable, DNS failure, or timeout. HTTP error statuses
    /// are not transport failures; those responses pass through unchanged.
    #[error("transport failure: {0}")]
    Transport(String),

    /// One or more install-time manifest fetches failed; install aborts.
    #[error("manifest population failed: {0}")]
    ManifestPopulation(String),

    /// Bucket store operation failed.
    #[error("cache store failure: {0}")]
    Store(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache store failure: migration failed: {0}")]
    MigrationFailed(String),

    /// Response body exceeded the configured byte limit.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// Invalid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Store(tokio_rusqlite::Error::Close(c)),
            _ => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Store(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Transport("connection refused".to_string());
        assert!(err.to_string().contains("transport failure"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_manifest_population_display() {
        let err = Error::ManifestPopulation("/static/ui.css: status 404".to_string());
        assert!(err.to_string().contains("manifest population failed"));
        assert!(err.to_string().contains("/static/ui.css"));
    }
}
