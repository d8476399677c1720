use std::fmt;

/// Result type for sessight-index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the index layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Stored JSON column could not be encoded or decoded
    Json(serde_json::Error),

    /// Query-specific error (invalid input, bad stored value, etc.)
    Query(String),

    /// Full-text search expression could not be parsed
    InvalidQuery(String),

    /// A schema migration step failed; the store is unusable
    Migration {
        version: i32,
        source: rusqlite::Error,
    },

    /// Store was written by a newer schema than this build understands
    UnsupportedVersion { found: i32, supported: i32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => {
                let msg = err.to_string();
                if msg.contains("no such column") || msg.contains("no such table") {
                    write!(
                        f,
                        "Database schema mismatch: {}. Reopen the store to migrate it.",
                        msg
                    )
                } else {
                    write!(f, "Database error: {}", err)
                }
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Query(msg) => write!(f, "Query error: {}", msg),
            Error::InvalidQuery(msg) => write!(f, "Invalid search query: {}", msg),
            Error::Migration { version, source } => {
                write!(f, "Schema migration to version {} failed: {}", version, source)
            }
            Error::UnsupportedVersion { found, supported } => write!(
                f,
                "Store schema version {} is newer than supported version {}",
                found, supported
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Migration { source, .. } => Some(source),
            Error::Query(_) | Error::InvalidQuery(_) | Error::UnsupportedVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
