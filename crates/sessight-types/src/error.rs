use std::fmt;

/// Result type for sessight-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Commit SHA rejected at construction
    InvalidSha(String),

    /// A stored tag does not name a known variant
    UnknownTag { kind: &'static str, value: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSha(msg) => write!(f, "Invalid commit SHA: {}", msg),
            Error::UnknownTag { kind, value } => write!(f, "Unknown {}: {}", kind, value),
        }
    }
}

impl std::error::Error for Error {}
