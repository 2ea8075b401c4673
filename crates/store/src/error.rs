//! Document store error types

/// Store result type
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure; the store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Rejected by the store's rule layer
    #[error("Missing or insufficient permissions: {0}")]
    PermissionDenied(String),

    /// Update against a document that does not exist
    #[error("No document to update: {0}")]
    NotFound(String),

    #[error("Malformed document at {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Every generated room code was already taken
    #[error("No free room code after {0} attempts")]
    Conflict(u32),
}

impl Error {
    pub fn decode(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<Error> for planit_core::Error {
    fn from(err: Error) -> Self {
        planit_core::Error::Store(err.to_string())
    }
}
