//! Error types for Warden

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed diagnostic cause carried by a [`LoginError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Process-level errors (configuration and bootstrapping)
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Classified failure of a login attempt.
///
/// Every directory interaction failure is recovered into one of these
/// variants; callers decide how to surface them. [`code`](Self::code) follows
/// HTTP status semantics: `401` means the caller is not authenticated, `500`
/// means the provider itself failed.
#[derive(Error, Debug)]
pub enum LoginError {
    /// The directory could not be reached, bound to, or queried in time.
    #[error("Directory unavailable: {0}")]
    Unavailable(#[source] BoxError),

    /// The directory rejected the credentials or does not know the user.
    #[error("Authenticating failed for user {0}")]
    Rejected(String),

    /// The user authenticated but their group membership could not be read.
    #[error("Error getting groups for user {username}: {source}")]
    GroupLookup {
        username: String,
        #[source]
        source: BoxError,
    },
}

impl LoginError {
    pub fn unavailable(cause: impl Into<BoxError>) -> Self {
        LoginError::Unavailable(cause.into())
    }

    pub fn rejected(username: impl Into<String>) -> Self {
        LoginError::Rejected(username.into())
    }

    pub fn group_lookup(username: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        LoginError::GroupLookup {
            username: username.into(),
            source: cause.into(),
        }
    }

    /// Caller-facing classification code
    pub fn code(&self) -> u16 {
        match self {
            LoginError::Unavailable(_) | LoginError::Rejected(_) => 401,
            LoginError::GroupLookup { .. } => 500,
        }
    }

    /// Whether retrying the same credentials later may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LoginError::Rejected(_))
    }

    /// Diagnostic detail, not meant for end users
    pub fn cause(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            LoginError::Unavailable(source) | LoginError::GroupLookup { source, .. } => {
                source.as_ref()
            }
            LoginError::Rejected(_) => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_codes() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(LoginError::unavailable(io).code(), 401);
        assert_eq!(LoginError::rejected("alice").code(), 401);
        assert_eq!(LoginError::group_lookup("alice", "search failed").code(), 500);
    }

    #[test]
    fn test_rejection_names_user() {
        let err = LoginError::rejected("alice");
        assert!(err.to_string().contains("alice"));
        assert_eq!(err.cause().to_string(), err.to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cause_is_underlying_error() {
        let err = LoginError::group_lookup("bob", "timed out");
        assert_eq!(err.cause().to_string(), "timed out");
        assert!(err.to_string().contains("bob"));
        assert!(err.is_retryable());
    }
}
