//! Error taxonomy for forum operations.
//!
//! Repositories stay on `anyhow::Result`; services translate everything that
//! crosses their boundary into a `ForumError` so callers can branch on the
//! outcome without parsing strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForumError {
    /// Missing row, or one the acting user is not allowed to know exists.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation requires a signed-in user.
    #[error("sign in required")]
    AuthenticationRequired,

    /// The acting user lacks the required capability.
    #[error("permission denied")]
    PermissionDenied,

    /// The thread is locked and the acting user cannot override the lock.
    /// Expected state rather than a fault; callers usually render it as an
    /// informational notice.
    #[error("thread is locked")]
    ThreadLocked,

    /// Field-level validation failure, suitable for re-rendering a form.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("voting on your own post is not allowed")]
    SelfVoteForbidden,

    #[error("reporting your own post is not allowed")]
    SelfReportForbidden,

    /// The per-user vote budget for the trailing hour is exhausted.
    #[error("vote limit reached, try again later")]
    RateLimited,

    /// Transaction or storage failure. The underlying detail is logged at
    /// the conversion site and never shown to the acting user.
    #[error("storage failure")]
    Persistence(anyhow::Error),
}

impl From<anyhow::Error> for ForumError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "forum operation failed in storage");
        ForumError::Persistence(err)
    }
}

impl ForumError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ForumError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForumError>;
