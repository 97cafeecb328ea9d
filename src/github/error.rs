//! Error taxonomy for the GitHub binding.

use thiserror::Error;

/// Failures returned by the GitHub REST binding.
///
/// `InvalidRef` is the only kind the directory-listing adapter treats as
/// recoverable. Everything else propagates to the agent run loop.
#[derive(Error, Debug)]
pub enum GithubError {
    #[error("invalid git reference '{0}'")]
    InvalidRef(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded{}", .reset.map(|r| format!(" (resets at unix time {})", r)).unwrap_or_default())]
    RateLimited { reset: Option<i64> },

    #[error("GitHub rejected the access token: {0}")]
    Unauthorized(String),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request to GitHub failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected GitHub payload: {0}")]
    Decode(String),
}

impl GithubError {
    /// Whether the error means the supplied ref could not be resolved.
    pub fn is_invalid_ref(&self) -> bool {
        matches!(self, GithubError::InvalidRef(_))
    }
}

pub type GithubResult<T> = Result<T, GithubError>;
