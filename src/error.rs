//! Error types for the client core.
//!
//! Each boundary has its own enum. Every enum implements [`ErrorCode`] so
//! callers can branch on a stable code instead of the display text.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Stable machine-readable code for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Failures talking to a REST collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// The collaborator answered with a non-success HTTP status.
    #[error("unexpected response status {status}")]
    Status { status: u16, body: String },

    /// The response body was not the JSON we expected.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_API_REQUEST",
            Self::Status { .. } => "E_API_STATUS",
            Self::Decode(_) => "E_API_DECODE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::InvalidUrl(_) => "E_INVALID_URL",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// TEMPLATE LOAD
// =============================================================================

/// Failures loading a template into the editor.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("template fetch failed: {0}")]
    Fetch(#[from] ApiError),

    #[error("template malformed: {0}")]
    Malformed(String),

    /// The background image could not be fetched or decoded. The editor
    /// still opens without it.
    #[error("background image unavailable: {0}")]
    Background(String),
}

impl ErrorCode for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "E_TEMPLATE_FETCH",
            Self::Malformed(_) => "E_TEMPLATE_MALFORMED",
            Self::Background(_) => "E_TEMPLATE_BACKGROUND",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.retryable(),
            Self::Malformed(_) => false,
            Self::Background(_) => true,
        }
    }
}

// =============================================================================
// RENDER
// =============================================================================

pub const SUBMIT_FAILED: &str = "Failed to start image generation.";
pub const JOB_FAILED: &str = "Image generation failed.";
pub const POLL_FAILED: &str = "Failed to check job status.";
pub const UNEXPECTED_RESPONSE: &str = "Unexpected response from render service.";
pub const TIMED_OUT: &str = "Image generation timed out.";

/// A render submission that ended without a result. The display text is
/// the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderFailure {
    /// The submit request itself failed.
    #[error("{0}")]
    Submission(String),

    /// The backend reported the job as failed.
    #[error("{0}")]
    Job(String),

    /// A status check failed. Polling stops.
    #[error("{0}")]
    Polling(String),

    /// The backend answered with a shape we do not understand.
    #[error("{0}")]
    Unexpected(String),

    /// The job did not reach a terminal status within the poll timeout.
    #[error("{0}")]
    TimedOut(String),
}

impl RenderFailure {
    #[must_use]
    pub fn submission() -> Self {
        Self::Submission(SUBMIT_FAILED.to_owned())
    }

    /// Job failure with the backend's message, or the generic one when the
    /// backend gave none.
    #[must_use]
    pub fn job(message: Option<&str>) -> Self {
        let message = message.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(JOB_FAILED);
        Self::Job(message.to_owned())
    }

    #[must_use]
    pub fn polling() -> Self {
        Self::Polling(POLL_FAILED.to_owned())
    }

    #[must_use]
    pub fn unexpected() -> Self {
        Self::Unexpected(UNEXPECTED_RESPONSE.to_owned())
    }

    #[must_use]
    pub fn timed_out() -> Self {
        Self::TimedOut(TIMED_OUT.to_owned())
    }

    /// Human-readable message for display.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Submission(m) | Self::Job(m) | Self::Polling(m) | Self::Unexpected(m) | Self::TimedOut(m) => m,
        }
    }
}

impl ErrorCode for RenderFailure {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Submission(_) => "E_RENDER_SUBMIT",
            Self::Job(_) => "E_RENDER_JOB_FAILED",
            Self::Polling(_) => "E_RENDER_POLL",
            Self::Unexpected(_) => "E_RENDER_UNEXPECTED",
            Self::TimedOut(_) => "E_RENDER_TIMEOUT",
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::Unexpected(_))
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "E_CONFIG_URL",
        }
    }
}
