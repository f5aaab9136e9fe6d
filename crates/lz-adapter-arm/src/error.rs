//! Error types for the ARM adapter.

use lz_runtime::RemoteError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArmError>;

#[derive(Debug, Error)]
pub enum ArmError {
    /// No bearer token was supplied.
    #[error("no ARM access token configured (set {env_var} or pass --token)")]
    MissingToken { env_var: String },

    /// Non-success status from ARM. `code` is the ARM error code when the
    /// body carried one.
    #[error("{}", format_status(*status, code.as_deref(), message))]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

fn format_status(status: u16, code: Option<&str>, message: &str) -> String {
    match code {
        Some(code) => format!("HTTP {} {}: {}", status, code, message),
        None => format!("HTTP {}: {}", status, message),
    }
}

impl ArmError {
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl From<ArmError> for RemoteError {
    fn from(err: ArmError) -> Self {
        match err {
            ArmError::Status { status: 404, .. } => RemoteError::NotFound,
            ArmError::Status {
                status,
                code,
                message,
            } => RemoteError::Status {
                status,
                message: match code {
                    Some(code) => format!("{}: {}", code, message),
                    None => message,
                },
            },
            ArmError::InvalidResponse { reason } => RemoteError::InvalidResponse(reason),
            other => RemoteError::Transport(other.to_string()),
        }
    }
}
