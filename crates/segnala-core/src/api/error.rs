use reqwest::StatusCode;
use thiserror::Error;

/// Maximum length of a response body carried inside an error.
/// Keeps inline error rendering and logs bounded on verbose backends.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Every gateway outcome that is not a decoded payload.
///
/// Exactly one of these reaches the caller; raw transport errors never do.
/// Only `Auth` implies a session change: by the time the caller sees it,
/// the session has already been invalidated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure or unreadable payload. Retryable by the user;
    /// session state is untouched.
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the credential (401/403). The session has been
    /// ended; the caller should navigate to the login view.
    #[error("session rejected by the backend")]
    Auth,

    /// Any other non-2xx response. Request-specific; rendered inline by the
    /// caller, session state untouched.
    #[error("request failed with status {status}: {body}")]
    Api { status: u16, body: String },
}

impl GatewayError {
    /// Truncate a response body so errors stay displayable. The cut backs up
    /// to a character boundary; backend error text is not guaranteed ASCII.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    /// Classify a non-2xx response. 401/403 are the session-invalidating
    /// class; the caller is responsible for actually ending the session.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth,
            _ => GatewayError::Api {
                status: status.as_u16(),
                body: Self::truncate_body(body),
            },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Network(e.to_string())
    }
}
