//! The typed error returned by the remote DLB API boundary
//!
//! Every failed remote call is converted into an [`ApiError`] right where it happens,
//! so that the rest of the crate never has to inspect raw reqwest errors or untyped
//! JSON bodies. The orchestrator makes its skip/abort/continue decisions through the
//! classification predicates, never by string-matching messages.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::Deserialize;

/// Error code reported by DLB when the API token is invalid or expired
pub const CODE_INVALID_TOKEN: &str = "INVALID_TOKEN";
/// Error code reported by DLB when the token lacks the required permission
pub const CODE_PERMISSION_DENIED: &str = "PERMISSION_DENIED";
/// Error code reported by DLB when the requested entity does not exist
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
/// Error code reported by DLB when the client is being rate-limited
pub const CODE_RATE_LIMITED: &str = "RATE_LIMITED";
/// Error code reported by DLB when a muster already exists for this date
pub const CODE_MUSTER_SUBMITTED: &str = "MUSTER_SUBMITTED";
/// Synthesized code for transport-level failures (DNS, connect, timeout)
pub const CODE_CONNECTION_ERROR: &str = "CONNECTION_ERROR";
/// Synthesized code for non-2xx responses whose body could not be interpreted
pub const CODE_UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// The shape of a DLB error body: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// A failed call to the DLB API.
///
/// Constructed either from a transport failure (no HTTP status, code
/// [`CODE_CONNECTION_ERROR`]) or from a parsed non-2xx response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    http_status: Option<u16>,
    error_code: Option<String>,
    message: String,
    raw_body: Option<String>,
}

impl ApiError {
    /// Build an error for a transport-level failure (the request never produced an HTTP response)
    pub fn connection<M: ToString>(message: M) -> Self {
        Self {
            http_status: None,
            error_code: Some(CODE_CONNECTION_ERROR.to_string()),
            message: message.to_string(),
            raw_body: None,
        }
    }

    /// Build an error from a non-2xx HTTP response.
    ///
    /// The body is parsed as a DLB error envelope when possible. Unparsable bodies
    /// still yield a best-effort error with code [`CODE_UNKNOWN_ERROR`].
    pub fn from_response(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self {
                http_status: Some(http_status),
                error_code: parsed.error.code,
                message: parsed.error.message
                    .unwrap_or_else(|| format!("HTTP error {}", http_status)),
                raw_body: Some(body.to_string()),
            },
            Err(_) => Self {
                http_status: Some(http_status),
                error_code: Some(CODE_UNKNOWN_ERROR.to_string()),
                message: format!("HTTP error {}", http_status),
                raw_body: Some(body.to_string()),
            },
        }
    }

    /// Build an error for a 2xx response whose body did not have the expected shape
    pub fn unexpected_response<M: ToString>(http_status: u16, message: M, raw_body: &str) -> Self {
        Self {
            http_status: Some(http_status),
            error_code: Some(CODE_UNKNOWN_ERROR.to_string()),
            message: message.to_string(),
            raw_body: Some(raw_body.to_string()),
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw response body, for post-mortem debugging of unexpected replies
    pub fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    fn has_code(&self, code: &str) -> bool {
        self.error_code.as_deref() == Some(code)
    }

    /// The API token was rejected. Retrying further calls with the same token is pointless
    pub fn is_auth_error(&self) -> bool {
        self.http_status == Some(401) || self.has_code(CODE_INVALID_TOKEN)
    }

    /// The token is valid but lacks the required permission
    pub fn is_permission_error(&self) -> bool {
        self.http_status == Some(403) || self.has_code(CODE_PERMISSION_DENIED)
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status == Some(404) || self.has_code(CODE_NOT_FOUND)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.http_status == Some(429) || self.has_code(CODE_RATE_LIMITED)
    }

    /// The desired record already exists remotely (e.g. a muster was already submitted
    /// for this date). The orchestrator treats this as a skip, not a failure
    pub fn is_conflict(&self) -> bool {
        self.http_status == Some(409) || self.has_code(CODE_MUSTER_SUBMITTED)
    }

    /// True for transport failures that never reached the server
    pub fn is_connection_error(&self) -> bool {
        self.http_status.is_none() && self.has_code(CODE_CONNECTION_ERROR)
    }

    /// A one-line human-readable rendition, suitable for the run's error list and the logs.
    ///
    /// Renders `"HTTP {status} - {code} - {message}"`, omitting the parts that are absent.
    pub fn summary(&self) -> String {
        match (self.http_status, self.error_code.as_deref()) {
            (Some(status), Some(code)) => format!("HTTP {} - {} - {}", status, code, self.message),
            (Some(status), None) => format!("HTTP {} - {}", status, self.message),
            (None, Some(code)) => format!("{} - {}", code, self.message),
            (None, None) => self.message.clone(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_status() {
        let err = ApiError::from_response(401, "");
        assert!(err.is_auth_error());
        assert!(!err.is_conflict());

        let err = ApiError::from_response(403, "not json");
        assert!(err.is_permission_error());

        let err = ApiError::from_response(404, "{}");
        assert!(err.is_not_found());

        let err = ApiError::from_response(429, "");
        assert!(err.is_rate_limited());

        let err = ApiError::from_response(409, "");
        assert!(err.is_conflict());
    }

    #[test]
    fn classification_by_code() {
        let body = r#"{"error": {"code": "MUSTER_SUBMITTED", "message": "A muster already exists for this date"}}"#;
        let err = ApiError::from_response(400, body);
        assert!(err.is_conflict());
        assert_eq!(err.error_code(), Some(CODE_MUSTER_SUBMITTED));
        assert_eq!(err.message(), "A muster already exists for this date");

        let body = r#"{"error": {"code": "INVALID_TOKEN", "message": "Token expired"}}"#;
        let err = ApiError::from_response(400, body);
        assert!(err.is_auth_error());
    }

    #[test]
    fn unparsable_body_is_unknown() {
        let err = ApiError::from_response(500, "<html>Internal Server Error</html>");
        assert_eq!(err.error_code(), Some(CODE_UNKNOWN_ERROR));
        assert_eq!(err.http_status(), Some(500));
        assert_eq!(err.raw_body(), Some("<html>Internal Server Error</html>"));
    }

    #[test]
    fn connection_error_has_no_status() {
        let err = ApiError::connection("dns error: no such host");
        assert!(err.is_connection_error());
        assert!(!err.is_auth_error());
        assert_eq!(err.http_status(), None);
        assert_eq!(err.summary(), "CONNECTION_ERROR - dns error: no such host");
    }

    #[test]
    fn summary_renders_available_parts() {
        let body = r#"{"error": {"code": "RATE_LIMITED", "message": "Too many requests"}}"#;
        let err = ApiError::from_response(429, body);
        assert_eq!(err.summary(), "HTTP 429 - RATE_LIMITED - Too many requests");

        let body = r#"{"error": {"message": "Something odd"}}"#;
        let err = ApiError::from_response(400, body);
        assert_eq!(err.summary(), "HTTP 400 - Something odd");
    }
}
