use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Unexpected status {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Offline: {0}")]
    Offline(String),
}

/// Maximum length for response bodies embedded in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        if text.len() <= MAX_ERROR_BODY_LENGTH {
            return text.into_owned();
        }

        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &text[..cut], body.len())
    }

    /// Build the error for a response whose status makes it unusable.
    pub fn from_status(url: &str, status: u16, body: &[u8]) -> Self {
        FetchError::Status {
            url: url.to_string(),
            status,
            body: Self::truncate_body(body),
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        !matches!(self, FetchError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_short_body() {
        let err = FetchError::from_status("http://localhost/manifest.json", 404, b"not found");
        match &err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(*status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_transport());
    }

    #[test]
    fn test_from_status_truncates_long_body() {
        let body = "x".repeat(2000);
        let err = FetchError::from_status("http://localhost/", 500, body.as_bytes());
        let message = err.to_string();
        assert!(message.contains("truncated, 2000 total bytes"));
        assert!(message.len() < 700);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // 'í' is two bytes, so byte 500 falls inside a character
        let body = format!("a{}", "í".repeat(400));
        let truncated = FetchError::truncate_body(body.as_bytes());
        assert!(truncated.starts_with('a'));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_offline_is_transport_failure() {
        assert!(FetchError::Offline("no route".to_string()).is_transport());
    }
}
