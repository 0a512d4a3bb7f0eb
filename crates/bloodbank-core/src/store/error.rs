use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthorized - access token missing or expired")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid store configuration: {0}")]
    Config(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl StoreError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => StoreError::Unauthorized,
            403 => StoreError::PermissionDenied(truncated),
            404 => StoreError::NotFound(truncated),
            429 => StoreError::RateLimited,
            500..=599 => StoreError::ServerError(truncated),
            _ => StoreError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            StoreError::from_status(StatusCode::UNAUTHORIZED, ""),
            StoreError::Unauthorized
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::FORBIDDEN, "denied"),
            StoreError::PermissionDenied(ref b) if b == "denied"
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::NOT_FOUND, ""),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            StoreError::RateLimited
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            StoreError::ServerError(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::BAD_REQUEST, "bad"),
            StoreError::InvalidResponse(ref m) if m.contains("400") && m.contains("bad")
        ));
    }

    #[test]
    fn test_long_bodies_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = StoreError::truncate_body(&body);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));
    }
}
