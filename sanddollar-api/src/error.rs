use serde::{Deserialize, Serialize};
use tower_api_client::{Error as ApiError, StatusCode};

#[derive(Debug)]
pub enum SanddollarApiError {
    Api(StatusCode, ErrorBody),
    Internal(ApiError),
}

impl SanddollarApiError {
    /// HTTP status of a backend rejection, `None` for transport-level failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SanddollarApiError::Api(status, _) => Some(*status),
            SanddollarApiError::Internal(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<ApiError> for SanddollarApiError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::ClientError(status, detail) | ApiError::ServerError(status, detail) => {
                SanddollarApiError::Api(status, ErrorBody::parse(&detail))
            }
            e => SanddollarApiError::Internal(e),
        }
    }
}

impl std::fmt::Display for SanddollarApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SanddollarApiError::Internal(e) => write!(f, "Internal error: {}", e),
            SanddollarApiError::Api(status, body) => write!(f, "({}) {}", status, body.message),
        }
    }
}

impl std::error::Error for SanddollarApiError {}

/// Backend error payload. The server answers with `{"message": ..}`,
/// `{"error": ..}` or plain text depending on the controller, so parsing is lenient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Deserialize)]
struct JsonErrorBody {
    message: Option<String>,
    error: Option<String>,
    detail: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        if let Ok(body) = serde_json::from_str::<JsonErrorBody>(raw) {
            if let Some(message) = body.message.or(body.error).or(body.detail) {
                return Self::new(message);
            }
        }
        Self::new(raw.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_field() {
        let body = ErrorBody::parse(r#"{"message":"Too many requests"}"#);
        assert_eq!(body.message, "Too many requests");
    }

    #[test]
    fn parses_error_field() {
        let body = ErrorBody::parse(r#"{"error":"Failed to process budget chat"}"#);
        assert_eq!(body.message, "Failed to process budget chat");
    }

    #[test]
    fn falls_back_to_raw_text() {
        let body = ErrorBody::parse("  Bad Gateway \n");
        assert_eq!(body.message, "Bad Gateway");
    }

    #[test]
    fn classifies_statuses() {
        let limited = SanddollarApiError::Api(StatusCode::TOO_MANY_REQUESTS, ErrorBody::new(""));
        assert_eq!(limited.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(!limited.is_not_found());

        let missing = SanddollarApiError::Api(StatusCode::NOT_FOUND, ErrorBody::new(""));
        assert!(missing.is_not_found());
        assert_eq!(missing.status(), Some(StatusCode::NOT_FOUND));
    }
}
