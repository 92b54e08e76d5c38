use sanddollar_api::SanddollarApiError;
use thiserror::Error;

pub const RATE_LIMITED_MESSAGE: &str =
    "You have requested several AI budgets. Please wait a minute before trying again.";
pub const UNAUTHORIZED_MESSAGE: &str = "Your session has expired. Please sign in again.";
pub const UNREACHABLE_MESSAGE: &str =
    "We could not reach the Sanddollar server. Check that the backend is running and try again.";
pub const SERVICE_MESSAGE: &str =
    "We could not reach the AI service right now. You can retry or continue with a heuristic budget.";

/// Failure of a backend call, reduced to what callers need to react.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("({status}) {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            BackendError::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn kind(&self) -> FailureKind {
        match self.status() {
            Some(429) => FailureKind::RateLimited,
            Some(401) => FailureKind::Unauthorized,
            Some(_) => FailureKind::Service,
            None => FailureKind::Unreachable,
        }
    }
}

impl From<SanddollarApiError> for BackendError {
    fn from(err: SanddollarApiError) -> Self {
        match err {
            SanddollarApiError::Api(status, body) => BackendError::Status {
                status: status.as_u16(),
                message: body.message,
            },
            SanddollarApiError::Internal(e) => BackendError::Transport(e.to_string()),
        }
    }
}

/// User-facing classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Unauthorized,
    Unreachable,
    Service,
}

impl FailureKind {
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => RATE_LIMITED_MESSAGE,
            FailureKind::Unauthorized => UNAUTHORIZED_MESSAGE,
            FailureKind::Unreachable => UNREACHABLE_MESSAGE,
            FailureKind::Service => SERVICE_MESSAGE,
        }
    }

    /// Expired sessions need a new sign-in before the request is sent again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanddollar_api::{ErrorBody, StatusCode};

    #[test]
    fn classifies_by_status() {
        let limited = BackendError::Status { status: 429, message: String::new() };
        assert_eq!(limited.kind(), FailureKind::RateLimited);
        assert_eq!(limited.kind().message(), RATE_LIMITED_MESSAGE);

        let expired = BackendError::Status { status: 401, message: String::new() };
        assert_eq!(expired.kind(), FailureKind::Unauthorized);
        assert!(!expired.kind().is_retryable());

        let broken = BackendError::Status { status: 502, message: String::new() };
        assert_eq!(broken.kind(), FailureKind::Service);

        let down = BackendError::Transport("connection refused".into());
        assert_eq!(down.kind(), FailureKind::Unreachable);
        assert!(down.kind().is_retryable());
    }

    #[test]
    fn converts_api_rejections() {
        let err = SanddollarApiError::Api(StatusCode::NOT_FOUND, ErrorBody::new("No snapshot"));
        let err = BackendError::from(err);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "(404) No snapshot");
    }
}
