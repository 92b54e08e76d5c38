/// Transient user-facing message raised by a completed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
    Info(String),
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification::Success(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification::Error(message.into())
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notification::Info(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Notification::Success(m) | Notification::Error(m) | Notification::Info(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }
}
