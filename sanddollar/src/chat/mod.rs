//! Budget assistant chat: plain and streamed answers, plus budget adjustments
//! proposed from free-text instructions.

pub mod adjust;
pub mod retry;
pub mod transport;

pub use adjust::is_budget_adjustment_instruction;
pub use retry::{stream_with_retry, CancellationToken, RetryPolicy, StreamObserver, StreamOutcome};
pub use transport::{ChatTransport, TokenStream};

use crate::errors::BackendError;
use crate::notify::Notification;
use async_trait::async_trait;
use sanddollar_api::endpoints::budgets::{AdjustBudget, AdjustmentStatus, BudgetAdjustmentResponse};
use sanddollar_api::endpoints::chat::{ChatAnswer, ChatAnswerResponse, ChatMessage};
use sanddollar_api::stream::ChatStreamError;
use sanddollar_api::Client;
use thiserror::Error;

pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const CONNECTION_FAILED_REPLY: &str =
    "Sorry, the connection failed. Please try sending your message again.";
pub const ADJUSTED_MESSAGE: &str = "Budget updated successfully!";

const TEMPERATURE: f32 = 0.7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("stream connection failed: {0}")]
    Connection(String),

    #[error("({status}) {message}")]
    Status { status: u16, message: String },
}

impl StreamError {
    /// Expired sessions are not worth reconnecting for.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StreamError::Status { status: 401, .. })
    }
}

impl From<ChatStreamError> for StreamError {
    fn from(err: ChatStreamError) -> Self {
        match err {
            ChatStreamError::Status(status, body) => StreamError::Status {
                status: status.as_u16(),
                message: body.message,
            },
            ChatStreamError::Http(e) => StreamError::Connection(e.to_string()),
        }
    }
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn adjust(&self, request: AdjustBudget) -> Result<BudgetAdjustmentResponse, BackendError>;

    async fn answer(&self, request: ChatAnswer) -> Result<ChatAnswerResponse, BackendError>;
}

#[async_trait]
impl AssistantBackend for Client {
    async fn adjust(&self, request: AdjustBudget) -> Result<BudgetAdjustmentResponse, BackendError> {
        Ok(self.send(request).await?)
    }

    async fn answer(&self, request: ChatAnswer) -> Result<ChatAnswerResponse, BackendError> {
        Ok(self.send(request).await?)
    }
}

/// An adjustment the backend wants confirmed before applying.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAdjustment {
    pub instruction: String,
    pub response: BudgetAdjustmentResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantReply {
    /// A budget adjustment was applied.
    Adjusted,
    /// An adjustment is waiting in [`Assistant::pending_adjustment`].
    NeedsConfirmation,
    Answered,
    Cancelled,
    Failed,
    /// Blank message, or nothing pending to confirm.
    Ignored,
}

/// Collects streamed tokens into the assistant's reply.
struct ReplySink {
    content: String,
    max_retries: u32,
    notifications: Vec<Notification>,
}

impl StreamObserver for ReplySink {
    fn on_token(&mut self, token: &str) {
        self.content.push_str(token);
    }

    fn on_reconnect(&mut self, attempt: u32, max: u32) {
        // A reconnect replays the answer from the start
        self.content.clear();
        self.notifications.push(Notification::info(format!(
            "Reconnecting... (attempt {}/{})",
            attempt, max
        )));
    }

    fn on_error(&mut self, _error: &StreamError) {
        self.notifications.push(Notification::error(format!(
            "Connection failed after {} attempts. Please try again.",
            self.max_retries
        )));
    }
}

pub struct Assistant<B: AssistantBackend, T: ChatTransport> {
    backend: B,
    transport: T,
    policy: RetryPolicy,
    streaming: bool,
    messages: Vec<ChatMessage>,
    pending: Option<PendingAdjustment>,
    notifications: Vec<Notification>,
    budget_changed: bool,
}

impl<B: AssistantBackend, T: ChatTransport> Assistant<B, T> {
    pub fn new(backend: B, transport: T) -> Self {
        Self {
            backend,
            transport,
            policy: RetryPolicy::default(),
            streaming: false,
            messages: Vec::new(),
            pending: None,
            notifications: Vec::new(),
            budget_changed: false,
        }
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn pending_adjustment(&self) -> Option<&PendingAdjustment> {
        self.pending.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// True once per applied adjustment; owners refresh their budget data.
    pub fn take_budget_changed(&mut self) -> bool {
        std::mem::take(&mut self.budget_changed)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
    }

    pub async fn send(&mut self, message: &str, cancel: &CancellationToken) -> AssistantReply {
        let message = message.trim();
        if message.is_empty() {
            return AssistantReply::Ignored;
        }
        self.messages.push(ChatMessage::user(message));

        if is_budget_adjustment_instruction(message) {
            match self.backend.adjust(AdjustBudget::new(message)).await {
                Ok(response) => match response.status {
                    AdjustmentStatus::Success => {
                        self.adjustment_applied();
                        return AssistantReply::Adjusted;
                    }
                    AdjustmentStatus::NeedsConfirmation => {
                        self.pending = Some(PendingAdjustment {
                            instruction: message.to_string(),
                            response,
                        });
                        return AssistantReply::NeedsConfirmation;
                    }
                    AdjustmentStatus::Error => {
                        tracing::warn!(
                            "Budget adjustment rejected, answering as chat: {}",
                            response.message.as_deref().unwrap_or("no message")
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!("Budget adjustment failed, answering as chat: {}", e);
                    self.notifications
                        .push(Notification::error(format!("Failed to adjust budget: {}", e)));
                }
            }
        }

        self.answer(cancel).await
    }

    async fn answer(&mut self, cancel: &CancellationToken) -> AssistantReply {
        let request = ChatAnswer::new(self.messages.clone()).temperature(TEMPERATURE);

        if !self.streaming {
            return match self.backend.answer(request).await {
                Ok(response) => {
                    self.messages.push(ChatMessage::assistant(response.answer));
                    AssistantReply::Answered
                }
                Err(e) => {
                    tracing::warn!("Chat answer failed: {}", e);
                    self.messages.push(ChatMessage::assistant(ERROR_REPLY));
                    AssistantReply::Failed
                }
            };
        }

        let mut sink = ReplySink {
            content: String::new(),
            max_retries: self.policy.max_retries,
            notifications: Vec::new(),
        };
        let outcome =
            stream_with_retry(&self.transport, &request, &self.policy, cancel, &mut sink).await;
        self.notifications.append(&mut sink.notifications);

        match outcome {
            StreamOutcome::Completed => {
                self.messages.push(ChatMessage::assistant(sink.content));
                AssistantReply::Answered
            }
            StreamOutcome::Cancelled => {
                tracing::debug!("Chat stream cancelled");
                if !sink.content.is_empty() {
                    self.messages.push(ChatMessage::assistant(sink.content));
                }
                AssistantReply::Cancelled
            }
            StreamOutcome::Failed(_) => {
                self.messages.push(ChatMessage::assistant(CONNECTION_FAILED_REPLY));
                AssistantReply::Failed
            }
        }
    }

    /// Applies the pending adjustment, optionally naming where the money comes from.
    pub async fn confirm_adjustment(&mut self, source_category: Option<String>) -> AssistantReply {
        let Some(pending) = self.pending.clone() else {
            return AssistantReply::Ignored;
        };

        let mut request = AdjustBudget::new(pending.instruction.clone()).confirm(true);
        if let Some(source) = source_category {
            request = request.source_category(source);
        }

        match self.backend.adjust(request).await {
            Ok(response) => match response.status {
                AdjustmentStatus::Success => {
                    self.adjustment_applied();
                    AssistantReply::Adjusted
                }
                AdjustmentStatus::NeedsConfirmation => {
                    self.pending = Some(PendingAdjustment {
                        instruction: pending.instruction,
                        response,
                    });
                    AssistantReply::NeedsConfirmation
                }
                AdjustmentStatus::Error => {
                    let reason = response.message.unwrap_or_else(|| "unknown error".to_string());
                    self.notifications
                        .push(Notification::error(format!("Failed to adjust budget: {}", reason)));
                    AssistantReply::Failed
                }
            },
            Err(e) => {
                tracing::error!("Failed to confirm budget adjustment: {}", e);
                self.notifications
                    .push(Notification::error(format!("Failed to adjust budget: {}", e)));
                AssistantReply::Failed
            }
        }
    }

    pub fn dismiss_adjustment(&mut self) {
        self.pending = None;
    }

    fn adjustment_applied(&mut self) {
        tracing::info!("Budget adjustment applied");
        self.pending = None;
        self.budget_changed = true;
        self.notifications.push(Notification::success(ADJUSTED_MESSAGE));
    }
}
