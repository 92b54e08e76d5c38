//! Reconnecting reader for streamed chat answers.

use super::transport::{ChatTransport, TokenStream};
use super::StreamError;
use sanddollar_api::endpoints::chat::ChatAnswer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Retry schedule: up to `max_retries` reconnects, waiting `base_delay` before
/// the first and doubling each time (1s, 2s, 4s by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Wait before reconnect number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|retry| self.delay_for(retry)).collect()
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation shared between a caller and a running stream.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<CancelState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Receives stream progress.
pub trait StreamObserver {
    fn on_token(&mut self, token: &str);

    /// Called before reconnect `attempt` of `max`.
    fn on_reconnect(&mut self, _attempt: u32, _max: u32) {}

    /// Called once all reconnects are used up.
    fn on_error(&mut self, _error: &StreamError) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed(StreamError),
}

/// Streams an answer, reconnecting per `policy` when the connection drops.
///
/// Cancellation ends the call with [`StreamOutcome::Cancelled`] and is never
/// retried. Rejections that reconnecting cannot fix (an expired session) fail
/// immediately.
pub async fn stream_with_retry<T, O>(
    transport: &T,
    request: &ChatAnswer,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    observer: &mut O,
) -> StreamOutcome
where
    T: ChatTransport + ?Sized,
    O: StreamObserver,
{
    let mut retries = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamOutcome::Cancelled,
            result = read_stream(transport, request, observer) => result,
        };

        let error = match result {
            Ok(()) => return StreamOutcome::Completed,
            Err(error) => error,
        };

        if retries >= policy.max_retries || !error.is_retryable() {
            tracing::error!("Chat stream failed after {} retries: {}", retries, error);
            observer.on_error(&error);
            return StreamOutcome::Failed(error);
        }

        retries += 1;
        tracing::warn!(
            "Chat stream interrupted ({}), reconnecting {}/{}",
            error,
            retries,
            policy.max_retries
        );
        observer.on_reconnect(retries, policy.max_retries);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamOutcome::Cancelled,
            _ = tokio::time::sleep(policy.delay_for(retries)) => {}
        }
    }
}

async fn read_stream<T, O>(transport: &T, request: &ChatAnswer, observer: &mut O) -> Result<(), StreamError>
where
    T: ChatTransport + ?Sized,
    O: StreamObserver,
{
    let mut stream = transport.open(request).await?;
    while let Some(token) = stream.next_token().await? {
        observer.on_token(&token);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_from_one_second() {
        assert_eq!(
            RetryPolicy::default().schedule(),
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn delay_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(3), Duration::from_secs(1));
        assert_eq!(policy.delay_for(90), policy.delay_for(17));
    }

    #[tokio::test]
    async fn cancellation_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::task::yield_now().await;
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());

        // Already-cancelled tokens resolve immediately
        token.cancelled().await;
    }
}
