use super::StreamError;
use async_trait::async_trait;
use sanddollar_api::endpoints::chat::ChatAnswer;
use sanddollar_api::stream::ChatStream;
use sanddollar_api::Client;

/// An open answer stream, read token by token.
#[async_trait]
pub trait TokenStream: Send {
    /// Next token, `None` once the answer is complete.
    async fn next_token(&mut self) -> Result<Option<String>, StreamError>;
}

/// Opens streamed chat answers. Kept separate from the retry policy so tests
/// can substitute a scripted transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    type Stream: TokenStream;

    async fn open(&self, request: &ChatAnswer) -> Result<Self::Stream, StreamError>;
}

#[async_trait]
impl TokenStream for ChatStream {
    async fn next_token(&mut self) -> Result<Option<String>, StreamError> {
        Ok(ChatStream::next_token(self).await?)
    }
}

#[async_trait]
impl ChatTransport for Client {
    type Stream = ChatStream;

    async fn open(&self, request: &ChatAnswer) -> Result<Self::Stream, StreamError> {
        Ok(self.open_chat_stream(request).await?)
    }
}
