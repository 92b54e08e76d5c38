//! Server-sent-event access to the chat endpoint.
//!
//! `tower-api-client` buffers whole JSON bodies, so the streaming variant of
//! `/ai/chat/answer` goes through `reqwest` directly and yields `data:` payloads
//! as they arrive.

use crate::endpoints::chat::{CHAT_ANSWER_PATH, ChatAnswer};
use crate::{Client, ErrorBody};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderValue};
use secrecy::ExposeSecret;
use std::collections::VecDeque;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug)]
pub enum ChatStreamError {
    Http(reqwest::Error),
    Status(StatusCode, ErrorBody),
}

impl ChatStreamError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(e) => e.status(),
            Self::Status(status, _) => Some(*status),
        }
    }
}

impl std::fmt::Display for ChatStreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {}", e),
            Self::Status(status, body) => write!(f, "({}) {}", status, body.message),
        }
    }
}

impl std::error::Error for ChatStreamError {}

impl From<reqwest::Error> for ChatStreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl Client {
    /// Open a streaming chat answer. Tokens are read with [`ChatStream::next_token`].
    pub async fn open_chat_stream(
        &self,
        request: &ChatAnswer,
    ) -> Result<ChatStream, ChatStreamError> {
        let url = format!("{}{}", self.base_url(), CHAT_ANSWER_PATH);
        let mut builder = reqwest::Client::new()
            .post(&url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(request);
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatStreamError::Status(status, ErrorBody::parse(&body)));
        }

        Ok(ChatStream {
            response,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            finished: false,
        })
    }
}

pub struct ChatStream {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl ChatStream {
    /// Next token of the answer, `None` once the server closes the stream or sends `[DONE]`.
    pub async fn next_token(&mut self) -> Result<Option<String>, ChatStreamError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            if self.finished {
                return Ok(None);
            }

            match self.response.chunk().await? {
                Some(chunk) => {
                    for event in self.decoder.push(&chunk) {
                        match event {
                            SseEvent::Data(token) => self.pending.push_back(token),
                            SseEvent::Done => self.finished = true,
                        }
                    }
                }
                None => {
                    if let Some(SseEvent::Data(token)) = self.decoder.finish() {
                        self.pending.push_back(token);
                    }
                    self.finished = true;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental `text/event-stream` line decoder. Only `data:` fields are surfaced.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = Self::decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        Self::decode_line(&line)
    }

    fn decode_line(line: &[u8]) -> Option<SseEvent> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);
        if data == DONE_MARKER {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(data.to_string()))
        }
    }
}
