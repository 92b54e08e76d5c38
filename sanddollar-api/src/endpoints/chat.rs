use crate::macros::setter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Method, Request, RequestData};

pub const CHAT_ANSWER_PATH: &str = "/ai/chat/answer";

// Common

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// Requests

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatAnswer {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
        }
    }

    setter!(opt temperature: f32);

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl Request for ChatAnswer {
    type Data = Self;
    type Response = ChatAnswerResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        CHAT_ANSWER_PATH.into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

// Responses

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswerResponse {
    #[serde(alias = "response", alias = "content")]
    pub answer: String,
}
