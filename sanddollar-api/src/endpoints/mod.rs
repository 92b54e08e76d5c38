pub mod ai_budget;
pub mod auth;
pub mod budgets;
pub mod chat;
pub mod plaid;

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Monetary value as the backend serializes it.
///
/// Amounts are `BigDecimal` on the server and arrive either as JSON numbers or as
/// decimal strings (`"1250.00"`); a few legacy endpoints wrap them in objects.
/// Callers normalize to `f64` once, right after deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Number(0.0)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Number(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Number(value as f64)
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

impl From<String> for Amount {
    fn from(value: String) -> Self {
        Amount::Text(value)
    }
}

impl From<serde_json::Value> for Amount {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Amount::Number(f),
                None => Amount::Other(serde_json::Value::Number(n)),
            },
            serde_json::Value::String(s) => Amount::Text(s),
            other => Amount::Other(other),
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{}", n),
            Amount::Text(s) => f.write_str(s),
            Amount::Other(value) => write!(f, "{}", value),
        }
    }
}
