use super::Amount;
use crate::macros::setter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Method, Request, RequestData};

// Common

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetScope {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    Success,
    NeedsConfirmation,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDiff {
    pub category: String,
    #[serde(default)]
    pub current_amount: Amount,
    #[serde(default)]
    pub new_amount: Amount,
    #[serde(default)]
    pub delta_amount: Amount,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentProposal {
    #[serde(default)]
    pub diffs: Vec<BudgetDiff>,
}

/// A category the server suggests funding an increase from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCategoryOption {
    pub category: String,
    #[serde(default)]
    pub current_amount: Amount,
    #[serde(default)]
    pub suggested_reduction: Amount,
}

// Requests

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBudget {
    instruction: String,
    confirm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<BudgetScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_category: Option<String>,
}

impl AdjustBudget {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            confirm: false,
            scope: None,
            source_category: None,
        }
    }

    setter!(confirm: bool);
    setter!(opt scope: BudgetScope);
    setter!(opt source_category: String);

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirm
    }

    pub fn selected_source(&self) -> Option<&str> {
        self.source_category.as_deref()
    }
}

impl Request for AdjustBudget {
    type Data = Self;
    type Response = BudgetAdjustmentResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/budgets/adjust".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

// Responses

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAdjustmentResponse {
    pub status: AdjustmentStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub proposal: Option<AdjustmentProposal>,
    #[serde(default)]
    pub options: Option<Vec<SourceCategoryOption>>,
    #[serde(default)]
    pub updated_budget: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_confirmation_response() {
        let json = r#"{
            "status": "needs_confirmation",
            "proposal": {"diffs": [{"category": "Dining", "currentAmount": 300, "newAmount": "350", "deltaAmount": 50}]},
            "options": [{"category": "Shopping", "currentAmount": 200, "suggestedReduction": 50}]
        }"#;
        let response: BudgetAdjustmentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, AdjustmentStatus::NeedsConfirmation);
        assert_eq!(response.proposal.unwrap().diffs[0].new_amount, Amount::Text("350".into()));
        assert_eq!(response.options.unwrap()[0].category, "Shopping");
    }

    #[test]
    fn request_skips_unset_source() {
        let json = serde_json::to_value(AdjustBudget::new("move $50 to dining")).unwrap();
        assert_eq!(json["confirm"], false);
        assert!(json.get("sourceCategory").is_none());

        let json = serde_json::to_value(
            AdjustBudget::new("move $50 to dining")
                .confirm(true)
                .source_category("Shopping"),
        )
        .unwrap();
        assert_eq!(json["confirm"], true);
        assert_eq!(json["sourceCategory"], "Shopping");
    }
}
