//! Budget domain model.
//!
//! Everything here holds plain `f64` amounts. Wire values from `sanddollar-api`
//! are converted once, in [`normalize`], right after they are received.

pub mod goals;
pub mod heuristic;
pub mod normalize;
pub mod review;

use chrono::{DateTime, NaiveDate, Utc};
use sanddollar_api::endpoints::ai_budget::{FinancialSnapshotResponse, GenerateBudgetResponse};
use serde::{Deserialize, Serialize};

pub use goals::GoalFormData;
pub use sanddollar_api::endpoints::ai_budget::{BudgetConstraints, BudgetStyle, CategoryTarget};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryActual {
    pub category: String,
    pub actual: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

impl CategoryActual {
    pub fn new(category: impl Into<String>, actual: f64) -> Self {
        Self {
            category: category.into(),
            actual,
            target: None,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTotals {
    pub expenses: f64,
    pub savings: f64,
    pub net_cash_flow: f64,
}

/// Month-level view of income, spend and any targets already accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    pub month: String,
    pub income: f64,
    pub actuals_by_category: Vec<CategoryActual>,
    pub totals: SnapshotTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets_by_category: Option<Vec<CategoryTarget>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl FinancialSnapshot {
    pub fn from_response(response: &FinancialSnapshotResponse, today: NaiveDate) -> Self {
        Self {
            month: normalize::normalize_month_at(response.month.as_deref(), today),
            income: normalize::to_number(&response.income),
            actuals_by_category: response
                .actuals_by_category
                .iter()
                .map(normalize::map_actual_entry)
                .collect(),
            totals: SnapshotTotals {
                expenses: normalize::to_number(&response.totals.expenses),
                savings: normalize::to_number(&response.totals.savings),
                net_cash_flow: normalize::to_number(&response.totals.net_cash_flow),
            },
            targets_by_category: response
                .targets_by_category
                .as_ref()
                .map(|targets| targets.iter().map(normalize::map_target_entry).collect()),
            accepted_at: response.accepted_at,
        }
    }

    pub fn has_saved_targets(&self) -> bool {
        self.targets_by_category
            .as_ref()
            .is_some_and(|targets| !targets.is_empty())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub savings_rate: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A proposed monthly budget, either from the AI service or built locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedBudget {
    pub month: String,
    pub targets_by_category: Vec<CategoryTarget>,
    pub summary: BudgetSummary,
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl GeneratedBudget {
    pub fn from_response(response: &GenerateBudgetResponse, today: NaiveDate) -> Self {
        Self {
            month: normalize::normalize_month_at(Some(&response.month), today),
            targets_by_category: response
                .targets_by_category
                .iter()
                .map(normalize::map_target_entry)
                .collect(),
            summary: BudgetSummary {
                savings_rate: normalize::to_number(&response.summary.savings_rate),
                notes: response.summary.notes.clone(),
            },
            prompt_tokens: response.prompt_tokens.unwrap_or(0),
            completion_tokens: response.completion_tokens.unwrap_or(0),
        }
    }

    pub fn total_targets(&self) -> f64 {
        self.targets_by_category.iter().map(|t| t.target).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanddollar_api::endpoints::{
        ai_budget::{self, CategoryActualEntry, CategoryTargetEntry},
        Amount,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn snapshot_from_response_normalizes_amounts_and_month() {
        let response = FinancialSnapshotResponse {
            month: Some("2025-01-01".into()),
            income: Amount::from("6200.00"),
            actuals_by_category: vec![CategoryActualEntry {
                category: "Dining".into(),
                actual: Amount::from("300"),
                target: Some(Amount::from(250.0)),
            }],
            targets_by_category: Some(vec![CategoryTargetEntry {
                category: "Dining".into(),
                target: Amount::from("250"),
                reason: None,
            }]),
            ..Default::default()
        };

        let snapshot = FinancialSnapshot::from_response(&response, today());
        assert_eq!(snapshot.month, "2025-01");
        assert_eq!(snapshot.income, 6200.0);
        assert_eq!(snapshot.actuals_by_category[0].actual, 300.0);
        assert_eq!(snapshot.actuals_by_category[0].target, Some(250.0));
        assert!(snapshot.has_saved_targets());
    }

    #[test]
    fn snapshot_without_month_uses_today() {
        let snapshot = FinancialSnapshot::from_response(&FinancialSnapshotResponse::default(), today());
        assert_eq!(snapshot.month, "2025-03");
        assert_eq!(snapshot.income, 0.0);
        assert!(!snapshot.has_saved_targets());
    }

    #[test]
    fn generated_budget_defaults_missing_reasons() {
        let response = GenerateBudgetResponse {
            month: "March 2025".into(),
            targets_by_category: vec![CategoryTargetEntry {
                category: "Groceries".into(),
                target: Amount::from(410.0),
                reason: None,
            }],
            summary: ai_budget::BudgetSummary {
                savings_rate: Amount::from("0.25"),
                notes: vec!["Keep groceries steady".into()],
            },
            prompt_tokens: Some(12),
            completion_tokens: None,
        };

        let budget = GeneratedBudget::from_response(&response, today());
        assert_eq!(budget.month, "2025-03");
        assert_eq!(budget.targets_by_category[0].reason, normalize::DEFAULT_TARGET_REASON);
        assert_eq!(budget.prompt_tokens, 12);
        assert_eq!(budget.completion_tokens, 0);
        assert_eq!(budget.total_targets(), 410.0);
        assert_eq!(budget.summary.savings_rate, 0.25);
        assert_eq!(budget.summary.notes, vec!["Keep groceries steady".to_string()]);
    }
}
