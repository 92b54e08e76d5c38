use super::Amount;
use crate::macros::setter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;
use tower_api_client::{Method, Request, RequestData};

// Common

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStyle {
    Aggressive,
    #[default]
    Balanced,
    Flexible,
}

impl BudgetStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Balanced => "balanced",
            Self::Flexible => "flexible",
        }
    }
}

impl Display for BudgetStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BudgetStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aggressive" => Ok(Self::Aggressive),
            "balanced" => Ok(Self::Balanced),
            "flexible" => Ok(Self::Flexible),
            other => Err(format!(
                "unknown budget style '{}': expected aggressive, balanced, or flexible",
                other
            )),
        }
    }
}

/// Actual spend for one category as reported by the snapshot endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryActualEntry {
    pub category: String,
    #[serde(default)]
    pub actual: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Amount>,
}

/// Target as produced by the AI service or stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTargetEntry {
    pub category: String,
    #[serde(default)]
    pub target: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Normalized per-category target, the shape sent back on accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTarget {
    pub category: String,
    pub target: f64,
    pub reason: String,
}

impl CategoryTarget {
    pub fn new(category: impl Into<String>, target: f64, reason: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            target,
            reason: reason.into(),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTotals {
    #[serde(default)]
    pub expenses: Amount,
    #[serde(default)]
    pub savings: Amount,
    #[serde(default)]
    pub net_cash_flow: Amount,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_keep_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_caps: Option<BTreeMap<String, f64>>,
}

impl BudgetConstraints {
    pub fn is_empty(&self) -> bool {
        self.must_keep_categories.as_ref().is_none_or(|c| c.is_empty())
            && self.category_caps.as_ref().is_none_or(|c| c.is_empty())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    #[serde(default)]
    pub savings_rate: Amount,
    #[serde(default)]
    pub notes: Vec<String>,
}

// Requests

#[derive(Default, Debug, Clone, Serialize)]
pub struct GetSnapshot;

impl GetSnapshot {
    pub fn new() -> Self {
        Self
    }
}

impl Request for GetSnapshot {
    type Data = ();
    type Response = FinancialSnapshotResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/ai/budget/snapshot".into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBudget {
    month: String,
    goals: Vec<String>,
    style: BudgetStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    constraints: Option<BudgetConstraints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl GenerateBudget {
    pub fn new(month: impl Into<String>, goals: Vec<String>, style: BudgetStyle) -> Self {
        Self {
            month: month.into(),
            goals,
            style,
            constraints: None,
            notes: None,
        }
    }

    setter!(opt constraints: BudgetConstraints);
    setter!(opt notes: String);

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    pub fn style(&self) -> BudgetStyle {
        self.style
    }
}

impl Request for GenerateBudget {
    type Data = Self;
    type Response = GenerateBudgetResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/ai/budget/generate".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptBudget {
    month: String,
    targets_by_category: Vec<CategoryTarget>,
}

impl AcceptBudget {
    pub fn new(month: impl Into<String>, targets_by_category: Vec<CategoryTarget>) -> Self {
        Self {
            month: month.into(),
            targets_by_category,
        }
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn targets_by_category(&self) -> &[CategoryTarget] {
        &self.targets_by_category
    }
}

impl Request for AcceptBudget {
    type Data = Self;
    type Response = AcceptBudgetResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/ai/budget/accept".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

// Responses

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshotResponse {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub income: Amount,
    #[serde(default)]
    pub actuals_by_category: Vec<CategoryActualEntry>,
    #[serde(default)]
    pub totals: FinancialTotals,
    #[serde(default)]
    pub targets_by_category: Option<Vec<CategoryTargetEntry>>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBudgetResponse {
    pub month: String,
    #[serde(default)]
    pub targets_by_category: Vec<CategoryTargetEntry>,
    #[serde(default)]
    pub summary: BudgetSummary,
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptBudgetResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_payload_uses_wire_names() {
        let request = GenerateBudget::new("2025-01", vec!["Emergency fund".into()], BudgetStyle::Balanced)
            .constraints(BudgetConstraints {
                must_keep_categories: Some(vec!["Rent".into()]),
                category_caps: None,
            })
            .notes("demo");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["month"], "2025-01");
        assert_eq!(json["style"], "balanced");
        assert_eq!(json["constraints"]["mustKeepCategories"][0], "Rent");
        assert!(json["constraints"].get("categoryCaps").is_none());
        assert_eq!(json["notes"], "demo");
    }

    #[test]
    fn generate_payload_omits_absent_optionals() {
        let request = GenerateBudget::new("2025-01", vec!["Pay off debt".into()], BudgetStyle::Aggressive);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("constraints").is_none());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn snapshot_accepts_decimal_strings() {
        let json = r#"{
            "month": "2025-01",
            "income": "6200.00",
            "actualsByCategory": [{"category": "Dining", "actual": 312.5}],
            "totals": {"expenses": 1500, "savings": "200", "netCashFlow": 200},
            "targetsByCategory": null,
            "acceptedAt": null
        }"#;
        let snapshot: FinancialSnapshotResponse = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.income, Amount::Text("6200.00".into()));
        assert_eq!(snapshot.actuals_by_category[0].actual, Amount::Number(312.5));
        assert!(snapshot.targets_by_category.is_none());
    }

    #[test]
    fn summary_accepts_decimal_savings_rate() {
        let json = r#"{
            "month": "2025-01",
            "targetsByCategory": [],
            "summary": {"savingsRate": "0.18", "notes": ["Trimmed dining"]}
        }"#;
        let response: GenerateBudgetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.summary.savings_rate, Amount::Text("0.18".into()));
        assert_eq!(response.summary.notes, vec!["Trimmed dining".to_string()]);
    }

    #[test]
    fn parses_style_case_insensitively() {
        assert_eq!("Flexible".parse::<BudgetStyle>(), Ok(BudgetStyle::Flexible));
        assert!("wild".parse::<BudgetStyle>().is_err());
    }
}
