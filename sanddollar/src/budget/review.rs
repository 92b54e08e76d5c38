use super::{normalize, BudgetSummary, CategoryActual, CategoryTarget, FinancialSnapshot, GeneratedBudget};
use std::collections::BTreeMap;

pub const SAVED_TARGETS_NOTE: &str = "Loaded from saved AI budget targets.";

/// User edits made in the review step, keyed by category.
///
/// Overrides are layered over the generated targets when they are read; the
/// generated list itself is never modified.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct TargetOverrides {
    amounts: BTreeMap<String, f64>,
}

impl TargetOverrides {
    /// Records an edit. Negative and non-finite amounts are stored as zero.
    pub fn set(&mut self, category: impl Into<String>, amount: f64) {
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.amounts.insert(category.into(), amount);
    }

    pub fn reset(&mut self) {
        self.amounts.clear();
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.amounts.get(category).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn apply(&self, targets: &[CategoryTarget]) -> Vec<CategoryTarget> {
        targets
            .iter()
            .map(|target| match self.get(&target.category) {
                Some(amount) => CategoryTarget {
                    target: amount,
                    ..target.clone()
                },
                None => target.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub category: String,
    pub target: f64,
    pub actual: f64,
    /// Target minus actual; negative when spend ran over.
    pub variance: f64,
    pub over_budget: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub rows: Vec<ReviewRow>,
    pub total_targets: f64,
    pub total_actuals: f64,
}

pub fn summarize(targets: &[CategoryTarget], actuals: &[CategoryActual]) -> ReviewSummary {
    let actual_by_category: BTreeMap<&str, f64> = actuals
        .iter()
        .map(|entry| (entry.category.as_str(), entry.actual))
        .collect();

    let rows: Vec<ReviewRow> = targets
        .iter()
        .map(|target| {
            let actual = actual_by_category
                .get(target.category.as_str())
                .copied()
                .unwrap_or(0.0);
            ReviewRow {
                category: target.category.clone(),
                target: target.target,
                actual,
                variance: target.target - actual,
                over_budget: target.target > 0.0 && actual > target.target,
                reason: target.reason.clone(),
            }
        })
        .collect();

    ReviewSummary {
        total_targets: rows.iter().map(|row| row.target).sum(),
        total_actuals: actuals.iter().map(|entry| entry.actual).sum(),
        rows,
    }
}

/// Rebuilds a reviewable budget from targets already accepted for the month.
pub fn budget_from_saved_targets(snapshot: &FinancialSnapshot) -> Option<GeneratedBudget> {
    let targets = snapshot.targets_by_category.clone()?;
    let planned: f64 = targets.iter().map(|t| t.target).sum();
    let savings_rate = if snapshot.income > 0.0 {
        ((snapshot.income - planned) / snapshot.income).max(0.0)
    } else {
        0.0
    };

    Some(GeneratedBudget {
        month: normalize::normalize_month(Some(&snapshot.month)),
        targets_by_category: targets,
        summary: BudgetSummary {
            savings_rate,
            notes: vec![SAVED_TARGETS_NOTE.to_string()],
        },
        prompt_tokens: 0,
        completion_tokens: 0,
    })
}
