//! Local budget proposal used when the AI service cannot answer.
//!
//! [`build_heuristic_budget`] is a pure function of the snapshot and the goal
//! form: no clock, no randomness, no I/O.

use super::{
    BudgetStyle, BudgetSummary, CategoryActual, CategoryTarget, FinancialSnapshot, GeneratedBudget,
    GoalFormData,
};
use std::collections::HashSet;

pub const HEURISTIC_NOTE: &str = "Heuristic budget generated locally after AI error.";

const EMERGENCY_FUND: &str = "Emergency Fund";
const EMERGENCY_FUND_TARGET: f64 = 500.0;
const CARD_PAYDOWN: &str = "Card Paydown";
const CARD_PAYDOWN_TARGET: f64 = 200.0;
const SAVINGS: &str = "Savings";
const MIN_SAVINGS_TARGET: f64 = 100.0;

pub fn style_factor(style: BudgetStyle) -> f64 {
    match style {
        BudgetStyle::Aggressive => 0.85,
        BudgetStyle::Balanced => 1.0,
        BudgetStyle::Flexible => 1.05,
    }
}

pub fn build_heuristic_budget(snapshot: &FinancialSnapshot, goals: &GoalFormData) -> GeneratedBudget {
    let income = snapshot.income;

    let mut targets: Vec<CategoryTarget> = snapshot
        .actuals_by_category
        .iter()
        .map(|entry| propose_target(entry, goals))
        .collect();
    let mut existing: HashSet<String> = targets.iter().map(|t| t.category.to_lowercase()).collect();

    if targets.is_empty() && income > 0.0 {
        push_line(&mut targets, &mut existing, "Essentials", (income * 0.5).round(), "50% baseline for needs");
        push_line(&mut targets, &mut existing, "Lifestyle", (income * 0.3).round(), "30% for wants and flexibility");
    }

    for goal in &goals.goals {
        let goal = goal.to_lowercase();
        if goal.contains("emergency") {
            push_line(
                &mut targets,
                &mut existing,
                EMERGENCY_FUND,
                EMERGENCY_FUND_TARGET,
                "Reserve for upcoming emergency goal",
            );
        }
        if goal.contains("debt") || goal.contains("card") {
            push_line(
                &mut targets,
                &mut existing,
                CARD_PAYDOWN,
                CARD_PAYDOWN_TARGET,
                "Monthly contribution toward debt reduction",
            );
        }
    }

    if income > 0.0 {
        push_line(
            &mut targets,
            &mut existing,
            SAVINGS,
            MIN_SAVINGS_TARGET.max((income * 0.2).round()),
            "Allocate ~20% toward savings goals",
        );
    }

    scale_to_income(&mut targets, income);

    let total: f64 = targets.iter().map(|t| t.target).sum();
    let savings_rate = if income > 0.0 {
        ((income - total) / income).max(0.0)
    } else {
        0.0
    };

    GeneratedBudget {
        month: snapshot.month.clone(),
        targets_by_category: targets,
        summary: BudgetSummary {
            savings_rate,
            notes: vec![HEURISTIC_NOTE.to_string()],
        },
        prompt_tokens: 0,
        completion_tokens: 0,
    }
}

fn propose_target(entry: &CategoryActual, goals: &GoalFormData) -> CategoryTarget {
    let keep = goals.is_must_keep(&entry.category);
    let mut proposed = if keep {
        entry.actual
    } else {
        entry.actual * style_factor(goals.style)
    };

    if let Some(cap) = goals.cap_for(&entry.category).filter(|cap| *cap >= 0.0) {
        proposed = proposed.min(cap);
    }

    let reason = if keep {
        "Kept close to recent spend per constraint".to_string()
    } else {
        format!("Based on recent average with {} adjustments", goals.style)
    };

    CategoryTarget::new(entry.category.clone(), proposed.round().max(0.0), reason)
}

/// Appends a line unless a category with that name (any case) already exists.
fn push_line(
    targets: &mut Vec<CategoryTarget>,
    existing: &mut HashSet<String>,
    category: &str,
    target: f64,
    reason: &str,
) {
    if existing.insert(category.to_lowercase()) {
        targets.push(CategoryTarget::new(category, target, reason));
    }
}

/// Scales targets down proportionally when they add up to more than `income`.
///
/// Each scaled target is floored, so the resulting sum never exceeds income.
pub fn scale_to_income(targets: &mut [CategoryTarget], income: f64) {
    if income <= 0.0 {
        return;
    }

    let total: f64 = targets.iter().map(|t| t.target).sum();
    if total <= income {
        return;
    }

    let ratio = income / total;
    for target in targets.iter_mut() {
        target.target = (target.target * ratio).floor().max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::SnapshotTotals;

    fn snapshot(income: f64, actuals: &[(&str, f64)]) -> FinancialSnapshot {
        FinancialSnapshot {
            month: "2025-01".into(),
            income,
            actuals_by_category: actuals
                .iter()
                .map(|(category, actual)| CategoryActual::new(*category, *actual))
                .collect(),
            totals: SnapshotTotals::default(),
            targets_by_category: None,
            accepted_at: None,
        }
    }

    fn target<'a>(budget: &'a GeneratedBudget, category: &str) -> Option<&'a CategoryTarget> {
        budget.targets_by_category.iter().find(|t| t.category == category)
    }

    #[test]
    fn applies_style_factor() {
        let snap = snapshot(5000.0, &[("Dining", 200.0)]);

        let aggressive = build_heuristic_budget(&snap, &GoalFormData::new(vec![], BudgetStyle::Aggressive));
        assert_eq!(target(&aggressive, "Dining").unwrap().target, 170.0);
        assert_eq!(
            target(&aggressive, "Dining").unwrap().reason,
            "Based on recent average with aggressive adjustments"
        );

        let flexible = build_heuristic_budget(&snap, &GoalFormData::new(vec![], BudgetStyle::Flexible));
        assert_eq!(target(&flexible, "Dining").unwrap().target, 210.0);
    }

    #[test]
    fn must_keep_ignores_style_and_caps_still_clamp() {
        let snap = snapshot(5000.0, &[("Rent", 1500.0), ("Dining", 400.0)]);
        let mut goals = GoalFormData::new(vec![], BudgetStyle::Aggressive);
        goals.add_must_keep_category("rent");
        goals.set_category_cap("dining", 250.0);

        let budget = build_heuristic_budget(&snap, &goals);
        let rent = target(&budget, "Rent").unwrap();
        assert_eq!(rent.target, 1500.0);
        assert_eq!(rent.reason, "Kept close to recent spend per constraint");
        assert_eq!(target(&budget, "Dining").unwrap().target, 250.0);
    }

    #[test]
    fn seeds_categories_without_actuals() {
        let budget = build_heuristic_budget(&snapshot(4000.0, &[]), &GoalFormData::default());
        assert_eq!(target(&budget, "Essentials").unwrap().target, 2000.0);
        assert_eq!(target(&budget, "Lifestyle").unwrap().target, 1200.0);
        assert_eq!(target(&budget, "Savings").unwrap().target, 800.0);
        assert_eq!(budget.summary.savings_rate, 0.0);
        assert_eq!(budget.summary.notes, vec![HEURISTIC_NOTE.to_string()]);
    }

    #[test]
    fn no_income_means_no_seeds_or_savings() {
        let budget = build_heuristic_budget(&snapshot(0.0, &[]), &GoalFormData::default());
        assert!(budget.targets_by_category.is_empty());
        assert_eq!(budget.summary.savings_rate, 0.0);
    }

    #[test]
    fn goal_keywords_add_fixed_lines_once() {
        let goals = GoalFormData::new(
            vec![
                "Build an emergency fund".into(),
                "Pay off credit card debt".into(),
                "Another EMERGENCY cushion".into(),
            ],
            BudgetStyle::Balanced,
        );
        let budget = build_heuristic_budget(&snapshot(10000.0, &[("Groceries", 500.0)]), &goals);

        let names: Vec<&str> = budget.targets_by_category.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(names, vec!["Groceries", "Emergency Fund", "Card Paydown", "Savings"]);
        assert_eq!(target(&budget, "Emergency Fund").unwrap().target, 500.0);
        assert_eq!(target(&budget, "Card Paydown").unwrap().target, 200.0);
        assert_eq!(target(&budget, "Savings").unwrap().target, 2000.0);
    }

    #[test]
    fn existing_categories_are_not_duplicated() {
        let snap = snapshot(3000.0, &[("emergency fund", 50.0), ("SAVINGS", 300.0)]);
        let goals = GoalFormData::new(vec!["emergency".into()], BudgetStyle::Balanced);
        let budget = build_heuristic_budget(&snap, &goals);
        assert_eq!(budget.targets_by_category.len(), 2);
    }

    #[test]
    fn savings_has_a_floor() {
        let budget = build_heuristic_budget(&snapshot(300.0, &[("Food", 10.0)]), &GoalFormData::default());
        assert_eq!(target(&budget, "Savings").unwrap().target, 100.0);
    }

    #[test]
    fn scales_down_to_income() {
        let snap = snapshot(1000.0, &[("Rent", 800.0), ("Dining", 400.0), ("Travel", 333.0)]);
        let budget = build_heuristic_budget(&snap, &GoalFormData::default());

        assert!(budget.total_targets() <= 1000.0);
        assert!(budget.total_targets() >= 1000.0 - budget.targets_by_category.len() as f64);
        assert!(budget.targets_by_category.iter().all(|t| t.target >= 0.0 && t.target.fract() == 0.0));
        assert!(budget.summary.savings_rate >= 0.0 && budget.summary.savings_rate <= 1.0);
    }

    #[test]
    fn never_exceeds_income_across_inputs() {
        for extra in [1.0, 7.0, 49.0, 333.0, 1001.0, 5000.0] {
            for style in [BudgetStyle::Aggressive, BudgetStyle::Balanced, BudgetStyle::Flexible] {
                let snap = snapshot(1000.0, &[("A", 333.0), ("B", 333.0), ("C", 333.0 + extra)]);
                let budget = build_heuristic_budget(&snap, &GoalFormData::new(vec!["debt".into()], style));
                assert!(budget.total_targets() <= 1000.0, "{} {:?}", extra, style);
            }
        }
    }

    #[test]
    fn is_deterministic() {
        let snap = snapshot(2500.0, &[("Dining", 410.4), ("Rent", 1200.0)]);
        let goals = GoalFormData::new(vec!["Emergency fund".into()], BudgetStyle::Flexible);
        assert_eq!(build_heuristic_budget(&snap, &goals), build_heuristic_budget(&snap, &goals));
    }
}
