use crate::budget::GoalFormData;
use itertools::Itertools;

pub const MAX_NOTES_CHARS: usize = 500;

pub const GOALS_REQUIRED: &str = "Select at least one goal to get personal recommendations.";
pub const NOTES_TOO_LONG: &str = "Notes must be 500 characters or less.";
pub const CAPS_NOT_POSITIVE: &str = "Category caps must be positive amounts.";

/// Field-level messages shown beside the goals form.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct GoalFormErrors {
    pub goals: Option<String>,
    pub notes: Option<String>,
    pub caps: Option<String>,
}

impl GoalFormErrors {
    pub fn is_empty(&self) -> bool {
        self.goals.is_none() && self.notes.is_none() && self.caps.is_none()
    }

    pub fn messages(&self) -> Vec<&str> {
        [&self.goals, &self.notes, &self.caps]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Validate the goals form and return the cleaned submission.
///
/// The cleaned form has trimmed, unique goals, no blank must-keep entries, no
/// empty caps map and notes trimmed (or dropped when blank).
pub fn validate_goal_form(form: &GoalFormData) -> Result<GoalFormData, GoalFormErrors> {
    let goals: Vec<String> = form
        .goals
        .iter()
        .map(|goal| goal.trim())
        .filter(|goal| !goal.is_empty())
        .unique()
        .map(str::to_string)
        .collect();

    let mut errors = GoalFormErrors::default();
    if goals.is_empty() {
        errors.goals = Some(GOALS_REQUIRED.to_string());
    }
    if form
        .notes
        .as_ref()
        .is_some_and(|notes| notes.chars().count() > MAX_NOTES_CHARS)
    {
        errors.notes = Some(NOTES_TOO_LONG.to_string());
    }
    if form
        .category_caps
        .as_ref()
        .is_some_and(|caps| caps.values().any(|cap| !cap.is_finite() || *cap <= 0.0))
    {
        errors.caps = Some(CAPS_NOT_POSITIVE.to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(GoalFormData {
        goals,
        style: form.style,
        must_keep_categories: form.must_keep_categories.as_ref().map(|categories| {
            categories
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        }),
        category_caps: form.category_caps.clone().filter(|caps| !caps.is_empty()),
        notes: form
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetStyle;
    use std::collections::BTreeMap;

    #[test]
    fn requires_a_goal() {
        let errors = validate_goal_form(&GoalFormData::new(vec!["   ".into()], BudgetStyle::Balanced))
            .unwrap_err();
        assert_eq!(errors.goals.as_deref(), Some(GOALS_REQUIRED));
        assert!(errors.notes.is_none());
        assert_eq!(errors.messages(), vec![GOALS_REQUIRED]);
    }

    #[test]
    fn rejects_long_notes_and_bad_caps() {
        let mut form = GoalFormData::new(vec!["Save".into()], BudgetStyle::Balanced);
        form.notes = Some("é".repeat(501));
        form.category_caps = Some(BTreeMap::from([("Dining".to_string(), 0.0)]));

        let errors = validate_goal_form(&form).unwrap_err();
        assert!(errors.goals.is_none());
        assert_eq!(errors.notes.as_deref(), Some(NOTES_TOO_LONG));
        assert_eq!(errors.caps.as_deref(), Some(CAPS_NOT_POSITIVE));
    }

    #[test]
    fn accepts_exactly_500_characters() {
        let mut form = GoalFormData::new(vec!["Save".into()], BudgetStyle::Balanced);
        form.notes = Some("n".repeat(500));
        assert!(validate_goal_form(&form).is_ok());
    }

    #[test]
    fn cleans_the_submission() {
        let form = GoalFormData {
            goals: vec![" Emergency fund ".into(), "Emergency fund".into(), "Travel".into()],
            style: BudgetStyle::Flexible,
            must_keep_categories: Some(vec!["Rent".into(), "  ".into()]),
            category_caps: Some(BTreeMap::new()),
            notes: Some("   ".into()),
        };

        let cleaned = validate_goal_form(&form).unwrap();
        assert_eq!(cleaned.goals, vec!["Emergency fund".to_string(), "Travel".to_string()]);
        assert_eq!(cleaned.must_keep_categories, Some(vec!["Rent".to_string()]));
        assert!(cleaned.category_caps.is_none());
        assert!(cleaned.notes.is_none());
        assert_eq!(cleaned.style, BudgetStyle::Flexible);
    }
}
