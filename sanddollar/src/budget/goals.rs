use super::{BudgetConstraints, BudgetStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the user asked for in the goals step.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalFormData {
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub style: BudgetStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_keep_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_caps: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl GoalFormData {
    pub fn new(goals: Vec<String>, style: BudgetStyle) -> Self {
        Self {
            goals,
            style,
            ..Default::default()
        }
    }

    /// Adds a trimmed goal. Blank and duplicate goals are ignored.
    pub fn add_goal(&mut self, goal: &str) -> bool {
        push_unique(&mut self.goals, goal)
    }

    pub fn remove_goal(&mut self, goal: &str) {
        self.goals.retain(|g| g != goal);
    }

    pub fn add_must_keep_category(&mut self, category: &str) -> bool {
        push_unique(
            self.must_keep_categories.get_or_insert_with(Vec::new),
            category,
        )
    }

    pub fn remove_must_keep_category(&mut self, category: &str) {
        if let Some(categories) = self.must_keep_categories.as_mut() {
            categories.retain(|c| c != category);
        }
    }

    /// Sets a cap for a category, as entered. Non-positive caps are left for
    /// validation to report; only a blank category is ignored.
    pub fn set_category_cap(&mut self, category: &str, amount: f64) -> bool {
        let category = category.trim();
        if category.is_empty() {
            return false;
        }
        self.category_caps
            .get_or_insert_with(BTreeMap::new)
            .insert(category.to_string(), amount);
        true
    }

    pub fn remove_category_cap(&mut self, category: &str) {
        if let Some(caps) = self.category_caps.as_mut() {
            caps.remove(category);
        }
    }

    pub fn is_must_keep(&self, category: &str) -> bool {
        self.must_keep_categories.as_ref().is_some_and(|keep| {
            keep.iter()
                .any(|c| c.to_lowercase() == category.to_lowercase())
        })
    }

    /// Cap for `category`, by exact key first and then case-insensitively.
    pub fn cap_for(&self, category: &str) -> Option<f64> {
        let caps = self.category_caps.as_ref()?;
        caps.get(category).copied().or_else(|| {
            let wanted = category.to_lowercase();
            caps.iter()
                .find(|(name, _)| name.to_lowercase() == wanted)
                .map(|(_, cap)| *cap)
        })
    }

    /// Request constraints, `None` when nothing was set.
    pub fn constraints(&self) -> Option<BudgetConstraints> {
        let constraints = BudgetConstraints {
            must_keep_categories: self.must_keep_categories.clone().filter(|c| !c.is_empty()),
            category_caps: self.category_caps.clone().filter(|c| !c.is_empty()),
        };
        (!constraints.is_empty()).then_some(constraints)
    }
}

fn push_unique(items: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || items.iter().any(|existing| existing == value) {
        return false;
    }
    items.push(value.to_string());
    true
}
