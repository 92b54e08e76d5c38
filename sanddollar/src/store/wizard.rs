use super::{KeyValueStore, StoreError};
use crate::budget::{CategoryActual, GeneratedBudget, GoalFormData};
use serde::{Deserialize, Serialize};

pub const WIZARD_STATE_KEY: &str = "ai-budget-wizard";

/// Progress through the budget wizard, persisted between sessions.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<GoalFormData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_budget: Option<GeneratedBudget>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actuals: Vec<CategoryActual>,
}

impl WizardState {
    pub fn is_default(&self) -> bool {
        self.month.as_deref().is_none_or(str::is_empty)
            && self.goals.is_none()
            && self.generated_budget.is_none()
            && self.actuals.is_empty()
    }

    /// Shallow merge. Fields left as `None` in `update` keep their value.
    pub fn merged(&self, update: WizardUpdate) -> Self {
        Self {
            month: update.month.or_else(|| self.month.clone()),
            goals: update.goals.or_else(|| self.goals.clone()),
            generated_budget: update
                .generated_budget
                .or_else(|| self.generated_budget.clone()),
            actuals: update.actuals.unwrap_or_else(|| self.actuals.clone()),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CategoryActual>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CategoryActual>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partial update for [`WizardStore::update`].
#[derive(Default, Debug, Clone, PartialEq)]
pub struct WizardUpdate {
    pub month: Option<String>,
    pub goals: Option<GoalFormData>,
    pub generated_budget: Option<GeneratedBudget>,
    pub actuals: Option<Vec<CategoryActual>>,
}

impl WizardUpdate {
    pub fn month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn goals(mut self, goals: GoalFormData) -> Self {
        self.goals = Some(goals);
        self
    }

    pub fn generated_budget(mut self, budget: GeneratedBudget) -> Self {
        self.generated_budget = Some(budget);
        self
    }

    pub fn actuals(mut self, actuals: Vec<CategoryActual>) -> Self {
        self.actuals = Some(actuals);
        self
    }
}

/// Reads the persisted wizard state. Missing or unreadable slots yield the default.
pub fn load_state<K: KeyValueStore>(kv: &K) -> WizardState {
    let raw = match kv.get(WIZARD_STATE_KEY) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => return WizardState::default(),
        Err(e) => {
            tracing::warn!("Failed to read AI budget wizard state: {}", e);
            return WizardState::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Failed to parse AI budget wizard state: {}", e);
            WizardState::default()
        }
    }
}

/// Wizard state backed by a key-value slot. Every change is written through.
pub struct WizardStore<K: KeyValueStore> {
    kv: K,
    state: WizardState,
}

impl<K: KeyValueStore> WizardStore<K> {
    pub fn load(kv: K) -> Self {
        let state = load_state(&kv);
        Self { kv, state }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn update(&mut self, update: WizardUpdate) {
        self.state = self.state.merged(update);
        self.persist();
    }

    pub fn reset(&mut self) {
        self.state = WizardState::default();
        self.persist();
    }

    /// Writes the current state, or clears the slot when the state is empty.
    pub fn save(&self) -> Result<(), StoreError> {
        if self.state.is_default() {
            return self.kv.remove(WIZARD_STATE_KEY);
        }
        let json = serde_json::to_string(&self.state)?;
        self.kv.set(WIZARD_STATE_KEY, &json)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("Failed to persist AI budget wizard state: {}", e);
        }
    }
}
