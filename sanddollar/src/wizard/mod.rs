//! The AI budget wizard: Snapshot → Goals → Review → accepted.
//!
//! [`WizardController`] owns the persisted wizard state, the cached snapshot
//! and the review edits. It talks to the backend only through
//! [`BudgetBackend`], so tests drive it with an in-memory implementation.

pub mod backend;
pub mod validators;

pub use backend::{BudgetBackend, DemoBackend, SnapshotQuery, SNAPSHOT_STALE_AFTER};
pub use validators::{validate_goal_form, GoalFormErrors};

use crate::budget::heuristic::build_heuristic_budget;
use crate::budget::normalize::normalize_month_at;
use crate::budget::review::{budget_from_saved_targets, summarize, ReviewSummary, TargetOverrides};
use crate::budget::{CategoryTarget, FinancialSnapshot, GeneratedBudget, GoalFormData};
use crate::errors::{BackendError, FailureKind};
use crate::notify::Notification;
use crate::store::{KeyValueStore, WizardState, WizardStore, WizardUpdate};
use chrono::{Local, NaiveDate};
use sanddollar_api::endpoints::ai_budget::{AcceptBudget, GenerateBudget};
use thiserror::Error;

pub const ACCEPTED_MESSAGE: &str = "AI budget accepted! Your targets are live for this month.";
pub const ACCEPT_FAILED_MESSAGE: &str = "Failed to accept AI budget. Please try again.";
pub const GENERATE_FAILED_MESSAGE: &str = "Unable to generate AI budget right now.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Overview,
    Snapshot,
    Goals,
    Review,
}

impl WizardStep {
    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Overview => "Budgeting",
            WizardStep::Snapshot => "Snapshot",
            WizardStep::Goals => "Goals",
            WizardStep::Review => "Review & Accept",
        }
    }
}

/// Inline banner shown on the goals step after generation failed.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardBanner {
    pub kind: FailureKind,
    pub message: String,
    /// The submission that failed, re-sent by [`WizardController::retry`].
    pub original: GoalFormData,
    /// Local budget offered instead, present only when a snapshot was loaded.
    pub fallback: Option<GeneratedBudget>,
}

impl WizardBanner {
    pub fn can_use_heuristic(&self) -> bool {
        self.fallback.is_some()
    }

    /// An expired session needs a new sign-in, not the same request again.
    pub fn can_retry(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; see [`WizardController::form_errors`].
    Invalid,
    Generated,
    Failed(FailureKind),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("There is no generated budget to accept")]
    NothingToAccept,

    #[error("There is no failed submission to retry")]
    NothingToRetry,

    #[error("{0}")]
    NotRetryable(&'static str),

    #[error("No heuristic budget is available")]
    NoHeuristic,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub struct WizardController<B: BudgetBackend, K: KeyValueStore> {
    backend: B,
    store: WizardStore<K>,
    snapshot: SnapshotQuery,
    step: WizardStep,
    banner: Option<WizardBanner>,
    form_errors: GoalFormErrors,
    overrides: TargetOverrides,
    notifications: Vec<Notification>,
    today: Option<NaiveDate>,
}

impl<B: BudgetBackend, K: KeyValueStore> WizardController<B, K> {
    pub fn new(backend: B, kv: K) -> Self {
        Self {
            backend,
            store: WizardStore::load(kv),
            snapshot: SnapshotQuery::default(),
            step: WizardStep::Overview,
            banner: None,
            form_errors: GoalFormErrors::default(),
            overrides: TargetOverrides::default(),
            notifications: Vec::new(),
            today: None,
        }
    }

    /// Pins the date used when a month has to be inferred.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> &WizardState {
        self.store.state()
    }

    pub fn snapshot(&self) -> Option<&FinancialSnapshot> {
        self.snapshot.data()
    }

    pub fn banner(&self) -> Option<&WizardBanner> {
        self.banner.as_ref()
    }

    pub fn form_errors(&self) -> &GoalFormErrors {
        &self.form_errors
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Month the wizard is budgeting for.
    pub fn budget_month(&self) -> String {
        match &self.store.state().month {
            Some(month) => month.clone(),
            None => normalize_month_at(self.snapshot().map(|s| s.month.as_str()), self.today()),
        }
    }

    pub fn invalidate_snapshot(&mut self) {
        self.snapshot.invalidate();
    }

    /// Loads (or serves from cache) the month snapshot and seeds an empty
    /// wizard state with its month and actuals.
    pub async fn load_snapshot(&mut self) -> Result<Option<&FinancialSnapshot>, BackendError> {
        let today = self.today();
        let snapshot = self.snapshot.fetch(&self.backend, today).await?.cloned();

        if let Some(snapshot) = snapshot {
            let state = self.store.state();
            let mut update = WizardUpdate::default();
            if state.month.is_none() {
                update.month = Some(snapshot.month.clone());
            }
            if state.actuals.is_empty() && !snapshot.actuals_by_category.is_empty() {
                update.actuals = Some(snapshot.actuals_by_category.clone());
            }
            if update != WizardUpdate::default() {
                self.store.update(update);
            }
        }

        Ok(self.snapshot.data())
    }

    async fn load_snapshot_lenient(&mut self) -> Option<FinancialSnapshot> {
        match self.load_snapshot().await {
            Ok(snapshot) => snapshot.cloned(),
            Err(_) => None,
        }
    }

    /// Overview "Use AI Budget": fresh wizard seeded from the snapshot.
    pub async fn start(&mut self) {
        let snapshot = self.load_snapshot_lenient().await;
        let today = self.today();

        self.store.reset();
        self.overrides.reset();
        self.banner = None;
        self.form_errors = GoalFormErrors::default();

        let month = normalize_month_at(snapshot.as_ref().map(|s| s.month.as_str()), today);
        let actuals = snapshot
            .map(|s| s.actuals_by_category)
            .unwrap_or_default();
        self.store
            .update(WizardUpdate::default().month(month).actuals(actuals));

        tracing::info!("Starting AI budget wizard");
        self.step = WizardStep::Snapshot;
    }

    /// Overview "Adjust Targets": reopen accepted targets in review, or start
    /// the wizard when none were accepted yet.
    pub async fn adjust_targets(&mut self) {
        let snapshot = self.load_snapshot_lenient().await;
        let Some((snapshot, budget)) = snapshot
            .and_then(|s| budget_from_saved_targets(&s).map(|budget| (s, budget)))
        else {
            self.start().await;
            return;
        };

        self.overrides.reset();
        self.banner = None;
        self.store.update(
            WizardUpdate::default()
                .month(budget.month.clone())
                .generated_budget(budget)
                .actuals(snapshot.actuals_by_category),
        );

        tracing::info!("Reopening saved AI budget targets");
        self.step = WizardStep::Review;
    }

    /// Moves to `step`. Review without a generated budget lands on Goals.
    pub fn navigate(&mut self, step: WizardStep) -> WizardStep {
        self.step = match step {
            WizardStep::Review if self.store.state().generated_budget.is_none() => WizardStep::Goals,
            other => other,
        };
        self.step
    }

    /// Snapshot step "Continue to goals". Blocked while the snapshot is failing.
    pub fn continue_to_goals(&mut self) -> Result<(), WizardError> {
        if let Some(error) = self.snapshot.error() {
            return Err(error.clone().into());
        }

        let month = self.budget_month();
        let mut update = WizardUpdate::default().month(month);
        if let Some(snapshot) = self.snapshot.data() {
            update.actuals = Some(snapshot.actuals_by_category.clone());
        }
        self.store.update(update);

        self.step = WizardStep::Goals;
        Ok(())
    }

    /// Persists in-progress form edits.
    pub fn update_goals(&mut self, form: GoalFormData) {
        self.store.update(WizardUpdate::default().goals(form));
    }

    pub async fn submit_goals(&mut self, form: GoalFormData) -> SubmitOutcome {
        match validate_goal_form(&form) {
            Ok(cleaned) => {
                self.form_errors = GoalFormErrors::default();
                self.generate(cleaned).await
            }
            Err(errors) => {
                tracing::debug!("Goal form rejected: {:?}", errors.messages());
                self.form_errors = errors;
                SubmitOutcome::Invalid
            }
        }
    }

    /// Banner "Try again": re-sends the submission that failed.
    pub async fn retry(&mut self) -> Result<SubmitOutcome, WizardError> {
        let banner = self.banner.as_ref().ok_or(WizardError::NothingToRetry)?;
        if !banner.can_retry() {
            return Err(WizardError::NotRetryable(banner.kind.message()));
        }
        let original = banner.original.clone();
        Ok(self.generate(original).await)
    }

    /// Banner "Use heuristic budget instead". No backend call is made.
    pub fn use_heuristic(&mut self) -> Result<(), WizardError> {
        let Some(WizardBanner {
            original,
            fallback: Some(fallback),
            ..
        }) = self.banner.clone()
        else {
            return Err(WizardError::NoHeuristic);
        };

        self.banner = None;
        let month = self.budget_month();
        let actuals = self
            .snapshot
            .data()
            .map(|s| s.actuals_by_category.clone())
            .unwrap_or_else(|| self.store.state().actuals.clone());

        self.overrides.reset();
        self.store.update(
            WizardUpdate::default()
                .goals(original)
                .month(month)
                .actuals(actuals)
                .generated_budget(fallback),
        );

        tracing::info!("Using locally generated heuristic budget");
        self.step = WizardStep::Review;
        Ok(())
    }

    async fn generate(&mut self, form: GoalFormData) -> SubmitOutcome {
        let month = self.budget_month();
        let mut request = GenerateBudget::new(month, form.goals.clone(), form.style);
        if let Some(constraints) = form.constraints() {
            request = request.constraints(constraints);
        }
        if let Some(notes) = form.notes.clone() {
            request = request.notes(notes);
        }

        self.banner = None;
        self.store.update(WizardUpdate::default().goals(form.clone()));

        tracing::info!("Requesting AI budget for {}", request.month());
        match self.backend.generate(request).await {
            Ok(response) => {
                let budget = GeneratedBudget::from_response(&response, self.today());
                tracing::info!(
                    "AI budget generated with {} targets",
                    budget.targets_by_category.len()
                );
                self.store.update(
                    WizardUpdate::default()
                        .goals(form)
                        .generated_budget(budget),
                );
                self.overrides.reset();
                self.snapshot.invalidate();
                self.step = WizardStep::Review;
                SubmitOutcome::Generated
            }
            Err(e) => {
                tracing::warn!("AI budget generation failed: {}", e);
                let kind = e.kind();
                // A resumed wizard may not have fetched the snapshot yet
                let fallback = self
                    .load_snapshot_lenient()
                    .await
                    .map(|snapshot| build_heuristic_budget(&snapshot, &form));

                self.notifications
                    .push(Notification::error(GENERATE_FAILED_MESSAGE));
                self.banner = Some(WizardBanner {
                    kind,
                    message: kind.message().to_string(),
                    original: form,
                    fallback,
                });
                self.step = WizardStep::Goals;
                SubmitOutcome::Failed(kind)
            }
        }
    }

    /// Review step inline edit. The generated list is left untouched.
    pub fn edit_target(&mut self, category: impl Into<String>, amount: f64) {
        self.overrides.set(category, amount);
    }

    /// Generated targets with the review edits applied.
    pub fn final_targets(&self) -> Vec<CategoryTarget> {
        self.store
            .state()
            .generated_budget
            .as_ref()
            .map(|budget| self.overrides.apply(&budget.targets_by_category))
            .unwrap_or_default()
    }

    pub fn review_summary(&self) -> Option<ReviewSummary> {
        self.store.state().generated_budget.as_ref()?;
        Some(summarize(&self.final_targets(), &self.store.state().actuals))
    }

    /// Review "Back": goals and the generated budget are kept.
    pub fn back_to_goals(&mut self) {
        self.step = WizardStep::Goals;
    }

    pub async fn accept(&mut self) -> Result<(), WizardError> {
        if self.store.state().generated_budget.is_none() {
            self.step = WizardStep::Goals;
            return Err(WizardError::NothingToAccept);
        }

        let month = self.budget_month();
        let request = AcceptBudget::new(month, self.final_targets());

        match self.backend.accept(request).await {
            Ok(response) => {
                tracing::info!("AI budget accepted ({})", response.status);
                self.store.reset();
                self.overrides.reset();
                self.banner = None;
                self.snapshot.invalidate();
                self.notifications.push(Notification::success(ACCEPTED_MESSAGE));
                self.step = WizardStep::Overview;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Accepting AI budget failed: {}", e);
                self.notifications.push(Notification::error(ACCEPT_FAILED_MESSAGE));
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetStyle;
    use crate::store::MemoryStore;

    fn controller() -> WizardController<DemoBackend, MemoryStore> {
        WizardController::new(DemoBackend::new(), MemoryStore::new())
            .with_today(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap())
    }

    #[test]
    fn review_requires_a_generated_budget() {
        let mut wizard = controller();
        assert_eq!(wizard.navigate(WizardStep::Review), WizardStep::Goals);
        assert_eq!(wizard.navigate(WizardStep::Snapshot), WizardStep::Snapshot);
    }

    #[tokio::test]
    async fn start_seeds_month_and_actuals() {
        let mut wizard = controller();
        wizard.start().await;

        assert_eq!(wizard.step(), WizardStep::Snapshot);
        assert_eq!(wizard.state().month.as_deref(), Some("2025-01"));
        assert_eq!(wizard.state().actuals.len(), 6);
        assert!(wizard.state().goals.is_none());
    }

    #[tokio::test]
    async fn adjust_without_saved_targets_starts_wizard() {
        let mut wizard = controller();
        wizard.adjust_targets().await;
        assert_eq!(wizard.step(), WizardStep::Snapshot);
    }

    #[tokio::test]
    async fn accept_without_budget_is_rejected() {
        let mut wizard = controller();
        assert_eq!(wizard.accept().await, Err(WizardError::NothingToAccept));
        assert_eq!(wizard.step(), WizardStep::Goals);
    }

    #[tokio::test]
    async fn demo_round_trip_reopens_saved_targets() {
        let mut wizard = controller();
        wizard.start().await;
        wizard.continue_to_goals().unwrap();

        let outcome = wizard
            .submit_goals(GoalFormData::new(vec!["Save more".into()], BudgetStyle::Balanced))
            .await;
        assert_eq!(outcome, SubmitOutcome::Generated);
        wizard.accept().await.unwrap();
        assert_eq!(wizard.step(), WizardStep::Overview);

        wizard.adjust_targets().await;
        assert_eq!(wizard.step(), WizardStep::Review);
        let budget = wizard.state().generated_budget.clone().unwrap();
        assert_eq!(budget.summary.notes, vec!["Loaded from saved AI budget targets.".to_string()]);
        assert_eq!(budget.targets_by_category.len(), 6);
    }
}
