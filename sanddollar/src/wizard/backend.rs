//! Remote side of the wizard: the three AI budget endpoints behind one trait.

use crate::budget::normalize::to_number;
use crate::budget::FinancialSnapshot;
use crate::errors::BackendError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sanddollar_api::endpoints::Amount;
use sanddollar_api::endpoints::ai_budget::{
    AcceptBudget, AcceptBudgetResponse, BudgetSummary, CategoryActualEntry, CategoryTargetEntry,
    FinancialSnapshotResponse, FinancialTotals, GenerateBudget, GenerateBudgetResponse,
};
use sanddollar_api::{Client, Request};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// How long a fetched snapshot is served from cache.
pub const SNAPSHOT_STALE_AFTER: Duration = Duration::from_secs(60);

#[async_trait]
pub trait BudgetBackend: Send + Sync {
    /// Current month snapshot, `None` when the backend has none (404).
    async fn snapshot(&self) -> Result<Option<FinancialSnapshotResponse>, BackendError>;

    async fn generate(&self, request: GenerateBudget) -> Result<GenerateBudgetResponse, BackendError>;

    async fn accept(&self, request: AcceptBudget) -> Result<AcceptBudgetResponse, BackendError>;
}

#[async_trait]
impl BudgetBackend for Client {
    async fn snapshot(&self) -> Result<Option<FinancialSnapshotResponse>, BackendError> {
        match self.send(Request::ai_budget().snapshot()).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) if e.is_not_found() => {
                tracing::debug!("No financial snapshot available");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn generate(&self, request: GenerateBudget) -> Result<GenerateBudgetResponse, BackendError> {
        Ok(self.send(request).await?)
    }

    async fn accept(&self, request: AcceptBudget) -> Result<AcceptBudgetResponse, BackendError> {
        Ok(self.send(request).await?)
    }
}

/// Cached snapshot query, refetched once stale or invalidated.
#[derive(Debug, Default)]
pub struct SnapshotQuery {
    data: Option<FinancialSnapshot>,
    fetched_at: Option<Instant>,
    error: Option<BackendError>,
}

impl SnapshotQuery {
    pub fn data(&self) -> Option<&FinancialSnapshot> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&BackendError> {
        self.error.as_ref()
    }

    pub fn is_fresh(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < SNAPSHOT_STALE_AFTER)
    }

    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Returns the cached snapshot, fetching it first when stale.
    pub async fn fetch<B: BudgetBackend + ?Sized>(
        &mut self,
        backend: &B,
        today: NaiveDate,
    ) -> Result<Option<&FinancialSnapshot>, BackendError> {
        if self.is_fresh() {
            tracing::debug!("Serving financial snapshot from cache");
            return Ok(self.data.as_ref());
        }

        match backend.snapshot().await {
            Ok(response) => {
                self.data = response
                    .as_ref()
                    .map(|r| FinancialSnapshot::from_response(r, today));
                self.fetched_at = Some(Instant::now());
                self.error = None;
                Ok(self.data.as_ref())
            }
            Err(e) => {
                tracing::warn!("Failed to load financial snapshot: {}", e);
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }
}

/// In-memory backend serving a fixed demo month, used in mock data mode.
///
/// Generated budgets trim each category by five percent; accepted targets are
/// reflected in later snapshots.
pub struct DemoBackend {
    snapshot: Mutex<FinancialSnapshotResponse>,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(demo_snapshot()),
        }
    }

    fn current(&self) -> Result<FinancialSnapshotResponse, BackendError> {
        self.snapshot
            .lock()
            .map(|snapshot| snapshot.clone())
            .map_err(|_| BackendError::Transport("demo backend lock poisoned".into()))
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BudgetBackend for DemoBackend {
    async fn snapshot(&self) -> Result<Option<FinancialSnapshotResponse>, BackendError> {
        self.current().map(Some)
    }

    async fn generate(&self, request: GenerateBudget) -> Result<GenerateBudgetResponse, BackendError> {
        let snapshot = self.current()?;
        let income = to_number(&snapshot.income);

        let targets: Vec<CategoryTargetEntry> = snapshot
            .actuals_by_category
            .iter()
            .map(|entry| CategoryTargetEntry {
                category: entry.category.clone(),
                target: (to_number(&entry.actual) * 0.95)
                    .round()
                    .into(),
                reason: Some(format!("Demo {} recommendation", request.style())),
            })
            .collect();
        let planned: f64 = targets
            .iter()
            .map(|t| to_number(&t.target))
            .sum();

        Ok(GenerateBudgetResponse {
            month: request.month().to_string(),
            targets_by_category: targets,
            summary: BudgetSummary {
                savings_rate: Amount::from(if income > 0.0 {
                    ((income - planned) / income).max(0.0)
                } else {
                    0.0
                }),
                notes: vec!["Demo data mode: no AI service was contacted.".to_string()],
            },
            prompt_tokens: Some(0),
            completion_tokens: Some(0),
        })
    }

    async fn accept(&self, request: AcceptBudget) -> Result<AcceptBudgetResponse, BackendError> {
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|_| BackendError::Transport("demo backend lock poisoned".into()))?;
        snapshot.targets_by_category = Some(
            request
                .targets_by_category()
                .iter()
                .map(|t| CategoryTargetEntry {
                    category: t.category.clone(),
                    target: t.target.into(),
                    reason: Some(t.reason.clone()),
                })
                .collect(),
        );
        snapshot.accepted_at = Some(Utc::now());

        Ok(AcceptBudgetResponse {
            status: "accepted".to_string(),
        })
    }
}

/// Demo month used by mock data mode.
pub fn demo_snapshot() -> FinancialSnapshotResponse {
    let actual = |category: &str, amount: f64| CategoryActualEntry {
        category: category.to_string(),
        actual: amount.into(),
        target: None,
    };

    FinancialSnapshotResponse {
        month: None,
        income: Amount::from("6200.00"),
        actuals_by_category: vec![
            actual("Rent", 1850.0),
            actual("Groceries", 640.0),
            actual("Dining", 300.0),
            actual("Transportation", 220.0),
            actual("Utilities", 180.0),
            actual("Entertainment", 150.0),
        ],
        totals: FinancialTotals {
            expenses: Amount::from(3340.0),
            savings: Amount::from(1200.0),
            net_cash_flow: Amount::from(1660.0),
        },
        targets_by_category: None,
        accepted_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{BudgetStyle, CategoryTarget};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    #[tokio::test]
    async fn demo_backend_reflects_accepted_targets() {
        let backend = DemoBackend::new();
        let first = backend.snapshot().await.unwrap().unwrap();
        assert!(first.targets_by_category.is_none());

        let generated = backend
            .generate(GenerateBudget::new("2025-01", vec!["Save".into()], BudgetStyle::Balanced))
            .await
            .unwrap();
        assert_eq!(generated.month, "2025-01");
        assert_eq!(generated.targets_by_category.len(), 6);

        backend
            .accept(AcceptBudget::new(
                "2025-01",
                vec![CategoryTarget::new("Dining", 250.0, "Edited")],
            ))
            .await
            .unwrap();

        let snapshot = FinancialSnapshot::from_response(&backend.snapshot().await.unwrap().unwrap(), today());
        assert!(snapshot.has_saved_targets());
        assert!(snapshot.accepted_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_query_caches_for_a_minute() {
        let backend = DemoBackend::new();
        let mut query = SnapshotQuery::default();
        assert!(!query.is_fresh());

        let income = query.fetch(&backend, today()).await.unwrap().unwrap().income;
        assert_eq!(income, 6200.0);
        assert!(query.is_fresh());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(query.is_fresh());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!query.is_fresh());

        query.fetch(&backend, today()).await.unwrap();
        assert!(query.is_fresh());
        query.invalidate();
        assert!(!query.is_fresh());
        assert!(query.data().is_some());
    }
}
