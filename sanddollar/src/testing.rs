//! Test doubles for driving the wizard and chat without a server.

use crate::chat::transport::{ChatTransport, TokenStream};
use crate::chat::{AssistantBackend, StreamError};
use crate::errors::BackendError;
use crate::store::MemoryStore;
use crate::wizard::{BudgetBackend, WizardController};
use async_trait::async_trait;
use chrono::NaiveDate;
use sanddollar_api::endpoints::ai_budget::{
    AcceptBudget, AcceptBudgetResponse, BudgetSummary, CategoryActualEntry, CategoryTargetEntry,
    FinancialSnapshotResponse, GenerateBudget, GenerateBudgetResponse,
};
use sanddollar_api::endpoints::budgets::{AdjustBudget, AdjustmentStatus, BudgetAdjustmentResponse};
use sanddollar_api::endpoints::chat::{ChatAnswer, ChatAnswerResponse};
use sanddollar_api::endpoints::Amount;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Snapshot response with the given income and `(category, actual)` rows.
pub fn snapshot_response(month: &str, income: f64, actuals: &[(&str, f64)]) -> FinancialSnapshotResponse {
    FinancialSnapshotResponse {
        month: Some(month.to_string()),
        income: Amount::from(income),
        actuals_by_category: actuals
            .iter()
            .map(|(category, actual)| CategoryActualEntry {
                category: category.to_string(),
                actual: Amount::from(*actual),
                target: None,
            })
            .collect(),
        ..Default::default()
    }
}

/// Generate response carrying the given `(category, target)` rows.
pub fn generate_response(month: &str, targets: &[(&str, f64)]) -> GenerateBudgetResponse {
    GenerateBudgetResponse {
        month: month.to_string(),
        targets_by_category: targets
            .iter()
            .map(|(category, target)| CategoryTargetEntry {
                category: category.to_string(),
                target: Amount::from(*target),
                reason: None,
            })
            .collect(),
        summary: BudgetSummary {
            savings_rate: Amount::from(0.2),
            notes: vec!["Generated in test".to_string()],
        },
        prompt_tokens: Some(10),
        completion_tokens: Some(20),
    }
}

pub fn status_error(status: u16) -> BackendError {
    BackendError::Status {
        status,
        message: format!("status {}", status),
    }
}

#[derive(Default)]
struct MockState {
    snapshot: Option<Result<Option<FinancialSnapshotResponse>, BackendError>>,
    generate: VecDeque<Result<GenerateBudgetResponse, BackendError>>,
    accept: VecDeque<Result<AcceptBudgetResponse, BackendError>>,
    snapshot_calls: usize,
    generate_calls: Vec<GenerateBudget>,
    accept_calls: Vec<AcceptBudget>,
}

/// Scripted [`BudgetBackend`] that records every call.
///
/// Clones share the script and the call log, so a test can keep a handle after
/// moving the backend into a controller.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    pub fn with_snapshot(self, snapshot: FinancialSnapshotResponse) -> Self {
        self.with_state(|s| s.snapshot = Some(Ok(Some(snapshot))));
        self
    }

    pub fn without_snapshot(self) -> Self {
        self.with_state(|s| s.snapshot = Some(Ok(None)));
        self
    }

    pub fn fail_snapshot(self, error: BackendError) -> Self {
        self.with_state(|s| s.snapshot = Some(Err(error)));
        self
    }

    pub fn push_generate(&self, result: Result<GenerateBudgetResponse, BackendError>) {
        self.with_state(|s| s.generate.push_back(result));
    }

    pub fn push_accept(&self, result: Result<AcceptBudgetResponse, BackendError>) {
        self.with_state(|s| s.accept.push_back(result));
    }

    pub fn snapshot_calls(&self) -> usize {
        self.with_state(|s| s.snapshot_calls)
    }

    pub fn generate_calls(&self) -> Vec<GenerateBudget> {
        self.with_state(|s| s.generate_calls.clone())
    }

    pub fn accept_calls(&self) -> Vec<AcceptBudget> {
        self.with_state(|s| s.accept_calls.clone())
    }
}

#[async_trait]
impl BudgetBackend for MockBackend {
    async fn snapshot(&self) -> Result<Option<FinancialSnapshotResponse>, BackendError> {
        self.with_state(|s| {
            s.snapshot_calls += 1;
            s.snapshot.clone().unwrap_or(Ok(None))
        })
    }

    async fn generate(&self, request: GenerateBudget) -> Result<GenerateBudgetResponse, BackendError> {
        self.with_state(|s| {
            s.generate_calls.push(request);
            s.generate
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Transport("no scripted generate response".into())))
        })
    }

    async fn accept(&self, request: AcceptBudget) -> Result<AcceptBudgetResponse, BackendError> {
        self.with_state(|s| {
            s.accept_calls.push(request);
            s.accept.pop_front().unwrap_or_else(|| {
                Ok(AcceptBudgetResponse {
                    status: "accepted".to_string(),
                })
            })
        })
    }
}

pub fn adjustment_response(status: AdjustmentStatus, message: &str) -> BudgetAdjustmentResponse {
    BudgetAdjustmentResponse {
        status,
        message: Some(message.to_string()),
        proposal: None,
        options: None,
        updated_budget: None,
    }
}

#[derive(Default)]
struct AssistantScript {
    adjust: VecDeque<Result<BudgetAdjustmentResponse, BackendError>>,
    answers: VecDeque<Result<ChatAnswerResponse, BackendError>>,
    adjust_calls: Vec<AdjustBudget>,
    answer_calls: Vec<ChatAnswer>,
}

/// Scripted [`AssistantBackend`]. Clones share the script and the call log.
#[derive(Clone, Default)]
pub struct MockAssistantBackend {
    script: Arc<Mutex<AssistantScript>>,
}

impl MockAssistantBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut AssistantScript) -> T) -> T {
        let mut script = self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut script)
    }

    pub fn push_adjust(&self, result: Result<BudgetAdjustmentResponse, BackendError>) {
        self.with_script(|s| s.adjust.push_back(result));
    }

    pub fn push_answer(&self, answer: &str) {
        self.with_script(|s| {
            s.answers.push_back(Ok(ChatAnswerResponse {
                answer: answer.to_string(),
            }))
        });
    }

    pub fn adjust_calls(&self) -> Vec<AdjustBudget> {
        self.with_script(|s| s.adjust_calls.clone())
    }

    pub fn answer_calls(&self) -> Vec<ChatAnswer> {
        self.with_script(|s| s.answer_calls.clone())
    }
}

#[async_trait]
impl AssistantBackend for MockAssistantBackend {
    async fn adjust(&self, request: AdjustBudget) -> Result<BudgetAdjustmentResponse, BackendError> {
        self.with_script(|s| {
            s.adjust_calls.push(request);
            s.adjust
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Transport("no scripted adjustment".into())))
        })
    }

    async fn answer(&self, request: ChatAnswer) -> Result<ChatAnswerResponse, BackendError> {
        self.with_script(|s| {
            s.answer_calls.push(request);
            s.answers
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Transport("no scripted answer".into())))
        })
    }
}

/// Wizard wired to a [`MockBackend`] and a [`MemoryStore`], with a fixed date.
pub struct TestWizard {
    pub backend: MockBackend,
    pub store: MemoryStore,
    pub wizard: WizardController<MockBackend, MemoryStore>,
}

impl TestWizard {
    pub fn new(backend: MockBackend) -> Self {
        Self::with_store(backend, MemoryStore::new())
    }

    pub fn with_store(backend: MockBackend, store: MemoryStore) -> Self {
        let wizard = WizardController::new(backend.clone(), store.clone()).with_today(test_today());
        Self {
            backend,
            store,
            wizard,
        }
    }
}

pub fn test_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap_or_default()
}

/// One scripted connection attempt of a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub enum Attempt {
    /// Opening the stream fails.
    Refused(StreamError),
    /// The stream yields these items, then ends.
    Items(Vec<Result<String, StreamError>>),
    /// The stream yields these tokens, then never completes.
    Hang(Vec<String>),
}

/// [`ChatTransport`] replaying scripted attempts in order.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    attempts: Arc<Mutex<VecDeque<Attempt>>>,
    opened: Arc<Mutex<usize>>,
}

impl ScriptedTransport {
    pub fn new(attempts: Vec<Attempt>) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(attempts.into())),
            opened: Arc::default(),
        }
    }

    pub fn opened(&self) -> usize {
        *self.opened.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    type Stream = ScriptedStream;

    async fn open(&self, _request: &ChatAnswer) -> Result<Self::Stream, StreamError> {
        *self.opened.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        let attempt = self
            .attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Attempt::Refused(StreamError::Connection("script exhausted".into())));

        match attempt {
            Attempt::Refused(error) => Err(error),
            Attempt::Items(items) => Ok(ScriptedStream {
                items: items.into(),
                hang: false,
            }),
            Attempt::Hang(tokens) => Ok(ScriptedStream {
                items: tokens.into_iter().map(Ok).collect(),
                hang: true,
            }),
        }
    }
}

pub struct ScriptedStream {
    items: VecDeque<Result<String, StreamError>>,
    hang: bool,
}

#[async_trait]
impl TokenStream for ScriptedStream {
    async fn next_token(&mut self) -> Result<Option<String>, StreamError> {
        match self.items.pop_front() {
            Some(item) => item.map(Some),
            None if self.hang => std::future::pending().await,
            None => Ok(None),
        }
    }
}
