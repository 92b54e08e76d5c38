use crate::endpoints::{
    ai_budget::{AcceptBudget, BudgetStyle, CategoryTarget, GenerateBudget, GetSnapshot},
    auth::Login,
    budgets::AdjustBudget,
    chat::{ChatAnswer, ChatMessage},
    plaid::{CreateLinkToken, ExchangePublicToken, GetPlaidStatus, SyncPlaid},
};

pub struct AiBudgetRepository;

impl AiBudgetRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn snapshot(&self) -> GetSnapshot {
        GetSnapshot::new()
    }

    pub fn generate(
        &self,
        month: impl Into<String>,
        goals: Vec<String>,
        style: BudgetStyle,
    ) -> GenerateBudget {
        GenerateBudget::new(month, goals, style)
    }

    pub fn accept(&self, month: impl Into<String>, targets: Vec<CategoryTarget>) -> AcceptBudget {
        AcceptBudget::new(month, targets)
    }
}

pub struct BudgetRepository;

impl BudgetRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn adjust(&self, instruction: impl Into<String>) -> AdjustBudget {
        AdjustBudget::new(instruction)
    }
}

pub struct PlaidRepository;

impl PlaidRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn create_link_token(&self) -> CreateLinkToken {
        CreateLinkToken
    }

    pub fn exchange_public_token(&self, public_token: impl Into<String>) -> ExchangePublicToken {
        ExchangePublicToken::new(public_token)
    }

    pub fn status(&self) -> GetPlaidStatus {
        GetPlaidStatus
    }

    pub fn sync(&self) -> SyncPlaid {
        SyncPlaid
    }
}

pub struct ChatRepository;

impl ChatRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn answer(&self, messages: Vec<ChatMessage>) -> ChatAnswer {
        ChatAnswer::new(messages)
    }
}

pub struct AuthRepository;

impl AuthRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn login(&self, email: impl Into<String>, password: impl Into<String>) -> Login {
        Login::new(email, password)
    }
}
