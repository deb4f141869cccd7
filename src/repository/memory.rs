//! In-memory repository for development and tests
//!
//! All tables sit behind one lock, so every trait method observes and
//! mutates a consistent state.

use super::FinancialRepository;
use crate::error::FinanceError;
use crate::models::{
    Debt, Expense, FinancialSnapshot, NewExpense, ProfileUpdate, SavingsGoal, User,
};
use crate::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    user_by_email: HashMap<String, Uuid>,
    expenses: Vec<Expense>,
    debts: Vec<Debt>,
    savings_goals: Vec<SavingsGoal>,
}

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw expense row without validation. Lets tests plant malformed data.
    pub async fn insert_raw_expense(&self, expense: Expense) {
        self.tables.write().await.expenses.push(expense);
    }
}

#[async_trait::async_trait]
impl FinancialRepository for InMemoryRepository {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables.user_by_email.contains_key(email) {
            return Err(FinanceError::Conflict("User already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            income: None,
            created_at: Utc::now(),
        };

        tables.user_by_email.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;

        Ok(tables
            .user_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn insert_expense(&self, user_id: Uuid, expense: NewExpense) -> Result<Expense> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(FinanceError::UserNotFound);
        }

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            amount: Some(expense.amount),
            category: expense.category,
            date: expense.date,
        };
        tables.expenses.push(expense.clone());

        Ok(expense)
    }

    async fn list_expenses(&self, user_id: Uuid) -> Result<Vec<Expense>> {
        let tables = self.tables.read().await;

        Ok(tables
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn load_snapshot(&self, user_id: Uuid) -> Result<Option<FinancialSnapshot>> {
        let tables = self.tables.read().await;

        let Some(user) = tables.users.get(&user_id).cloned() else {
            return Ok(None);
        };

        let owned = |owner: Uuid| owner == user_id;

        Ok(Some(FinancialSnapshot {
            user,
            expenses: tables.expenses.iter().filter(|e| owned(e.user_id)).cloned().collect(),
            debts: tables.debts.iter().filter(|d| owned(d.user_id)).cloned().collect(),
            savings_goals: tables
                .savings_goals
                .iter()
                .filter(|g| owned(g.user_id))
                .cloned()
                .collect(),
        }))
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<()> {
        let mut tables = self.tables.write().await;

        let Some(user) = tables.users.get_mut(&user_id) else {
            return Err(FinanceError::UserNotFound);
        };

        if let Some(income) = update.income {
            user.income = income;
        }

        if let Some(debts) = &update.debts {
            tables.debts.retain(|d| d.user_id != user_id);
            tables.debts.extend(debts.iter().map(|d| Debt {
                id: Uuid::new_v4(),
                user_id,
                amount: d.amount,
                interest_rate: d.interest_rate,
            }));
        }

        if let Some(goals) = &update.savings_goals {
            tables.savings_goals.retain(|g| g.user_id != user_id);
            tables.savings_goals.extend(goals.iter().map(|g| SavingsGoal {
                id: Uuid::new_v4(),
                user_id,
                amount: g.amount,
                target_date: g.target_date,
            }));
        }

        Ok(())
    }
}
