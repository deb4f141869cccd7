//! Expense recording

use crate::coerce::parse_iso_date;
use crate::error::FinanceError;
use crate::models::{Expense, NewExpense};
use crate::repository::FinancialRepository;
use crate::Result;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Expense body as sent by clients, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
}

impl ExpenseRequest {
    pub fn validate(&self) -> Result<NewExpense> {
        let amount = self
            .amount
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or_else(|| {
                FinanceError::Validation("amount must be a positive number".to_string())
            })?;

        let category = self
            .category
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                FinanceError::Validation("category must be a non-empty string".to_string())
            })?;

        let date = self
            .date
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_iso_date)
            .ok_or_else(|| {
                FinanceError::Validation("date must be in YYYY-MM-DD format".to_string())
            })?;

        Ok(NewExpense {
            amount,
            category: category.to_string(),
            date,
        })
    }
}

pub struct ExpenseService {
    repo: Arc<dyn FinancialRepository>,
}

impl ExpenseService {
    pub fn new(repo: Arc<dyn FinancialRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_expense(&self, user_id: Uuid, request: &ExpenseRequest) -> Result<Expense> {
        let new_expense = request.validate()?;
        let expense = self.repo.insert_expense(user_id, new_expense).await?;

        info!(%user_id, expense_id = %expense.id, category = %expense.category, "Expense recorded");
        Ok(expense)
    }

    pub async fn list_expenses(&self, user_id: Uuid) -> Result<Vec<Expense>> {
        self.repo.list_expenses(user_id).await
    }
}
