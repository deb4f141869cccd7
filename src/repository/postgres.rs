//! Postgres repository backed by sqlx

use super::FinancialRepository;
use crate::error::FinanceError;
use crate::models::{
    Debt, Expense, FinancialSnapshot, NewExpense, ProfileUpdate, SavingsGoal, User,
};
use crate::Result;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

/// Postgres error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id UUID PRIMARY KEY,
      email TEXT NOT NULL UNIQUE,
      password_hash TEXT NOT NULL,
      income DOUBLE PRECISION,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS expenses (
      id UUID PRIMARY KEY,
      seq BIGSERIAL,
      user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      amount DOUBLE PRECISION,
      category TEXT NOT NULL,
      expense_date DATE NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_expenses_user_seq ON expenses (user_id, seq);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS debts (
      id UUID PRIMARY KEY,
      seq BIGSERIAL,
      user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      amount DOUBLE PRECISION,
      interest_rate DOUBLE PRECISION
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_debts_user_seq ON debts (user_id, seq);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS savings_goals (
      id UUID PRIMARY KEY,
      seq BIGSERIAL,
      user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      amount DOUBLE PRECISION,
      target_date DATE
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_savings_goals_user_seq ON savings_goals (user_id, seq);
    "#,
];

pub struct PostgresRepository {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresRepository {
    /// Build a pool without opening a connection yet. The schema is created on first use.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect_lazy(url)?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                debug!("Finance schema ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                FinanceError::Database(format!("Failed to initialize finance schema: {}", e))
            })?;

        Ok(())
    }

    fn user_from_row(row: &PgRow) -> Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            income: row.try_get::<Option<f64>, _>("income").ok().flatten(),
            created_at: row.try_get("created_at")?,
        })
    }

    fn expense_from_row(row: &PgRow) -> Result<Expense> {
        Ok(Expense {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: row.try_get::<Option<f64>, _>("amount").ok().flatten(),
            category: row.try_get("category")?,
            date: row.try_get("expense_date")?,
        })
    }

    fn debt_from_row(row: &PgRow) -> Result<Debt> {
        Ok(Debt {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: row.try_get::<Option<f64>, _>("amount").ok().flatten(),
            interest_rate: row.try_get::<Option<f64>, _>("interest_rate").ok().flatten(),
        })
    }

    fn goal_from_row(row: &PgRow) -> Result<SavingsGoal> {
        Ok(SavingsGoal {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: row.try_get::<Option<f64>, _>("amount").ok().flatten(),
            target_date: row.try_get("target_date").ok().flatten(),
        })
    }
}

#[async_trait::async_trait]
impl FinancialRepository for PostgresRepository {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, income, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::user_from_row(&row),
            None => Err(FinanceError::Conflict("User already exists".to_string())),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.ensure_schema().await?;

        sqlx::query(
            "SELECT id, email, password_hash, income, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(Self::user_from_row)
        .transpose()
    }

    async fn insert_expense(&self, user_id: Uuid, expense: NewExpense) -> Result<Expense> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO expenses (id, user_id, amount, category, expense_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, amount, category, expense_date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expense.amount)
        .bind(&expense.category)
        .bind(expense.date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                FinanceError::UserNotFound
            }
            _ => FinanceError::from(e),
        })?;

        Self::expense_from_row(&row)
    }

    async fn list_expenses(&self, user_id: Uuid) -> Result<Vec<Expense>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, category, expense_date
            FROM expenses
            WHERE user_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::expense_from_row).collect()
    }

    async fn load_snapshot(&self, user_id: Uuid) -> Result<Option<FinancialSnapshot>> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await?;

        // One snapshot for all four reads
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let user_row = sqlx::query(
            "SELECT id, email, password_hash, income, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_row) = user_row else {
            return Ok(None);
        };
        let user = Self::user_from_row(&user_row)?;

        let expenses = sqlx::query(
            r#"
            SELECT id, user_id, amount, category, expense_date
            FROM expenses WHERE user_id = $1 ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(Self::expense_from_row)
        .collect::<Result<Vec<_>>>()?;

        let debts = sqlx::query(
            r#"
            SELECT id, user_id, amount, interest_rate
            FROM debts WHERE user_id = $1 ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(Self::debt_from_row)
        .collect::<Result<Vec<_>>>()?;

        let savings_goals = sqlx::query(
            r#"
            SELECT id, user_id, amount, target_date
            FROM savings_goals WHERE user_id = $1 ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(Self::goal_from_row)
        .collect::<Result<Vec<_>>>()?;

        tx.commit().await?;

        Ok(Some(FinancialSnapshot {
            user,
            expenses,
            debts,
            savings_goals,
        }))
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<()> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent updates of the same profile
        let exists = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(FinanceError::UserNotFound);
        }

        if let Some(income) = update.income {
            sqlx::query("UPDATE users SET income = $2 WHERE id = $1")
                .bind(user_id)
                .bind(income)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(debts) = &update.debts {
            sqlx::query("DELETE FROM debts WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            for debt in debts {
                sqlx::query(
                    r#"
                    INSERT INTO debts (id, user_id, amount, interest_rate)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(debt.amount)
                .bind(debt.interest_rate)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(goals) = &update.savings_goals {
            sqlx::query("DELETE FROM savings_goals WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            for goal in goals {
                sqlx::query(
                    r#"
                    INSERT INTO savings_goals (id, user_id, amount, target_date)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(goal.amount)
                .bind(goal.target_date)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        debug!(%user_id, "Profile updated");
        Ok(())
    }
}
