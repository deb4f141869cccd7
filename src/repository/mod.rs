//! Storage layer
//!
//! The rest of the crate only talks to [`FinancialRepository`]. Two backends
//! exist: Postgres for deployments and an in-memory store for development
//! and tests. Each trait method is atomic on its own; in particular
//! `update_profile` swaps whole debt/goal collections in one step so a
//! concurrent `load_snapshot` never sees a half-replaced set.

use crate::models::{Expense, FinancialSnapshot, NewExpense, ProfileUpdate, User};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Trait for user-scoped financial storage
#[async_trait::async_trait]
pub trait FinancialRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with `UserNotFound` when the owner does not exist.
    async fn insert_expense(&self, user_id: Uuid, expense: NewExpense) -> Result<Expense>;
    /// The user's own expenses in creation order.
    async fn list_expenses(&self, user_id: Uuid) -> Result<Vec<Expense>>;

    /// User row plus all owned records, read from one consistent view.
    async fn load_snapshot(&self, user_id: Uuid) -> Result<Option<FinancialSnapshot>>;
    /// Apply a partial profile update atomically. Fails with `UserNotFound`.
    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<()>;
}

/// Pick a backend: Postgres when a database URL is configured, memory otherwise.
pub fn build_repository(database_url: Option<&str>) -> Arc<dyn FinancialRepository> {
    if let Some(url) = database_url {
        match PostgresRepository::connect_lazy(url) {
            Ok(repo) => {
                info!("Repository backend: postgres");
                return Arc::new(repo);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres repository, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Repository backend: in-memory");
    Arc::new(InMemoryRepository::new())
}
