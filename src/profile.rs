//! Financial profile: income, debts and savings goals

use crate::error::FinanceError;
use crate::models::{ProfileUpdate, ProfileView};
use crate::repository::FinancialRepository;
use crate::Result;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct ProfileService {
    repo: Arc<dyn FinancialRepository>,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn FinancialRepository>) -> Self {
        Self { repo }
    }

    /// Apply the supplied fields. Debts and savings goals, when present,
    /// replace the stored collections wholesale; an empty list clears them.
    /// A negative income is rejected before anything is written.
    pub async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<()> {
        if let Some(Some(income)) = update.income {
            if income < 0.0 {
                return Err(FinanceError::Validation(
                    "income must be a non-negative number".to_string(),
                ));
            }
        }

        self.repo.update_profile(user_id, update).await?;

        info!(
            %user_id,
            income_updated = update.income.is_some(),
            debts = update.debts.as_ref().map(Vec::len),
            savings_goals = update.savings_goals.as_ref().map(Vec::len),
            "Profile updated"
        );
        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileView> {
        let snapshot = self
            .repo
            .load_snapshot(user_id)
            .await?
            .ok_or(FinanceError::UserNotFound)?;

        Ok(ProfileView::from(&snapshot))
    }
}
