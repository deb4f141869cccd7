//! Registration and login

use crate::auth::AuthService;
use crate::error::FinanceError;
use crate::models::User;
use crate::repository::FinancialRepository;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AccountService {
    repo: Arc<dyn FinancialRepository>,
    auth: Arc<AuthService>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn FinancialRepository>, auth: Arc<AuthService>) -> Self {
        Self { repo, auth }
    }

    pub async fn register(&self, email: Option<&str>, password: Option<&str>) -> Result<User> {
        let (email, password) = require_credentials(email, password)?;

        let auth = Arc::clone(&self.auth);
        let plain = password.to_string();
        let hash = run_blocking(move || auth.hash_password(&plain)).await?;

        let user = self.repo.create_user(&email, &hash).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Returns a fresh bearer token. Unknown email and wrong password fail the same way.
    pub async fn login(&self, email: Option<&str>, password: Option<&str>) -> Result<String> {
        let (email, password) = require_credentials(email, password)?;

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            warn!("Login attempt for unknown email");
            return Err(FinanceError::InvalidCredentials);
        };

        let auth = Arc::clone(&self.auth);
        let plain = password.to_string();
        let hash = user.password_hash.clone();
        let matches = run_blocking(move || auth.verify_password(&plain, &hash)).await?;

        if !matches {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(FinanceError::InvalidCredentials);
        }

        self.auth.issue(user.id)
    }
}

/// Emails are compared trimmed and lowercased. Passwords are taken verbatim
/// but may not be blank.
fn require_credentials<'a>(
    email: Option<&str>,
    password: Option<&'a str>,
) -> Result<(String, &'a str)> {
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.trim().is_empty());

    match (email, password) {
        (Some(email), Some(password)) => Ok((email.to_lowercase(), password)),
        _ => Err(FinanceError::Validation(
            "Email and password are required".to_string(),
        )),
    }
}

/// bcrypt work runs on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FinanceError::Internal(format!("blocking task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(AuthService::new("test-secret", 4)),
        )
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let accounts = service();
        let user = accounts.register(Some("a@x.com"), Some("p")).await.unwrap();
        assert_ne!(user.password_hash, "p");

        let token = accounts.login(Some("a@x.com"), Some("p")).await.unwrap();
        assert_eq!(accounts.auth.verify(&token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let accounts = service();
        assert!(matches!(
            accounts.register(None, Some("p")).await,
            Err(FinanceError::Validation(_))
        ));
        assert!(matches!(
            accounts.register(Some("a@x.com"), Some("  ")).await,
            Err(FinanceError::Validation(_))
        ));
        assert!(matches!(
            accounts.login(Some(""), Some("p")).await,
            Err(FinanceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let accounts = service();
        accounts.register(Some("a@x.com"), Some("p")).await.unwrap();

        let again = accounts.register(Some(" A@X.com "), Some("q")).await;
        assert!(matches!(again, Err(FinanceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let accounts = service();
        accounts.register(Some("a@x.com"), Some("p")).await.unwrap();

        assert!(matches!(
            accounts.login(Some("a@x.com"), Some("wrong")).await,
            Err(FinanceError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login(Some("nobody@x.com"), Some("p")).await,
            Err(FinanceError::InvalidCredentials)
        ));
    }
}
