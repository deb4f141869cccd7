//! REST API server for the finance advisor
//!
//! Every failure leaves through [`FinanceError`]'s `IntoResponse`, so clients
//! always get a JSON `{ "error": ... }` body.

use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::accounts::AccountService;
use crate::advice::AdviceService;
use crate::auth::{AuthService, AuthenticatedUser};
use crate::config::AppConfig;
use crate::error::FinanceError;
use crate::expenses::{ExpenseRequest, ExpenseService};
use crate::models::{Expense, ProfileUpdate, ProfileView};
use crate::profile::ProfileService;
use crate::repository::{build_repository, FinancialRepository};
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub accounts: Arc<AccountService>,
    pub expenses: Arc<ExpenseService>,
    pub profile: Arc<ProfileService>,
    pub advice: Arc<AdviceService>,
}

impl ApiState {
    pub fn new(
        repo: Arc<dyn FinancialRepository>,
        auth: Arc<AuthService>,
        advice: AdviceService,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(Arc::clone(&repo), Arc::clone(&auth))),
            expenses: Arc::new(ExpenseService::new(Arc::clone(&repo))),
            profile: Arc::new(ProfileService::new(repo)),
            advice: Arc::new(advice),
            auth,
        }
    }

    /// Build every service from process configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let repo = build_repository(config.database_url.as_deref());
        let auth = Arc::new(AuthService::new(
            &config.auth.jwt_secret,
            config.auth.bcrypt_cost,
        ));
        let advice = AdviceService::from_settings(Arc::clone(&repo), config.advice.clone())?;

        Ok(Self::new(repo, auth, advice))
    }
}

impl FromRef<ApiState> for Arc<AuthService> {
    fn from_ref(state: &ApiState) -> Self {
        Arc::clone(&state.auth)
    }
}

/// =============================
/// Helpers
/// =============================

/// Turn axum's JSON rejection into a 400 with our error body.
fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection);
        FinanceError::Validation("Request body must be valid JSON".to_string())
    })
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Account Endpoints
/// =============================

async fn register(
    State(state): State<ApiState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let req = json_body(body)?;

    state
        .accounts
        .register(req.email.as_deref(), req.password.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

async fn login(
    State(state): State<ApiState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let req = json_body(body)?;

    let token = state
        .accounts
        .login(req.email.as_deref(), req.password.as_deref())
        .await?;

    Ok(Json(json!({ "message": "Login successful", "token": token })))
}

/// =============================
/// Expense Endpoints
/// =============================

async fn create_expense(
    State(state): State<ApiState>,
    caller: AuthenticatedUser,
    body: std::result::Result<Json<ExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>)> {
    let req = json_body(body)?;
    let expense = state.expenses.create_expense(caller.user_id, &req).await?;

    Ok((StatusCode::CREATED, Json(expense)))
}

async fn list_expenses(
    State(state): State<ApiState>,
    caller: AuthenticatedUser,
) -> Result<Json<Vec<Expense>>> {
    Ok(Json(state.expenses.list_expenses(caller.user_id).await?))
}

/// =============================
/// Profile Endpoints
/// =============================

async fn update_profile(
    State(state): State<ApiState>,
    caller: AuthenticatedUser,
    body: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Value>> {
    let update = json_body(body)?;
    state.profile.update_profile(caller.user_id, &update).await?;

    Ok(Json(json!({ "message": "Profile updated successfully" })))
}

async fn get_profile(
    State(state): State<ApiState>,
    caller: AuthenticatedUser,
) -> Result<Json<ProfileView>> {
    Ok(Json(state.profile.get_profile(caller.user_id).await?))
}

/// =============================
/// Advice Endpoint
/// =============================

async fn generate_advice(
    State(state): State<ApiState>,
    caller: AuthenticatedUser,
) -> Result<Json<Value>> {
    let advice = state.advice.generate_advice(caller.user_id).await?;

    Ok(Json(json!({ "advice": advice.text })))
}

/// =============================
/// Router
/// =============================

pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = origin.parse::<HeaderValue>().map_err(|_| {
        FinanceError::Configuration(format!("CORS_ORIGIN is not a valid origin: {:?}", origin))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/expenses", post(create_expense).get(list_expenses))
        .route("/profile", post(update_profile).get(get_profile))
        .route("/advice", post(generate_advice))
        .with_state(state)
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    config: AppConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let state = ApiState::from_config(&config)?;
    let router = create_router(state)
        .layer(cors_layer(&config.server.cors_origin)?)
        .layer(TraceLayer::new_for_http());

    let port = config.server.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
