//! Core data models for the finance advisor

use crate::coerce::{
    format_iso_date, lenient_date, lenient_f64, lenient_present_f64, to_finite_or_zero,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//
// ================= Accounts =================
//

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    /// May be unset, or hold garbage carried over from older rows.
    pub income: Option<f64>,
    pub created_at: DateTime<Utc>,
}

//
// ================= Stored records =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Option<f64>,
    pub category: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Debt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Option<f64>,
    pub interest_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Option<f64>,
    pub target_date: Option<NaiveDate>,
}

/// Everything the advice pipeline reads for one user, taken from one consistent view.
#[derive(Debug, Clone)]
pub struct FinancialSnapshot {
    pub user: User,
    pub expenses: Vec<Expense>,
    pub debts: Vec<Debt>,
    pub savings_goals: Vec<SavingsGoal>,
}

//
// ================= Inputs =================
//

/// An expense that already passed request validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtInput {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub interest_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalInput {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub target_date: Option<NaiveDate>,
}

/// Partial profile update. Each field is independent:
/// `None` leaves the stored value alone, `Some` replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "lenient_present_f64")]
    pub income: Option<Option<f64>>,
    #[serde(default)]
    pub debts: Option<Vec<DebtInput>>,
    #[serde(default)]
    pub savings_goals: Option<Vec<SavingsGoalInput>>,
}

//
// ================= Outputs =================
//

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtView {
    pub amount: f64,
    pub interest_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalView {
    pub amount: f64,
    pub target_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub income: f64,
    pub debts: Vec<DebtView>,
    pub savings_goals: Vec<SavingsGoalView>,
}

impl From<&FinancialSnapshot> for ProfileView {
    fn from(snapshot: &FinancialSnapshot) -> Self {
        Self {
            income: to_finite_or_zero(snapshot.user.income),
            debts: snapshot
                .debts
                .iter()
                .map(|d| DebtView {
                    amount: to_finite_or_zero(d.amount),
                    interest_rate: to_finite_or_zero(d.interest_rate),
                })
                .collect(),
            savings_goals: snapshot
                .savings_goals
                .iter()
                .map(|g| SavingsGoalView {
                    amount: to_finite_or_zero(g.amount),
                    target_date: g.target_date.map(format_iso_date),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub text: String,
}
