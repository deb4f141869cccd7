//! Financial aggregation
//!
//! Turns a user's raw records into the metrics the advice prompt is built
//! from. Pure and synchronous. Malformed stored amounts never fail the
//! computation; they contribute zero through [`to_finite_or_zero`].

use crate::coerce::{sum_finite, to_finite_or_zero};
use crate::models::{Debt, Expense, FinancialSnapshot, SavingsGoal};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialMetrics {
    pub income: f64,
    /// Stored income was present and finite.
    pub income_specified: bool,
    pub total_expenses: f64,
    /// `income - total_expenses`; negative means overspending.
    pub disposable_income: f64,
    /// `None` when the user has no debts at all.
    pub total_debt: Option<f64>,
    /// `None` when the user has no savings goals at all.
    pub total_savings_goals: Option<f64>,
    /// First-seen category order.
    pub category_totals: Vec<CategoryTotal>,
}

impl FinancialMetrics {
    pub fn is_overspending(&self) -> bool {
        self.disposable_income < 0.0
    }
}

pub struct FinancialAggregator;

impl FinancialAggregator {
    pub fn aggregate(snapshot: &FinancialSnapshot) -> FinancialMetrics {
        Self::aggregate_records(
            snapshot.user.id,
            snapshot.user.income,
            &snapshot.expenses,
            &snapshot.debts,
            &snapshot.savings_goals,
        )
    }

    /// Records owned by anyone other than `user_id` are ignored.
    pub fn aggregate_records(
        user_id: Uuid,
        income: Option<f64>,
        expenses: &[Expense],
        debts: &[Debt],
        savings_goals: &[SavingsGoal],
    ) -> FinancialMetrics {
        let expenses: Vec<&Expense> = expenses.iter().filter(|e| e.user_id == user_id).collect();
        let debts: Vec<&Debt> = debts.iter().filter(|d| d.user_id == user_id).collect();
        let goals: Vec<&SavingsGoal> = savings_goals
            .iter()
            .filter(|g| g.user_id == user_id)
            .collect();

        let income_specified = income.is_some_and(f64::is_finite);
        let income = to_finite_or_zero(income);
        let total_expenses = sum_finite(expenses.iter().map(|e| e.amount));

        let total_debt = (!debts.is_empty()).then(|| sum_finite(debts.iter().map(|d| d.amount)));
        let total_savings_goals =
            (!goals.is_empty()).then(|| sum_finite(goals.iter().map(|g| g.amount)));

        FinancialMetrics {
            income,
            income_specified,
            total_expenses,
            disposable_income: income - total_expenses,
            total_debt,
            total_savings_goals,
            category_totals: category_totals(&expenses),
        }
    }
}

fn category_totals(expenses: &[&Expense]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for expense in expenses {
        let amount = to_finite_or_zero(expense.amount);

        match index.get(expense.category.as_str()) {
            Some(&i) => totals[i].total += amount,
            None => {
                index.insert(expense.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: expense.category.clone(),
                    total: amount,
                });
            }
        }
    }

    totals
}
