//! Advice prompt rendering
//!
//! Clause order is fixed: income, expenses, disposable income, debt, savings
//! goals, category breakdown, instructions. The debt, goal and breakdown
//! clauses appear only when the metrics carry that data. Same metrics in,
//! same string out.

use crate::aggregator::FinancialMetrics;

const INSTRUCTIONS: &str = "Based on this data, give a concise 3-4 sentence recommendation. \
If there is disposable income, suggest how to split it between debt repayment and savings \
as percentages (when applicable), and estimate how many months it would take to pay off \
the debt and to reach the savings goal with that split. \
If there are expenses, name at least two specific expense categories to cut back on, \
with dollar amounts. \
If expenses exceed income, focus first on reducing expenses before anything else. \
If there is no debt, suggest suitable investment options for the remaining money.";

pub struct AdvicePromptBuilder;

impl AdvicePromptBuilder {
    pub fn render(metrics: &FinancialMetrics) -> String {
        let mut clauses: Vec<String> = Vec::with_capacity(7);

        clauses.push(income_clause(metrics));
        clauses.push(format!(
            "My total monthly expenses are {}.",
            dollars(metrics.total_expenses)
        ));
        clauses.push(disposable_clause(metrics));

        if let Some(total_debt) = metrics.total_debt {
            clauses.push(format!("I have a total debt of {}.", dollars(total_debt)));
        }

        if let Some(total_goals) = metrics.total_savings_goals {
            clauses.push(format!(
                "My savings goals add up to {}.",
                dollars(total_goals)
            ));
        }

        if metrics.total_expenses > 0.0 {
            clauses.push(category_clause(metrics));
        }

        clauses.push(INSTRUCTIONS.to_string());

        clauses.join(" ")
    }
}

fn dollars(amount: f64) -> String {
    // -0.0 would print as "$-0"
    let amount = if amount == 0.0 { 0.0 } else { amount };
    format!("${}", amount)
}

fn income_clause(metrics: &FinancialMetrics) -> String {
    if metrics.income_specified {
        format!("My monthly income is {}.", dollars(metrics.income))
    } else {
        "My monthly income is not specified, so assume it is $0 for these calculations.".to_string()
    }
}

fn disposable_clause(metrics: &FinancialMetrics) -> String {
    if metrics.is_overspending() {
        format!(
            "I am overspending by {} each month.",
            dollars(metrics.disposable_income.abs())
        )
    } else {
        format!(
            "That leaves a disposable income of {}.",
            dollars(metrics.disposable_income)
        )
    }
}

fn category_clause(metrics: &FinancialMetrics) -> String {
    let mut breakdown = String::from("Expense breakdown by category: ");

    for entry in &metrics.category_totals {
        breakdown.push_str(&format!("{}: {}, ", entry.category, dollars(entry.total)));
    }

    let trimmed = breakdown.strip_suffix(", ").unwrap_or(&breakdown);
    format!("{}.", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::FinancialAggregator;
    use crate::models::{Debt, Expense, SavingsGoal};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn expense(user_id: Uuid, amount: f64, category: &str) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            user_id,
            amount: Some(amount),
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_food_example() {
        let user = Uuid::new_v4();
        let expenses = vec![expense(user, 200.0, "food")];
        let metrics =
            FinancialAggregator::aggregate_records(user, Some(1000.0), &expenses, &[], &[]);

        let prompt = AdvicePromptBuilder::render(&metrics);

        assert!(prompt.contains("My monthly income is $1000."));
        assert!(prompt.contains("My total monthly expenses are $200."));
        assert!(prompt.contains("disposable income of $800."));
        assert!(prompt.contains("food: $200."));
        assert!(!prompt.contains("total debt"));
        assert!(!prompt.contains("savings goals add up"));
    }

    #[test]
    fn test_clause_order() {
        let user = Uuid::new_v4();
        let expenses = vec![expense(user, 50.0, "food")];
        let debts = vec![Debt {
            id: Uuid::new_v4(),
            user_id: user,
            amount: Some(2000.0),
            interest_rate: Some(19.9),
        }];
        let goals = vec![SavingsGoal {
            id: Uuid::new_v4(),
            user_id: user,
            amount: Some(5000.0),
            target_date: None,
        }];
        let metrics =
            FinancialAggregator::aggregate_records(user, Some(3000.0), &expenses, &debts, &goals);

        let prompt = AdvicePromptBuilder::render(&metrics);
        let positions: Vec<usize> = [
            "monthly income is $3000",
            "monthly expenses are $50",
            "disposable income of $2950",
            "total debt of $2000",
            "savings goals add up to $5000",
            "food: $50.",
            "3-4 sentence recommendation",
        ]
        .iter()
        .map(|needle| prompt.find(needle).unwrap())
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_overspending_states_absolute_amount() {
        let user = Uuid::new_v4();
        let expenses = vec![expense(user, 1300.0, "rent")];
        let metrics =
            FinancialAggregator::aggregate_records(user, Some(1000.0), &expenses, &[], &[]);

        let prompt = AdvicePromptBuilder::render(&metrics);
        assert!(prompt.contains("overspending by $300"));
        assert!(!prompt.contains("-300"));
        assert!(!prompt.contains("disposable income of"));
    }

    #[test]
    fn test_unspecified_income_and_no_expenses() {
        let user = Uuid::new_v4();
        let metrics = FinancialAggregator::aggregate_records(user, None, &[], &[], &[]);

        let prompt = AdvicePromptBuilder::render(&metrics);
        assert!(prompt.contains("income is not specified"));
        assert!(prompt.contains("My total monthly expenses are $0."));
        assert!(prompt.contains("disposable income of $0."));
        assert!(!prompt.contains("Expense breakdown"));
    }

    #[test]
    fn test_negative_zero_renders_as_zero() {
        assert_eq!(dollars(-0.0), "$0");
        assert_eq!(dollars(0.0), "$0");
        assert_eq!(dollars(12.5), "$12.5");

        let user = Uuid::new_v4();
        let metrics = FinancialAggregator::aggregate_records(user, Some(-0.0), &[], &[], &[]);
        let prompt = AdvicePromptBuilder::render(&metrics);
        assert!(!prompt.contains("$-0"));
        assert!(prompt.contains("My monthly income is $0."));
    }

    #[test]
    fn test_debt_clause_kept_when_amounts_are_garbage() {
        let user = Uuid::new_v4();
        let debts = vec![Debt {
            id: Uuid::new_v4(),
            user_id: user,
            amount: None,
            interest_rate: None,
        }];
        let metrics = FinancialAggregator::aggregate_records(user, Some(100.0), &[], &debts, &[]);

        let prompt = AdvicePromptBuilder::render(&metrics);
        assert!(prompt.contains("total debt of $0."));
    }

    #[test]
    fn test_category_breakdown_lists_all_categories() {
        let user = Uuid::new_v4();
        let expenses = vec![
            expense(user, 120.5, "food"),
            expense(user, 60.0, "transport"),
            expense(user, 20.0, "food"),
        ];
        let metrics =
            FinancialAggregator::aggregate_records(user, Some(1000.0), &expenses, &[], &[]);

        let prompt = AdvicePromptBuilder::render(&metrics);
        assert!(prompt.contains("Expense breakdown by category: food: $140.5, transport: $60."));
    }

    #[test]
    fn test_render_is_deterministic() {
        let user = Uuid::new_v4();
        let expenses = vec![expense(user, 10.0, "a"), expense(user, 20.0, "b")];
        let metrics =
            FinancialAggregator::aggregate_records(user, Some(100.0), &expenses, &[], &[]);

        assert_eq!(
            AdvicePromptBuilder::render(&metrics),
            AdvicePromptBuilder::render(&metrics)
        );
    }
}
