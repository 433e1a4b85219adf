use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::Category;
use crate::error::{ExpenseError, Result};

/// A stored expense. `id` and both timestamps are owned by the database.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Expense {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) amount: Decimal,
    pub(crate) category: Category,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Everything about an expense the user gets to choose.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExpenseDraft {
    pub(crate) title: String,
    pub(crate) amount: Decimal,
    pub(crate) category: Category,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
}

impl ExpenseDraft {
    pub(crate) fn new(title: &str, amount: Decimal, category: Category, date: NaiveDate) -> Self {
        Self {
            title: title.to_string(),
            amount,
            category,
            date,
            description: String::new(),
        }
    }

    pub(crate) fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Invariants the database enforces on every write. Title length and
    /// future dates are form rules and are not checked here.
    pub(crate) fn check_storable(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ExpenseError::validation("title must not be empty"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ExpenseError::validation(format!(
                "amount must be greater than 0 (got {})",
                self.amount
            )));
        }
        Ok(())
    }
}
