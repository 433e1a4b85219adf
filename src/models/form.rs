use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{Category, Expense, ExpenseDraft};
use crate::error::{ExpenseError, Result};

pub(crate) const MIN_TITLE_LEN: usize = 3;
pub(crate) const MAX_AMOUNT: Decimal = Decimal::from_parts(999_999, 0, 0, false, 0);

/// Raw, unvalidated input as typed by the user.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExpenseForm {
    pub(crate) title: String,
    pub(crate) amount: String,
    pub(crate) category: String,
    pub(crate) date: String,
    pub(crate) description: String,
}

impl ExpenseForm {
    /// Prefill from an existing record.
    pub(crate) fn from_expense(expense: &Expense) -> Self {
        Self {
            title: expense.title.clone(),
            amount: expense.amount.to_string(),
            category: expense.category.as_str().to_string(),
            date: expense.date.format("%Y-%m-%d").to_string(),
            description: expense.description.clone(),
        }
    }

    /// Check every field in form order and report the first problem.
    pub(crate) fn validate(&self, today: NaiveDate) -> Result<ExpenseDraft> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ExpenseError::validation("please enter an expense title"));
        }
        if title.chars().count() < MIN_TITLE_LEN {
            return Err(ExpenseError::validation(format!(
                "title must be at least {MIN_TITLE_LEN} characters long"
            )));
        }

        let amount = parse_amount(&self.amount)?;
        let category = Category::parse(&self.category)?;
        let date = parse_date(&self.date)?;
        if date > today {
            return Err(ExpenseError::validation(
                "expense date cannot be in the future",
            ));
        }

        Ok(ExpenseDraft::new(title, amount, category, date).with_description(self.description.trim()))
    }
}

/// Parse a user-entered amount. Tolerates "$" and thousands separators.
pub(crate) fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim().replace(['$', ','], "");
    let amount = Decimal::from_str(cleaned.trim())
        .map_err(|_| ExpenseError::validation("please enter a valid amount"))?;
    if amount <= Decimal::ZERO {
        return Err(ExpenseError::validation("amount must be greater than 0"));
    }
    if amount > MAX_AMOUNT {
        return Err(ExpenseError::validation("amount cannot exceed $999,999"));
    }
    Ok(amount)
}

/// Parse a strict `YYYY-MM-DD` date.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let shape = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$")
        .map_err(|e| ExpenseError::validation(e.to_string()))?;
    if !shape.is_match(raw) {
        return Err(ExpenseError::validation(
            "please enter date in YYYY-MM-DD format",
        ));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ExpenseError::validation(format!("'{raw}' is not a calendar date")))
}
