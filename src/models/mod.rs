mod category;
mod expense;
mod form;
mod summary;

pub(crate) use category::Category;
pub(crate) use expense::{Expense, ExpenseDraft};
pub(crate) use form::{parse_date, ExpenseForm};
pub(crate) use summary::{add_amount, sum_amounts, CategorySummary, MonthlySummary};
