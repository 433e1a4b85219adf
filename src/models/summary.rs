use rust_decimal::Decimal;

use super::Category;
use crate::error::{ExpenseError, Result};

/// Add one amount to a running total without panicking on overflow.
pub(crate) fn add_amount(total: Decimal, amount: Decimal) -> Result<Decimal> {
    total.checked_add(amount).ok_or(ExpenseError::Overflow)
}

pub(crate) fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, add_amount)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CategorySummary {
    pub(crate) category: Category,
    pub(crate) total: Decimal,
    pub(crate) count: u64,
}

impl CategorySummary {
    /// Share of `grand_total` in percent, 0 when there is nothing to share.
    pub(crate) fn percent_of(&self, grand_total: Decimal) -> Decimal {
        if grand_total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.total
            .checked_div(grand_total)
            .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Decimal::ZERO, |pct| pct.round_dp(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MonthlySummary {
    /// Format: "YYYY-MM"
    pub(crate) month: String,
    pub(crate) total: Decimal,
    pub(crate) count: u64,
}
