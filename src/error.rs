use thiserror::Error;

use crate::store::StoreStatus;

/// Failures surfaced by the expense data layer.
///
/// Nothing in the core retries; every variant reaches the caller of the
/// operation that failed.
#[derive(Debug, Error)]
pub(crate) enum ExpenseError {
    /// The backing database could not be opened or its schema created.
    #[error("storage unavailable: {context}")]
    StorageUnavailable {
        context: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("invalid expense: {0}")]
    Validation(String),
    #[error("expense {0} not found")]
    NotFound(i64),
    #[error("query failed: {0}")]
    QueryFailure(#[from] rusqlite::Error),
    /// A sum over stored amounts left the range `Decimal` can hold.
    #[error("query failed: amount total is too large to compute")]
    Overflow,
    #[error("expense store is not ready ({0})")]
    NotReady(StoreStatus),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl ExpenseError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn unavailable(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::StorageUnavailable {
            context: context.into(),
            source,
        }
    }
}

pub(crate) type Result<T, E = ExpenseError> = std::result::Result<T, E>;
