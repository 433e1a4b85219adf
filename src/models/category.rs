use crate::error::{ExpenseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Category {
    Food,
    Transportation,
    Entertainment,
    Shopping,
    Bills,
    Healthcare,
    Education,
    Other,
}

impl Category {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transportation => "Transportation",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Bills => "Bills",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive lookup. Anything outside the fixed set is a
    /// validation failure rather than a silent fallback to `Other`.
    pub(crate) fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ExpenseError::validation(format!("unknown category '{wanted}'")))
    }

    pub(crate) fn all() -> &'static [Category] {
        &[
            Self::Food,
            Self::Transportation,
            Self::Entertainment,
            Self::Shopping,
            Self::Bills,
            Self::Healthcare,
            Self::Education,
            Self::Other,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
