mod schema;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{ExpenseError, Result};
use crate::models::*;

/// Number of months `monthly_breakdown` reports.
pub(crate) const TREND_MONTHS: usize = 12;

const EXPENSE_COLUMNS: &str =
    "id, title, amount, category, date, description, created_at, updated_at";

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            ExpenseError::unavailable(format!("failed to open {}", path.display()), e)
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| ExpenseError::unavailable("failed to set database pragmas", e))?;
        let mut db = Self { conn };
        db.initialize()?;
        info!(path = %path.display(), "expense database opened");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ExpenseError::unavailable("failed to open in-memory database", e))?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create or migrate the schema. Safe to run any number of times.
    pub(crate) fn initialize(&mut self) -> Result<()> {
        self.migrate()
            .map_err(|e| ExpenseError::unavailable("database migration failed", e))
    }

    fn migrate(&mut self) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        let has_version_table: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        let recorded: Option<i32> = if has_version_table {
            tx.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
        } else {
            None
        };

        // No version row: create whatever is missing and stamp the current version.
        let Some(current) = recorded else {
            tx.execute_batch(schema::SCHEMA_V1)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return tx.commit();
        };

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                tx.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            debug!(from = current, to = schema::CURRENT_VERSION, "schema migrated");
            tx.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        tx.commit()
    }

    // ── Expenses ──────────────────────────────────────────────

    /// Insert a new expense and return it as stored, with its fresh id.
    pub(crate) fn add(&self, draft: &ExpenseDraft) -> Result<Expense> {
        draft.check_storable()?;
        // Keep creation order and id order in step even if the clock steps back.
        let newest: Option<DateTime<Utc>> = self.conn.query_row(
            "SELECT MAX(created_at) FROM expenses",
            [],
            |row| {
                row.get::<_, Option<String>>(0)?
                    .map(|raw| decode(0, &raw, parse_timestamp))
                    .transpose()
            },
        )?;
        let now = newest.map_or_else(timestamp_now, |newest| timestamp_now().max(newest));
        self.conn.execute(
            "INSERT INTO expenses (title, amount, category, date, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                draft.title,
                draft.amount.to_string(),
                draft.category.as_str(),
                format_date(draft.date),
                draft.description,
                format_timestamp(&now),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, category = %draft.category, amount = %draft.amount, "expense added");

        Ok(Expense {
            id,
            title: draft.title.clone(),
            amount: draft.amount,
            category: draft.category,
            date: draft.date,
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// All expenses, most recently created first.
    pub(crate) fn get_all(&self) -> Result<Vec<Expense>> {
        self.select_expenses(None)
    }

    pub(crate) fn get_by_id(&self, id: i64) -> Result<Option<Expense>> {
        let result = self.conn.query_row(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
            params![id],
            expense_from_row,
        );
        match result {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace every user-settable field of `id` in one transaction.
    pub(crate) fn update(&mut self, id: i64, draft: &ExpenseDraft) -> Result<Expense> {
        draft.check_storable()?;
        let tx = self.conn.transaction()?;

        let existing = match tx.query_row(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
            params![id],
            expense_from_row,
        ) {
            Ok(e) => e,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(ExpenseError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };

        // A wall clock stepping backwards must not make updated_at regress.
        let updated_at = timestamp_now().max(existing.updated_at);
        tx.execute(
            "UPDATE expenses
             SET title = ?1, amount = ?2, category = ?3, date = ?4, description = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                draft.title,
                draft.amount.to_string(),
                draft.category.as_str(),
                format_date(draft.date),
                draft.description,
                format_timestamp(&updated_at),
                id,
            ],
        )?;
        tx.commit()?;
        debug!(id, "expense updated");

        Ok(Expense {
            id,
            title: draft.title.clone(),
            amount: draft.amount,
            category: draft.category,
            date: draft.date,
            description: draft.description.clone(),
            created_at: existing.created_at,
            updated_at,
        })
    }

    /// Remove an expense. Returns whether a row existed; a missing id is not an error.
    pub(crate) fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
        debug!(id, removed, "expense deleted");
        Ok(removed > 0)
    }

    pub(crate) fn delete_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM expenses", [])?;
        info!(removed, "all expenses cleared");
        Ok(removed)
    }

    fn select_expenses(&self, month: Option<&str>) -> Result<Vec<Expense>> {
        let pattern = month.map(|m| format!("{m}-%"));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE (?1 IS NULL OR date LIKE ?1)
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![pattern], expense_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ── Analytics ─────────────────────────────────────────────

    /// Spending per category, largest total first. Categories without
    /// expenses are left out.
    pub(crate) fn category_breakdown(&self) -> Result<Vec<CategorySummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT category, amount FROM expenses ORDER BY category")?;
        let rows = stmt.query_map([], |row| {
            let category = decode(0, &row.get::<_, String>(0)?, Category::parse)?;
            let amount = decode(1, &row.get::<_, String>(1)?, Decimal::from_str)?;
            Ok((category, amount))
        })?;

        let mut groups: BTreeMap<Category, CategorySummary> = BTreeMap::new();
        for row in rows {
            let (category, amount) = row?;
            let entry = groups.entry(category).or_insert(CategorySummary {
                category,
                total: Decimal::ZERO,
                count: 0,
            });
            entry.total = add_amount(entry.total, amount)?;
            entry.count += 1;
        }

        let mut result: Vec<_> = groups.into_values().collect();
        result.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });
        Ok(result)
    }

    /// Spending per calendar month, newest month first, at most
    /// [`TREND_MONTHS`] entries.
    pub(crate) fn monthly_breakdown(&self) -> Result<Vec<MonthlySummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT substr(date, 1, 7) AS month, amount FROM expenses")?;
        let rows = stmt.query_map([], |row| {
            let month: String = row.get(0)?;
            let amount = decode(1, &row.get::<_, String>(1)?, Decimal::from_str)?;
            Ok((month, amount))
        })?;

        let mut groups: BTreeMap<String, (Decimal, u64)> = BTreeMap::new();
        for row in rows {
            let (month, amount) = row?;
            let entry = groups.entry(month).or_insert((Decimal::ZERO, 0));
            entry.0 = add_amount(entry.0, amount)?;
            entry.1 += 1;
        }

        Ok(groups
            .into_iter()
            .rev()
            .take(TREND_MONTHS)
            .map(|(month, (total, count))| MonthlySummary {
                month,
                total,
                count,
            })
            .collect())
    }

    // ── Export ────────────────────────────────────────────────

    /// Write expenses to a CSV file, optionally only those dated in `month`
    /// ("YYYY-MM"). Returns the number of data rows written.
    pub(crate) fn export_to_csv(&self, path: &Path, month: Option<&str>) -> Result<usize> {
        let expenses = self.select_expenses(month)?;
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "id",
            "date",
            "title",
            "category",
            "amount",
            "description",
            "created_at",
            "updated_at",
        ])?;
        for e in &expenses {
            wtr.write_record([
                e.id.to_string(),
                format_date(e.date),
                e.title.clone(),
                e.category.as_str().to_string(),
                e.amount.to_string(),
                e.description.clone(),
                format_timestamp(&e.created_at),
                format_timestamp(&e.updated_at),
            ])?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        info!(rows = expenses.len(), path = %path.display(), "expenses exported");
        Ok(expenses.len())
    }
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        title: row.get(1)?,
        amount: decode(2, &row.get::<_, String>(2)?, Decimal::from_str)?,
        category: decode(3, &row.get::<_, String>(3)?, Category::parse)?,
        date: decode(4, &row.get::<_, String>(4)?, |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
        })?,
        description: row.get(5)?,
        created_at: decode(6, &row.get::<_, String>(6)?, parse_timestamp)?,
        updated_at: decode(7, &row.get::<_, String>(7)?, parse_timestamp)?,
    })
}

/// Turn a text column into a typed value, reporting bad data as a
/// conversion failure on that column.
fn decode<T, E>(
    idx: usize,
    raw: &str,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    parse(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Current time at the precision the database keeps.
fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text order is time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}
