//! In-memory expense state, kept in step with the database.
//!
//! [`ExpenseStore`] owns the only [`Database`] handle. Every mutation runs
//! against the database first and is mirrored into the snapshot only once
//! the write has committed, so the snapshot never shows a change that is
//! not on disk. Mutations hold the writer lock from the durable write until
//! subscribers have been notified, which keeps them strictly one at a time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{ExpenseError, Result};
use crate::models::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreStatus {
    Uninitialized,
    Loading,
    Ready,
    /// Initialization failed; holds the reason for display.
    Failed(String),
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

type Subscriber = Box<dyn Fn(&[Expense]) + Send + Sync>;

enum Backing {
    File(PathBuf),
    #[cfg(test)]
    Memory,
}

impl Backing {
    fn open(&self) -> Result<Database> {
        match self {
            Self::File(path) => Database::open(path),
            #[cfg(test)]
            Self::Memory => Database::open_in_memory(),
        }
    }
}

struct View {
    status: StoreStatus,
    /// Newest-created first, same order as `Database::get_all`.
    expenses: Vec<Expense>,
}

pub(crate) struct ExpenseStore {
    backing: Backing,
    db: Mutex<Option<Database>>,
    view: RwLock<View>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ExpenseStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_backing(Backing::File(path.into()))
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self::with_backing(Backing::Memory)
    }

    fn with_backing(backing: Backing) -> Self {
        Self {
            backing,
            db: Mutex::new(None),
            view: RwLock::new(View {
                status: StoreStatus::Uninitialized,
                expenses: Vec::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn status(&self) -> StoreStatus {
        read(&self.view).status.clone()
    }

    /// Open the database and load every expense.
    ///
    /// Runs once: a store that is already `Ready` returns `Ok`, one that
    /// has `Failed` keeps reporting that failure. Callers racing the first
    /// initialization wait for it to finish.
    pub(crate) fn initialize(&self) -> Result<()> {
        let mut db = lock(&self.db);
        {
            let mut view = write(&self.view);
            match &view.status {
                StoreStatus::Ready => return Ok(()),
                StoreStatus::Failed(_) => return Err(ExpenseError::NotReady(view.status.clone())),
                StoreStatus::Uninitialized | StoreStatus::Loading => {}
            }
            view.status = StoreStatus::Loading;
        }

        let loaded = self.backing.open().and_then(|opened| {
            let expenses = opened.get_all()?;
            Ok((opened, expenses))
        });

        match loaded {
            Ok((opened, expenses)) => {
                info!(count = expenses.len(), "expense store ready");
                *db = Some(opened);
                self.mirror(|snapshot| *snapshot = expenses, Some(StoreStatus::Ready));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "expense store failed to initialize");
                write(&self.view).status = StoreStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Register a callback that receives the snapshot after every
    /// confirmed change. Callbacks run on the mutating thread while the
    /// writer lock is held, so they must not call back into the store.
    pub(crate) fn subscribe(&self, callback: impl Fn(&[Expense]) + Send + Sync + 'static) {
        lock(&self.subscribers).push(Box::new(callback));
    }

    // ── Mutations ─────────────────────────────────────────────

    pub(crate) fn add(&self, draft: &ExpenseDraft) -> Result<Expense> {
        self.with_db("add", |db| {
            let expense = db.add(draft)?;
            self.mirror(|snapshot| snapshot.insert(0, expense.clone()), None);
            Ok(expense)
        })
    }

    pub(crate) fn update(&self, id: i64, draft: &ExpenseDraft) -> Result<Expense> {
        self.with_db("update", |db| {
            let updated = db.update(id, draft)?;
            self.mirror(
                |snapshot| {
                    if let Some(slot) = snapshot.iter_mut().find(|e| e.id == id) {
                        *slot = updated.clone();
                    }
                },
                None,
            );
            Ok(updated)
        })
    }

    /// Delete by id. Deleting something that is already gone succeeds.
    pub(crate) fn delete(&self, id: i64) -> Result<()> {
        self.with_db("delete", |db| {
            if db.delete(id)? {
                self.mirror(|snapshot| snapshot.retain(|e| e.id != id), None);
            }
            Ok(())
        })
    }

    /// Remove every expense. Returns how many were deleted.
    pub(crate) fn clear(&self) -> Result<usize> {
        self.with_db("clear", |db| {
            let removed = db.delete_all()?;
            self.mirror(Vec::clear, None);
            Ok(removed)
        })
    }

    // ── Snapshot reads ────────────────────────────────────────

    pub(crate) fn expenses(&self) -> Vec<Expense> {
        read(&self.view).expenses.clone()
    }

    pub(crate) fn get(&self, id: i64) -> Option<Expense> {
        read(&self.view).expenses.iter().find(|e| e.id == id).cloned()
    }

    /// Sum of every amount in the snapshot. Fails with `Overflow` rather
    /// than panicking when the amounts add up past `Decimal::MAX`.
    pub(crate) fn total(&self) -> Result<Decimal> {
        sum_amounts(read(&self.view).expenses.iter().map(|e| e.amount))
    }

    pub(crate) fn average(&self) -> Result<Option<Decimal>> {
        let view = read(&self.view);
        if view.expenses.is_empty() {
            return Ok(None);
        }
        let total = sum_amounts(view.expenses.iter().map(|e| e.amount))?;
        Ok(Some((total / Decimal::from(view.expenses.len())).round_dp(2)))
    }

    /// Expenses dated within `start..=end`, in snapshot order.
    pub(crate) fn filter_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Expense> {
        read(&self.view)
            .expenses
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect()
    }

    // ── Database reads ────────────────────────────────────────

    /// Look an expense up in the database rather than the snapshot.
    pub(crate) fn fetch(&self, id: i64) -> Result<Option<Expense>> {
        self.with_db("fetch", |db| db.get_by_id(id))
    }

    pub(crate) fn category_breakdown(&self) -> Result<Vec<CategorySummary>> {
        self.with_db("category breakdown", |db| db.category_breakdown())
    }

    pub(crate) fn monthly_breakdown(&self) -> Result<Vec<MonthlySummary>> {
        self.with_db("monthly breakdown", |db| db.monthly_breakdown())
    }

    pub(crate) fn export_csv(&self, path: &Path, month: Option<&str>) -> Result<usize> {
        self.with_db("export", |db| db.export_to_csv(path, month))
    }

    // ── Internals ─────────────────────────────────────────────

    /// Run `op` with exclusive use of the database, provided the store is
    /// ready. Anything `op` mirrors into the snapshot happens under the
    /// same lock.
    fn with_db<T>(&self, what: &str, op: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut guard = lock(&self.db);
        let status = self.status();
        let result = match &mut *guard {
            Some(db) if status == StoreStatus::Ready => op(db),
            _ => Err(ExpenseError::NotReady(status)),
        };
        if let Err(e) = &result {
            warn!(operation = what, error = %e, "expense operation failed");
        }
        result
    }

    fn mirror(&self, change: impl FnOnce(&mut Vec<Expense>), status: Option<StoreStatus>) {
        let snapshot = {
            let mut view = write(&self.view);
            change(&mut view.expenses);
            if let Some(status) = status {
                view.status = status;
            }
            view.expenses.clone()
        };
        for subscriber in lock(&self.subscribers).iter() {
            subscriber(&snapshot);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
