// Expense store backed by a single SQLite file

use crate::expense::{CategorySummary, Expense, NewExpense};
use crate::filter::{DateRange, SummaryFilter};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Category of the throwaway row written during the startup self-test
pub const SENTINEL_CATEGORY: &str = "test";
const SENTINEL_DATE: &str = "2000-01-01";

/// Persistent expense store
///
/// Holds only the database path. Every operation opens its own connection
/// and drops it before returning, so the store is cheap to clone and share
/// across threads; SQLite's WAL locking is the only concurrency control.
#[derive(Debug, Clone)]
pub struct ExpenseStore {
    db_path: PathBuf,
}

impl ExpenseStore {
    /// Open or create the store at the given database file
    ///
    /// Creates the schema if missing and runs the write self-test. Any
    /// failure here is fatal for the caller.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            db_path: path.as_ref().to_path_buf(),
        };

        info!(path = ?store.db_path, "Opening expense database");
        if let Err(e) = store.init() {
            error!(path = ?store.db_path, error = ?e, "Database init failed");
            return Err(e);
        }
        info!("Database initialized");

        Ok(store)
    }

    /// Path of the backing database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Idempotent schema setup plus write self-test
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let mut conn = self.connect()?;

        let mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .context("Failed to enable WAL journal mode")?;
        debug!(journal_mode = %mode, "Journal mode set");

        Self::create_schema(&conn)?;
        Self::write_self_test(&mut conn)?;

        Ok(())
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open SQLite database at {}", self.db_path.display()))
    }

    /// Create database schema
    fn create_schema(conn: &Connection) -> Result<()> {
        debug!("Creating database schema");

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT DEFAULT '',
                note TEXT DEFAULT ''
            );
            "#,
        )
        .context("Failed to create expenses table")?;

        Ok(())
    }

    /// Insert and remove a sentinel row to prove the file is writable
    ///
    /// Runs in one IMMEDIATE transaction: the write lock (and the busy wait
    /// that comes with it) is taken before `sqlite_sequence` is read. The
    /// AUTOINCREMENT counter is put back to its prior value afterwards so the
    /// sentinel never consumes a visible id.
    fn write_self_test(conn: &mut Connection) -> Result<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Write self-test could not take the write lock")?;

        let prior_seq: Option<i64> = tx
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = 'expenses'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        tx.execute(
            "INSERT OR IGNORE INTO expenses (date, amount, category) VALUES (?1, 0, ?2)",
            params![SENTINEL_DATE, SENTINEL_CATEGORY],
        )
        .context("Write self-test failed")?;
        let removed = tx.execute("DELETE FROM expenses WHERE category = ?1", [SENTINEL_CATEGORY])?;

        match prior_seq {
            Some(seq) => {
                tx.execute("UPDATE sqlite_sequence SET seq = ?1 WHERE name = 'expenses'", [seq])?;
            }
            None => {
                tx.execute("DELETE FROM sqlite_sequence WHERE name = 'expenses'", [])?;
            }
        }

        tx.commit().context("Write self-test failed to commit")?;
        debug!(removed, "Write self-test passed");

        Ok(())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Append one expense, returning its newly assigned id
    pub fn add(&self, expense: &NewExpense) -> Result<i64> {
        let conn = self.connect()?;

        conn.execute(
            "INSERT INTO expenses (date, amount, category, subcategory, note)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                expense.date,
                expense.amount,
                expense.category,
                expense.subcategory,
                expense.note
            ],
        )
        .context("Failed to insert expense")?;

        let id = conn.last_insert_rowid();
        debug!(id, date = %expense.date, category = %expense.category, "Expense added");

        Ok(id)
    }

    /// All expenses in the inclusive range, newest date first, then newest id
    pub fn list(&self, range: &DateRange) -> Result<Vec<Expense>> {
        let conn = self.connect()?;
        let (clause, args) = range.where_clause();

        let mut stmt = conn.prepare(&format!(
            "SELECT id, date, amount, category, subcategory, note
             FROM expenses
             WHERE {}
             ORDER BY date DESC, id DESC",
            clause
        ))?;

        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok(Expense {
                id: row.get(0)?,
                date: row.get(1)?,
                amount: row.get(2)?,
                category: row.get(3)?,
                subcategory: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                note: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })?;

        let mut results = Vec::new();
        for row_result in rows {
            results.push(row_result.context("Failed to read expense row")?);
        }
        debug!(range = %range, count = results.len(), "Listed expenses");

        Ok(results)
    }

    /// Totals per category, largest total first; ties broken by category name
    pub fn summarize(&self, filter: &SummaryFilter) -> Result<Vec<CategorySummary>> {
        let conn = self.connect()?;
        let (clause, args) = filter.where_clause();

        let mut stmt = conn.prepare(&format!(
            "SELECT category, SUM(amount) AS total, COUNT(*) AS count
             FROM expenses
             WHERE {}
             GROUP BY category
             ORDER BY total DESC, category ASC",
            clause
        ))?;

        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok(CategorySummary {
                category: row.get(0)?,
                total: row.get(1)?,
                count: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row_result in rows {
            results.push(row_result.context("Failed to read summary row")?);
        }
        debug!(range = %filter.range, category = ?filter.category, groups = results.len(), "Summarized expenses");

        Ok(results)
    }
}
