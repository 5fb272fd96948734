// Schema Manager & Row Models
// Owns the table definitions and store creation/upgrade, plus the typed row
// models and convenience helpers the CLI works with

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::contract::{self, ResourceUri, RowValues};
use crate::router::{ExpenseRouter, Table};

/// Bumping this drops and recreates the tables on the next open.
pub const SCHEMA_VERSION: i32 = 1;

/// Store-native date form: ISO-8601 text, lexicographically comparable.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Referential integrity lives here, not in the router: every expense
    // must reference an existing category.
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // Upgrade policy is drop-and-recreate. Version 0 is a fresh store
    // where the drops are no-ops.
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.execute_batch(
            "DROP TABLE IF EXISTS expenses;
             DROP TABLE IF EXISTS categories;",
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) > 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            value REAL NOT NULL,
            category_id INTEGER NOT NULL REFERENCES categories (id),
            date TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses (date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses (category_id)",
        [],
    )?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    Ok(())
}

// ============================================================================
// ROW MODELS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub value: f64,
    pub category_id: i64,
    pub date: NaiveDate,
}

/// One row of the joined read-only view: the expense plus the name of its
/// category. Never persisted separately, never mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseWithCategory {
    pub id: i64,
    pub value: f64,
    pub category_name: String,
    pub date: NaiveDate,
}

// ============================================================================
// TYPED HELPERS
// Thin typed layer over the router for collaborators that want structs
// instead of tabular rows
// ============================================================================

/// Insert a category, returning its store-assigned id.
pub fn add_category(router: &ExpenseRouter, name: &str) -> Result<i64> {
    let values = RowValues::new().set(contract::categories::NAME, name.to_string());
    let uri = router
        .insert(&ResourceUri::categories(), &values)?
        .context("store rejected the category insert")?;
    id_from_item_uri(&uri)
}

/// Insert an expense, returning its store-assigned id.
pub fn add_expense(
    router: &ExpenseRouter,
    value: f64,
    category_id: i64,
    date: NaiveDate,
) -> Result<i64> {
    let values = RowValues::new()
        .set(contract::expenses::VALUE, value)
        .set(contract::expenses::CATEGORY_ID, category_id)
        .set(
            contract::expenses::DATE,
            date.format(DATE_FORMAT).to_string(),
        );
    let uri = router
        .insert(&ResourceUri::expenses(), &values)?
        .context("store rejected the expense insert")?;
    id_from_item_uri(&uri)
}

/// All categories in their default order.
pub fn list_categories(router: &ExpenseRouter) -> Result<Vec<Category>> {
    let table = router.query(&ResourceUri::categories(), None, None, &[], None)?;

    let mut categories = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        categories.push(Category {
            id: require_i64(&table, row, contract::categories::ID)?,
            name: require_text(&table, row, contract::categories::NAME)?,
        });
    }
    Ok(categories)
}

/// The joined view, in store-native order.
pub fn list_expenses_with_categories(router: &ExpenseRouter) -> Result<Vec<ExpenseWithCategory>> {
    let table = router.query(
        &ResourceUri::expenses_with_categories(),
        None,
        None,
        &[],
        None,
    )?;

    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        rows.push(ExpenseWithCategory {
            id: require_i64(&table, row, contract::expenses::ID)?,
            value: require_f64(&table, row, contract::expenses::VALUE)?,
            category_name: require_text(&table, row, contract::categories::NAME)?,
            date: parse_date(&require_text(&table, row, contract::expenses::DATE)?)?,
        });
    }
    Ok(rows)
}

/// Sum of expense values on one date. `None` when no expense matches.
pub fn sum_for_date(router: &ExpenseRouter, date: NaiveDate) -> Result<Option<f64>> {
    let table = router.query(
        &ResourceUri::sum_by_date(),
        None,
        None,
        &[Value::Text(date.format(DATE_FORMAT).to_string())],
        None,
    )?;
    read_sum(&table)
}

/// Sum of expense values over an inclusive date range.
pub fn sum_for_range(router: &ExpenseRouter, from: NaiveDate, to: NaiveDate) -> Result<Option<f64>> {
    let table = router.query(
        &ResourceUri::sum_by_date_range(),
        None,
        None,
        &[
            Value::Text(from.format(DATE_FORMAT).to_string()),
            Value::Text(to.format(DATE_FORMAT).to_string()),
        ],
        None,
    )?;
    read_sum(&table)
}

/// Look up a category id by exact name.
pub fn find_category_by_name(router: &ExpenseRouter, name: &str) -> Result<Option<i64>> {
    let table = router.query(
        &ResourceUri::categories(),
        Some(&[contract::categories::ID]),
        Some("name = ?1"),
        &[Value::Text(name.to_string())],
        None,
    )?;
    if table.is_empty() {
        return Ok(None);
    }
    Ok(Some(require_i64(&table, 0, contract::categories::ID)?))
}

fn find_or_create_category(router: &ExpenseRouter, name: &str) -> Result<i64> {
    match find_category_by_name(router, name)? {
        Some(id) => Ok(id),
        None => add_category(router, name),
    }
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One imported line: `value,category,date`.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvExpense {
    pub value: f64,
    pub category: String,
    pub date: NaiveDate,
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<CsvExpense>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: CsvExpense = result.context("Failed to deserialize expense record")?;
        records.push(record);
    }

    Ok(records)
}

/// Insert the records through the router, creating each missing category
/// once. Returns the number of expenses inserted.
pub fn import_expenses(router: &ExpenseRouter, records: &[CsvExpense]) -> Result<usize> {
    let mut inserted = 0;

    for record in records {
        let category_id = find_or_create_category(router, &record.category)?;
        add_expense(router, record.value, category_id, record.date)?;
        inserted += 1;
    }

    Ok(inserted)
}

// ============================================================================
// CELL READERS
// ============================================================================

fn id_from_item_uri(uri: &ResourceUri) -> Result<i64> {
    uri.last_segment()
        .and_then(|s| s.parse::<i64>().ok())
        .with_context(|| format!("insert returned a non-item resource `{uri}`"))
}

fn cell<'t>(table: &'t Table, row: usize, column: &str) -> Result<&'t Value> {
    table
        .value(row, column)
        .with_context(|| format!("missing column `{column}` in row {row}"))
}

fn require_i64(table: &Table, row: usize, column: &str) -> Result<i64> {
    match cell(table, row, column)? {
        Value::Integer(v) => Ok(*v),
        other => bail!("column `{column}` is not an integer: {other:?}"),
    }
}

fn require_f64(table: &Table, row: usize, column: &str) -> Result<f64> {
    match cell(table, row, column)? {
        Value::Real(v) => Ok(*v),
        Value::Integer(v) => Ok(*v as f64),
        other => bail!("column `{column}` is not numeric: {other:?}"),
    }
}

fn require_text(table: &Table, row: usize, column: &str) -> Result<String> {
    match cell(table, row, column)? {
        Value::Text(v) => Ok(v.clone()),
        other => bail!("column `{column}` is not text: {other:?}"),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .with_context(|| format!("malformed stored date `{text}`"))
}

/// The sum queries always return exactly one row with one scalar column;
/// SQL `SUM` over zero rows is NULL, surfaced here as `None`.
fn read_sum(table: &Table) -> Result<Option<f64>> {
    match cell(table, 0, contract::expenses::VALUES_SUM)? {
        Value::Null => Ok(None),
        Value::Real(v) => Ok(Some(*v)),
        Value::Integer(v) => Ok(Some(*v as f64)),
        other => bail!("sum column is not numeric: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_schema_enforces_references_and_non_empty_names() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        // Empty category name violates the CHECK constraint.
        assert!(conn
            .execute("INSERT INTO categories (name) VALUES ('')", [])
            .is_err());

        // An expense must reference an existing category.
        assert!(conn
            .execute(
                "INSERT INTO expenses (value, category_id, date) VALUES (1.0, 999, '2024-01-01')",
                [],
            )
            .is_err());
    }

    #[test]
    fn test_typed_helpers_round_trip() {
        let router = ExpenseRouter::open_in_memory().unwrap();

        let groceries = add_category(&router, "Groceries").unwrap();
        let dining = add_category(&router, "Dining").unwrap();
        add_expense(&router, 12.5, groceries, date("2024-01-01")).unwrap();
        add_expense(&router, 30.0, dining, date("2024-01-02")).unwrap();

        let categories = list_categories(&router).unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dining", "Groceries"]);

        let rows = list_expenses_with_categories(&router).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .any(|r| r.category_name == "Groceries" && r.value == 12.5));

        assert_eq!(
            sum_for_date(&router, date("2024-01-01")).unwrap(),
            Some(12.5)
        );
        assert_eq!(
            sum_for_range(&router, date("2024-01-01"), date("2024-01-02")).unwrap(),
            Some(42.5)
        );
        assert_eq!(sum_for_date(&router, date("2024-03-01")).unwrap(), None);
    }

    #[test]
    fn test_find_category_by_name() {
        let router = ExpenseRouter::open_in_memory().unwrap();
        let id = add_category(&router, "Travel").unwrap();

        assert_eq!(find_category_by_name(&router, "Travel").unwrap(), Some(id));
        assert_eq!(find_category_by_name(&router, "Absent").unwrap(), None);
    }

    #[test]
    fn test_csv_import_creates_categories_once() {
        let router = ExpenseRouter::open_in_memory().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value,category,date").unwrap();
        writeln!(file, "10.0,Groceries,2024-01-01").unwrap();
        writeln!(file, "5.5,Groceries,2024-01-01").unwrap();
        writeln!(file, "1.0,Dining,2024-01-02").unwrap();
        file.flush().unwrap();

        let records = load_csv(file.path()).unwrap();
        assert_eq!(records.len(), 3);

        let inserted = import_expenses(&router, &records).unwrap();
        assert_eq!(inserted, 3);

        // "Groceries" was created once, not per record.
        assert_eq!(list_categories(&router).unwrap().len(), 2);
        assert_eq!(
            sum_for_date(&router, date("2024-01-01")).unwrap(),
            Some(15.5)
        );
    }

    #[test]
    fn test_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.db");

        {
            let router = ExpenseRouter::open(&path).unwrap();
            let id = add_category(&router, "Groceries").unwrap();
            add_expense(&router, 3.0, id, date("2024-01-01")).unwrap();
        }

        let router = ExpenseRouter::open(&path).unwrap();
        assert_eq!(list_expenses_with_categories(&router).unwrap().len(), 1);
    }

    #[test]
    fn test_version_bump_drops_and_recreates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.db");

        {
            let router = ExpenseRouter::open(&path).unwrap();
            add_category(&router, "Groceries").unwrap();
        }

        // Rewind the stored version to simulate an older layout.
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 0).unwrap();
        }

        let router = ExpenseRouter::open(&path).unwrap();
        assert!(list_categories(&router).unwrap().is_empty());
    }
}
