// Resource Router
// Maps resource identifiers to table operations: compiles and runs the
// queries, and enforces the per-kind mutation policy

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

use crate::contract::{self, ResourceUri, RowValues, CATEGORIES_TABLE, EXPENSES_TABLE};
use crate::db;
use crate::error::RouterError;
use crate::matcher::{match_uri, ResourceKind};

/*
 * SELECT expenses.id, expenses.value, categories.name, expenses.date
 * FROM expenses JOIN categories
 * ON expenses.category_id = categories.id
 */
const SELECT_EXPENSES_WITH_CATEGORIES: &str =
    "SELECT expenses.id, expenses.value, categories.name, expenses.date \
     FROM expenses JOIN categories ON expenses.category_id = categories.id";

const SELECT_EXPENSE_VALUES_SUM: &str =
    "SELECT SUM(expenses.value) AS values_sum FROM expenses";

// ============================================================================
// TABULAR RESULT
// ============================================================================

/// The tabular-cursor result of `query`: column names plus rows of
/// store-native values.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// The URI-addressed query/mutation interface over the expense store.
///
/// One owned connection, acquired at construction and borrowed per call;
/// SQLite's WAL mode provides the write serialization. Every operation is a
/// single blocking statement — no transactions, no retries, no local
/// recovery.
pub struct ExpenseRouter {
    conn: Connection,
}

impl ExpenseRouter {
    /// Open (creating or upgrading the schema as needed) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RouterError> {
        let conn = Connection::open(path)?;
        db::setup_database(&conn)?;
        Ok(ExpenseRouter { conn })
    }

    /// In-memory store, mainly for tests.
    pub fn open_in_memory() -> Result<Self, RouterError> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;
        Ok(ExpenseRouter { conn })
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Read rows addressed by `uri`.
    ///
    /// Collection scans honor the caller's projection/selection/sort and
    /// fall back to the entity's default sort order. Item reads force the
    /// selection to the path id, ignoring any caller selection. The five
    /// derived kinds run their fixed parametrized queries and bind only
    /// `selection_args`.
    pub fn query(
        &self,
        uri: &ResourceUri,
        projection: Option<&[&str]>,
        selection: Option<&str>,
        selection_args: &[Value],
        sort_order: Option<&str>,
    ) -> Result<Table, RouterError> {
        match self.kind_for(uri)? {
            ResourceKind::CategoryCollection => {
                let order = order_or_default(sort_order, contract::categories::DEFAULT_SORT_ORDER);
                self.scan(
                    CATEGORIES_TABLE,
                    projection,
                    selection,
                    selection_args,
                    Some(order),
                )
            }
            ResourceKind::ExpenseCollection => {
                let order = order_or_default(sort_order, contract::expenses::DEFAULT_SORT_ORDER);
                self.scan(
                    EXPENSES_TABLE,
                    projection,
                    selection,
                    selection_args,
                    Some(order),
                )
            }
            // The id in the path takes precedence over any caller selection.
            ResourceKind::CategoryItem => {
                let id = item_id(uri)?;
                self.scan(
                    CATEGORIES_TABLE,
                    projection,
                    Some("id = ?1"),
                    &[Value::Integer(id)],
                    sort_order,
                )
            }
            ResourceKind::ExpenseItem => {
                let id = item_id(uri)?;
                self.scan(
                    EXPENSES_TABLE,
                    projection,
                    Some("id = ?1"),
                    &[Value::Integer(id)],
                    sort_order,
                )
            }
            ResourceKind::JoinedView => self.run_select(SELECT_EXPENSES_WITH_CATEGORIES, &[]),
            ResourceKind::JoinedViewByDate => {
                let sql = format!(
                    "{SELECT_EXPENSES_WITH_CATEGORIES} WHERE expenses.date = ?1"
                );
                self.run_select(&sql, selection_args)
            }
            ResourceKind::JoinedViewByDateRange => {
                let sql = format!(
                    "{SELECT_EXPENSES_WITH_CATEGORIES} WHERE expenses.date BETWEEN ?1 AND ?2"
                );
                self.run_select(&sql, selection_args)
            }
            ResourceKind::SumByDate => {
                let sql = format!("{SELECT_EXPENSE_VALUES_SUM} WHERE expenses.date = ?1");
                self.run_select(&sql, selection_args)
            }
            ResourceKind::SumByDateRange => {
                let sql =
                    format!("{SELECT_EXPENSE_VALUES_SUM} WHERE expenses.date BETWEEN ?1 AND ?2");
                self.run_select(&sql, selection_args)
            }
        }
    }

    /// Insert a row at a collection path. Returns the item identifier of
    /// the new row, or `None` when the store reports a non-positive row id.
    ///
    /// Ids are store-assigned: a caller-supplied `id` column is stripped,
    /// and inserting at an item path is rejected outright.
    pub fn insert(
        &self,
        uri: &ResourceUri,
        values: &RowValues,
    ) -> Result<Option<ResourceUri>, RouterError> {
        let (table, collection) = match self.kind_for(uri)? {
            ResourceKind::CategoryCollection => (CATEGORIES_TABLE, ResourceUri::categories()),
            ResourceKind::ExpenseCollection => (EXPENSES_TABLE, ResourceUri::expenses()),
            _ => return Err(RouterError::unsupported("insert", uri)),
        };

        let values = values.without("id");
        let (sql, args) = if values.is_empty() {
            (format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new())
        } else {
            let columns: Vec<&str> = values.iter().map(|(column, _)| column).collect();
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            );
            let args: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
            (sql, args)
        };

        self.conn.execute(&sql, params_from_iter(args.iter()))?;

        let new_row_id = self.conn.last_insert_rowid();
        Ok((new_row_id >= 1).then(|| collection.with_appended_id(new_row_id)))
    }

    /// Update the single row addressed by an item path; the path id always
    /// wins, so the caller's selection and arguments are ignored. Bulk
    /// update is forbidden for every kind. Returns the affected-row count.
    pub fn update(
        &self,
        uri: &ResourceUri,
        values: &RowValues,
        _selection: Option<&str>,
        _selection_args: &[Value],
    ) -> Result<usize, RouterError> {
        let table = match self.kind_for(uri)? {
            ResourceKind::CategoryItem => CATEGORIES_TABLE,
            ResourceKind::ExpenseItem => EXPENSES_TABLE,
            _ => return Err(RouterError::unsupported("update", uri)),
        };
        let id = item_id(uri)?;

        if values.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(values.len());
        let mut args = Vec::with_capacity(values.len() + 1);
        for (i, (column, value)) in values.iter().enumerate() {
            assignments.push(format!("{column} = ?{}", i + 1));
            args.push(value.clone());
        }
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{}",
            assignments.join(", "),
            args.len() + 1
        );
        args.push(Value::Integer(id));

        Ok(self.conn.execute(&sql, params_from_iter(args.iter()))?)
    }

    /// Delete rows addressed by `uri`, returning the affected-row count.
    ///
    /// Item paths delete exactly the addressed row. The expense collection
    /// permits bulk delete (honoring a caller selection; none removes every
    /// row); the category collection never does — categories are reference
    /// data other rows depend on.
    pub fn delete(
        &self,
        uri: &ResourceUri,
        selection: Option<&str>,
        selection_args: &[Value],
    ) -> Result<usize, RouterError> {
        match self.kind_for(uri)? {
            ResourceKind::CategoryItem => self.delete_by_id(CATEGORIES_TABLE, uri),
            ResourceKind::ExpenseItem => self.delete_by_id(EXPENSES_TABLE, uri),
            ResourceKind::ExpenseCollection => {
                let mut sql = format!("DELETE FROM {EXPENSES_TABLE}");
                if let Some(filter) = selection.filter(|s| !s.is_empty()) {
                    sql.push_str(" WHERE ");
                    sql.push_str(filter);
                }
                Ok(self
                    .conn
                    .execute(&sql, params_from_iter(selection_args.iter()))?)
            }
            _ => Err(RouterError::unsupported("delete", uri)),
        }
    }

    /// Content-type of the resource, or `None` when the identifier is
    /// unmatched. Unlike the other entry points this never errors.
    pub fn resolve_type(&self, uri: &ResourceUri) -> Option<&'static str> {
        match_uri(uri).map(|kind| kind.content_type())
    }

    // ------------------------------------------------------------------
    // Compilation & execution
    // ------------------------------------------------------------------

    fn kind_for(&self, uri: &ResourceUri) -> Result<ResourceKind, RouterError> {
        match_uri(uri).ok_or_else(|| RouterError::unknown_resource(uri))
    }

    /// Generic single-table scan. Projection, selection, and sort order are
    /// trusted query fragments; only `args` travel as bound parameters.
    fn scan(
        &self,
        table: &str,
        projection: Option<&[&str]>,
        selection: Option<&str>,
        args: &[Value],
        sort_order: Option<&str>,
    ) -> Result<Table, RouterError> {
        let columns = match projection.filter(|p| !p.is_empty()) {
            Some(p) => p.join(", "),
            None => "*".to_string(),
        };

        let mut sql = format!("SELECT {columns} FROM {table}");
        if let Some(filter) = selection.filter(|s| !s.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let Some(order) = sort_order.filter(|s| !s.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        self.run_select(&sql, args)
    }

    fn run_select(&self, sql: &str, args: &[Value]) -> Result<Table, RouterError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut result = Vec::new();
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                record.push(row.get::<_, Value>(i)?);
            }
            result.push(record);
        }

        Ok(Table {
            columns,
            rows: result,
        })
    }

    fn delete_by_id(&self, table: &str, uri: &ResourceUri) -> Result<usize, RouterError> {
        let id = item_id(uri)?;
        let sql = format!("DELETE FROM {table} WHERE id = ?1");
        Ok(self
            .conn
            .execute(&sql, params_from_iter([Value::Integer(id)].iter()))?)
    }
}

fn order_or_default<'a>(sort_order: Option<&'a str>, default: &'a str) -> &'a str {
    match sort_order {
        Some(order) if !order.is_empty() => order,
        _ => default,
    }
}

/// Extract the numeric id segment of an item path. The matcher guarantees
/// the segment is all digits; digits that overflow i64 or name row 0 are
/// out of range.
fn item_id(uri: &ResourceUri) -> Result<i64, RouterError> {
    match uri.last_segment().and_then(|s| s.parse::<i64>().ok()) {
        Some(id) if id >= 1 => Ok(id),
        _ => Err(RouterError::invalid_id(uri)),
    }
}
