// Expense Ledger - Core Library
// URI-addressed data-access layer over the expense store, for use in the
// CLI and tests

pub mod contract;
pub mod db;
pub mod error;
pub mod matcher;
pub mod router;

// Re-export commonly used types
pub use contract::{ResourceUri, RowValues, AUTHORITY};
pub use db::{
    add_category, add_expense, find_category_by_name, import_expenses, list_categories,
    list_expenses_with_categories, load_csv, setup_database, sum_for_date, sum_for_range,
    Category, CsvExpense, Expense, ExpenseWithCategory, DATE_FORMAT, SCHEMA_VERSION,
};
pub use error::RouterError;
pub use matcher::{match_uri, ResourceKind};
pub use router::{ExpenseRouter, Table};

/// Store-native dynamic cell type, re-exported for callers building
/// selection arguments and row values.
pub use rusqlite::types::Value;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
