// Addressing Contract
// Authority, table/column names, content types, and the resource identifier
// syntax every collaborator addresses the router with

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value;

use crate::error::RouterError;

/// Authority every resource identifier must carry.
pub const AUTHORITY: &str = "expense-ledger";

// ============================================================================
// TABLES & COLUMNS
// ============================================================================

pub const CATEGORIES_TABLE: &str = "categories";
pub const EXPENSES_TABLE: &str = "expenses";

pub mod categories {
    /// Store-assigned row id.
    pub const ID: &str = "id";
    /// Category name, non-empty.
    pub const NAME: &str = "name";

    /// Applied when a collection scan supplies no sort order.
    pub const DEFAULT_SORT_ORDER: &str = "name ASC";

    /// Path segment under the authority.
    pub const PATH: &str = "categories";
}

pub mod expenses {
    /// Store-assigned row id.
    pub const ID: &str = "id";
    /// Decimal amount.
    pub const VALUE: &str = "value";
    /// Foreign key into categories, non-null.
    pub const CATEGORY_ID: &str = "category_id";
    /// ISO-8601 `YYYY-MM-DD` text, lexicographically comparable.
    pub const DATE: &str = "date";

    /// Name of the scalar column the sum queries project.
    pub const VALUES_SUM: &str = "values_sum";

    /// Applied when a collection scan supplies no sort order.
    /// Newest first; `id DESC` makes the order total within a day.
    pub const DEFAULT_SORT_ORDER: &str = "date DESC, id DESC";

    /// Path segment under the authority.
    pub const PATH: &str = "expenses";
}

/// Path segments for the derived read-only views.
pub const JOINED_PATH: &str = "expensesWithCategories";
pub const DATE_SEGMENT: &str = "date";
pub const DATE_RANGE_SEGMENT: &str = "dateRange";
pub const SUM_SEGMENT: &str = "sum";

// ============================================================================
// CONTENT TYPES
// ============================================================================

pub const CONTENT_TYPE_CATEGORIES: &str = "vnd.expense-ledger.dir/categories";
pub const CONTENT_TYPE_CATEGORY_ITEM: &str = "vnd.expense-ledger.item/category";
pub const CONTENT_TYPE_EXPENSES: &str = "vnd.expense-ledger.dir/expenses";
pub const CONTENT_TYPE_EXPENSE_ITEM: &str = "vnd.expense-ledger.item/expense";
/// Shared by all join/aggregate kinds; they have no stable row identity and
/// are therefore never item-typed.
pub const CONTENT_TYPE_JOINED: &str = "vnd.expense-ledger.dir/expenses-with-categories";

// ============================================================================
// RESOURCE IDENTIFIER
// ============================================================================

/// An opaque path-structured address: authority plus path segments, naming a
/// collection, a single row, or a derived view.
///
/// The textual form is `authority/segment[/segment...]`, e.g.
/// `expense-ledger/expenses/12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    authority: String,
    segments: Vec<String>,
}

impl ResourceUri {
    /// Build an identifier from an authority and path segments.
    pub fn new(authority: &str, segments: &[&str]) -> Self {
        ResourceUri {
            authority: authority.to_string(),
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse the textual form. Requires a non-empty authority and at least
    /// one non-empty path segment; anything else is rejected as unknown.
    pub fn parse(input: &str) -> Result<Self, RouterError> {
        let mut parts = input.split('/');
        let authority = parts.next().unwrap_or_default();
        let segments: Vec<String> = parts.map(|s| s.to_string()).collect();

        if authority.is_empty() || segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(RouterError::unknown_resource(input));
        }

        Ok(ResourceUri {
            authority: authority.to_string(),
            segments,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Derive an item identifier from a collection identifier.
    pub fn with_appended_id(&self, id: i64) -> Self {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        ResourceUri {
            authority: self.authority.clone(),
            segments,
        }
    }

    // ------------------------------------------------------------------
    // Builders for every addressable resource
    // ------------------------------------------------------------------

    pub fn categories() -> Self {
        Self::new(AUTHORITY, &[categories::PATH])
    }

    pub fn category(id: i64) -> Self {
        Self::categories().with_appended_id(id)
    }

    pub fn expenses() -> Self {
        Self::new(AUTHORITY, &[expenses::PATH])
    }

    pub fn expense(id: i64) -> Self {
        Self::expenses().with_appended_id(id)
    }

    pub fn expenses_with_categories() -> Self {
        Self::new(AUTHORITY, &[JOINED_PATH])
    }

    pub fn expenses_with_categories_by_date() -> Self {
        Self::new(AUTHORITY, &[JOINED_PATH, DATE_SEGMENT])
    }

    pub fn expenses_with_categories_by_date_range() -> Self {
        Self::new(AUTHORITY, &[JOINED_PATH, DATE_RANGE_SEGMENT])
    }

    pub fn sum_by_date() -> Self {
        Self::new(AUTHORITY, &[JOINED_PATH, DATE_SEGMENT, SUM_SEGMENT])
    }

    pub fn sum_by_date_range() -> Self {
        Self::new(AUTHORITY, &[JOINED_PATH, DATE_RANGE_SEGMENT, SUM_SEGMENT])
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.authority)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceUri {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceUri::parse(s)
    }
}

// ============================================================================
// ROW VALUES
// ============================================================================

/// Column/value pairs supplied to `insert` and `update`.
///
/// Column names are trusted fragments (they end up in the statement text);
/// the values always travel as bound parameters.
#[derive(Debug, Clone, Default)]
pub struct RowValues {
    entries: Vec<(String, Value)>,
}

impl RowValues {
    pub fn new() -> Self {
        RowValues::default()
    }

    /// Builder-style set; replaces an existing entry for the same column.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.put(column, value);
        self
    }

    pub fn put(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(c, _)| c == column) {
            entry.1 = value;
        } else {
            self.entries.push((column.to_string(), value));
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Copy without the named column. Insert uses this to drop any
    /// caller-supplied id; the store assigns ids.
    pub fn without(&self, column: &str) -> Self {
        RowValues {
            entries: self
                .entries
                .iter()
                .filter(|(c, _)| c != column)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let uri = ResourceUri::parse("expense-ledger/expenses/12").unwrap();
        assert_eq!(uri.authority(), AUTHORITY);
        assert_eq!(uri.segments(), &["expenses".to_string(), "12".to_string()]);
        assert_eq!(uri.to_string(), "expense-ledger/expenses/12");

        let parsed: ResourceUri = uri.to_string().parse().unwrap();
        assert_eq!(parsed, uri);
    }

    #[test]
    fn test_parse_rejects_degenerate_forms() {
        assert!(ResourceUri::parse("").is_err());
        assert!(ResourceUri::parse("expense-ledger").is_err());
        assert!(ResourceUri::parse("/categories").is_err());
        assert!(ResourceUri::parse("expense-ledger//categories").is_err());
    }

    #[test]
    fn test_builders_render_the_documented_paths() {
        assert_eq!(
            ResourceUri::categories().to_string(),
            "expense-ledger/categories"
        );
        assert_eq!(
            ResourceUri::expense(7).to_string(),
            "expense-ledger/expenses/7"
        );
        assert_eq!(
            ResourceUri::sum_by_date_range().to_string(),
            "expense-ledger/expensesWithCategories/dateRange/sum"
        );
    }

    #[test]
    fn test_row_values_replace_and_strip() {
        let mut values = RowValues::new()
            .set("name", "Groceries".to_string())
            .set("id", 99i64);
        values.put("name", "Dining".to_string());

        assert_eq!(values.len(), 2);
        assert_eq!(
            values.get("name"),
            Some(&Value::Text("Dining".to_string()))
        );

        let stripped = values.without("id");
        assert_eq!(stripped.len(), 1);
        assert!(stripped.get("id").is_none());
    }
}
