// Resource Matcher
// Classifies a resource identifier into one of the nine operation kinds

use crate::contract::{
    self, ResourceUri, AUTHORITY, CONTENT_TYPE_CATEGORIES, CONTENT_TYPE_CATEGORY_ITEM,
    CONTENT_TYPE_EXPENSES, CONTENT_TYPE_EXPENSE_ITEM, CONTENT_TYPE_JOINED, DATE_RANGE_SEGMENT,
    DATE_SEGMENT, JOINED_PATH, SUM_SEGMENT,
};

// ============================================================================
// OPERATION KIND
// ============================================================================

/// The closed set of operations a resource identifier can resolve to.
///
/// Dispatch over this enum is the router's entire control flow; there is no
/// extensibility beyond these nine kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    CategoryCollection,
    CategoryItem,
    ExpenseCollection,
    ExpenseItem,
    JoinedView,
    JoinedViewByDate,
    JoinedViewByDateRange,
    SumByDate,
    SumByDateRange,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::CategoryCollection => "CategoryCollection",
            ResourceKind::CategoryItem => "CategoryItem",
            ResourceKind::ExpenseCollection => "ExpenseCollection",
            ResourceKind::ExpenseItem => "ExpenseItem",
            ResourceKind::JoinedView => "JoinedView",
            ResourceKind::JoinedViewByDate => "JoinedViewByDate",
            ResourceKind::JoinedViewByDateRange => "JoinedViewByDateRange",
            ResourceKind::SumByDate => "SumByDate",
            ResourceKind::SumByDateRange => "SumByDateRange",
        }
    }

    /// Single-row kinds, addressed by a trailing numeric id segment.
    pub fn is_item(&self) -> bool {
        matches!(self, ResourceKind::CategoryItem | ResourceKind::ExpenseItem)
    }

    /// Read-only join/aggregate kinds. Query is the only legal verb.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            ResourceKind::JoinedView
                | ResourceKind::JoinedViewByDate
                | ResourceKind::JoinedViewByDateRange
                | ResourceKind::SumByDate
                | ResourceKind::SumByDateRange
        )
    }

    /// Content-type string for collaborators that branch on result shape.
    /// Derived kinds share one collection type; they have no stable row
    /// identity and are never item-typed.
    pub fn content_type(&self) -> &'static str {
        match self {
            ResourceKind::CategoryCollection => CONTENT_TYPE_CATEGORIES,
            ResourceKind::CategoryItem => CONTENT_TYPE_CATEGORY_ITEM,
            ResourceKind::ExpenseCollection => CONTENT_TYPE_EXPENSES,
            ResourceKind::ExpenseItem => CONTENT_TYPE_EXPENSE_ITEM,
            ResourceKind::JoinedView
            | ResourceKind::JoinedViewByDate
            | ResourceKind::JoinedViewByDateRange
            | ResourceKind::SumByDate
            | ResourceKind::SumByDateRange => CONTENT_TYPE_JOINED,
        }
    }
}

// ============================================================================
// MATCHING
// ============================================================================

/// Classify an identifier, or `None` when it matches no known pattern.
///
/// Matching is exact on authority and on segment shape: the bare collection
/// path, the collection path plus one all-digit segment, or one of the four
/// fixed view/aggregate suffixes under the joined path. No prefix or partial
/// matches.
pub fn match_uri(uri: &ResourceUri) -> Option<ResourceKind> {
    if uri.authority() != AUTHORITY {
        return None;
    }

    let segments = uri.segments();
    match segments {
        [first] if first == contract::categories::PATH => Some(ResourceKind::CategoryCollection),
        [first] if first == contract::expenses::PATH => Some(ResourceKind::ExpenseCollection),
        [first] if first == JOINED_PATH => Some(ResourceKind::JoinedView),

        [first, id] if first == contract::categories::PATH && is_numeric_segment(id) => {
            Some(ResourceKind::CategoryItem)
        }
        [first, id] if first == contract::expenses::PATH && is_numeric_segment(id) => {
            Some(ResourceKind::ExpenseItem)
        }

        [first, second] if first == JOINED_PATH && second == DATE_SEGMENT => {
            Some(ResourceKind::JoinedViewByDate)
        }
        [first, second] if first == JOINED_PATH && second == DATE_RANGE_SEGMENT => {
            Some(ResourceKind::JoinedViewByDateRange)
        }
        [first, second, third]
            if first == JOINED_PATH && second == DATE_SEGMENT && third == SUM_SEGMENT =>
        {
            Some(ResourceKind::SumByDate)
        }
        [first, second, third]
            if first == JOINED_PATH && second == DATE_RANGE_SEGMENT && third == SUM_SEGMENT =>
        {
            Some(ResourceKind::SumByDateRange)
        }

        _ => None,
    }
}

/// One or more ASCII digits. Whether the digits fit in an i64 is checked at
/// execution time, not here.
fn is_numeric_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
