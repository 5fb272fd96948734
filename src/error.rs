// Router Error Taxonomy
// Every rejection the router manufactures, plus the store pass-through

use thiserror::Error;

/// Errors produced by the resource router.
///
/// The first three variants are rejections this layer manufactures before
/// touching the store; `StoreFailure` is whatever SQLite reported, passed
/// through unretried. Each manufactured variant carries the offending
/// resource identifier so a caller can render a meaningful message.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The identifier matches none of the known path patterns.
    #[error("unknown resource `{uri}`")]
    UnknownResource { uri: String },

    /// An item-style path carried a missing, malformed, or out-of-range
    /// numeric id segment.
    #[error("invalid row id in resource `{uri}`")]
    InvalidResourceId { uri: String },

    /// The verb/kind combination is forbidden by the mutation policy.
    #[error("{verb} is not supported on `{uri}`")]
    UnsupportedMutation { verb: &'static str, uri: String },

    /// Underlying store I/O, locking, or corruption error.
    #[error("store failure: {0}")]
    StoreFailure(#[from] rusqlite::Error),
}

impl RouterError {
    pub fn unknown_resource(uri: impl ToString) -> Self {
        RouterError::UnknownResource {
            uri: uri.to_string(),
        }
    }

    pub fn invalid_id(uri: impl ToString) -> Self {
        RouterError::InvalidResourceId {
            uri: uri.to_string(),
        }
    }

    pub fn unsupported(verb: &'static str, uri: impl ToString) -> Self {
        RouterError::UnsupportedMutation {
            verb,
            uri: uri.to_string(),
        }
    }

    /// The resource identifier the error was raised for, if the error
    /// carries one (`StoreFailure` does not).
    pub fn resource(&self) -> Option<&str> {
        match self {
            RouterError::UnknownResource { uri }
            | RouterError::InvalidResourceId { uri }
            | RouterError::UnsupportedMutation { uri, .. } => Some(uri),
            RouterError::StoreFailure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_resource() {
        let err = RouterError::unknown_resource("expense-ledger/unknown");
        assert_eq!(
            err.to_string(),
            "unknown resource `expense-ledger/unknown`"
        );
        assert_eq!(err.resource(), Some("expense-ledger/unknown"));

        let err = RouterError::unsupported("insert", "expense-ledger/expenses/4");
        assert_eq!(
            err.to_string(),
            "insert is not supported on `expense-ledger/expenses/4`"
        );
    }

    #[test]
    fn test_store_failure_wraps_sqlite_error() {
        let err = RouterError::from(rusqlite::Error::InvalidQuery);
        assert!(matches!(err, RouterError::StoreFailure(_)));
        assert_eq!(err.resource(), None);
    }
}
