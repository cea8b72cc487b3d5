//! Error types for ksql.

use thiserror::Error;

/// The main error type for ksql operations.
#[derive(Debug, Error)]
pub enum KsqlError {
    /// The AST contains a node or method the compiler cannot express.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The query chain is structurally invalid (no source, duplicated clause, ...).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The response header was missing or malformed.
    #[error("Invalid response header: {0}")]
    Header(String),

    /// A response row could not be turned into the requested type.
    #[error("Invalid row: {0}")]
    Row(String),

    /// The server reported an error in the middle of a response.
    #[error("Query error {error_code}: {message}")]
    Query { message: String, error_code: i64 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KsqlError {
    /// Create an unsupported-operation error naming the construct.
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported(construct.into())
    }

    /// Create an invalid-query error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Create a query error from a server error row.
    pub fn query(message: impl Into<String>, error_code: i64) -> Self {
        Self::Query {
            message: message.into(),
            error_code,
        }
    }
}

/// Result type alias for ksql operations.
pub type KsqlResult<T> = Result<T, KsqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KsqlError::unsupported("method 'PadLeft'");
        assert_eq!(err.to_string(), "Unsupported operation: method 'PadLeft'");

        let err = KsqlError::query("Line: 1, Col: 8: no such column", 40001);
        assert_eq!(
            err.to_string(),
            "Query error 40001: Line: 1, Col: 8: no such column"
        );
    }
}
