//! Error types for chainsql

use thiserror::Error;

/// Result type alias for chainsql operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Error types for statement building, execution and the connection registry
#[derive(Debug, Error)]
pub enum ChainError {
    /// Invalid or incomplete configuration
    #[error("{0}")]
    Config(String),

    /// The database could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// `insert`/`update` called without a data payload
    #[error("Data missing first parameter.")]
    MissingData,

    /// Data payload has the wrong shape for the statement kind
    #[error("Data type error, {location} parameter must be {expected}.")]
    Shape {
        location: &'static str,
        expected: &'static str,
    },

    /// LIMIT on UPDATE/DELETE is not a bare row count
    #[error("Limit type error, must be an integer.")]
    LimitNotInteger,

    /// The database reported a failure while running a statement
    #[error("SQL_STATE: {code}, ERROR_INFO: {message}, SQL: {sql}.")]
    Execution {
        code: String,
        message: String,
        sql: String,
    },

    /// Unknown registry key
    #[error("Database[{0}] not found.")]
    NotFound(String),

    /// Row/aggregate decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ChainError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub(crate) fn must_be_array(location: &'static str) -> Self {
        Self::Shape {
            location,
            expected: "an array",
        }
    }

    pub(crate) fn must_be_assoc(location: &'static str) -> Self {
        Self::Shape {
            location,
            expected: "an associative array",
        }
    }

    pub(crate) fn must_be_list(location: &'static str) -> Self {
        Self::Shape {
            location,
            expected: "a normal array",
        }
    }

    /// Attach the failing SQL text to a driver error.
    pub fn execution(err: DriverError, sql: impl Into<String>) -> Self {
        Self::Execution {
            code: err.code,
            message: err.message,
            sql: sql.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error was raised before anything reached the database
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingData | Self::Shape { .. } | Self::LimitNotInteger
        )
    }

    /// Check if the database rejected the statement
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Error state reported by a database backend: a status code and a message.
///
/// Backends convert their native errors into this at the [`Connection`](crate::Connection)
/// boundary; the gateway then attaches the SQL text via [`ChainError::execution`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct DriverError {
    pub code: String,
    pub message: String,
}

impl DriverError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message) => Self {
                code: format!("{:?}", code.code),
                message: message.clone().unwrap_or_else(|| code.to_string()),
            },
            _ => Self {
                code: "HY000".to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_messages_name_location() {
        assert_eq!(
            ChainError::must_be_array("the first").to_string(),
            "Data type error, the first parameter must be an array."
        );
        assert_eq!(
            ChainError::must_be_assoc("the first").to_string(),
            "Data type error, the first parameter must be an associative array."
        );
        assert_eq!(
            ChainError::must_be_list("the element of the second").to_string(),
            "Data type error, the element of the second parameter must be a normal array."
        );
    }

    #[test]
    fn execution_message_carries_sql() {
        let err = ChainError::execution(
            DriverError::new("42S02", "no such table: nope"),
            "SELECT * FROM `nope`",
        );
        assert_eq!(
            err.to_string(),
            "SQL_STATE: 42S02, ERROR_INFO: no such table: nope, SQL: SELECT * FROM `nope`."
        );
        assert!(err.is_execution());
        assert!(!err.is_validation());
    }

    #[test]
    fn not_found_message() {
        let err = ChainError::not_found("2");
        assert_eq!(err.to_string(), "Database[2] not found.");
        assert!(err.is_not_found());
    }
}
