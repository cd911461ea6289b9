//! Error types for streamwatch-inventory

use thiserror::Error;

/// Errors that can occur while reading the stream inventory.
///
/// Every variant is fatal for the current cycle only; the scheduler logs it
/// and tries again on the next tick.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// One or more required configuration variables are not set
    #[error("missing required inventory configuration: {}", vars.join(", "))]
    MissingConfig { vars: Vec<String> },

    /// A configuration value is present but unusable
    #[error("invalid inventory configuration: {0}")]
    InvalidConfig(String),

    /// Database connection error
    #[error("inventory connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("inventory query failed: {0}")]
    Query(String),

    /// A row could not be mapped onto a stream record
    #[error("failed to decode stream record: {0}")]
    Decode(String),

    /// Inventory file could not be read
    #[error("inventory io error: {0}")]
    Io(#[from] std::io::Error),

    /// Inventory file is not a valid JSON stream list
    #[error("inventory json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio_postgres::Error> for InventoryError {
    fn from(err: tokio_postgres::Error) -> Self {
        InventoryError::Query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_every_variable() {
        let err = InventoryError::MissingConfig {
            vars: vec!["POSTGRES_USER".to_string(), "POSTGRES_DB".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("POSTGRES_USER"));
        assert!(msg.contains("POSTGRES_DB"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: InventoryError = parse.into();
        assert!(matches!(err, InventoryError::Json(_)));
    }
}
