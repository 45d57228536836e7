use std::fmt;
use thiserror::Error;

/// Profile store operation that failed, carried inside `DbError::Storage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Open,
    Migrate,
    Create,
    Find,
    Delete,
}

impl StorageOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOp::Open => "open",
            StorageOp::Migrate => "migrate",
            StorageOp::Create => "create",
            StorageOp::Find => "find",
            StorageOp::Delete => "delete",
        }
    }
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection profile {0} not found")]
    ProfileNotFound(i64),

    #[error("unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("connection unreachable: {0}")]
    ConnectionUnreachable(String),

    #[error("no active database connection")]
    NoActiveConnection,

    #[error("column info unavailable: {0}")]
    ColumnInfoUnavailable(String),

    #[error("row count failed: {0}")]
    CountFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("profile storage {op} failed: {reason}")]
    Storage { op: StorageOp, reason: String },
}

impl DbError {
    pub fn storage(op: StorageOp, reason: impl fmt::Display) -> Self {
        DbError::Storage {
            op,
            reason: reason.to_string(),
        }
    }
}
