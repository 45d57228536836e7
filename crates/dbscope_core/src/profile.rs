use crate::DbError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    SQLite,
}

impl BackendKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "PostgreSQL",
            BackendKind::SQLite => "SQLite",
        }
    }

    /// Canonical wire name, as persisted and as accepted from callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::SQLite => "sqlite",
        }
    }

    /// Parse a wire name. Unknown names fail with `UnsupportedBackend`
    /// carrying the requested string.
    pub fn parse(s: &str) -> Result<Self, DbError> {
        match s {
            "postgres" => Ok(BackendKind::Postgres),
            "sqlite" => Ok(BackendKind::SQLite),
            other => Err(DbError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Saved connection profile.
///
/// Persisted by the profile store; `id` is assigned on insert and stable for
/// the profile's lifetime. The DSN is treated as an opaque string and is
/// never validated at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Store-assigned identifier.
    pub id: i64,

    /// User-defined display label. Not required to be unique.
    pub name: String,

    /// The backend this profile connects to.
    pub kind: BackendKind,

    /// Opaque connection string handed verbatim to the driver.
    pub dsn: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names_round_trip() {
        for kind in [BackendKind::Postgres, BackendKind::SQLite] {
            assert_eq!(BackendKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_reports_requested_name() {
        let err = BackendKind::parse("oracle").unwrap_err();
        assert!(matches!(err, DbError::UnsupportedBackend(ref s) if s == "oracle"));
    }

    #[test]
    fn kind_serializes_as_wire_name() {
        let json = serde_json::to_string(&BackendKind::SQLite).unwrap();
        assert_eq!(json, "\"sqlite\"");
    }
}
