use serde::{Deserialize, Serialize};

/// Table entry returned by a listing.
///
/// `row_count` is a best-effort snapshot taken at listing time: when the
/// count query fails for a single table the listing substitutes 0 instead of
/// failing as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub row_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Column metadata normalized across backends.
///
/// `type_name` is the backend-native type string; no cross-backend type
/// taxonomy is imposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}
