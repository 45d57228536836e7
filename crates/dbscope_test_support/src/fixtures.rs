use crate::FakeTable;
use dbscope_core::{ColumnInfo, TableRef, Value};

pub fn column(name: &str, type_name: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        type_name: type_name.to_string(),
        nullable: true,
        default_value: None,
        is_primary_key: false,
    }
}

pub fn pk_column(name: &str, type_name: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        type_name: type_name.to_string(),
        nullable: false,
        default_value: None,
        is_primary_key: true,
    }
}

/// A `users(id, name, email)` table with three rows, one of which carries a
/// NULL email.
pub fn users_table() -> FakeTable {
    FakeTable::new(
        TableRef::new("users"),
        vec![
            pk_column("id", "integer"),
            column("name", "text"),
            column("email", "text"),
        ],
        vec![
            vec![
                Value::Int(1),
                Value::Text("alice".to_string()),
                Value::Text("alice@example.com".to_string()),
            ],
            vec![
                Value::Int(2),
                Value::Text("bob".to_string()),
                Value::Null,
            ],
            vec![
                Value::Int(3),
                Value::Text("carol".to_string()),
                Value::Text("carol@example.com".to_string()),
            ],
        ],
    )
}

/// An empty `orders(id)` table.
pub fn orders_table() -> FakeTable {
    FakeTable::new(
        TableRef::new("orders"),
        vec![pk_column("id", "integer")],
        Vec::new(),
    )
}
