use serde::{Deserialize, Serialize};

/// Database cell value.
///
/// A closed sum instead of `serde_json::Value` so decoding and tests stay
/// exhaustive. Raw byte sequences are coerced to text by the drivers at
/// decode time, so no `Bytes` variant exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_display_string())
    }
}

/// A single row of query results.
pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_serializes_as_json_null() {
        let json = serde_json::to_string(&Value::Null).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn scalar_values_serialize_untagged() {
        assert_eq!(serde_json::to_string(&Value::Int(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&Value::Text("a".to_string())).unwrap(),
            "\"a\""
        );
    }

    #[test]
    fn display_renders_null_marker() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }
}
