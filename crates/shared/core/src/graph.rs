//! Object graphs
//!
//! API description documents, gateway objects and merge templates are all
//! handled as JSON values. `serde_json::Value` already is the tagged union
//! (null, bool, number, string, array, object) we need; this module adds the
//! checked accessors used wherever a document is expected to have a shape.

use serde_json::{Map, Value};
use thiserror::Error;

/// Recursive JSON-like value
pub type ObjectGraph = Value;

/// Map node of an object graph
pub type ObjectMap = Map<String, Value>;

/// Shape errors raised by the checked accessors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Missing field: {0}")]
    Missing(String),

    #[error("Field {field} has type {found}, expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Name of the JSON type of a value, for diagnostics
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checked accessors over an object graph
pub trait GraphExt {
    /// View this value as a map, naming it `what` in the error
    fn expect_object(&self, what: &str) -> GraphResult<&ObjectMap>;

    /// Required string field
    fn str_field(&self, key: &str) -> GraphResult<&str>;

    /// Optional string field (missing and null both map to `None`)
    fn opt_str_field(&self, key: &str) -> GraphResult<Option<&str>>;

    /// Required array field
    fn array_field(&self, key: &str) -> GraphResult<&Vec<Value>>;

    /// Required bool field
    fn bool_field(&self, key: &str) -> GraphResult<bool>;
}

impl GraphExt for Value {
    fn expect_object(&self, what: &str) -> GraphResult<&ObjectMap> {
        self.as_object().ok_or_else(|| GraphError::WrongType {
            field: what.to_string(),
            expected: "object",
            found: kind_name(self),
        })
    }

    fn str_field(&self, key: &str) -> GraphResult<&str> {
        self.expect_object(key)?.str_field(key)
    }

    fn opt_str_field(&self, key: &str) -> GraphResult<Option<&str>> {
        self.expect_object(key)?.opt_str_field(key)
    }

    fn array_field(&self, key: &str) -> GraphResult<&Vec<Value>> {
        self.expect_object(key)?.array_field(key)
    }

    fn bool_field(&self, key: &str) -> GraphResult<bool> {
        self.expect_object(key)?.bool_field(key)
    }
}

impl GraphExt for ObjectMap {
    fn expect_object(&self, _what: &str) -> GraphResult<&ObjectMap> {
        Ok(self)
    }

    fn str_field(&self, key: &str) -> GraphResult<&str> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(wrong_type(key, "string", other)),
            None => Err(GraphError::Missing(key.to_string())),
        }
    }

    fn opt_str_field(&self, key: &str) -> GraphResult<Option<&str>> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(wrong_type(key, "string", other)),
        }
    }

    fn array_field(&self, key: &str) -> GraphResult<&Vec<Value>> {
        match self.get(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(wrong_type(key, "array", other)),
            None => Err(GraphError::Missing(key.to_string())),
        }
    }

    fn bool_field(&self, key: &str) -> GraphResult<bool> {
        match self.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(wrong_type(key, "bool", other)),
            None => Err(GraphError::Missing(key.to_string())),
        }
    }
}

fn wrong_type(field: &str, expected: &'static str, found: &Value) -> GraphError {
    GraphError::WrongType {
        field: field.to_string(),
        expected,
        found: kind_name(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_field() {
        let doc = json!({"name": "invoice", "count": 3});
        assert_eq!(doc.str_field("name").unwrap(), "invoice");
        assert_eq!(
            doc.str_field("count"),
            Err(GraphError::WrongType {
                field: "count".to_string(),
                expected: "string",
                found: "number",
            })
        );
        assert_eq!(
            doc.str_field("missing"),
            Err(GraphError::Missing("missing".to_string()))
        );
    }

    #[test]
    fn test_opt_str_field_tolerates_null() {
        let doc = json!({"title": null});
        assert_eq!(doc.opt_str_field("title").unwrap(), None);
        assert_eq!(doc.opt_str_field("absent").unwrap(), None);
    }

    #[test]
    fn test_accessors_on_non_object() {
        let doc = json!([1, 2, 3]);
        assert!(matches!(
            doc.array_field("endpoints"),
            Err(GraphError::WrongType { found: "array", .. })
        ));
    }
}
