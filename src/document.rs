//! Caller-owned documents and their external identifiers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier supplied by the caller for a document.
///
/// Numbers and strings are kept apart, so `1` and `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(i64),
    Text(String),
}

impl ExternalId {
    /// Converts an extracted attribute value into an id.
    ///
    /// `null` is treated as absent. Values that are neither integers nor
    /// strings are keyed by their JSON rendering.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(
                n.as_i64()
                    .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            ),
            Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ExternalId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ExternalId {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A small structured record: field name to field value.
///
/// The index never keeps a document; it tokenizes the indexed fields and
/// copies out the configured stored fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    /// Accepts JSON objects; anything else is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Renders a field value as indexable text.
///
/// Strings are used verbatim, arrays are joined with commas, and `null` yields
/// nothing. Everything else uses its JSON rendering.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(7), Some(ExternalId::Number(7)))]
    #[case(json!("doc-7"), Some(ExternalId::Text("doc-7".into())))]
    #[case(json!(1.5), Some(ExternalId::Text("1.5".into())))]
    #[case(json!(null), None)]
    fn test_external_id_from_value(#[case] value: Value, #[case] expected: Option<ExternalId>) {
        check!(ExternalId::from_value(&value) == expected);
    }

    #[test]
    fn test_number_and_text_ids_differ() {
        check!(ExternalId::from(1) != ExternalId::from("1"));
    }

    #[rstest]
    #[case(json!("plain text"), Some("plain text"))]
    #[case(json!(["red", "green"]), Some("red,green"))]
    #[case(json!(42), Some("42"))]
    #[case(json!(null), None)]
    fn test_value_to_text(#[case] value: Value, #[case] expected: Option<&str>) {
        check!(value_to_text(&value).as_deref() == expected);
    }

    #[test]
    fn test_try_from_rejects_non_objects() {
        check!(Document::try_from(json!([1, 2])).is_err());
        let doc = Document::try_from(json!({"id": 1, "title": "x"})).unwrap();
        check!(doc.get("title") == Some(&json!("x")));
    }
}
