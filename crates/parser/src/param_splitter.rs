//! Parameter splitting
//!
//! Separates the path identifier from the rest of a caller's parameter bag.

use serde_json::{Map, Value};
use tracing::debug;

/// Identifier and remaining body of a parameter bag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitParameters {
    pub identifier: Option<String>,
    /// Never contains the identifier key
    pub body: Map<String, Value>,
}

/// Splits parameter bags into identifier and body
pub struct ParameterSplitter;

impl ParameterSplitter {
    /// Remove `identifier_name` from the bag
    ///
    /// Strings are used verbatim, numbers and booleans are stringified.
    /// `null`, arrays and objects count as absent; the key is removed either way.
    ///
    /// # Examples
    /// ```
    /// use apidispatch_parser::ParameterSplitter;
    /// use serde_json::json;
    ///
    /// let bag = json!({ "customer": "cus_1", "email": "a@b.com" });
    /// let split = ParameterSplitter::split(bag.as_object().unwrap().clone(), "customer");
    /// assert_eq!(split.identifier.as_deref(), Some("cus_1"));
    /// assert!(!split.body.contains_key("customer"));
    /// ```
    pub fn split(mut bag: Map<String, Value>, identifier_name: &str) -> SplitParameters {
        let identifier = match bag.remove(identifier_name) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(Value::Null) | None => None,
            Some(other) => {
                debug!(
                    parameter = identifier_name,
                    value = %other,
                    "Ignoring non-scalar identifier value"
                );
                None
            }
        };

        SplitParameters {
            identifier,
            body: bag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_split_removes_identifier() {
        let split = ParameterSplitter::split(
            bag(json!({ "customer": "cus_1", "email": "a@b.com" })),
            "customer",
        );
        assert_eq!(split.identifier.as_deref(), Some("cus_1"));
        assert_eq!(split.body, bag(json!({ "email": "a@b.com" })));
    }

    #[test]
    fn test_missing_identifier() {
        let split = ParameterSplitter::split(bag(json!({ "email": "a@b.com" })), "customer");
        assert_eq!(split.identifier, None);
        assert_eq!(split.body.len(), 1);
    }

    #[test]
    fn test_identifier_value_kinds() {
        let split = ParameterSplitter::split(bag(json!({ "id": 42 })), "id");
        assert_eq!(split.identifier.as_deref(), Some("42"));

        let split = ParameterSplitter::split(bag(json!({ "id": null, "limit": 3 })), "id");
        assert_eq!(split.identifier, None);
        assert!(!split.body.contains_key("id"));

        let split = ParameterSplitter::split(bag(json!({ "id": ["a", "b"] })), "id");
        assert_eq!(split.identifier, None);
        assert!(split.body.is_empty());
    }
}
