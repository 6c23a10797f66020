//! Template loading and management

use apidispatch_common::{DispatchError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("rust_type", rust_type_filter);
    tera.register_filter("rust_str", rust_str_filter);

    tera.add_raw_template("operation.rs", include_str!("../templates/operation.rs.tera"))
        .map_err(|e| {
            DispatchError::Generation(format!("Failed to load operation.rs template: {}", e))
        })?;

    tera.add_raw_template("mod.rs", include_str!("../templates/mod.rs.tera"))
        .map_err(|e| DispatchError::Generation(format!("Failed to load mod.rs template: {}", e)))?;

    Ok(tera)
}

/// Filter to convert a serialized `PrimitiveKind` to a Rust type
fn rust_type_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let kind = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("rust_type filter expects a string"))?;

    let rust_type = match kind {
        "string" => "String",
        "integer" => "i64",
        "number" => "f64",
        "boolean" => "bool",
        "array" => "Vec<Value>",
        "object" => "serde_json::Map<String, Value>",
        _ => "Value",
    };

    Ok(Value::String(rust_type.to_string()))
}

/// Filter to render a string as a quoted, escaped Rust literal
fn rust_str_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("rust_str filter expects a string"))?;

    Ok(Value::String(format!("{:?}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(
        filter: fn(&Value, &HashMap<String, Value>) -> tera::Result<Value>,
        input: &str,
    ) -> String {
        filter(&Value::String(input.to_string()), &HashMap::new())
            .unwrap()
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_templates_load() {
        let tera = load_templates().unwrap();
        let names: Vec<&str> = tera.get_template_names().collect();
        assert!(names.contains(&"operation.rs"));
        assert!(names.contains(&"mod.rs"));
    }

    #[test]
    fn test_rust_type_filter() {
        assert_eq!(apply(rust_type_filter, "integer"), "i64");
        assert_eq!(apply(rust_type_filter, "array"), "Vec<Value>");
        assert_eq!(apply(rust_type_filter, "unknown"), "Value");
    }

    #[test]
    fn test_rust_str_filter_escapes() {
        assert_eq!(apply(rust_str_filter, "say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
