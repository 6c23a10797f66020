//! Type mapping from OpenAPI schemas to the engine's primitive kinds

use crate::openapi::{OpenApiSpec, Schema, SchemaOrRef};
use apidispatch_common::PrimitiveKind;

/// Maps OpenAPI schemas to `PrimitiveKind`
pub struct TypeMapper;

impl TypeMapper {
    /// Map an OpenAPI `type` string to a kind
    ///
    /// # Examples
    /// ```
    /// use apidispatch_parser::TypeMapper;
    /// use apidispatch_common::PrimitiveKind;
    ///
    /// assert_eq!(TypeMapper::map_type("string"), PrimitiveKind::String);
    /// assert_eq!(TypeMapper::map_type("integer"), PrimitiveKind::Integer);
    /// assert_eq!(TypeMapper::map_type("file"), PrimitiveKind::Unknown);
    /// ```
    pub fn map_type(type_name: &str) -> PrimitiveKind {
        match type_name {
            "string" => PrimitiveKind::String,
            "integer" => PrimitiveKind::Integer,
            "number" => PrimitiveKind::Number,
            "boolean" => PrimitiveKind::Boolean,
            "array" => PrimitiveKind::Array,
            "object" => PrimitiveKind::Object,
            _ => PrimitiveKind::Unknown,
        }
    }

    /// Map a schema, following one level of `$ref`
    pub fn map_schema(spec: &OpenApiSpec, schema: &SchemaOrRef) -> PrimitiveKind {
        match spec.schema(schema) {
            Some(resolved) => Self::map_resolved(resolved),
            // Dangling references still point at some structured component
            None => PrimitiveKind::Object,
        }
    }

    fn map_resolved(schema: &Schema) -> PrimitiveKind {
        match schema.schema_type.as_deref() {
            Some(type_name) => Self::map_type(type_name),
            None if !schema.properties.is_empty() => PrimitiveKind::Object,
            None if schema.items.is_some() => PrimitiveKind::Array,
            // anyOf unions and untyped schemas carry no single kind
            None => PrimitiveKind::Unknown,
        }
    }
}
