//! OpenAPI 3.0 type definitions
//!
//! Simplified representation focusing on what operation resolution needs:
//! operation identifiers, parameters and request body fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// OpenAPI document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// OpenAPI version (e.g., "3.0.0")
    pub openapi: String,

    /// API metadata
    pub info: Info,

    /// API paths (endpoints)
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,

    /// Reusable components
    #[serde(default)]
    pub components: Option<Components>,
}

/// API information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,

    pub version: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Path item (operations for a path)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<Operation>,

    #[serde(default)]
    pub post: Option<Operation>,

    #[serde(default)]
    pub put: Option<Operation>,

    #[serde(default)]
    pub patch: Option<Operation>,

    #[serde(default)]
    pub delete: Option<Operation>,

    /// Parameters shared by every operation of the path
    #[serde(default)]
    pub parameters: Vec<ParameterOrRef>,

    /// Everything else: `head`, `options`, `trace`, `summary`, `servers`...
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// HTTP operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID (unique identifier)
    #[serde(rename = "operationId")]
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parameters: Vec<ParameterOrRef>,

    #[serde(rename = "requestBody")]
    #[serde(default)]
    pub request_body: Option<RequestBody>,
}

/// Parameter or `$ref` to `#/components/parameters/*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterOrRef {
    Reference {
        #[serde(rename = "$ref")]
        ref_path: String,
    },

    Parameter(Box<Parameter>),
}

/// Parameter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Location: query, header, path, cookie
    #[serde(rename = "in")]
    pub location: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub schema: Option<SchemaOrRef>,
}

/// Request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,

    /// Content types
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

/// Media type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<SchemaOrRef>,
}

/// Schema or reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    /// Reference to schema
    Reference {
        #[serde(rename = "$ref")]
        ref_path: String,
    },

    /// Direct schema
    Schema(Box<Schema>),
}

/// Schema definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Type: string, number, integer, boolean, array, object
    #[serde(rename = "type")]
    #[serde(default)]
    pub schema_type: Option<String>,

    /// Format (e.g., int32, int64, date-time, unix-time)
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Properties (for object type)
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaOrRef>,

    /// Required properties
    #[serde(default)]
    pub required: Vec<String>,

    /// Items schema (for array type)
    #[serde(default)]
    pub items: Option<Box<SchemaOrRef>>,

    #[serde(rename = "anyOf")]
    #[serde(default)]
    pub any_of: Vec<SchemaOrRef>,

    /// Enum values
    #[serde(rename = "enum")]
    #[serde(default)]
    pub enum_values: Vec<Value>,
}

/// Reusable components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,

    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
}

impl OpenApiSpec {
    /// Get a schema by reference path
    /// e.g., "#/components/schemas/customer" -> returns the customer schema
    pub fn resolve_schema_ref(&self, ref_path: &str) -> Option<&Schema> {
        let schema_name = ref_path.strip_prefix("#/components/schemas/")?;
        self.components
            .as_ref()
            .and_then(|c| c.schemas.get(schema_name))
    }

    /// Get a parameter by reference path
    pub fn resolve_parameter_ref(&self, ref_path: &str) -> Option<&Parameter> {
        let param_name = ref_path.strip_prefix("#/components/parameters/")?;
        self.components
            .as_ref()
            .and_then(|c| c.parameters.get(param_name))
    }

    /// Resolve a schema-or-reference one level deep
    pub fn schema<'a>(&'a self, schema: &'a SchemaOrRef) -> Option<&'a Schema> {
        match schema {
            SchemaOrRef::Schema(s) => Some(s.as_ref()),
            SchemaOrRef::Reference { ref_path } => self.resolve_schema_ref(ref_path),
        }
    }

    /// Resolve a parameter-or-reference
    pub fn parameter<'a>(&'a self, parameter: &'a ParameterOrRef) -> Option<&'a Parameter> {
        match parameter {
            ParameterOrRef::Parameter(p) => Some(p.as_ref()),
            ParameterOrRef::Reference { ref_path } => self.resolve_parameter_ref(ref_path),
        }
    }
}

impl PathItem {
    /// Operations declared with one of the supported verbs
    pub fn operations(&self) -> Vec<(&'static str, &Operation)> {
        [
            ("get", &self.get),
            ("post", &self.post),
            ("put", &self.put),
            ("patch", &self.patch),
            ("delete", &self.delete),
        ]
        .into_iter()
        .filter_map(|(verb, op)| op.as_ref().map(|op| (verb, op)))
        .collect()
    }

    /// Operations declared under any other HTTP verb, with their operationId
    pub fn unsupported_operations(&self) -> Vec<(&str, Option<&str>)> {
        const OTHER_VERBS: [&str; 3] = ["head", "options", "trace"];

        self.other
            .iter()
            .filter(|(key, _)| OTHER_VERBS.contains(&key.as_str()))
            .map(|(verb, op)| {
                (
                    verb.as_str(),
                    op.get("operationId").and_then(Value::as_str),
                )
            })
            .collect()
    }
}
