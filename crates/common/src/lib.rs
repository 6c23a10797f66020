//! Common types and utilities for apidispatch
//!
//! This crate contains the shared data model, the error taxonomy and the
//! resolution rules used by the parser, the runtime dispatcher and the
//! source generator.

mod resolution_rules;

pub use resolution_rules::{
    ActionRename, ResolutionRules, ResourceException, RuleCondition, SingletonView, SpecialCase,
    SpecialStep,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while resolving or invoking an operation
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    #[error("Resource not found: {resource} (operation {operation_id})")]
    ResourceNotFound {
        resource: String,
        operation_id: String,
    },

    #[error("Missing required identifier '{parameter}' for operation {operation_id}")]
    MissingIdentifier {
        operation_id: String,
        parameter: String,
    },

    #[error("Unsupported HTTP verb: {0}")]
    UnsupportedVerb(String),

    #[error("Backend invocation failed: {message}")]
    BackendInvocation {
        message: String,
        /// Diagnostic detail from the backend (status, response body, error chain)
        trace: Option<String>,
    },

    #[error("Invalid operation identifier: {0}")]
    InvalidOperationId(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DispatchError {
    /// Build a backend error from a message and optional trace
    pub fn backend(message: impl Into<String>, trace: Option<String>) -> Self {
        Self::BackendInvocation {
            message: message.into(),
            trace,
        }
    }

    /// Backend diagnostic trace, when the error carries one
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::BackendInvocation { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// HTTP verbs the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 5] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Delete,
    ];

    /// Lower-case form used in OpenAPI path items
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
            HttpVerb::Put => "put",
            HttpVerb::Patch => "patch",
            HttpVerb::Delete => "delete",
        }
    }

    /// Capitalized form used as an operationId prefix (e.g. `Post`)
    pub fn prefix(&self) -> &'static str {
        match self {
            HttpVerb::Get => "Get",
            HttpVerb::Post => "Post",
            HttpVerb::Put => "Put",
            HttpVerb::Patch => "Patch",
            HttpVerb::Delete => "Delete",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpVerb::Get),
            "post" => Ok(HttpVerb::Post),
            "put" => Ok(HttpVerb::Put),
            "patch" => Ok(HttpVerb::Patch),
            "delete" => Ok(HttpVerb::Delete),
            _ => Err(DispatchError::UnsupportedVerb(s.to_string())),
        }
    }
}

/// The two path shapes the engine indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathShape {
    /// `/v1/{segment}`
    Collection,
    /// `/v1/{segment}/{identifier}`
    Detail,
}

/// Where a declared input travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Body,
}

/// Primitive kind of a declared input, as far as the engine cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Unknown,
}

/// One declared input of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub kind: PrimitiveKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// One endpoint definition taken from the API description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation_id: String,
    pub path: String,
    pub verb: HttpVerb,
    pub shape: PathShape,
    #[serde(default)]
    pub description: Option<String>,
    /// Path and query parameters, in declaration order
    pub parameters: Vec<ParameterDescriptor>,
    /// Request body fields, ordered by name
    pub body_fields: Vec<ParameterDescriptor>,
}

impl OperationRecord {
    /// Name used for the identifier when the description declares no path parameter
    pub const DEFAULT_IDENTIFIER: &'static str = "id";

    /// The single path-location parameter, if declared
    pub fn path_parameter(&self) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Path)
    }

    /// Name of the identifier parameter, falling back to `id`
    pub fn identifier_name(&self) -> &str {
        self.path_parameter()
            .map(|p| p.name.as_str())
            .unwrap_or(Self::DEFAULT_IDENTIFIER)
    }
}

/// Generic actions every resource capability exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    Cancel,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::List => "list",
            ActionKind::Retrieve => "retrieve",
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of resource classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResolution {
    /// Backend-recognized name, dotted for nested capabilities
    pub canonical_name: String,
    pub is_singleton: bool,
    pub is_detail: bool,
}

/// Output of action selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub action: ActionKind,
}

impl ActionDecision {
    /// Whether the action cannot be performed without a path identifier
    pub fn requires_identifier(&self, resource: &ResourceResolution) -> bool {
        match self.action {
            ActionKind::List | ActionKind::Create => false,
            ActionKind::Retrieve | ActionKind::Update => resource.is_detail,
            ActionKind::Delete | ActionKind::Cancel => true,
        }
    }
}

/// Arguments for one capability call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationRequest {
    pub identifier: Option<String>,
    pub body: Map<String, Value>,
}
