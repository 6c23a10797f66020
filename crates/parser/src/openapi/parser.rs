//! OpenAPI spec file parser

use super::index::SchemaIndex;
use super::types::OpenApiSpec;
use apidispatch_common::{DispatchError, Result};
use std::fs;
use std::path::Path;

/// OpenAPI specification parser
///
/// Reads OpenAPI 3.0 documents in JSON or YAML form and builds the
/// `SchemaIndex` the resolution engine works on.
pub struct OpenApiParser {
    /// Loaded OpenAPI spec
    spec: OpenApiSpec,
}

impl OpenApiParser {
    /// Load OpenAPI spec from file path
    ///
    /// Files ending in `.yaml` or `.yml` are read as YAML, everything else as JSON.
    ///
    /// # Example
    /// ```rust,ignore
    /// let parser = OpenApiParser::from_file("spec3.json")?;
    /// let index = parser.parse()?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DispatchError::Parse(format!(
                "Failed to read OpenAPI file {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Parse OpenAPI spec from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: OpenApiSpec = serde_json::from_str(json)
            .map_err(|e| DispatchError::Parse(format!("Failed to parse OpenAPI JSON: {}", e)))?;

        Ok(Self { spec })
    }

    /// Parse OpenAPI spec from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let spec: OpenApiSpec = serde_yaml::from_str(yaml)
            .map_err(|e| DispatchError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;

        Ok(Self { spec })
    }

    /// Build the schema index for the loaded spec
    pub fn parse(&self) -> Result<SchemaIndex> {
        SchemaIndex::from_spec(&self.spec)
    }

    /// Get reference to the underlying OpenAPI spec
    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }
}
