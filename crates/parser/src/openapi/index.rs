//! Schema index: the read-only view of the API description the engine works on
//!
//! Only two path shapes are indexed:
//! - collection shape: `/v1/{segment}`
//! - detail shape: `/v1/{segment}/{identifier}`
//!
//! Nested sub-resources and multi-level paths are silently excluded. This is
//! a scope limitation of the engine, not a parsing failure.

use super::types::{OpenApiSpec, Operation, PathItem, Schema};
use crate::type_mapper::TypeMapper;
use apidispatch_common::{
    DispatchError, HttpVerb, OperationRecord, ParameterDescriptor, ParameterLocation, PathShape,
    Result,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, trace};

static COLLECTION_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/v1/[^/]+$").expect("valid collection path pattern"));

static DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/v1/[^/]+/\{[^}]+\}$").expect("valid detail path pattern"));

/// Body media types, most preferred first
const PREFERRED_MEDIA_TYPES: [&str; 2] = ["application/json", "application/x-www-form-urlencoded"];

#[derive(Debug, Clone)]
enum IndexEntry {
    Supported(OperationRecord),
    /// Declared under a verb the engine cannot map (head, options, trace)
    Unsupported { verb: String },
}

/// Lookup structure over the operations of an API description
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl SchemaIndex {
    /// Build the index from a parsed OpenAPI document
    pub fn from_spec(spec: &OpenApiSpec) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for (path, item) in &spec.paths {
            let Some(shape) = Self::path_shape(path) else {
                trace!(path = %path, "Skipping path outside the indexed shapes");
                continue;
            };

            for (verb, operation) in item.operations() {
                let Some(ref operation_id) = operation.operation_id else {
                    debug!(path = %path, verb, "Skipping operation without operationId");
                    continue;
                };

                let verb: HttpVerb = verb.parse()?;
                let record = build_record(spec, path, shape, verb, item, operation, operation_id);
                insert_unique(&mut entries, operation_id, IndexEntry::Supported(record))?;
            }

            for (verb, operation_id) in item.unsupported_operations() {
                if let Some(operation_id) = operation_id {
                    let entry = IndexEntry::Unsupported {
                        verb: verb.to_string(),
                    };
                    insert_unique(&mut entries, operation_id, entry)?;
                }
            }
        }

        debug!(operations = entries.len(), "Built schema index");
        Ok(Self { entries })
    }

    /// Build an index from already-extracted records
    pub fn from_records(records: impl IntoIterator<Item = OperationRecord>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for record in records {
            let operation_id = record.operation_id.clone();
            insert_unique(&mut entries, &operation_id, IndexEntry::Supported(record))?;
        }
        Ok(Self { entries })
    }

    /// Classify a path into one of the two indexed shapes
    ///
    /// # Examples
    /// ```
    /// use apidispatch_parser::SchemaIndex;
    /// use apidispatch_common::PathShape;
    ///
    /// assert_eq!(SchemaIndex::path_shape("/v1/customers"), Some(PathShape::Collection));
    /// assert_eq!(SchemaIndex::path_shape("/v1/customers/{customer}"), Some(PathShape::Detail));
    /// assert_eq!(SchemaIndex::path_shape("/v1/customers/{customer}/sources"), None);
    /// ```
    pub fn path_shape(path: &str) -> Option<PathShape> {
        if COLLECTION_PATH.is_match(path) {
            Some(PathShape::Collection)
        } else if DETAIL_PATH.is_match(path) {
            Some(PathShape::Detail)
        } else {
            None
        }
    }

    /// Find an operation by its identifier
    pub fn find_operation(&self, operation_id: &str) -> Result<&OperationRecord> {
        match self.entries.get(operation_id) {
            Some(IndexEntry::Supported(record)) => Ok(record),
            Some(IndexEntry::Unsupported { verb }) => {
                Err(DispatchError::UnsupportedVerb(verb.clone()))
            }
            None => Err(DispatchError::OperationNotFound(operation_id.to_string())),
        }
    }

    /// All indexed operationIds, sorted
    ///
    /// Operations declared under unsupported verbs are included so that
    /// resolving them reports `UnsupportedVerb` instead of vanishing.
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// All resolvable operation records, sorted by operationId
    pub fn operations(&self) -> impl Iterator<Item = &OperationRecord> + '_ {
        self.entries.values().filter_map(|entry| match entry {
            IndexEntry::Supported(record) => Some(record),
            IndexEntry::Unsupported { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn insert_unique(
    entries: &mut BTreeMap<String, IndexEntry>,
    operation_id: &str,
    entry: IndexEntry,
) -> Result<()> {
    if entries.insert(operation_id.to_string(), entry).is_some() {
        return Err(DispatchError::Parse(format!(
            "Duplicate operationId in API description: {}",
            operation_id
        )));
    }
    Ok(())
}

/// Extract an `OperationRecord` from an OpenAPI operation
fn build_record(
    spec: &OpenApiSpec,
    path: &str,
    shape: PathShape,
    verb: HttpVerb,
    item: &PathItem,
    operation: &Operation,
    operation_id: &str,
) -> OperationRecord {
    OperationRecord {
        operation_id: operation_id.to_string(),
        path: path.to_string(),
        verb,
        shape,
        description: operation
            .description
            .clone()
            .or_else(|| operation.summary.clone()),
        parameters: extract_parameters(spec, path, item, operation),
        body_fields: extract_body_fields(spec, operation),
    }
}

/// Merge path-level and operation-level parameters
///
/// Operation-level parameters override path-level ones with the same name
/// and location. Header and cookie parameters are dropped, as are path
/// parameters that do not appear in the path template.
fn extract_parameters(
    spec: &OpenApiSpec,
    path: &str,
    item: &PathItem,
    operation: &Operation,
) -> Vec<ParameterDescriptor> {
    let template_param = path
        .rsplit('/')
        .next()
        .and_then(|segment| segment.strip_prefix('{'))
        .and_then(|segment| segment.strip_suffix('}'));

    let mut descriptors: Vec<ParameterDescriptor> = Vec::new();

    for declared in item.parameters.iter().chain(&operation.parameters) {
        let Some(param) = spec.parameter(declared) else {
            debug!(path = %path, "Skipping unresolvable parameter reference");
            continue;
        };

        let location = match param.location.as_str() {
            "path" if template_param == Some(param.name.as_str()) => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            _ => continue,
        };

        let descriptor = ParameterDescriptor {
            name: param.name.clone(),
            location,
            required: param.required || location == ParameterLocation::Path,
            kind: param
                .schema
                .as_ref()
                .map(|s| TypeMapper::map_schema(spec, s))
                .unwrap_or(apidispatch_common::PrimitiveKind::String),
            description: param.description.clone(),
        };

        match descriptors
            .iter_mut()
            .find(|d| d.name == descriptor.name && d.location == descriptor.location)
        {
            Some(existing) => *existing = descriptor,
            None => descriptors.push(descriptor),
        }
    }

    descriptors
}

/// Extract body fields from the preferred request body media type
fn extract_body_fields(spec: &OpenApiSpec, operation: &Operation) -> Vec<ParameterDescriptor> {
    let Some(ref request_body) = operation.request_body else {
        return Vec::new();
    };

    let media_type = PREFERRED_MEDIA_TYPES
        .iter()
        .find_map(|name| request_body.content.get(*name))
        .or_else(|| request_body.content.values().next());

    let Some(schema) = media_type
        .and_then(|m| m.schema.as_ref())
        .and_then(|s| spec.schema(s))
    else {
        return Vec::new();
    };

    body_fields_from_schema(spec, schema)
}

fn body_fields_from_schema(spec: &OpenApiSpec, schema: &Schema) -> Vec<ParameterDescriptor> {
    schema
        .properties
        .iter()
        .map(|(name, property)| {
            let description = spec.schema(property).and_then(|s| s.description.clone());
            ParameterDescriptor {
                name: name.clone(),
                location: ParameterLocation::Body,
                required: schema.required.iter().any(|r| r == name),
                kind: TypeMapper::map_schema(spec, property),
                description,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidispatch_common::PrimitiveKind;

    fn spec(json: &str) -> OpenApiSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_path_shapes() {
        assert_eq!(
            SchemaIndex::path_shape("/v1/setup_intents"),
            Some(PathShape::Collection)
        );
        assert_eq!(
            SchemaIndex::path_shape("/v1/setup_intents/{intent}"),
            Some(PathShape::Detail)
        );
        assert_eq!(SchemaIndex::path_shape("/v1/setup_intents/{intent}/confirm"), None);
        assert_eq!(SchemaIndex::path_shape("/v1/billing_portal/sessions"), None);
        assert_eq!(SchemaIndex::path_shape("/v2/customers"), None);
        assert_eq!(SchemaIndex::path_shape("/v1/"), None);
    }

    #[test]
    fn test_parameters_merge_and_filter() {
        let spec = spec(
            r#"{
                "openapi": "3.0.0",
                "info": { "title": "Test", "version": "1" },
                "paths": {
                    "/v1/customers/{customer}": {
                        "parameters": [
                            { "name": "customer", "in": "path", "required": true, "schema": { "type": "string" } },
                            { "name": "expand", "in": "query", "schema": { "type": "array" } }
                        ],
                        "get": {
                            "operationId": "GetCustomersCustomer",
                            "parameters": [
                                { "name": "expand", "in": "query", "required": true, "schema": { "type": "array" } },
                                { "name": "Stripe-Account", "in": "header", "schema": { "type": "string" } },
                                { "name": "other", "in": "path", "schema": { "type": "string" } }
                            ]
                        }
                    }
                }
            }"#,
        );

        let index = SchemaIndex::from_spec(&spec).unwrap();
        let record = index.find_operation("GetCustomersCustomer").unwrap();

        assert_eq!(record.shape, PathShape::Detail);
        assert_eq!(record.parameters.len(), 2);
        assert_eq!(record.identifier_name(), "customer");

        let expand = &record.parameters[1];
        assert_eq!(expand.location, ParameterLocation::Query);
        assert!(expand.required, "operation-level parameter should override");
        assert_eq!(expand.kind, PrimitiveKind::Array);
    }

    #[test]
    fn test_body_fields_prefer_known_media_types() {
        let spec = spec(
            r##"{
                "openapi": "3.0.0",
                "info": { "title": "Test", "version": "1" },
                "paths": {
                    "/v1/customers": {
                        "post": {
                            "operationId": "PostCustomers",
                            "requestBody": {
                                "content": {
                                    "application/x-www-form-urlencoded": {
                                        "schema": {
                                            "type": "object",
                                            "required": ["email"],
                                            "properties": {
                                                "email": { "type": "string", "description": "Customer email" },
                                                "balance": { "type": "integer" },
                                                "address": { "$ref": "#/components/schemas/address" }
                                            }
                                        }
                                    },
                                    "text/plain": { "schema": { "type": "string" } }
                                }
                            }
                        }
                    }
                },
                "components": { "schemas": { "address": { "type": "object" } } }
            }"##,
        );

        let index = SchemaIndex::from_spec(&spec).unwrap();
        let record = index.find_operation("PostCustomers").unwrap();
        let names: Vec<&str> = record.body_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["address", "balance", "email"]);

        let email = &record.body_fields[2];
        assert!(email.required);
        assert_eq!(email.description.as_deref(), Some("Customer email"));
        assert_eq!(record.body_fields[0].kind, PrimitiveKind::Object);
        assert_eq!(record.body_fields[1].kind, PrimitiveKind::Integer);
        assert!(!record.body_fields[1].required);
    }

    #[test]
    fn test_unsupported_verbs_and_duplicates() {
        let unsupported = spec(
            r#"{
                "openapi": "3.0.0",
                "info": { "title": "Test", "version": "1" },
                "paths": {
                    "/v1/customers": {
                        "get": { "operationId": "GetCustomers" },
                        "options": { "operationId": "OptionsCustomers" }
                    }
                }
            }"#,
        );
        let index = SchemaIndex::from_spec(&unsupported).unwrap();
        let ids: Vec<&str> = index.operation_ids().collect();
        assert_eq!(ids, vec!["GetCustomers", "OptionsCustomers"]);
        assert_eq!(index.operations().count(), 1);
        assert!(matches!(
            index.find_operation("OptionsCustomers"),
            Err(DispatchError::UnsupportedVerb(v)) if v == "options"
        ));

        let duplicated = spec(
            r#"{
                "openapi": "3.0.0",
                "info": { "title": "Test", "version": "1" },
                "paths": {
                    "/v1/customers": { "get": { "operationId": "GetCustomers" } },
                    "/v1/clients": { "get": { "operationId": "GetCustomers" } }
                }
            }"#,
        );
        assert!(matches!(
            SchemaIndex::from_spec(&duplicated),
            Err(DispatchError::Parse(_))
        ));
    }
}
