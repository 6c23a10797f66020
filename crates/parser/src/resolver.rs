//! The resolution pipeline shared by runtime dispatch and source generation
//!
//! Schema Index -> Name Parser -> Classifier -> Action Selector. The
//! Parameter Splitter is applied by `Resolution::prepare` once a caller's
//! parameters are known.

use crate::action_selector::ActionSelector;
use crate::classifier::ResourceClassifier;
use crate::openapi::SchemaIndex;
use crate::operation_mapper::OperationNameParser;
use crate::param_splitter::ParameterSplitter;
use apidispatch_common::{
    ActionDecision, DispatchError, InvocationRequest, OperationRecord, ResolutionRules,
    ResourceResolution, Result,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// Everything needed to invoke or emit one operation
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub record: &'a OperationRecord,
    pub resource: ResourceResolution,
    pub decision: ActionDecision,
}

impl Resolution<'_> {
    pub fn operation_id(&self) -> &str {
        &self.record.operation_id
    }

    /// Name of the identifier parameter (declared path parameter or `id`)
    pub fn identifier_name(&self) -> &str {
        self.record.identifier_name()
    }

    pub fn requires_identifier(&self) -> bool {
        self.decision.requires_identifier(&self.resource)
    }

    /// Whether an identifier is taken out of the caller's parameters at all
    ///
    /// Detail operations, singletons and identifier-bound actions address one
    /// object. Other collection operations forward the bag untouched, so a
    /// body field named like the fallback identifier (`id` on a coupon
    /// create) reaches the backend.
    pub fn splits_identifier(&self) -> bool {
        self.resource.is_detail || self.resource.is_singleton || self.requires_identifier()
    }

    /// Split a caller's parameters into an invocation request
    ///
    /// Fails with `MissingIdentifier` when the action needs an identifier the
    /// bag does not supply.
    pub fn prepare(&self, parameters: Map<String, Value>) -> Result<InvocationRequest> {
        if !self.splits_identifier() {
            return Ok(InvocationRequest {
                identifier: None,
                body: parameters,
            });
        }

        let split = ParameterSplitter::split(parameters, self.identifier_name());

        if split.identifier.is_none() && self.requires_identifier() {
            return Err(DispatchError::MissingIdentifier {
                operation_id: self.operation_id().to_string(),
                parameter: self.identifier_name().to_string(),
            });
        }

        Ok(InvocationRequest {
            identifier: split.identifier,
            body: split.body,
        })
    }
}

/// Resolves operationIds into resource/action pairs
pub struct OperationResolver<'a> {
    index: &'a SchemaIndex,
    rules: &'a ResolutionRules,
    known_resources: Option<&'a BTreeSet<String>>,
}

impl<'a> OperationResolver<'a> {
    pub fn new(index: &'a SchemaIndex, rules: &'a ResolutionRules) -> Self {
        Self {
            index,
            rules,
            known_resources: None,
        }
    }

    /// Fail resolution with `ResourceNotFound` for names outside this set
    pub fn with_known_resources(mut self, names: &'a BTreeSet<String>) -> Self {
        self.known_resources = Some(names);
        self
    }

    /// Resolve an operation by identifier
    pub fn resolve(&self, operation_id: &str) -> Result<Resolution<'a>> {
        let record = self.index.find_operation(operation_id)?;
        self.resolve_record(record)
    }

    /// Resolve an already-looked-up record
    pub fn resolve_record(&self, record: &'a OperationRecord) -> Result<Resolution<'a>> {
        let parsed = OperationNameParser::parse(&record.operation_id)?;
        let resource = ResourceClassifier::new(self.rules).classify(record, &parsed);

        if let Some(known) = self.known_resources {
            if !known.contains(&resource.canonical_name) {
                return Err(DispatchError::ResourceNotFound {
                    resource: resource.canonical_name,
                    operation_id: record.operation_id.clone(),
                });
            }
        }

        let decision = ActionSelector::new(self.rules).select(record.verb, &resource);

        debug!(
            operation_id = %record.operation_id,
            resource = %resource.canonical_name,
            singleton = resource.is_singleton,
            detail = resource.is_detail,
            action = %decision.action,
            "Resolved operation"
        );

        Ok(Resolution {
            record,
            resource,
            decision,
        })
    }

    /// Resolve every indexed operation, in operationId order
    pub fn resolve_all(&self) -> Vec<(&'a str, Result<Resolution<'a>>)> {
        self.index
            .operation_ids()
            .map(|id| (id, self.resolve(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidispatch_common::{ActionKind, HttpVerb, PathShape};
    use serde_json::json;

    fn record(operation_id: &str, verb: HttpVerb, path: &str) -> OperationRecord {
        OperationRecord {
            operation_id: operation_id.to_string(),
            path: path.to_string(),
            verb,
            shape: SchemaIndex::path_shape(path).unwrap(),
            description: None,
            parameters: vec![],
            body_fields: vec![],
        }
    }

    #[test]
    fn test_prepare_requires_identifier() {
        let index = SchemaIndex::from_records([record(
            "DeleteCustomersCustomer",
            HttpVerb::Delete,
            "/v1/customers/{customer}",
        )])
        .unwrap();
        let rules = ResolutionRules::default();
        let resolver = OperationResolver::new(&index, &rules);
        let resolution = resolver.resolve("DeleteCustomersCustomer").unwrap();

        // No declared path parameter: falls back to `id`
        assert_eq!(resolution.identifier_name(), "id");
        assert_eq!(resolution.record.shape, PathShape::Detail);

        let request = resolution
            .prepare(json!({ "id": "cus_1" }).as_object().unwrap().clone())
            .unwrap();
        assert_eq!(request.identifier.as_deref(), Some("cus_1"));

        let err = resolution.prepare(Map::new()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingIdentifier { ref parameter, .. } if parameter == "id"
        ));
    }

    #[test]
    fn test_collection_operations_keep_id_in_body() {
        let index = SchemaIndex::from_records([
            record("PostCoupons", HttpVerb::Post, "/v1/coupons"),
            record("GetCoupons", HttpVerb::Get, "/v1/coupons"),
        ])
        .unwrap();
        let rules = ResolutionRules::default();
        let resolver = OperationResolver::new(&index, &rules);

        for (operation_id, action) in [
            ("PostCoupons", ActionKind::Create),
            ("GetCoupons", ActionKind::List),
        ] {
            let resolution = resolver.resolve(operation_id).unwrap();
            assert_eq!(resolution.decision.action, action);
            assert!(!resolution.splits_identifier());

            let params = json!({ "id": "SUMMER", "percent_off": 10 });
            let request = resolution
                .prepare(params.as_object().unwrap().clone())
                .unwrap();
            assert_eq!(request.identifier, None);
            assert_eq!(request.body, *params.as_object().unwrap());
        }
    }

    #[test]
    fn test_known_resources() {
        let index =
            SchemaIndex::from_records([record("GetWidgets", HttpVerb::Get, "/v1/widgets")]).unwrap();
        let rules = ResolutionRules::default();
        let known: BTreeSet<String> = ["customers".to_string()].into_iter().collect();

        let err = OperationResolver::new(&index, &rules)
            .with_known_resources(&known)
            .resolve("GetWidgets")
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ResourceNotFound { ref resource, ref operation_id }
                if resource == "widgets" && operation_id == "GetWidgets"
        ));

        let resolution = OperationResolver::new(&index, &rules)
            .resolve("GetWidgets")
            .unwrap();
        assert_eq!(resolution.decision.action, ActionKind::List);
    }

    #[test]
    fn test_unknown_operation() {
        let index = SchemaIndex::default();
        let rules = ResolutionRules::default();
        assert!(matches!(
            OperationResolver::new(&index, &rules).resolve("GetNothing"),
            Err(DispatchError::OperationNotFound(id)) if id == "GetNothing"
        ));
    }
}
