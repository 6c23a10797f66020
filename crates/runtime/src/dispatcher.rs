//! Runtime-mode dispatch
//!
//! Special cases are checked first. Everything else goes through the shared
//! resolver, the registry and one capability call.

use crate::capability::ActionCall;
use crate::protocol::{InvokeRequest, InvokeResponse};
use crate::registry::ResourceRegistry;
use apidispatch_common::{
    DispatchError, InvocationRequest, OperationRecord, ResolutionRules, Result, SpecialCase,
};
use apidispatch_parser::{OperationResolver, ParameterSplitter, SchemaIndex};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Invokes operations by identifier against a resource registry
///
/// All state is immutable and shared, so a dispatcher can be cloned into
/// concurrent tasks freely.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    index: Arc<SchemaIndex>,
    rules: Arc<ResolutionRules>,
    registry: Arc<ResourceRegistry>,
}

impl Dispatcher {
    pub fn new(
        index: Arc<SchemaIndex>,
        rules: Arc<ResolutionRules>,
        registry: Arc<ResourceRegistry>,
    ) -> Self {
        Self {
            index,
            rules,
            registry,
        }
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn rules(&self) -> &ResolutionRules {
        &self.rules
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Invoke an operation and return the backend payload unmodified
    pub async fn invoke(&self, operation_id: &str, parameters: Map<String, Value>) -> Result<Value> {
        if let Some(special) = self.rules.special_case(operation_id) {
            return self.invoke_special(special, parameters).await;
        }

        let resolution = OperationResolver::new(&self.index, &self.rules).resolve(operation_id)?;
        let resource = resolution.resource.canonical_name.as_str();
        let capability = self.registry.resolve(resource, operation_id)?;
        let request = resolution.prepare(parameters)?;

        info!(
            operation_id,
            resource,
            action = %resolution.decision.action,
            identifier = request.identifier.as_deref().unwrap_or(""),
            "Invoking operation"
        );

        let call = ActionCall {
            operation_id,
            identifier_name: resolution.identifier_name(),
            action: resolution.decision.action,
        };
        call.perform(capability.as_ref(), request).await
    }

    /// Invoke and fold any error into a `{ "message", "trace"? }` response
    pub async fn handle(&self, request: InvokeRequest) -> InvokeResponse {
        let result = self.invoke(&request.operation_id, request.parameters).await;
        if let Err(e) = &result {
            warn!(
                operation_id = %request.operation_id,
                error = %e,
                trace = e.trace().unwrap_or_default(),
                "Invocation failed"
            );
        }
        InvokeResponse::from(result)
    }

    async fn invoke_special(
        &self,
        special: &SpecialCase,
        parameters: Map<String, Value>,
    ) -> Result<Value> {
        let operation_id = special.operation_id.as_str();
        let mut last = Value::Null;

        for step in &special.steps {
            let capability = self.registry.resolve(&step.resource, operation_id)?;
            let identifier_name = step
                .identifier
                .as_deref()
                .unwrap_or(OperationRecord::DEFAULT_IDENTIFIER);

            let request = match &step.identifier {
                Some(name) => {
                    let split = ParameterSplitter::split(parameters.clone(), name);
                    if split.identifier.is_none() {
                        return Err(DispatchError::MissingIdentifier {
                            operation_id: operation_id.to_string(),
                            parameter: name.clone(),
                        });
                    }
                    InvocationRequest {
                        identifier: split.identifier,
                        body: split.body,
                    }
                }
                None => InvocationRequest {
                    identifier: None,
                    body: parameters.clone(),
                },
            };

            debug!(
                operation_id,
                resource = %step.resource,
                action = %step.action,
                "Running special-case step"
            );

            let call = ActionCall {
                operation_id,
                identifier_name,
                action: step.action,
            };
            last = call.perform(capability.as_ref(), request).await?;
        }

        info!(operation_id, steps = special.steps.len(), "Invoked special case");
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, MockCapability};
    use apidispatch_common::{HttpVerb, ParameterDescriptor, ParameterLocation, PrimitiveKind};
    use mockall::predicate::eq;
    use serde_json::json;

    fn customers_index() -> SchemaIndex {
        let record = OperationRecord {
            operation_id: "PostCustomersCustomer".to_string(),
            path: "/v1/customers/{customer}".to_string(),
            verb: HttpVerb::Post,
            shape: SchemaIndex::path_shape("/v1/customers/{customer}").unwrap(),
            description: None,
            parameters: vec![ParameterDescriptor {
                name: "customer".to_string(),
                location: ParameterLocation::Path,
                required: true,
                kind: PrimitiveKind::String,
                description: None,
            }],
            body_fields: vec![],
        };
        SchemaIndex::from_records([record]).unwrap()
    }

    fn dispatcher(registry: ResourceRegistry) -> Dispatcher {
        Dispatcher::new(
            Arc::new(customers_index()),
            Arc::new(ResolutionRules::default()),
            Arc::new(registry),
        )
    }

    fn bag(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_invoke_splits_identifier() {
        let mut customers = MockCapability::new();
        customers
            .expect_update()
            .with(
                eq(Some("cus_1".to_string())),
                eq(bag(json!({ "email": "a@b.com" }))),
            )
            .times(1)
            .returning(|_, _| Ok(json!({ "id": "cus_1", "email": "a@b.com" })));

        let registry = ResourceRegistry::new().with("customers", Arc::new(customers));
        let result = dispatcher(registry)
            .invoke(
                "PostCustomersCustomer",
                bag(json!({ "customer": "cus_1", "email": "a@b.com" })),
            )
            .await
            .unwrap();
        assert_eq!(result["email"], "a@b.com");
    }

    #[tokio::test]
    async fn test_special_case_bypasses_index() {
        let mut transactions = MockCapability::new();
        transactions
            .expect_retrieve()
            .with(eq(Some("txn_1".to_string())), eq(Map::new()))
            .times(1)
            .returning(|_, _| Ok(json!({ "id": "txn_1" })));

        let registry = ResourceRegistry::new()
            .with("balanceTransactions", Arc::new(transactions) as Arc<dyn Capability>);
        let result = dispatcher(registry)
            .invoke("GetBalanceHistoryId", bag(json!({ "id": "txn_1" })))
            .await
            .unwrap();
        assert_eq!(result, json!({ "id": "txn_1" }));
    }

    #[tokio::test]
    async fn test_special_case_requires_identifier() {
        let mut transactions = MockCapability::new();
        transactions.expect_retrieve().never();

        let registry = ResourceRegistry::new().with("balanceTransactions", Arc::new(transactions));
        let err = dispatcher(registry)
            .invoke("GetBalanceHistoryId", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingIdentifier { ref parameter, .. } if parameter == "id"
        ));
    }

    #[tokio::test]
    async fn test_handle_folds_errors() {
        let response = dispatcher(ResourceRegistry::new())
            .handle(InvokeRequest::new("PostCustomersCustomer", Map::new()))
            .await;
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "message": "Resource not found: customers (operation PostCustomersCustomer)" })
        );
    }
}
