//! Resource capabilities
//!
//! A capability is one named backend resource exposing the generic actions.
//! Nested resources (`accounts.externalAccounts`) are reached through
//! `Capability::child`.

use apidispatch_common::{ActionKind, DispatchError, InvocationRequest, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A backend resource with the generic CRUD-style methods
///
/// Singleton resources receive `None` as the identifier for `retrieve` and
/// `update`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Capability: Send + Sync {
    async fn list(&self, params: Map<String, Value>) -> Result<Value>;

    async fn retrieve(&self, id: Option<String>, params: Map<String, Value>) -> Result<Value>;

    async fn create(&self, params: Map<String, Value>) -> Result<Value>;

    async fn update(&self, id: Option<String>, params: Map<String, Value>) -> Result<Value>;

    async fn delete(&self, id: String, params: Map<String, Value>) -> Result<Value>;

    async fn cancel(&self, id: String, params: Map<String, Value>) -> Result<Value>;

    /// Nested capability by (camelCase) name
    fn child(&self, _name: &str) -> Option<Arc<dyn Capability>> {
        None
    }
}

/// One action to perform against a capability
#[derive(Debug, Clone, Copy)]
pub struct ActionCall<'a> {
    pub operation_id: &'a str,
    pub identifier_name: &'a str,
    pub action: ActionKind,
}

impl ActionCall<'_> {
    /// Call the capability method matching the action
    pub async fn perform(
        &self,
        capability: &dyn Capability,
        request: InvocationRequest,
    ) -> Result<Value> {
        let InvocationRequest { identifier, body } = request;

        match self.action {
            ActionKind::List => capability.list(body).await,
            ActionKind::Retrieve => capability.retrieve(identifier, body).await,
            ActionKind::Create => capability.create(body).await,
            ActionKind::Update => capability.update(identifier, body).await,
            ActionKind::Delete => capability.delete(self.require(identifier)?, body).await,
            ActionKind::Cancel => capability.cancel(self.require(identifier)?, body).await,
        }
    }

    fn require(&self, identifier: Option<String>) -> Result<String> {
        identifier.ok_or_else(|| DispatchError::MissingIdentifier {
            operation_id: self.operation_id.to_string(),
            parameter: self.identifier_name.to_string(),
        })
    }
}
