//! Resource registry: canonical resource name → capability

use crate::capability::Capability;
use apidispatch_common::{DispatchError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Lookup table from resource names to capabilities
///
/// Built once at startup and read concurrently afterwards. Dotted names
/// resolve the first segment here and every following segment through
/// `Capability::child`.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Capability>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level capability
    pub fn register(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.resources.insert(name.into(), capability);
    }

    /// Builder-style `register`
    pub fn with(mut self, name: impl Into<String>, capability: Arc<dyn Capability>) -> Self {
        self.register(name, capability);
        self
    }

    /// Look up a possibly dotted resource name
    pub fn lookup(&self, dotted_name: &str) -> Option<Arc<dyn Capability>> {
        let mut segments = dotted_name.split('.');
        let root = self.resources.get(segments.next()?)?.clone();
        segments.try_fold(root, |parent, segment| parent.child(segment))
    }

    /// Look up a resource for an operation, failing with `ResourceNotFound`
    pub fn resolve(&self, dotted_name: &str, operation_id: &str) -> Result<Arc<dyn Capability>> {
        self.lookup(dotted_name)
            .ok_or_else(|| DispatchError::ResourceNotFound {
                resource: dotted_name.to_string(),
                operation_id: operation_id.to_string(),
            })
    }

    /// Top-level resource names
    pub fn names(&self) -> BTreeSet<String> {
        self.resources.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockCapability;
    use mockall::predicate::eq;

    #[test]
    fn test_lookup_top_level() {
        let registry = ResourceRegistry::new().with("customers", Arc::new(MockCapability::new()));

        assert!(registry.lookup("customers").is_some());
        assert!(registry.lookup("invoices").is_none());
        assert!(registry.lookup("").is_none());
        assert_eq!(registry.names().into_iter().collect::<Vec<_>>(), vec!["customers"]);
    }

    #[test]
    fn test_lookup_nested() {
        let mut accounts = MockCapability::new();
        accounts
            .expect_child()
            .with(eq("externalAccounts"))
            .returning(|_| Some(Arc::new(MockCapability::new()) as Arc<dyn Capability>));
        accounts
            .expect_child()
            .with(eq("persons"))
            .returning(|_| None);

        let registry = ResourceRegistry::new().with("accounts", Arc::new(accounts));

        assert!(registry.lookup("accounts.externalAccounts").is_some());
        assert!(registry.lookup("accounts.persons").is_none());
    }

    #[test]
    fn test_resolve_reports_operation() {
        let registry = ResourceRegistry::new();
        let err = registry.resolve("widgets", "GetWidgets").err().unwrap();
        assert!(matches!(
            err,
            DispatchError::ResourceNotFound { ref resource, ref operation_id }
                if resource == "widgets" && operation_id == "GetWidgets"
        ));
    }
}
