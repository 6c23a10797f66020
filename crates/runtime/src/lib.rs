//! Runtime dispatch for apidispatch
//!
//! Resolves an operationId against a `SchemaIndex` and invokes the matching
//! action on a `Capability` looked up in a `ResourceRegistry`.
//!
//! ```no_run
//! # async fn run() -> apidispatch_common::Result<()> {
//! use apidispatch_common::ResolutionRules;
//! use apidispatch_runtime::{resource_names, Dispatcher, RestCapability, RestConfig};
//! use std::sync::Arc;
//!
//! let index = apidispatch_parser::load_schema_index("spec3.json")?;
//! let rules = ResolutionRules::default();
//! let registry = RestCapability::registry(
//!     RestConfig::new("https://api.example.com"),
//!     resource_names(&index, &rules),
//! )?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(index), Arc::new(rules), Arc::new(registry));
//! let customers = dispatcher.invoke("GetCustomers", Default::default()).await?;
//! # Ok(())
//! # }
//! ```

mod capability;
mod dispatcher;
mod protocol;
mod registry;
mod rest;

pub use capability::{ActionCall, Capability};
pub use dispatcher::Dispatcher;
pub use protocol::{ErrorPayload, InvokeRequest, InvokeResponse};
pub use registry::ResourceRegistry;
pub use rest::{flatten_params, RestCapability, RestConfig};

use apidispatch_common::ResolutionRules;
use apidispatch_parser::{OperationResolver, SchemaIndex};
use std::collections::BTreeSet;

/// Top-level resource names needed to serve every resolvable operation
///
/// Dotted names contribute their first segment; special-case steps are
/// included.
pub fn resource_names(index: &SchemaIndex, rules: &ResolutionRules) -> BTreeSet<String> {
    let resolved = OperationResolver::new(index, rules)
        .resolve_all()
        .into_iter()
        .filter_map(|(_, resolution)| resolution.ok())
        .map(|resolution| resolution.resource.canonical_name);

    let special = rules
        .special_cases
        .iter()
        .flat_map(|special| special.steps.iter())
        .map(|step| step.resource.clone());

    resolved
        .chain(special)
        .filter_map(|name| name.split('.').next().map(str::to_string))
        .collect()
}
