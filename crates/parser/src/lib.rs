//! OpenAPI operation resolution
//!
//! This crate turns an OpenAPI description into a `SchemaIndex` and resolves
//! each operation to a generic resource action.
//!
//! ## Resolution Strategy
//!
//! Resolution is driven purely by naming conventions and path shape:
//! - `PostCustomers` on `/v1/customers` → `customers.create`
//! - `PostCustomersCustomer` on `/v1/customers/{customer}` → `customers.update`
//! - `GetSetupIntents` on `/v1/setup_intents` → `setupIntents.list`
//! - `DeleteSubscriptionsSubscription` → `subscriptions.cancel`
//!
//! Irregularities (singleton views, dotted nested resources, action renames)
//! come from `ResolutionRules`, never from the name parser.

mod action_selector;
mod classifier;
pub mod openapi;
mod operation_mapper;
mod param_splitter;
mod resolver;
mod type_mapper;

pub use action_selector::ActionSelector;
pub use classifier::ResourceClassifier;
pub use openapi::{OpenApiParser, SchemaIndex};
pub use operation_mapper::{OperationNameParser, ParsedOperationName};
pub use param_splitter::{ParameterSplitter, SplitParameters};
pub use resolver::{OperationResolver, Resolution};
pub use type_mapper::TypeMapper;

use apidispatch_common::Result;
use std::path::Path;

/// Load an OpenAPI description and index its operations
///
/// # Arguments
/// * `path` - JSON or YAML OpenAPI document
///
/// # Returns
/// * `SchemaIndex` - Operations with collection or detail shaped paths
pub fn load_schema_index<P: AsRef<Path>>(path: P) -> Result<SchemaIndex> {
    OpenApiParser::from_file(path)?.parse()
}
