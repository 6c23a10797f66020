//! OpenAPI 3.0 description loading and indexing
//!
//! Parses OpenAPI documents (JSON or YAML) into a `SchemaIndex`: one
//! `OperationRecord` per operation whose path has the collection shape
//! (`/v1/{segment}`) or the detail shape (`/v1/{segment}/{id}`).
//!
//! ## Usage
//! ```rust,ignore
//! use apidispatch_parser::openapi::OpenApiParser;
//!
//! let index = OpenApiParser::from_file("spec3.json")?.parse()?;
//! let record = index.find_operation("PostCustomers")?;
//! ```

mod index;
mod parser;
mod types;

pub use index::SchemaIndex;
pub use parser::OpenApiParser;
pub use types::*;
