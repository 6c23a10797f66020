//! Source generation for apidispatch
//!
//! Emission mode: every indexed operation becomes one Rust file holding a
//! typed parameter struct and an async wrapper that performs the same
//! split/lookup/call sequence the runtime dispatcher performs. A `mod.rs`
//! index re-exports the wrappers alphabetically.

mod templates;

use apidispatch_common::{
    ActionKind, DispatchError, HttpVerb, OperationRecord, ParameterDescriptor, ParameterLocation,
    PrimitiveKind, ResolutionRules, ResourceResolution, Result,
};
use apidispatch_parser::{OperationResolver, Resolution, SchemaIndex};
use heck::{ToSnakeCase, ToUpperCamelCase};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tera::Tera;
use tracing::{info, warn};

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// One field of a generated parameter struct
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedField {
    /// Rust identifier
    pub name: String,
    /// Key in the parameter bag, renamed via serde when it differs from `name`
    pub wire_name: String,
    pub location: ParameterLocation,
    pub kind: PrimitiveKind,
    pub required: bool,
    pub doc: Vec<String>,
}

/// One generated operation wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedOperation {
    pub operation_id: String,
    pub verb: HttpVerb,
    pub path: String,
    pub module_name: String,
    pub function_name: String,
    pub params_type: String,
    pub fields: Vec<EmittedField>,
    pub resource: ResourceResolution,
    pub action: ActionKind,
    /// `ActionKind` variant name used in generated code
    pub action_variant: String,
    pub identifier_name: String,
    /// Whether the wrapper splits the identifier out of its parameters
    pub splits_identifier: bool,
    pub requires_identifier: bool,
    pub doc: Vec<String>,
    /// Rendered module source
    #[serde(skip)]
    pub source: String,
}

/// An operation left out of emission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedOperation {
    pub operation_id: String,
    pub reason: String,
}

/// Everything produced by one emission pass
#[derive(Debug, Clone, Default)]
pub struct Emission {
    /// Ordered by operationId
    pub operations: Vec<EmittedOperation>,
    pub skipped: Vec<SkippedOperation>,
}

/// Summary returned after writing generated sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    /// Operation files written, not counting the index
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedOperation>,
}

/// Operation emitter
///
/// Resolves each indexed operation with the shared resolver and renders it:
/// - `{function_name}.rs` per operation
/// - `mod.rs` index
pub struct OperationEmitter<'a> {
    index: &'a SchemaIndex,
    rules: &'a ResolutionRules,
    tera: Tera,
}

impl<'a> OperationEmitter<'a> {
    /// Create a new emitter over an index and its resolution rules
    pub fn new(index: &'a SchemaIndex, rules: &'a ResolutionRules) -> Result<Self> {
        let tera = templates::load_templates()?;
        Ok(Self { index, rules, tera })
    }

    /// Resolve and render every indexed operation
    ///
    /// Operations that fail to resolve, or that are special cases handled
    /// only by the runtime dispatcher, are skipped with a warning.
    pub fn emit(&self) -> Result<Emission> {
        let resolver = OperationResolver::new(self.index, self.rules);
        let mut emission = Emission::default();
        let mut used_names = BTreeSet::new();

        for (operation_id, resolved) in resolver.resolve_all() {
            if self.rules.special_case(operation_id).is_some() {
                warn!(operation_id, "Skipping special-case operation");
                emission.skipped.push(SkippedOperation {
                    operation_id: operation_id.to_string(),
                    reason: "special case handled at runtime only".to_string(),
                });
                continue;
            }

            let resolution = match resolved {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!(operation_id, error = %e, "Skipping unresolvable operation");
                    emission.skipped.push(SkippedOperation {
                        operation_id: operation_id.to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut function_name =
                export_name(&resolution.resource, resolution.decision.action, self.rules);
            if used_names.contains(&function_name) {
                let fallback = operation_id.to_snake_case();
                warn!(
                    operation_id,
                    name = %function_name,
                    fallback = %fallback,
                    "Export name collision, using operationId"
                );
                function_name = fallback;
            }
            used_names.insert(function_name.clone());

            let mut operation = build_operation(&resolution, function_name);
            operation.source = self.render_operation(&operation)?;
            emission.operations.push(operation);
        }

        Ok(emission)
    }

    /// Render the `mod.rs` index for a set of emitted operations
    pub fn render_index(&self, operations: &[EmittedOperation]) -> Result<String> {
        let mut sorted: Vec<&EmittedOperation> = operations.iter().collect();
        sorted.sort_by(|a, b| a.module_name.cmp(&b.module_name));

        let mut context = tera::Context::new();
        context.insert("operations", &sorted);
        self.tera
            .render("mod.rs", &context)
            .map_err(|e| DispatchError::Generation(format!("Template error: {:?}", e)))
    }

    /// Generate all operation files and the index into a directory
    pub fn generate_to_directory(&self, output_dir: &Path) -> Result<GenerationReport> {
        fs::create_dir_all(output_dir).map_err(|e| {
            DispatchError::Generation(format!("Failed to create output directory: {}", e))
        })?;

        let emission = self.emit()?;

        for operation in &emission.operations {
            let output_path = output_dir.join(format!("{}.rs", operation.module_name));
            fs::write(&output_path, &operation.source).map_err(|e| {
                DispatchError::Generation(format!(
                    "Failed to write {}.rs: {}",
                    operation.module_name, e
                ))
            })?;
            info!(
                operation_id = %operation.operation_id,
                path = %output_path.display(),
                "Wrote operation"
            );
        }

        let index = self.render_index(&emission.operations)?;
        fs::write(output_dir.join("mod.rs"), index)
            .map_err(|e| DispatchError::Generation(format!("Failed to write mod.rs: {}", e)))?;

        let report = GenerationReport {
            count: emission.operations.len(),
            skipped: emission.skipped,
        };
        info!(
            count = report.count,
            skipped = report.skipped.len(),
            output = %output_dir.display(),
            "Generation complete"
        );
        Ok(report)
    }

    fn render_operation(&self, operation: &EmittedOperation) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("op", operation);
        self.tera.render("operation.rs", &context).map_err(|e| {
            DispatchError::Generation(format!(
                "Template error in {}: {:?}",
                operation.operation_id, e
            ))
        })
    }
}

/// Generate operation wrappers (convenience function)
pub fn generate_operations(
    index: &SchemaIndex,
    rules: &ResolutionRules,
    output_path: &Path,
) -> Result<GenerationReport> {
    OperationEmitter::new(index, rules)?.generate_to_directory(output_path)
}

/// Public function name for a resolved operation
///
/// `{action}_{resource}` where the resource is the last dotted segment,
/// singularized unless the action is List or the resource is an inherent
/// singleton. Singleton views of a collection (`GetAccount`) are singular.
pub fn export_name(
    resource: &ResourceResolution,
    action: ActionKind,
    rules: &ResolutionRules,
) -> String {
    let last = resource
        .canonical_name
        .rsplit('.')
        .next()
        .unwrap_or(&resource.canonical_name);

    let keep_plural =
        action == ActionKind::List || rules.is_inherent_singleton(&resource.canonical_name);
    let noun = if keep_plural {
        last
    } else {
        last.strip_suffix('s').unwrap_or(last)
    };

    format!("{}_{}", action.as_str(), noun.to_snake_case())
}

/// Rust identifier for a wire parameter name
fn field_ident(wire_name: &str) -> String {
    let mut ident = wire_name.to_snake_case();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("field_{}", ident);
    }
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

fn doc_lines(description: Option<&str>) -> Vec<String> {
    description
        .map(|d| d.trim().lines().map(|l| l.trim_end().to_string()).collect())
        .unwrap_or_default()
}

fn build_operation(resolution: &Resolution<'_>, function_name: String) -> EmittedOperation {
    let record = resolution.record;
    let identifier_name = resolution.identifier_name().to_string();
    let requires_identifier = resolution.requires_identifier();

    let mut fields = collect_fields(record);
    if requires_identifier && !fields.iter().any(|f| f.wire_name == identifier_name) {
        fields.insert(
            0,
            EmittedField {
                name: field_ident(&identifier_name),
                wire_name: identifier_name.clone(),
                location: ParameterLocation::Path,
                kind: PrimitiveKind::String,
                required: true,
                doc: vec![],
            },
        );
    }

    EmittedOperation {
        operation_id: record.operation_id.clone(),
        verb: record.verb,
        path: record.path.clone(),
        module_name: function_name.clone(),
        params_type: format!("{}Params", function_name.to_upper_camel_case()),
        function_name,
        fields,
        resource: resolution.resource.clone(),
        action: resolution.decision.action,
        action_variant: resolution.decision.action.as_str().to_upper_camel_case(),
        identifier_name,
        splits_identifier: resolution.splits_identifier(),
        requires_identifier,
        doc: doc_lines(record.description.as_deref()),
        source: String::new(),
    }
}

/// Path, then query, then body descriptors, de-duplicated by name
fn collect_fields(record: &OperationRecord) -> Vec<EmittedField> {
    let path = record
        .parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path);
    let query = record
        .parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Query);
    let descriptors = path.chain(query).chain(record.body_fields.iter());

    let mut seen_wire = BTreeSet::new();
    let mut seen_ident = BTreeSet::new();
    let mut fields = Vec::new();

    for descriptor in descriptors {
        if !seen_wire.insert(descriptor.name.as_str()) {
            continue;
        }
        let field = emitted_field(descriptor);
        if !seen_ident.insert(field.name.clone()) {
            warn!(
                operation_id = %record.operation_id,
                parameter = %descriptor.name,
                "Dropping parameter whose Rust name collides with another"
            );
            continue;
        }
        fields.push(field);
    }

    fields
}

fn emitted_field(descriptor: &ParameterDescriptor) -> EmittedField {
    EmittedField {
        name: field_ident(&descriptor.name),
        wire_name: descriptor.name.clone(),
        location: descriptor.location,
        kind: descriptor.kind,
        required: descriptor.required,
        doc: doc_lines(descriptor.description.as_deref()),
    }
}
