//! Resource classification
//!
//! Turns the name parser's raw candidate into a canonical resource name and
//! decides whether the resource is a singleton, using `ResolutionRules`.

use crate::operation_mapper::ParsedOperationName;
use apidispatch_common::{OperationRecord, PathShape, ResolutionRules, ResourceResolution};
use heck::ToUpperCamelCase;
use tracing::trace;

/// Maps resource candidates to canonical resource names
pub struct ResourceClassifier<'a> {
    rules: &'a ResolutionRules,
}

impl<'a> ResourceClassifier<'a> {
    pub fn new(rules: &'a ResolutionRules) -> Self {
        Self { rules }
    }

    /// Classify a parsed operation name against its record
    pub fn classify(
        &self,
        record: &OperationRecord,
        parsed: &ParsedOperationName,
    ) -> ResourceResolution {
        let (candidate, is_detail) = if self.rules.reconcile_path_suffix {
            reconcile_with_path(record, parsed)
        } else {
            (parsed.resource_candidate.clone(), parsed.is_detail)
        };

        let canonical_name = self
            .rules
            .exception_for(&candidate, record.verb, is_detail, &record.operation_id)
            .map(str::to_string)
            .unwrap_or(candidate);

        let is_singleton = self.rules.is_singleton(
            &canonical_name,
            record.verb,
            is_detail,
            &record.operation_id,
        );

        ResourceResolution {
            canonical_name,
            is_singleton,
            is_detail,
        }
    }
}

/// Align the parser's detail flag with the record's path shape
///
/// Enabled by `ResolutionRules::reconcile_path_suffix`.
/// A detail-shaped path whose name did not repeat the singular resource
/// (`GetSetupIntentsIntent` on `/v1/setup_intents/{intent}`) ends with the
/// camel-cased path parameter. That suffix is dropped and the operation is
/// treated as a detail operation.
fn reconcile_with_path(record: &OperationRecord, parsed: &ParsedOperationName) -> (String, bool) {
    let candidate = parsed.resource_candidate.clone();
    if parsed.is_detail || record.shape != PathShape::Detail {
        return (candidate, parsed.is_detail);
    }

    let suffix = record.identifier_name().to_upper_camel_case();
    match candidate.strip_suffix(&suffix) {
        Some(trimmed) if !trimmed.is_empty() => {
            trace!(
                operation_id = %record.operation_id,
                from = %candidate,
                to = %trimmed,
                "Trimmed identifier suffix from resource candidate"
            );
            (trimmed.to_string(), true)
        }
        _ => (candidate, false),
    }
}
