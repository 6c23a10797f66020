//! Operation name parsing
//!
//! Splits an operationId such as `PostCustomersCustomer` into a resource name
//! candidate and a detail flag. The heuristic assumes single-entity operations
//! repeat the singular resource name as their second token. Irregular names
//! are corrected by the classifier's rules, never here.

use apidispatch_common::{DispatchError, HttpVerb, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static OPERATION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Get|Post|Put|Patch|Delete)([A-Z][A-Za-z0-9]*)$")
        .expect("valid operationId pattern")
});

/// Result of parsing an operationId
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOperationName {
    /// Verb taken from the operationId prefix
    pub verb: HttpVerb,
    /// Capitalized word tokens following the verb
    pub tokens: Vec<String>,
    pub resource_candidate: String,
    pub is_detail: bool,
}

/// Parses operationIds into resource candidates
pub struct OperationNameParser;

impl OperationNameParser {
    /// Parse an operationId
    ///
    /// # Examples
    /// ```
    /// use apidispatch_parser::OperationNameParser;
    ///
    /// let parsed = OperationNameParser::parse("PostCustomersCustomer").unwrap();
    /// assert_eq!(parsed.resource_candidate, "customers");
    /// assert!(parsed.is_detail);
    ///
    /// let parsed = OperationNameParser::parse("GetSetupIntents").unwrap();
    /// assert_eq!(parsed.resource_candidate, "setupIntents");
    /// assert!(!parsed.is_detail);
    /// ```
    pub fn parse(operation_id: &str) -> Result<ParsedOperationName> {
        let captures = OPERATION_ID
            .captures(operation_id)
            .ok_or_else(|| DispatchError::InvalidOperationId(operation_id.to_string()))?;

        let verb: HttpVerb = captures[1].parse()?;
        let tokens = Self::tokenize(&captures[2]);

        let first = tokens[0].to_lowercase();
        let first_singular = first.strip_suffix('s').unwrap_or(&first);
        let second = tokens.get(1).map(|t| t.to_lowercase()).unwrap_or_default();

        let is_detail = tokens.len() > 1 && first_singular == second;

        let resource_candidate = if is_detail {
            first.clone()
        } else {
            let mut candidate = first.clone();
            for token in &tokens[1..] {
                candidate.push_str(token);
            }
            candidate
        };

        Ok(ParsedOperationName {
            verb,
            tokens,
            resource_candidate,
            is_detail,
        })
    }

    /// Split at every upper-case letter; the first token keeps its capital
    pub fn tokenize(name: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for c in name.chars() {
            match tokens.last_mut() {
                Some(current) if !c.is_ascii_uppercase() => current.push(c),
                _ => tokens.push(c.to_string()),
            }
        }
        tokens
    }
}
