//! Resolution rules loaded from YAML
//!
//! The naming heuristics in the parser are deliberately naive. Every
//! irregularity of a concrete API surface lives here instead, as data that
//! both the runtime dispatcher and the source generator consume:
//!
//! - `exceptions`: resource-name corrections, optionally conditioned on
//!   verb, shape or operationId
//! - `singletons`: resources with no collection semantics
//! - `singleton_views`: verb/shape/operationId combinations that address the
//!   singleton view of an otherwise-collection resource
//! - `action_renames`: resource-specific action substitutions
//! - `special_cases`: operationIds that bypass table-driven resolution
//! - `reconcile_path_suffix`: whether a detail-shaped path may override the
//!   name parser (see `ResourceClassifier`)

use crate::{ActionKind, DispatchError, HttpVerb, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root structure of a resolution rules document
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResolutionRules {
    /// Rules format version
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub exceptions: Vec<ResourceException>,
    #[serde(default)]
    pub singletons: Vec<String>,
    #[serde(default)]
    pub singleton_views: Vec<SingletonView>,
    #[serde(default)]
    pub action_renames: Vec<ActionRename>,
    #[serde(default)]
    pub special_cases: Vec<SpecialCase>,
    /// Strip a trailing camel-cased path parameter from the resource candidate
    /// and treat the operation as detail when the path is detail-shaped
    #[serde(default = "default_reconcile_path_suffix")]
    pub reconcile_path_suffix: bool,
}

fn default_version() -> u32 {
    1
}

fn default_reconcile_path_suffix() -> bool {
    true
}

/// Optional conditions a rule applies under. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<HttpVerb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl RuleCondition {
    pub fn matches(&self, verb: HttpVerb, detail: bool, operation_id: &str) -> bool {
        self.verb.map_or(true, |v| v == verb)
            && self.detail.map_or(true, |d| d == detail)
            && self
                .operation_id
                .as_deref()
                .map_or(true, |id| id == operation_id)
    }
}

/// Maps a raw resource-name candidate to a corrected (possibly dotted) name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceException {
    pub candidate: String,
    pub resource: String,
    #[serde(default)]
    pub when: RuleCondition,
}

/// Marks a collection resource as a singleton under some conditions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SingletonView {
    pub resource: String,
    #[serde(default)]
    pub when: RuleCondition,
}

/// Replaces one action by another for a specific resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActionRename {
    pub resource: String,
    pub from: ActionKind,
    pub to: ActionKind,
}

/// An operation handled by a fixed sequence of capability calls
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpecialCase {
    pub operation_id: String,
    /// Calls performed in order; the last result is returned
    pub steps: Vec<SpecialStep>,
}

/// One capability call inside a special case
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpecialStep {
    pub resource: String,
    pub action: ActionKind,
    /// Parameter carrying the identifier for this call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Default for ResolutionRules {
    fn default() -> Self {
        Self {
            version: default_version(),
            exceptions: vec![ResourceException {
                candidate: "account".to_string(),
                resource: "accounts".to_string(),
                when: RuleCondition {
                    verb: Some(HttpVerb::Get),
                    detail: Some(false),
                    operation_id: None,
                },
            }],
            singletons: vec!["balance".to_string()],
            singleton_views: vec![SingletonView {
                resource: "accounts".to_string(),
                when: RuleCondition {
                    verb: Some(HttpVerb::Get),
                    detail: Some(false),
                    operation_id: Some("GetAccount".to_string()),
                },
            }],
            action_renames: vec![ActionRename {
                resource: "subscriptions".to_string(),
                from: ActionKind::Delete,
                to: ActionKind::Cancel,
            }],
            special_cases: vec![
                SpecialCase {
                    operation_id: "GetBalanceHistory".to_string(),
                    steps: vec![SpecialStep {
                        resource: "balanceTransactions".to_string(),
                        action: ActionKind::List,
                        identifier: None,
                    }],
                },
                SpecialCase {
                    operation_id: "GetBalanceHistoryId".to_string(),
                    steps: vec![SpecialStep {
                        resource: "balanceTransactions".to_string(),
                        action: ActionKind::Retrieve,
                        identifier: Some("id".to_string()),
                    }],
                },
            ],
            reconcile_path_suffix: default_reconcile_path_suffix(),
        }
    }
}

impl ResolutionRules {
    /// Load rules from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DispatchError::Parse(format!("Failed to read rules file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content).map_err(|e| {
            DispatchError::Parse(format!("Failed to parse rules YAML from {:?}: {}", path, e))
        })
    }

    /// Parse rules from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize rules back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Corrected resource name for a candidate, if an exception applies
    pub fn exception_for(
        &self,
        candidate: &str,
        verb: HttpVerb,
        detail: bool,
        operation_id: &str,
    ) -> Option<&str> {
        self.exceptions
            .iter()
            .find(|e| e.candidate == candidate && e.when.matches(verb, detail, operation_id))
            .map(|e| e.resource.as_str())
    }

    /// Whether a resolved resource behaves as a singleton for this operation
    pub fn is_singleton(
        &self,
        resource: &str,
        verb: HttpVerb,
        detail: bool,
        operation_id: &str,
    ) -> bool {
        self.is_inherent_singleton(resource)
            || self
                .singleton_views
                .iter()
                .any(|v| v.resource == resource && v.when.matches(verb, detail, operation_id))
    }

    /// Whether a resource is a singleton everywhere, not only through a view
    pub fn is_inherent_singleton(&self, resource: &str) -> bool {
        self.singletons.iter().any(|s| s == resource)
    }

    /// Apply resource-specific action renames
    pub fn rename_action(&self, resource: &str, action: ActionKind) -> ActionKind {
        self.action_renames
            .iter()
            .find(|r| r.resource == resource && r.from == action)
            .map(|r| r.to)
            .unwrap_or(action)
    }

    pub fn special_case(&self, operation_id: &str) -> Option<&SpecialCase> {
        self.special_cases
            .iter()
            .find(|s| s.operation_id == operation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_rules() {
        let rules = ResolutionRules::default();

        assert_eq!(
            rules.exception_for("account", HttpVerb::Get, false, "GetAccount"),
            Some("accounts")
        );
        assert_eq!(
            rules.exception_for("account", HttpVerb::Post, false, "PostAccount"),
            None
        );
        assert!(rules.is_singleton("balance", HttpVerb::Get, false, "GetBalance"));
        assert!(rules.is_singleton("accounts", HttpVerb::Get, false, "GetAccount"));
        assert!(!rules.is_singleton("accounts", HttpVerb::Get, false, "GetAccounts"));
        assert!(rules.is_inherent_singleton("balance"));
        assert!(!rules.is_inherent_singleton("accounts"));
        assert_eq!(
            rules.rename_action("subscriptions", ActionKind::Delete),
            ActionKind::Cancel
        );
        assert_eq!(
            rules.rename_action("customers", ActionKind::Delete),
            ActionKind::Delete
        );
        assert!(rules.special_case("GetBalanceHistoryId").is_some());
    }

    #[test]
    fn test_yaml_roundtrip_preserves_defaults() {
        let rules = ResolutionRules::default();
        let yaml = rules.to_yaml().unwrap();
        assert_eq!(ResolutionRules::from_yaml(&yaml).unwrap(), rules);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
exceptions:
  - candidate: externalAccounts
    resource: accounts.externalAccounts
singletons: [balance, balanceSettings]
action_renames:
  - resource: subscriptionItems
    from: delete
    to: cancel
"#
        )
        .unwrap();

        let rules = ResolutionRules::load(file.path()).unwrap();
        assert_eq!(rules.version, 1);
        assert_eq!(
            rules.exception_for("externalAccounts", HttpVerb::Post, true, "Anything"),
            Some("accounts.externalAccounts")
        );
        assert!(rules.is_singleton("balanceSettings", HttpVerb::Post, false, "PostBalanceSettings"));
        assert!(rules.special_cases.is_empty());
        assert!(rules.reconcile_path_suffix);
    }

    #[test]
    fn test_reconcile_path_suffix_can_be_disabled() {
        let rules = ResolutionRules::from_yaml("reconcile_path_suffix: false\n").unwrap();
        assert!(!rules.reconcile_path_suffix);
        assert!(rules.to_yaml().unwrap().contains("reconcile_path_suffix: false"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ResolutionRules::load(Path::new("/nonexistent/rules.yaml"));
        assert!(matches!(result, Err(DispatchError::Parse(_))));
    }
}
