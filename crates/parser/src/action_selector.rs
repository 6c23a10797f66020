//! Action selection
//!
//! | verb      | singleton | detail | action   |
//! |-----------|-----------|--------|----------|
//! | get       | true      | -      | Retrieve |
//! | get       | false     | true   | Retrieve |
//! | get       | false     | false  | List     |
//! | post      | -         | true   | Update   |
//! | post      | -         | false  | Create   |
//! | put/patch | -         | -      | Update   |
//! | delete    | -         | -      | Delete   |
//!
//! Resource-specific renames (e.g. subscriptions delete -> cancel) are
//! applied afterwards from `ResolutionRules::action_renames`.

use apidispatch_common::{
    ActionDecision, ActionKind, HttpVerb, ResolutionRules, ResourceResolution,
};

/// Chooses the generic action for a classified operation
pub struct ActionSelector<'a> {
    rules: &'a ResolutionRules,
}

impl<'a> ActionSelector<'a> {
    pub fn new(rules: &'a ResolutionRules) -> Self {
        Self { rules }
    }

    pub fn select(&self, verb: HttpVerb, resource: &ResourceResolution) -> ActionDecision {
        let action = Self::base_action(verb, resource.is_singleton, resource.is_detail);
        ActionDecision {
            action: self.rules.rename_action(&resource.canonical_name, action),
        }
    }

    /// The rename-free action table
    pub fn base_action(verb: HttpVerb, is_singleton: bool, is_detail: bool) -> ActionKind {
        match verb {
            HttpVerb::Get if is_singleton || is_detail => ActionKind::Retrieve,
            HttpVerb::Get => ActionKind::List,
            HttpVerb::Post if is_detail => ActionKind::Update,
            HttpVerb::Post => ActionKind::Create,
            HttpVerb::Put | HttpVerb::Patch => ActionKind::Update,
            HttpVerb::Delete => ActionKind::Delete,
        }
    }
}
