//! Policy requirement rules.
//!
//! A rule decides whether a policy applies to the request. Its answer is a
//! [`Tristate`]: `Fail` means the rule could not be evaluated (missing
//! request data, broken script) and is never treated as a match. `Err` is
//! reserved for lifecycle misuse.

mod bridge;
mod direction;
mod entity_attribute;
mod logic;
mod script;
mod target;
mod value_count;

pub use bridge::RuleFromMatcher;
pub use direction::DirectionRule;
pub use entity_attribute::EntityAttributeRule;
pub use logic::{AndRule, NotRule, OrRule};
pub use script::ScriptedRule;
pub use target::{RuleTarget, TargetRegexRule, TargetStringRule};
pub use value_count::NumOfAttributeValuesRule;

use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use idp_core::{Component, ComponentId, ComponentResult, Lifecycle, Tristate};
use std::fmt;

/// Decides whether a policy applies to a request
pub trait PolicyRequirementRule: Component + Send + Sync + fmt::Debug {
    /// Evaluate the rule.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` or `Destroyed` when called outside the
    /// component's initialized lifetime
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate>;
}

/// Always true
#[derive(Debug)]
pub struct AnyRule {
    id: ComponentId,
    lifecycle: Lifecycle,
}

impl AnyRule {
    /// Create the rule
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
        }
    }

    fn validate(&mut self) -> ComponentResult<()> {
        Ok(())
    }
}

impl_component!(AnyRule);

impl PolicyRequirementRule for AnyRule {
    fn matches(&self, _ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        Ok(Tristate::True)
    }
}
