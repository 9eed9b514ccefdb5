use super::Matcher;
use crate::composition::{impl_component, require_ready};
use crate::context::AttributeFilterContext;
use crate::rule::PolicyRequirementRule;
use idp_core::{
    Component, ComponentId, ComponentResult, IdPAttribute, Lifecycle, Tristate, ValueSet,
};
use std::sync::Arc;

/// Releases every value when a policy rule holds, nothing otherwise
#[derive(Debug)]
pub struct MatcherFromRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    rule: Option<Arc<dyn PolicyRequirementRule>>,
}

impl MatcherFromRule {
    /// Create the bridge with no rule
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            rule: None,
        }
    }

    /// Set the rule.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_rule(&mut self, rule: Arc<dyn PolicyRequirementRule>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.rule = Some(rule);
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        require_ready(&self.id, "rule", self.rule.as_ref())
    }
}

impl_component!(MatcherFromRule);

impl Matcher for MatcherFromRule {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(rule) = &self.rule else {
            return Ok(None);
        };
        Ok(match rule.matches(ctx)? {
            Tristate::True => Some(attribute.value_set()),
            Tristate::False => Some(ValueSet::new()),
            Tristate::Fail => None,
        })
    }
}
