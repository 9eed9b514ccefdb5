use super::PolicyRequirementRule;
use crate::composition::{impl_component, require_ready};
use crate::context::AttributeFilterContext;
use crate::matcher::Matcher;
use idp_core::{Component, ComponentError, ComponentId, ComponentResult, Lifecycle, Tristate};
use std::sync::Arc;
use tracing::{debug, warn};

/// True when a matcher selects at least one value of an attribute
#[derive(Debug)]
pub struct RuleFromMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    attribute_id: Option<String>,
    matcher: Option<Arc<dyn Matcher>>,
}

impl RuleFromMatcher {
    /// Create the bridge with no attribute or matcher
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            attribute_id: None,
            matcher: None,
        }
    }

    /// Set the attribute the matcher runs over.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_id(&mut self, attribute_id: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.attribute_id = Some(attribute_id.into());
        Ok(())
    }

    /// Set the matcher.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_matcher(&mut self, matcher: Arc<dyn Matcher>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.matcher = Some(matcher);
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        if self.attribute_id.is_none() {
            return Err(ComponentError::configuration(self.id.as_str(), "attribute id is required"));
        }
        require_ready(&self.id, "matcher", self.matcher.as_ref())
    }
}

impl_component!(RuleFromMatcher);

impl PolicyRequirementRule for RuleFromMatcher {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let (Some(attribute_id), Some(matcher)) = (&self.attribute_id, &self.matcher) else {
            return Ok(Tristate::Fail);
        };
        let Some(attribute) = ctx.prefiltered_attributes().get(attribute_id) else {
            debug!(
                "{} attribute '{}' not found, returning FALSE",
                self.id.log_prefix(),
                attribute_id
            );
            return Ok(Tristate::False);
        };
        Ok(match matcher.evaluate(attribute, ctx)? {
            Some(values) => Tristate::from(!values.is_empty()),
            None => {
                warn!(
                    "{} matcher cannot be evaluated, returning FAIL",
                    self.id.log_prefix()
                );
                Tristate::Fail
            }
        })
    }
}
