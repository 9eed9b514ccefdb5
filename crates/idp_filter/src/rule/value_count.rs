use super::PolicyRequirementRule;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use idp_core::{Component, ComponentError, ComponentId, ComponentResult, Lifecycle, Tristate};
use tracing::{debug, warn};

/// True when an attribute has between `minimum` and `maximum` values,
/// inclusive
#[derive(Debug)]
pub struct NumOfAttributeValuesRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    attribute_id: Option<String>,
    minimum: usize,
    maximum: usize,
}

impl NumOfAttributeValuesRule {
    /// Create the rule. Bounds default to `0..=usize::MAX`.
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            attribute_id: None,
            minimum: 0,
            maximum: usize::MAX,
        }
    }

    /// Set the attribute to count.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_id(&mut self, attribute_id: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.attribute_id = Some(attribute_id.into());
        Ok(())
    }

    /// Set the lower bound.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_minimum(&mut self, minimum: usize) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.minimum = minimum;
        Ok(())
    }

    /// Set the upper bound.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_maximum(&mut self, maximum: usize) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.maximum = maximum;
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        if self.attribute_id.as_deref().is_none_or(str::is_empty) {
            return Err(ComponentError::configuration(self.id.as_str(), "attribute id is required"));
        }
        if self.minimum > self.maximum {
            return Err(ComponentError::configuration(
                self.id.as_str(),
                format!("minimum {} exceeds maximum {}", self.minimum, self.maximum),
            ));
        }
        Ok(())
    }
}

impl_component!(NumOfAttributeValuesRule);

impl PolicyRequirementRule for NumOfAttributeValuesRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let attribute_id = self.attribute_id.as_deref().unwrap_or_default();
        let Some(attribute) = ctx.prefiltered_attributes().get(attribute_id) else {
            warn!(
                "{} attribute '{}' not found, returning FALSE",
                self.id.log_prefix(),
                attribute_id
            );
            return Ok(Tristate::False);
        };
        let count = attribute.values().len();
        debug!(
            "{} attribute '{}' has {} values",
            self.id.log_prefix(),
            attribute_id,
            count
        );
        Ok(Tristate::from((self.minimum..=self.maximum).contains(&count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{attribute, outbound, ready};

    fn rule(min: usize, max: usize) -> std::sync::Arc<NumOfAttributeValuesRule> {
        let mut rule = NumOfAttributeValuesRule::new("count");
        rule.set_attribute_id("affiliation").unwrap();
        rule.set_minimum(min).unwrap();
        rule.set_maximum(max).unwrap();
        ready(rule)
    }

    #[test]
    fn test_bounds_inclusive() {
        let ctx = outbound().with_attributes([attribute("affiliation", ["a", "b"])]);
        assert_eq!(rule(2, 2).matches(&ctx).unwrap(), Tristate::True);
        assert_eq!(rule(0, 1).matches(&ctx).unwrap(), Tristate::False);
        assert_eq!(rule(3, 5).matches(&ctx).unwrap(), Tristate::False);
        assert_eq!(rule(1, 3).matches(&ctx).unwrap(), Tristate::True);
    }

    #[test]
    fn test_exactly_one() {
        let one = outbound().with_attributes([attribute("affiliation", ["staff"])]);
        let none = outbound().with_attributes([attribute("affiliation", [])]);
        let two = outbound().with_attributes([attribute("affiliation", ["staff", "member"])]);
        assert_eq!(rule(1, 1).matches(&one).unwrap(), Tristate::True);
        assert_eq!(rule(1, 1).matches(&none).unwrap(), Tristate::False);
        assert_eq!(rule(1, 1).matches(&two).unwrap(), Tristate::False);
    }

    #[test]
    fn test_absent_attribute_is_false() {
        assert_eq!(rule(0, 10).matches(&outbound()).unwrap(), Tristate::False);
    }

    #[test]
    fn test_invalid_configuration() {
        let mut r = NumOfAttributeValuesRule::new("count");
        assert!(matches!(r.initialize(), Err(ComponentError::Configuration { .. })));

        let mut r = NumOfAttributeValuesRule::new("count");
        r.set_attribute_id("affiliation").unwrap();
        r.set_minimum(3).unwrap();
        r.set_maximum(1).unwrap();
        let err = r.initialize().unwrap_err();
        assert!(err.to_string().contains("minimum 3 exceeds maximum 1"));
    }
}
