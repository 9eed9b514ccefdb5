use super::PolicyRequirementRule;
use crate::composition::impl_component;
use crate::context::{AttributeFilterContext, Direction};
use idp_core::{Component, ComponentError, ComponentId, ComponentResult, Lifecycle, Tristate};

/// True when the request flows in the configured direction
#[derive(Debug)]
pub struct DirectionRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    direction: Option<Direction>,
}

impl DirectionRule {
    /// Create the rule with no direction
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            direction: None,
        }
    }

    /// Set the direction to match.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_direction(&mut self, direction: Direction) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.direction = Some(direction);
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        if self.direction.is_none() {
            return Err(ComponentError::configuration(self.id.as_str(), "direction is required"));
        }
        Ok(())
    }
}

impl_component!(DirectionRule);

impl PolicyRequirementRule for DirectionRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        Ok(Tristate::from(self.direction == Some(ctx.direction())))
    }
}
