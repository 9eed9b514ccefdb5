use super::PolicyRequirementRule;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::script::{ScriptEvaluator, ScriptInput, ScriptOutput};
use idp_core::{Component, ComponentError, ComponentId, ComponentResult, Lifecycle, Tristate};
use std::sync::Arc;
use tracing::warn;

/// Rule delegating to a script returning a boolean
#[derive(Debug)]
pub struct ScriptedRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    script: Option<Arc<dyn ScriptEvaluator>>,
}

impl ScriptedRule {
    /// Create the rule with no script
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            script: None,
        }
    }

    /// Set the script.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_script(&mut self, script: Arc<dyn ScriptEvaluator>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.script = Some(script);
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        if self.script.is_none() {
            return Err(ComponentError::configuration(self.id.as_str(), "script is required"));
        }
        Ok(())
    }
}

impl_component!(ScriptedRule);

impl PolicyRequirementRule for ScriptedRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let Some(script) = &self.script else {
            return Ok(Tristate::Fail);
        };
        let input = ScriptInput {
            context: ctx,
            attribute: None,
        };
        Ok(match script.evaluate(&input) {
            Ok(ScriptOutput::Bool(result)) => Tristate::from(result),
            Ok(other) => {
                warn!(
                    "{} script '{}' returned {:?} instead of a boolean, returning FAIL",
                    self.id.log_prefix(),
                    script.name(),
                    other
                );
                Tristate::Fail
            }
            Err(e) => {
                warn!("{} {}, returning FAIL", self.id.log_prefix(), e);
                Tristate::Fail
            }
        })
    }
}
