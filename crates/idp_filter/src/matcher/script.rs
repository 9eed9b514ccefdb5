use super::Matcher;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::script::{ScriptEvaluator, ScriptInput, ScriptOutput};
use idp_core::{
    Component, ComponentError, ComponentId, ComponentResult, IdPAttribute, Lifecycle, ValueSet,
};
use std::sync::Arc;
use tracing::warn;

/// Matcher delegating to a script returning the values to release
#[derive(Debug)]
pub struct ScriptedMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    script: Option<Arc<dyn ScriptEvaluator>>,
}

impl ScriptedMatcher {
    /// Create the matcher with no script
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

impl_component!(ScriptedMatcher);

impl Matcher for ScriptedMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(script) = &self.script else {
            return Ok(None);
        };
        let input = ScriptInput {
            context: ctx,
            attribute: Some(attribute),
        };
        match script.evaluate(&input) {
            Ok(ScriptOutput::Values(values)) => Ok(Some(
                attribute
                    .values()
                    .iter()
                    .filter(|value| values.contains(value))
                    .cloned()
                    .collect(),
            )),
            Ok(other) => {
                warn!(
                    "{} script '{}' returned {:?} instead of values",
                    self.id.log_prefix(),
                    script.name(),
                    other
                );
                Ok(None)
            }
            Err(e) => {
                warn!("{} {}", self.id.log_prefix(), e);
                Ok(None)
            }
        }
    }
}
