//! Requester entity attribute rules (entity categories and the like).

use super::PolicyRequirementRule;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::metadata::EntityAttribute;
use crate::strings::RegexMatch;
use idp_core::{Component, ComponentError, ComponentId, ComponentResult, Lifecycle, Tristate};
use tracing::warn;

#[derive(Debug)]
enum ValueMatch {
    Exact(Option<String>),
    Regex(RegexMatch),
}

/// True when the requester's metadata carries an entity attribute with the
/// configured name and a matching value
#[derive(Debug)]
pub struct EntityAttributeRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    attribute_name: Option<String>,
    name_format: Option<String>,
    value: ValueMatch,
}

impl EntityAttributeRule {
    /// Rule comparing values exactly
    #[must_use]
    pub fn exact(id: impl Into<ComponentId>) -> Self {
        Self::with_match(id.into(), ValueMatch::Exact(None))
    }

    /// Rule matching values against a regular expression
    #[must_use]
    pub fn regex(id: impl Into<ComponentId>) -> Self {
        Self::with_match(id.into(), ValueMatch::Regex(RegexMatch::default()))
    }

    fn with_match(id: ComponentId, value: ValueMatch) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::new(),
            attribute_name: None,
            name_format: None,
            value,
        }
    }

    /// Set the entity attribute name.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_name(&mut self, name: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.attribute_name = Some(name.into());
        Ok(())
    }

    /// Restrict to entity attributes with this name format.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_name_format(&mut self, name_format: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.name_format = Some(name_format.into());
        Ok(())
    }

    /// Set the value (exact) or pattern (regex).
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_value(&mut self, value: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        match &mut self.value {
            ValueMatch::Exact(exact) => *exact = Some(value.into()),
            ValueMatch::Regex(regex) => regex.set_pattern(value),
        }
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        if self.attribute_name.is_none() {
            return Err(ComponentError::configuration(
                self.id.as_str(),
                "attribute name is required",
            ));
        }
        match &mut self.value {
            ValueMatch::Exact(None) => {
                Err(ComponentError::configuration(self.id.as_str(), "value is required"))
            }
            ValueMatch::Exact(Some(_)) => Ok(()),
            ValueMatch::Regex(regex) => regex.compile(&self.id),
        }
    }

    fn selects(&self, attribute: &EntityAttribute) -> bool {
        if self.attribute_name.as_deref() != Some(attribute.name.as_str()) {
            return false;
        }
        match (&self.name_format, &attribute.name_format) {
            (Some(wanted), Some(declared)) => wanted == declared,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    fn value_matches(&self, candidate: &str) -> bool {
        match &self.value {
            ValueMatch::Exact(value) => value.as_deref() == Some(candidate),
            ValueMatch::Regex(regex) => regex.matches(candidate),
        }
    }
}

impl_component!(EntityAttributeRule);

impl PolicyRequirementRule for EntityAttributeRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let Some(metadata) = ctx.requester_metadata() else {
            warn!("{} no requester metadata, returning FAIL", self.id.log_prefix());
            return Ok(Tristate::Fail);
        };
        let found = metadata
            .entity_attributes
            .iter()
            .filter(|attribute| self.selects(attribute))
            .flat_map(|attribute| attribute.values.iter())
            .any(|value| self.value_matches(value));
        Ok(Tristate::from(found))
    }
}
