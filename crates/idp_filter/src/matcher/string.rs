//! String and regular-expression matchers over attribute values or scopes.

use super::Matcher;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::strings::{RegexMatch, StringMatch};
use idp_core::{
    Component, ComponentId, ComponentResult, EmptyType, IdPAttribute, IdPAttributeValue, Lifecycle,
    ValueSet,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which part of a value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTarget {
    /// The value itself (the unscoped part for scoped values)
    Value,
    /// The scope of a scoped value
    Scope,
}

impl ValueTarget {
    /// Extract the comparable string.
    ///
    /// The outer `None` marks an unsupported value type; the inner `None` is
    /// a null value.
    fn extract<'a>(
        self,
        value: &'a IdPAttributeValue,
        owner: &ComponentId,
    ) -> Option<Option<&'a str>> {
        match (self, value) {
            (Self::Value, IdPAttributeValue::String(s)) => Some(Some(s)),
            (Self::Value, IdPAttributeValue::ScopedString { value, .. }) => Some(Some(value)),
            (Self::Value, IdPAttributeValue::Empty(EmptyType::ZeroLength)) => Some(Some("")),
            (Self::Value, IdPAttributeValue::Empty(EmptyType::Null)) => Some(None),
            (Self::Scope, IdPAttributeValue::ScopedString { scope, .. }) => Some(Some(scope)),
            (Self::Value, other) => {
                warn!(
                    "{} value of type {} is not a string, skipping",
                    owner.log_prefix(),
                    other.kind_name()
                );
                None
            }
            (Self::Scope, other) => {
                warn!(
                    "{} value of type {} is not scoped, skipping",
                    owner.log_prefix(),
                    other.kind_name()
                );
                None
            }
        }
    }
}

/// Releases values whose value (or scope) equals a configured string
#[derive(Debug)]
pub struct StringMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    target: ValueTarget,
    string: StringMatch,
}

impl StringMatcher {
    /// Create a matcher comparing `target`
    #[must_use]
    pub fn new(id: impl Into<ComponentId>, target: ValueTarget) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            target,
            string: StringMatch::default(),
        }
    }

    /// Set the string to compare against.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_match_string(&mut self, value: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.string.set_match_string(value);
        Ok(())
    }

    /// Set case-insensitive comparison.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_ignore_case(&mut self, ignore_case: bool) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.string.set_ignore_case(ignore_case);
        Ok(())
    }

    /// Compared part of the value
    #[must_use]
    pub fn target(&self) -> ValueTarget {
        self.target
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.string.validate(&self.id)
    }
}

impl_component!(StringMatcher);

impl Matcher for StringMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        _ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        Ok(Some(
            attribute
                .values()
                .iter()
                .filter(|value| {
                    self.target
                        .extract(value, &self.id)
                        .is_some_and(|candidate| self.string.matches(candidate))
                })
                .cloned()
                .collect(),
        ))
    }
}

/// Releases values whose value (or scope) fully matches a regular expression
#[derive(Debug)]
pub struct RegexMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    target: ValueTarget,
    regex: RegexMatch,
}

impl RegexMatcher {
    /// Create a matcher comparing `target`
    #[must_use]
    pub fn new(id: impl Into<ComponentId>, target: ValueTarget) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            target,
            regex: RegexMatch::default(),
        }
    }

    /// Set the regular expression.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_regex(&mut self, pattern: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.regex.set_pattern(pattern);
        Ok(())
    }

    /// Compared part of the value
    #[must_use]
    pub fn target(&self) -> ValueTarget {
        self.target
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.regex.compile(&self.id)
    }
}

impl_component!(RegexMatcher);

impl Matcher for RegexMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        _ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        Ok(Some(
            attribute
                .values()
                .iter()
                .filter(|value| {
                    matches!(
                        self.target.extract(value, &self.id),
                        Some(Some(candidate)) if self.regex.matches(candidate)
                    )
                })
                .cloned()
                .collect(),
        ))
    }
}
