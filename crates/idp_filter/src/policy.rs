//! Attribute rules and the policies that group them.

use crate::composition::{impl_component, require_ready};
use crate::context::AttributeFilterContext;
use crate::matcher::Matcher;
use crate::rule::PolicyRequirementRule;
use idp_core::{
    Component, ComponentError, ComponentId, ComponentResult, IdPAttribute, Lifecycle, Tristate,
    ValueSet,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Permit and deny matchers for one attribute.
///
/// At least one of the two must be configured. A rule with only a deny
/// matcher permits nothing on its own but removes values permitted by
/// other active policies.
#[derive(Debug)]
pub struct AttributeRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    attribute_id: Option<String>,
    permit: Option<Arc<dyn Matcher>>,
    deny: Option<Arc<dyn Matcher>>,
}

impl AttributeRule {
    /// Create an empty attribute rule
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            attribute_id: None,
            permit: None,
            deny: None,
        }
    }

    /// Set the attribute this rule applies to.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_id(&mut self, attribute_id: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.attribute_id = Some(attribute_id.into());
        Ok(())
    }

    /// Set the permit matcher.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_permit(&mut self, matcher: Arc<dyn Matcher>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.permit = Some(matcher);
        Ok(())
    }

    /// Set the deny matcher.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_deny(&mut self, matcher: Arc<dyn Matcher>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.deny = Some(matcher);
        Ok(())
    }

    /// Attribute this rule applies to
    #[must_use]
    pub fn attribute_id(&self) -> &str {
        self.attribute_id.as_deref().unwrap_or_default()
    }

    /// Values the permit matcher releases; empty without one or when the
    /// matcher cannot be evaluated.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error from this rule or its matcher
    pub fn permitted_values(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<ValueSet> {
        self.ensure_active()?;
        let Some(matcher) = &self.permit else {
            return Ok(ValueSet::new());
        };
        Ok(matcher.evaluate(attribute, ctx)?.unwrap_or_else(|| {
            warn!(
                "{} permit matcher cannot be evaluated, permitting no values of '{}'",
                self.id.log_prefix(),
                attribute.id()
            );
            ValueSet::new()
        }))
    }

    /// Values the deny matcher removes; empty without one, every value
    /// when the matcher cannot be evaluated.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error from this rule or its matcher
    pub fn denied_values(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<ValueSet> {
        self.ensure_active()?;
        let Some(matcher) = &self.deny else {
            return Ok(ValueSet::new());
        };
        Ok(matcher.evaluate(attribute, ctx)?.unwrap_or_else(|| {
            warn!(
                "{} deny matcher cannot be evaluated, denying every value of '{}'",
                self.id.log_prefix(),
                attribute.id()
            );
            attribute.value_set()
        }))
    }

    fn validate(&mut self) -> ComponentResult<()> {
        if self.attribute_id.as_deref().is_none_or(str::is_empty) {
            return Err(ComponentError::configuration(self.id.as_str(), "attribute id is required"));
        }
        if self.permit.is_none() && self.deny.is_none() {
            return Err(ComponentError::configuration(
                self.id.as_str(),
                "a permit or deny matcher is required",
            ));
        }
        if self.permit.is_some() {
            require_ready(&self.id, "permit matcher", self.permit.as_ref())?;
        }
        if self.deny.is_some() {
            require_ready(&self.id, "deny matcher", self.deny.as_ref())?;
        }
        Ok(())
    }
}

impl_component!(AttributeRule);

/// A requirement rule plus the attribute rules it activates
#[derive(Debug)]
pub struct AttributeFilterPolicy {
    id: ComponentId,
    lifecycle: Lifecycle,
    rule: Option<Arc<dyn PolicyRequirementRule>>,
    attribute_rules: Vec<AttributeRule>,
}

impl AttributeFilterPolicy {
    /// Create an empty policy
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            rule: None,
            attribute_rules: Vec::new(),
        }
    }

    /// Set the requirement rule.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_rule(&mut self, rule: Arc<dyn PolicyRequirementRule>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.rule = Some(rule);
        Ok(())
    }

    /// Set the attribute rules. Rules not yet initialized are initialized
    /// with the policy.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_rules<I>(&mut self, rules: I) -> ComponentResult<()>
    where
        I: IntoIterator<Item = AttributeRule>,
    {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.attribute_rules = rules.into_iter().collect();
        Ok(())
    }

    /// Attribute rules in configuration order
    #[must_use]
    pub fn attribute_rules(&self) -> &[AttributeRule] {
        &self.attribute_rules
    }

    /// Evaluate the requirement rule.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error from this policy or its rule
    pub fn applies(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        match &self.rule {
            Some(rule) => rule.matches(ctx),
            None => Ok(Tristate::Fail),
        }
    }

    fn validate(&mut self) -> ComponentResult<()> {
        require_ready(&self.id, "requirement rule", self.rule.as_ref())?;
        let mut seen = HashSet::new();
        for rule in &mut self.attribute_rules {
            if !seen.insert(rule.id().as_str().to_string()) {
                return Err(ComponentError::configuration(
                    self.id.as_str(),
                    format!("duplicate attribute rule '{}'", rule.id()),
                ));
            }
            if !rule.is_initialized() {
                rule.initialize()?;
            }
        }
        Ok(())
    }
}

impl Component for AttributeFilterPolicy {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn initialize(&mut self) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.validate()?;
        self.lifecycle.mark_initialized(&self.id)
    }

    fn destroy(&self) {
        for rule in &self.attribute_rules {
            rule.destroy();
        }
        self.lifecycle.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ScopeMatchesShibMdScopeMatcher;
    use crate::testing::{attribute, constant, fixed, outbound, ready, strings};

    fn attribute_rule(permit: Option<&[&str]>, deny: Option<&[&str]>) -> AttributeRule {
        let mut rule = AttributeRule::new("policy/affiliation");
        rule.set_attribute_id("affiliation").unwrap();
        if let Some(values) = permit {
            rule.set_permit(fixed_slice(values)).unwrap();
        }
        if let Some(values) = deny {
            rule.set_deny(fixed_slice(values)).unwrap();
        }
        rule
    }

    fn fixed_slice(values: &[&str]) -> Arc<dyn Matcher> {
        match values {
            [a] => fixed([*a]),
            [a, b] => fixed([*a, *b]),
            _ => fixed([]),
        }
    }

    #[test]
    fn test_attribute_rule_requires_a_matcher() {
        let mut rule = attribute_rule(None, None);
        assert!(matches!(rule.initialize(), Err(ComponentError::Configuration { .. })));
        let mut rule = AttributeRule::new("r");
        rule.set_permit(fixed(["a"])).unwrap();
        assert!(matches!(rule.initialize(), Err(ComponentError::Configuration { .. })));
    }

    #[test]
    fn test_attribute_rule_values() {
        let attr = attribute("affiliation", ["staff", "member", "student"]);
        let mut rule = attribute_rule(Some(&["staff", "member"]), Some(&["member"]));
        rule.initialize().unwrap();
        assert_eq!(rule.attribute_id(), "affiliation");
        assert_eq!(
            rule.permitted_values(&attr, &outbound()).unwrap(),
            strings(["staff", "member"])
        );
        assert_eq!(rule.denied_values(&attr, &outbound()).unwrap(), strings(["member"]));

        let mut deny_only = attribute_rule(None, Some(&["member"]));
        deny_only.initialize().unwrap();
        assert!(deny_only.permitted_values(&attr, &outbound()).unwrap().is_empty());
    }

    #[test]
    fn test_unevaluable_matchers_fail_closed() {
        let attr = attribute("eppn", ["jsmith"]);
        let scope: Arc<dyn Matcher> = ready(ScopeMatchesShibMdScopeMatcher::new("scope"));

        let mut rule = AttributeRule::new("policy/eppn");
        rule.set_attribute_id("eppn").unwrap();
        rule.set_permit(scope.clone()).unwrap();
        rule.set_deny(scope).unwrap();
        rule.initialize().unwrap();

        assert!(rule.permitted_values(&attr, &outbound()).unwrap().is_empty());
        assert_eq!(rule.denied_values(&attr, &outbound()).unwrap(), strings(["jsmith"]));
    }

    #[test]
    fn test_policy_initializes_rules() {
        let mut policy = AttributeFilterPolicy::new("policy");
        policy.set_rule(constant(Tristate::True)).unwrap();
        policy.set_attribute_rules([attribute_rule(Some(&["staff"]), None)]).unwrap();
        policy.initialize().unwrap();
        assert!(policy.attribute_rules()[0].is_initialized());
        assert_eq!(policy.applies(&outbound()).unwrap(), Tristate::True);

        policy.destroy();
        assert!(policy.attribute_rules()[0].lifecycle().is_destroyed());
        assert!(matches!(policy.applies(&outbound()), Err(ComponentError::Destroyed { .. })));
    }

    #[test]
    fn test_policy_requires_rule() {
        let mut policy = AttributeFilterPolicy::new("policy");
        assert!(matches!(policy.initialize(), Err(ComponentError::Configuration { .. })));
    }

    #[test]
    fn test_policy_rejects_duplicate_attribute_rules() {
        let mut policy = AttributeFilterPolicy::new("policy");
        policy.set_rule(constant(Tristate::True)).unwrap();
        policy
            .set_attribute_rules([
                attribute_rule(Some(&["staff"]), None),
                attribute_rule(Some(&["member"]), None),
            ])
            .unwrap();
        let err = policy.initialize().unwrap_err();
        assert!(err.to_string().contains("duplicate attribute rule"));
    }

    #[test]
    fn test_policy_propagates_attribute_rule_error() {
        let mut policy = AttributeFilterPolicy::new("policy");
        policy.set_rule(constant(Tristate::True)).unwrap();
        policy.set_attribute_rules([attribute_rule(None, None)]).unwrap();
        let err = policy.initialize().unwrap_err();
        assert_eq!(err.component(), "policy/affiliation");
        assert!(!policy.is_initialized());
    }
}
