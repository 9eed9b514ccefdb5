//! String and regular-expression rules over a request property: issuer,
//! requester, principal, authentication method or proxied requesters.

use super::PolicyRequirementRule;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::strings::{RegexMatch, StringMatch};
use idp_core::{Component, ComponentId, ComponentResult, Lifecycle, Tristate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Request property a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    /// Attribute issuer entity ID
    Issuer,
    /// Attribute requester entity ID
    Requester,
    /// Authenticated principal name
    Principal,
    /// Any of the principal's authentication methods
    AuthenticationMethod,
    /// Any entry of the proxied requester chain
    ProxiedRequester,
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer => write!(f, "issuer"),
            Self::Requester => write!(f, "requester"),
            Self::Principal => write!(f, "principal"),
            Self::AuthenticationMethod => write!(f, "authentication method"),
            Self::ProxiedRequester => write!(f, "proxied requester"),
        }
    }
}

impl RuleTarget {
    /// Apply `test` to the target's candidates.
    ///
    /// A missing single-valued target (or no authentication methods) is a
    /// `Fail`; an empty proxied chain is simply `False`.
    fn evaluate<F>(self, ctx: &AttributeFilterContext, owner: &ComponentId, test: F) -> Tristate
    where
        F: Fn(&str) -> bool,
    {
        let single = match self {
            Self::Issuer => ctx.issuer(),
            Self::Requester => ctx.requester(),
            Self::Principal => ctx.principal(),
            Self::AuthenticationMethod => {
                let methods = ctx.authentication_methods();
                if methods.is_empty() {
                    warn!("{} no authentication methods, returning FAIL", owner.log_prefix());
                    return Tristate::Fail;
                }
                return Tristate::from(methods.iter().any(|m| test(m.as_str())));
            }
            Self::ProxiedRequester => {
                let chain = ctx.proxied_requesters();
                if chain.is_empty() {
                    debug!("{} no proxied requesters, returning FALSE", owner.log_prefix());
                    return Tristate::False;
                }
                return Tristate::from(chain.iter().any(|r| test(r.as_str())));
            }
        };
        match single {
            Some(candidate) => {
                let result = Tristate::from(test(candidate));
                debug!("{} {} '{}' evaluated to {}", owner.log_prefix(), self, candidate, result);
                result
            }
            None => {
                warn!("{} no {} available, returning FAIL", owner.log_prefix(), self);
                Tristate::Fail
            }
        }
    }
}

/// Compares a request property with a configured string
#[derive(Debug)]
pub struct TargetStringRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    target: RuleTarget,
    string: StringMatch,
}

impl TargetStringRule {
    /// Create a rule inspecting `target`
    #[must_use]
    pub fn new(id: impl Into<ComponentId>, target: RuleTarget) -> Self {
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

    /// Inspected property
    #[must_use]
    pub fn target(&self) -> RuleTarget {
        self.target
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.string.validate(&self.id)
    }
}

impl_component!(TargetStringRule);

impl PolicyRequirementRule for TargetStringRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        Ok(self
            .target
            .evaluate(ctx, &self.id, |candidate| self.string.matches(Some(candidate))))
    }
}

/// Matches a request property against a regular expression
#[derive(Debug)]
pub struct TargetRegexRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    target: RuleTarget,
    regex: RegexMatch,
}

impl TargetRegexRule {
    /// Create a rule inspecting `target`
    #[must_use]
    pub fn new(id: impl Into<ComponentId>, target: RuleTarget) -> Self {
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

    /// Inspected property
    #[must_use]
    pub fn target(&self) -> RuleTarget {
        self.target
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.regex.compile(&self.id)
    }
}

impl_component!(TargetRegexRule);

impl PolicyRequirementRule for TargetRegexRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        Ok(self
            .target
            .evaluate(ctx, &self.id, |candidate| self.regex.matches(candidate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{outbound, ready};
    use idp_core::ComponentError;
    use std::sync::Arc;

    fn string_rule(target: RuleTarget, value: &str, ignore_case: bool) -> Arc<TargetStringRule> {
        let mut rule = TargetStringRule::new("string", target);
        rule.set_match_string(value).unwrap();
        rule.set_ignore_case(ignore_case).unwrap();
        ready(rule)
    }

    fn regex_rule(target: RuleTarget, pattern: &str) -> Arc<TargetRegexRule> {
        let mut rule = TargetRegexRule::new("regex", target);
        rule.set_regex(pattern).unwrap();
        ready(rule)
    }

    #[test]
    fn test_requester_string() {
        let ctx = outbound().with_requester("https://sp.example.org");
        let rule = string_rule(RuleTarget::Requester, "https://sp.example.org", false);
        assert_eq!(rule.matches(&ctx).unwrap(), Tristate::True);
        let rule = string_rule(RuleTarget::Requester, "https://SP.example.org", false);
        assert_eq!(rule.matches(&ctx).unwrap(), Tristate::False);
        let rule = string_rule(RuleTarget::Requester, "https://SP.example.org", true);
        assert_eq!(rule.matches(&ctx).unwrap(), Tristate::True);
    }

    #[test]
    fn test_case_sensitivity() {
        let sensitive = string_rule(RuleTarget::Requester, "issuer", false);
        let insensitive = string_rule(RuleTarget::Requester, "issuer", true);
        let exact = outbound().with_requester("issuer");
        let upper = outbound().with_requester("Issuer");
        assert_eq!(sensitive.matches(&exact).unwrap(), Tristate::True);
        assert_eq!(sensitive.matches(&upper).unwrap(), Tristate::False);
        assert_eq!(insensitive.matches(&upper).unwrap(), Tristate::True);
    }

    #[test]
    fn test_missing_target_fails() {
        let ctx = outbound();
        for target in [
            RuleTarget::Issuer,
            RuleTarget::Requester,
            RuleTarget::Principal,
            RuleTarget::AuthenticationMethod,
        ] {
            assert_eq!(string_rule(target, "x", false).matches(&ctx).unwrap(), Tristate::Fail);
            assert_eq!(regex_rule(target, ".*").matches(&ctx).unwrap(), Tristate::Fail);
        }
    }

    #[test]
    fn test_issuer_and_principal() {
        let ctx = outbound()
            .with_issuer("https://idp.example.edu")
            .with_principal("jsmith");
        assert_eq!(
            regex_rule(RuleTarget::Issuer, r"https://idp\.example\..*").matches(&ctx).unwrap(),
            Tristate::True
        );
        assert_eq!(
            string_rule(RuleTarget::Principal, "jdoe", false).matches(&ctx).unwrap(),
            Tristate::False
        );
    }

    #[test]
    fn test_authentication_method_any() {
        let ctx = outbound().with_authentication_methods([
            "urn:oasis:names:tc:SAML:2.0:ac:classes:Password",
            "https://refeds.org/profile/mfa",
        ]);
        assert_eq!(
            string_rule(RuleTarget::AuthenticationMethod, "https://refeds.org/profile/mfa", false)
                .matches(&ctx)
                .unwrap(),
            Tristate::True
        );
        assert_eq!(
            regex_rule(RuleTarget::AuthenticationMethod, ".*Kerberos").matches(&ctx).unwrap(),
            Tristate::False
        );
    }

    #[test]
    fn test_proxied_requesters() {
        let rule = regex_rule(RuleTarget::ProxiedRequester, r"https://.*\.example\.org");
        assert_eq!(rule.matches(&outbound()).unwrap(), Tristate::False);
        let ctx =
            outbound().with_proxied_requesters(["https://other.net", "https://sp.example.org"]);
        assert_eq!(rule.matches(&ctx).unwrap(), Tristate::True);
        let rule = string_rule(RuleTarget::ProxiedRequester, "https://nope.net", false);
        assert_eq!(rule.matches(&ctx).unwrap(), Tristate::False);
    }

    #[test]
    fn test_unconfigured_rules_rejected() {
        let mut rule = TargetStringRule::new("string", RuleTarget::Issuer);
        assert!(matches!(rule.initialize(), Err(ComponentError::Configuration { .. })));
        let mut rule = TargetRegexRule::new("regex", RuleTarget::Issuer);
        assert!(matches!(rule.initialize(), Err(ComponentError::Configuration { .. })));
    }
}
