//! Scope check against the issuer's `shibmd:Scope` metadata.

use super::Matcher;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::metadata::ShibMdScope;
use crate::strings::compare_strings;
use idp_core::{Component, ComponentId, ComponentResult, IdPAttribute, Lifecycle, ValueSet};
use tracing::warn;

/// Releases scoped values whose scope the issuer declares in metadata
#[derive(Debug)]
pub struct ScopeMatchesShibMdScopeMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
}

impl ScopeMatchesShibMdScopeMatcher {
    /// Create the matcher
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
        }
    }

    fn validate(&mut self) -> ComponentResult<()> {
        Ok(())
    }
}

fn scope_declared(scope: &str, declared: &[ShibMdScope], ctx: &AttributeFilterContext) -> bool {
    declared.iter().any(|entry| {
        if entry.regexp {
            ctx.issuer_scope_regex(&entry.value).is_some_and(|re| re.is_match(scope))
        } else {
            compare_strings(Some(scope), Some(&entry.value), true)
        }
    })
}

impl_component!(ScopeMatchesShibMdScopeMatcher);

impl Matcher for ScopeMatchesShibMdScopeMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(metadata) = ctx.issuer_metadata() else {
            warn!(
                "{} no issuer metadata, matcher cannot be evaluated",
                self.id.log_prefix()
            );
            return Ok(None);
        };
        let mut result = ValueSet::new();
        for value in attribute.values() {
            match value.scope() {
                Some(scope) if scope_declared(scope, &metadata.scopes, ctx) => {
                    result.insert(value.clone());
                }
                Some(_) => {}
                None => warn!(
                    "{} value of type {} is not scoped, skipping",
                    self.id.log_prefix(),
                    value.kind_name()
                ),
            }
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityMetadata;
    use crate::testing::{outbound, ready};
    use idp_core::IdPAttributeValue;

    fn eppn() -> IdPAttribute {
        IdPAttribute::new("eppn").with_values([
            IdPAttributeValue::scoped("a", "Example.edu"),
            IdPAttributeValue::scoped("b", "dept.example.org"),
            IdPAttributeValue::scoped("c", "evil.com"),
            IdPAttributeValue::string("plain"),
        ])
    }

    #[test]
    fn test_literal_and_regex_scopes() {
        let ctx = outbound().with_issuer_metadata(
            EntityMetadata::new("https://idp.example.edu")
                .with_scope(ShibMdScope::literal("example.edu"))
                .with_scope(ShibMdScope::regex(r".*\.example\.org")),
        );
        let m = ready(ScopeMatchesShibMdScopeMatcher::new("scope"));
        let result = m.matching_values(&eppn(), &ctx).unwrap();
        let ids: Vec<String> = result.iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["a@Example.edu", "b@dept.example.org"]);
    }

    #[test]
    fn test_no_issuer_metadata() {
        let m = ready(ScopeMatchesShibMdScopeMatcher::new("scope"));
        assert_eq!(m.evaluate(&eppn(), &outbound()).unwrap(), None);
        assert!(m.matching_values(&eppn(), &outbound()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_regex_scope_skipped() {
        let ctx = outbound().with_issuer_metadata(
            EntityMetadata::new("https://idp.example.edu")
                .with_scope(ShibMdScope::regex("(")),
        );
        let m = ready(ScopeMatchesShibMdScopeMatcher::new("scope"));
        assert!(m.matching_values(&eppn(), &ctx).unwrap().is_empty());
    }
}
