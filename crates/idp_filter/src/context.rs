//! Per-request filtering state.

use crate::error::{FilterError, FilterResult};
use crate::metadata::{AttributeConsumingService, EntityMetadata};
use crate::strings::full_match_regex;
use idp_core::IdPAttribute;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Direction of the traffic being filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Attributes received from another party (e.g. proxied IdP)
    Inbound,
    /// Attributes about to be released to a relying party
    Outbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
        }
    }
}

/// State of one filtering request.
///
/// Built once with the `with_*` methods, then handed to the engine. The
/// prefiltered attributes cannot change after construction; the filtered
/// attributes are written exactly once by the engine.
#[derive(Debug, Clone)]
pub struct AttributeFilterContext {
    direction: Direction,
    issuer: Option<String>,
    requester: Option<String>,
    proxied_requesters: Vec<String>,
    principal: Option<String>,
    authentication_methods: Vec<String>,
    requester_metadata: Option<EntityMetadata>,
    issuer_metadata: Option<EntityMetadata>,
    issuer_scope_patterns: IndexMap<String, Regex>,
    prefiltered: IndexMap<String, IdPAttribute>,
    filtered: IndexMap<String, IdPAttribute>,
    filtered_set: bool,
}

impl AttributeFilterContext {
    /// Create an empty context for the given direction
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            issuer: None,
            requester: None,
            proxied_requesters: Vec::new(),
            principal: None,
            authentication_methods: Vec::new(),
            requester_metadata: None,
            issuer_metadata: None,
            issuer_scope_patterns: IndexMap::new(),
            prefiltered: IndexMap::new(),
            filtered: IndexMap::new(),
            filtered_set: false,
        }
    }

    /// Set the attribute issuer entity ID
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the attribute requester entity ID
    #[must_use]
    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    /// Set the chain of proxied requesters
    #[must_use]
    pub fn with_proxied_requesters<I, S>(mut self, requesters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxied_requesters = requesters.into_iter().map(Into::into).collect();
        self
    }

    /// Set the authenticated principal name
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Set the methods the principal authenticated with
    #[must_use]
    pub fn with_authentication_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authentication_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Set the requester's metadata
    #[must_use]
    pub fn with_requester_metadata(mut self, metadata: EntityMetadata) -> Self {
        self.requester_metadata = Some(metadata);
        self
    }

    /// Set the issuer's metadata. Regular-expression scopes are compiled
    /// here; invalid ones are logged and never match.
    #[must_use]
    pub fn with_issuer_metadata(mut self, metadata: EntityMetadata) -> Self {
        self.issuer_scope_patterns = IndexMap::new();
        for scope in metadata.scopes.iter().filter(|scope| scope.regexp) {
            if self.issuer_scope_patterns.contains_key(&scope.value) {
                continue;
            }
            match full_match_regex(&scope.value) {
                Ok(re) => {
                    self.issuer_scope_patterns.insert(scope.value.clone(), re);
                }
                Err(e) => warn!(
                    issuer = %metadata.entity_id,
                    scope = %scope.value,
                    "Ignoring invalid scope regular expression: {}",
                    e
                ),
            }
        }
        self.issuer_metadata = Some(metadata);
        self
    }

    /// Set the attributes to filter, keyed by attribute id.
    ///
    /// A later attribute with the same id replaces an earlier one.
    #[must_use]
    pub fn with_attributes<I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = IdPAttribute>,
    {
        self.prefiltered = attributes
            .into_iter()
            .map(|attribute| (attribute.id().to_string(), attribute))
            .collect();
        self
    }

    /// Direction being filtered
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Attribute issuer entity ID
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Attribute requester entity ID
    #[must_use]
    pub fn requester(&self) -> Option<&str> {
        self.requester.as_deref()
    }

    /// Proxied requester chain
    #[must_use]
    pub fn proxied_requesters(&self) -> &[String] {
        &self.proxied_requesters
    }

    /// Authenticated principal name
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Authentication methods of the principal
    #[must_use]
    pub fn authentication_methods(&self) -> &[String] {
        &self.authentication_methods
    }

    /// Requester metadata
    #[must_use]
    pub fn requester_metadata(&self) -> Option<&EntityMetadata> {
        self.requester_metadata.as_ref()
    }

    /// Issuer metadata
    #[must_use]
    pub fn issuer_metadata(&self) -> Option<&EntityMetadata> {
        self.issuer_metadata.as_ref()
    }

    /// Compiled form of a regular-expression scope declared in the issuer
    /// metadata; `None` if the pattern was invalid or not declared
    #[must_use]
    pub fn issuer_scope_regex(&self, pattern: &str) -> Option<&Regex> {
        self.issuer_scope_patterns.get(pattern)
    }

    /// Attribute consuming service of the requester, if metadata has one
    #[must_use]
    pub fn attribute_consuming_service(&self) -> Option<&AttributeConsumingService> {
        self.requester_metadata
            .as_ref()
            .and_then(|md| md.attribute_consuming_service.as_ref())
    }

    /// Attributes before filtering
    #[must_use]
    pub fn prefiltered_attributes(&self) -> &IndexMap<String, IdPAttribute> {
        &self.prefiltered
    }

    /// Attributes released by filtering; empty until the engine has run
    #[must_use]
    pub fn filtered_attributes(&self) -> &IndexMap<String, IdPAttribute> {
        &self.filtered
    }

    /// Check whether the engine already ran on this context
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.filtered_set
    }

    /// Record the filtering result.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFiltered` if a result was already recorded
    pub fn set_filtered_attributes(
        &mut self,
        filtered: IndexMap<String, IdPAttribute>,
    ) -> FilterResult<()> {
        if self.filtered_set {
            return Err(FilterError::AlreadyFiltered);
        }
        self.filtered = filtered;
        self.filtered_set = true;
        Ok(())
    }

    /// Take the filtering result out of the context
    #[must_use]
    pub fn into_filtered_attributes(self) -> IndexMap<String, IdPAttribute> {
        self.filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AttributeConsumingService, ShibMdScope};

    #[test]
    fn test_context_new() {
        let ctx = AttributeFilterContext::new(Direction::Outbound);
        assert_eq!(ctx.direction(), Direction::Outbound);
        assert!(ctx.requester().is_none());
        assert!(ctx.prefiltered_attributes().is_empty());
        assert!(ctx.filtered_attributes().is_empty());
        assert!(!ctx.is_filtered());
    }

    #[test]
    fn test_context_attributes_keyed_by_id() {
        let ctx = AttributeFilterContext::new(Direction::Outbound).with_attributes([
            IdPAttribute::new("uid").with_value("jsmith"),
            IdPAttribute::new("mail").with_value("jsmith@example.edu"),
        ]);
        let keys: Vec<&str> = ctx.prefiltered_attributes().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["uid", "mail"]);
    }

    #[test]
    fn test_filtered_written_once() {
        let mut ctx = AttributeFilterContext::new(Direction::Outbound);
        ctx.set_filtered_attributes(IndexMap::new()).unwrap();
        assert!(ctx.is_filtered());
        assert_eq!(
            ctx.set_filtered_attributes(IndexMap::new()),
            Err(FilterError::AlreadyFiltered)
        );
    }

    #[test]
    fn test_acs_navigation() {
        let ctx = AttributeFilterContext::new(Direction::Outbound);
        assert!(ctx.attribute_consuming_service().is_none());

        let ctx = ctx.with_requester_metadata(
            EntityMetadata::new("https://sp.example.org")
                .with_attribute_consuming_service(AttributeConsumingService::new()),
        );
        assert!(ctx.attribute_consuming_service().is_some());
    }

    #[test]
    fn test_issuer_scope_patterns_compiled_once() {
        let ctx = AttributeFilterContext::new(Direction::Outbound).with_issuer_metadata(
            EntityMetadata::new("https://idp.example.edu")
                .with_scope(ShibMdScope::literal("example.edu"))
                .with_scope(ShibMdScope::regex(r".*\.example\.edu"))
                .with_scope(ShibMdScope::regex("(")),
        );
        let re = ctx.issuer_scope_regex(r".*\.example\.edu").unwrap();
        assert!(re.is_match("dept.example.edu"));
        assert!(!re.is_match("dept.example.edu.evil.com"));
        assert!(ctx.issuer_scope_regex("(").is_none());
        assert!(ctx.issuer_scope_regex("example.edu").is_none());
    }

    #[test]
    fn test_direction_json() {
        let d: Direction = serde_json::from_str("\"inbound\"").unwrap();
        assert_eq!(d, Direction::Inbound);
        assert_eq!(d.to_string(), "inbound");
    }
}
