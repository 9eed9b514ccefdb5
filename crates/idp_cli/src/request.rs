//! JSON request documents: the input to one filtering run.

use idp_core::{IdPAttribute, IdPAttributeValue};
use idp_filter::{AttributeFilterContext, Direction, EntityMetadata};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Traffic direction, outbound unless stated
    #[serde(default = "outbound")]
    pub direction: Direction,
    /// Attribute issuer entity ID
    #[serde(default)]
    pub issuer: Option<String>,
    /// Attribute requester entity ID
    #[serde(default)]
    pub requester: Option<String>,
    /// Proxied requester chain
    #[serde(default)]
    pub proxied_requesters: Vec<String>,
    /// Authenticated principal
    #[serde(default)]
    pub principal: Option<String>,
    /// Authentication methods used
    #[serde(default)]
    pub authentication_methods: Vec<String>,
    /// Resolved attributes
    #[serde(default)]
    pub attributes: Vec<IdPAttribute>,
    /// Requester metadata snapshot
    #[serde(default)]
    pub requester_metadata: Option<EntityMetadata>,
    /// Issuer metadata snapshot
    #[serde(default)]
    pub issuer_metadata: Option<EntityMetadata>,
}

fn outbound() -> Direction {
    Direction::Outbound
}

impl FilterRequest {
    /// Build the filtering context
    #[must_use]
    pub fn into_context(self) -> AttributeFilterContext {
        let mut ctx = AttributeFilterContext::new(self.direction)
            .with_proxied_requesters(self.proxied_requesters)
            .with_authentication_methods(self.authentication_methods)
            .with_attributes(self.attributes);
        if let Some(issuer) = self.issuer {
            ctx = ctx.with_issuer(issuer);
        }
        if let Some(requester) = self.requester {
            ctx = ctx.with_requester(requester);
        }
        if let Some(principal) = self.principal {
            ctx = ctx.with_principal(principal);
        }
        if let Some(metadata) = self.requester_metadata {
            ctx = ctx.with_requester_metadata(metadata);
        }
        if let Some(metadata) = self.issuer_metadata {
            ctx = ctx.with_issuer_metadata(metadata);
        }
        ctx
    }
}

/// Released values keyed by attribute id
pub fn released_values(
    attributes: IndexMap<String, IdPAttribute>,
) -> IndexMap<String, Vec<IdPAttributeValue>> {
    attributes
        .into_iter()
        .map(|(id, attribute)| (id, attribute.values().to_vec()))
        .collect()
}
