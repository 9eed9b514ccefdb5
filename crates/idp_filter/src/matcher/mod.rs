//! Value-level matchers.
//!
//! A matcher decides which values of one attribute may be released. It
//! never invents values: the result is always a subset of the attribute's
//! values. "Nothing matched" is an empty set. "Could not evaluate" (a
//! script error, missing metadata) is `None` from [`Matcher::evaluate`] and
//! stays distinct through AND/OR/NOT, so a failure under a NOT never turns
//! into releasing everything. `Err` is reserved for lifecycle misuse.

mod bridge;
mod logic;
mod metadata;
mod scope;
mod script;
mod string;

pub use bridge::MatcherFromRule;
pub use logic::{AndMatcher, NotMatcher, OrMatcher};
pub use metadata::AttributeInMetadataMatcher;
pub use scope::ScopeMatchesShibMdScopeMatcher;
pub use script::ScriptedMatcher;
pub use string::{RegexMatcher, StringMatcher, ValueTarget};

use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use idp_core::{Component, ComponentId, ComponentResult, IdPAttribute, Lifecycle, ValueSet};
use std::fmt;

/// Selects the releasable values of an attribute
pub trait Matcher: Component + Send + Sync + fmt::Debug {
    /// Values of `attribute` that match, or `None` when the matcher could
    /// not be evaluated for this request.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` or `Destroyed` when called outside the
    /// component's initialized lifetime
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>>;

    /// Values of `attribute` that match; empty when nothing matched or the
    /// matcher could not be evaluated.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` or `Destroyed` when called outside the
    /// component's initialized lifetime
    fn matching_values(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<ValueSet> {
        Ok(self.evaluate(attribute, ctx)?.unwrap_or_default())
    }
}

/// Matches every value
#[derive(Debug)]
pub struct AnyMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
}

impl AnyMatcher {
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

impl_component!(AnyMatcher);

impl Matcher for AnyMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        _ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        Ok(Some(attribute.value_set()))
    }
}
