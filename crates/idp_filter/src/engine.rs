//! The attribute filter engine.
//!
//! Evaluates every policy against the request, then releases, per
//! attribute, the values permitted by some active policy and denied by
//! none. Policies whose requirement rule returns `Fail` are inactive.

use crate::context::AttributeFilterContext;
use crate::error::{FilterError, FilterResult};
use crate::policy::AttributeFilterPolicy;
use idp_core::{
    Component, ComponentError, ComponentId, ComponentResult, IdPAttribute, Lifecycle, Tristate,
    ValueSet,
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Compiled set of filter policies
#[derive(Debug)]
pub struct AttributeFilter {
    id: ComponentId,
    lifecycle: Lifecycle,
    policies: Vec<AttributeFilterPolicy>,
}

impl AttributeFilter {
    /// Create an engine with no policies
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            policies: Vec::new(),
        }
    }

    /// Set the policies, evaluated in order. Policies not yet initialized
    /// are initialized with the engine.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_policies<I>(&mut self, policies: I) -> ComponentResult<()>
    where
        I: IntoIterator<Item = AttributeFilterPolicy>,
    {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.policies = policies.into_iter().collect();
        Ok(())
    }

    /// Policies in evaluation order
    #[must_use]
    pub fn policies(&self) -> &[AttributeFilterPolicy] {
        &self.policies
    }

    /// Filter the context's attributes and record the result in it.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFiltered` if the context was filtered before, or a
    /// component error if any part of the policy graph is not usable
    pub fn filter(&self, ctx: &mut AttributeFilterContext) -> FilterResult<()> {
        self.ensure_active()?;
        if ctx.is_filtered() {
            return Err(FilterError::AlreadyFiltered);
        }
        let filtered = self.released_attributes(ctx)?;
        tracing::debug!(
            filter = %self.id,
            prefiltered = ctx.prefiltered_attributes().len(),
            released = filtered.len(),
            "Filtering complete"
        );
        ctx.set_filtered_attributes(filtered)
    }

    fn released_attributes(
        &self,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<IndexMap<String, IdPAttribute>> {
        let prefiltered = ctx.prefiltered_attributes();
        let mut permitted: IndexMap<&str, ValueSet> = IndexMap::new();
        let mut denied: IndexMap<&str, ValueSet> = IndexMap::new();

        for policy in &self.policies {
            match policy.applies(ctx)? {
                Tristate::True => {
                    tracing::debug!(policy = %policy.id(), "Policy is active");
                }
                Tristate::False => {
                    tracing::debug!(policy = %policy.id(), "Policy does not apply");
                    continue;
                }
                Tristate::Fail => {
                    tracing::warn!(
                        policy = %policy.id(),
                        "Policy requirement could not be evaluated, treating policy as inactive"
                    );
                    continue;
                }
            }

            for rule in policy.attribute_rules() {
                let Some((attribute_id, attribute)) = prefiltered.get_key_value(rule.attribute_id())
                else {
                    tracing::trace!(
                        rule = %rule.id(),
                        attribute = rule.attribute_id(),
                        "Attribute not resolved, skipping rule"
                    );
                    continue;
                };
                let permit = rule.permitted_values(attribute, ctx)?;
                let deny = rule.denied_values(attribute, ctx)?;
                tracing::trace!(
                    rule = %rule.id(),
                    attribute = %attribute_id,
                    permitted = permit.len(),
                    denied = deny.len(),
                    "Evaluated attribute rule"
                );
                permitted.entry(attribute_id.as_str()).or_default().extend(permit);
                denied.entry(attribute_id.as_str()).or_default().extend(deny);
            }
        }

        let mut released = IndexMap::new();
        for (attribute_id, attribute) in prefiltered {
            let Some(permit) = permitted.get(attribute_id.as_str()) else {
                tracing::debug!(
                    attribute = %attribute_id,
                    "No values permitted, removing attribute"
                );
                continue;
            };
            let mut retained = permit.clone();
            if let Some(deny) = denied.get(attribute_id.as_str()) {
                retained.retain(|value| !deny.contains(value));
            }
            let filtered = attribute.retain_values(&retained);
            if filtered.values().is_empty() {
                tracing::debug!(
                    attribute = %attribute_id,
                    "All values filtered, removing attribute"
                );
                continue;
            }
            tracing::debug!(
                attribute = %attribute_id,
                released = filtered.values().len(),
                of = attribute.values().len(),
                "Releasing attribute"
            );
            released.insert(attribute_id.clone(), filtered);
        }
        Ok(released)
    }

    fn validate(&mut self) -> ComponentResult<()> {
        let mut seen = HashSet::new();
        for policy in &mut self.policies {
            if !seen.insert(policy.id().as_str().to_string()) {
                return Err(ComponentError::configuration(
                    self.id.as_str(),
                    format!("duplicate policy '{}'", policy.id()),
                ));
            }
            if !policy.is_initialized() {
                policy.initialize()?;
            }
        }
        Ok(())
    }
}

impl Component for AttributeFilter {
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
        for policy in &self.policies {
            policy.destroy();
        }
        self.lifecycle.destroy();
    }
}
