//! Fixtures shared by the unit tests.

use crate::composition::impl_component;
use crate::context::{AttributeFilterContext, Direction};
use crate::matcher::Matcher;
use crate::rule::PolicyRequirementRule;
use idp_core::{
    Component, ComponentId, ComponentResult, IdPAttribute, IdPAttributeValue, Lifecycle, Tristate,
    ValueSet,
};
use std::sync::Arc;

/// Matcher releasing a fixed list of values (those present in the attribute)
#[derive(Debug)]
pub struct FixedMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    values: Vec<IdPAttributeValue>,
}

impl FixedMatcher {
    fn validate(&mut self) -> ComponentResult<()> {
        Ok(())
    }
}

impl_component!(FixedMatcher);

impl Matcher for FixedMatcher {
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
                .filter(|v| self.values.contains(v))
                .cloned()
                .collect(),
        ))
    }
}

/// Initialized matcher releasing `values`
pub fn fixed<const N: usize>(values: [&str; N]) -> Arc<dyn Matcher> {
    let mut m = FixedMatcher {
        id: ComponentId::new(format!("fixed{:?}", values)),
        lifecycle: Lifecycle::new(),
        values: values.iter().map(|v| IdPAttributeValue::string(*v)).collect(),
    };
    m.initialize().unwrap();
    Arc::new(m)
}

/// Rule returning a constant
#[derive(Debug)]
pub struct FixedRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    result: Tristate,
}

impl FixedRule {
    fn validate(&mut self) -> ComponentResult<()> {
        Ok(())
    }
}

impl_component!(FixedRule);

impl PolicyRequirementRule for FixedRule {
    fn matches(&self, _ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        Ok(self.result)
    }
}

/// Initialized rule returning `result`
pub fn constant(result: Tristate) -> Arc<dyn PolicyRequirementRule> {
    let mut r = FixedRule {
        id: ComponentId::new(format!("constant-{}", result)),
        lifecycle: Lifecycle::new(),
        result,
    };
    r.initialize().unwrap();
    Arc::new(r)
}

/// Initialize a component and share it
pub fn ready<T: Component>(mut component: T) -> Arc<T> {
    component.initialize().unwrap();
    Arc::new(component)
}

/// Plain outbound context
pub fn outbound() -> AttributeFilterContext {
    AttributeFilterContext::new(Direction::Outbound)
}

/// Attribute with string values
pub fn attribute<const N: usize>(id: &str, values: [&str; N]) -> IdPAttribute {
    IdPAttribute::new(id).with_values(values)
}

/// Value set of strings
pub fn strings<const N: usize>(values: [&str; N]) -> ValueSet {
    values.into_iter().map(IdPAttributeValue::string).collect()
}
