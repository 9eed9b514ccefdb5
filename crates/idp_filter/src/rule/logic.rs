//! Boolean composition of rules over the tristate domain.

use super::PolicyRequirementRule;
use crate::composition::{impl_component, Arity, Composition};
use crate::context::AttributeFilterContext;
use idp_core::{Component, ComponentId, ComponentResult, Lifecycle, Tristate};
use std::sync::Arc;

/// Tristate conjunction of the children
#[derive(Debug)]
pub struct AndRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    children: Composition<dyn PolicyRequirementRule>,
}

impl AndRule {
    /// Create the rule with no children
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children: Composition::new(),
        }
    }

    /// Set the children.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_children<I>(&mut self, children: I) -> ComponentResult<()>
    where
        I: IntoIterator<Item = Arc<dyn PolicyRequirementRule>>,
    {
        self.children.set_children(&self.id, &self.lifecycle, children)
    }

    /// Children in configuration order
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn PolicyRequirementRule>] {
        self.children.children()
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.children.validate(&self.id, Arity::AtLeastOne)
    }
}

impl_component!(AndRule);

impl PolicyRequirementRule for AndRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let results = evaluate_all(self.children.children(), ctx)?;
        Ok(Tristate::all(results))
    }
}

/// Tristate disjunction of the children
#[derive(Debug)]
pub struct OrRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    children: Composition<dyn PolicyRequirementRule>,
}

impl OrRule {
    /// Create the rule with no children
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children: Composition::new(),
        }
    }

    /// Set the children.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_children<I>(&mut self, children: I) -> ComponentResult<()>
    where
        I: IntoIterator<Item = Arc<dyn PolicyRequirementRule>>,
    {
        self.children.set_children(&self.id, &self.lifecycle, children)
    }

    /// Children in configuration order
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn PolicyRequirementRule>] {
        self.children.children()
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.children.validate(&self.id, Arity::AtLeastOne)
    }
}

impl_component!(OrRule);

impl PolicyRequirementRule for OrRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let results = evaluate_all(self.children.children(), ctx)?;
        Ok(Tristate::any(results))
    }
}

/// Tristate negation of the child
#[derive(Debug)]
pub struct NotRule {
    id: ComponentId,
    lifecycle: Lifecycle,
    children: Composition<dyn PolicyRequirementRule>,
}

impl NotRule {
    /// Create the rule with no child
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children: Composition::new(),
        }
    }

    /// Set the negated rule.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_child(&mut self, child: Arc<dyn PolicyRequirementRule>) -> ComponentResult<()> {
        self.children.set_children(&self.id, &self.lifecycle, [child])
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.children.validate(&self.id, Arity::ExactlyOne)
    }
}

impl_component!(NotRule);

impl PolicyRequirementRule for NotRule {
    fn matches(&self, ctx: &AttributeFilterContext) -> ComponentResult<Tristate> {
        self.ensure_active()?;
        let results = evaluate_all(self.children.children(), ctx)?;
        Ok(results.first().copied().map_or(Tristate::Fail, Tristate::negate))
    }
}

// Every child is evaluated so that the result never depends on child order.
fn evaluate_all(
    children: &[Arc<dyn PolicyRequirementRule>],
    ctx: &AttributeFilterContext,
) -> ComponentResult<Vec<Tristate>> {
    children.iter().map(|child| child.matches(ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{constant, outbound, ready};
    use idp_core::ComponentError;
    use idp_core::Tristate::{Fail, False, True};
    use proptest::prelude::*;

    fn and_of(children: &[Tristate]) -> Arc<AndRule> {
        let mut rule = AndRule::new("and");
        rule.set_children(children.iter().map(|t| constant(*t))).unwrap();
        ready(rule)
    }

    fn or_of(children: &[Tristate]) -> Arc<OrRule> {
        let mut rule = OrRule::new("or");
        rule.set_children(children.iter().map(|t| constant(*t))).unwrap();
        ready(rule)
    }

    #[test]
    fn test_and_table() {
        let ctx = outbound();
        assert_eq!(and_of(&[True, True]).matches(&ctx).unwrap(), True);
        assert_eq!(and_of(&[True, Fail]).matches(&ctx).unwrap(), Fail);
        assert_eq!(and_of(&[Fail, False]).matches(&ctx).unwrap(), False);
        assert_eq!(and_of(&[False, Fail]).matches(&ctx).unwrap(), False);
    }

    #[test]
    fn test_or_table() {
        let ctx = outbound();
        assert_eq!(or_of(&[False, False]).matches(&ctx).unwrap(), False);
        assert_eq!(or_of(&[False, Fail]).matches(&ctx).unwrap(), Fail);
        assert_eq!(or_of(&[Fail, True]).matches(&ctx).unwrap(), True);
        assert_eq!(or_of(&[True, Fail]).matches(&ctx).unwrap(), True);
    }

    #[test]
    fn test_not() {
        let ctx = outbound();
        for (input, expected) in [(True, False), (False, True), (Fail, Fail)] {
            let mut not = NotRule::new("not");
            not.set_child(constant(input)).unwrap();
            assert_eq!(ready(not).matches(&ctx).unwrap(), expected);
        }
    }

    #[test]
    fn test_arity() {
        assert!(matches!(
            AndRule::new("and").initialize(),
            Err(ComponentError::Configuration { .. })
        ));
        assert!(matches!(
            OrRule::new("or").initialize(),
            Err(ComponentError::Configuration { .. })
        ));
        assert!(matches!(
            NotRule::new("not").initialize(),
            Err(ComponentError::Configuration { .. })
        ));
    }

    #[test]
    fn test_reconfigure_rejected() {
        let rule = and_of(&[True]);
        assert_eq!(rule.children().len(), 1);
        let mut rule = AndRule::new("and");
        rule.set_children([constant(True)]).unwrap();
        rule.initialize().unwrap();
        assert!(matches!(
            rule.set_children([constant(False)]),
            Err(ComponentError::AlreadyInitialized { .. })
        ));
    }

    fn tristate() -> impl Strategy<Value = Tristate> {
        prop_oneof![Just(True), Just(False), Just(Fail)]
    }

    proptest! {
        #[test]
        fn prop_order_independent(children in proptest::collection::vec(tristate(), 1..6)) {
            let ctx = outbound();
            let mut reversed = children.clone();
            reversed.reverse();
            prop_assert_eq!(
                and_of(&children).matches(&ctx).unwrap(),
                and_of(&reversed).matches(&ctx).unwrap()
            );
            prop_assert_eq!(
                or_of(&children).matches(&ctx).unwrap(),
                or_of(&reversed).matches(&ctx).unwrap()
            );
            prop_assert_eq!(
                and_of(&children).matches(&ctx).unwrap(),
                Tristate::all(children.clone())
            );
            prop_assert_eq!(or_of(&children).matches(&ctx).unwrap(), Tristate::any(children));
        }
    }
}
