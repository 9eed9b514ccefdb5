//! Boolean composition of matchers over value sets.

use super::Matcher;
use crate::composition::{impl_component, Arity, Composition};
use crate::context::AttributeFilterContext;
use idp_core::{Component, ComponentId, ComponentResult, IdPAttribute, Lifecycle, ValueSet};
use std::sync::Arc;
use tracing::debug;

/// Intersection of the children's results
#[derive(Debug)]
pub struct AndMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    children: Composition<dyn Matcher>,
}

impl AndMatcher {
    /// Create the matcher with no children
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
        I: IntoIterator<Item = Arc<dyn Matcher>>,
    {
        self.children.set_children(&self.id, &self.lifecycle, children)
    }

    /// Children in configuration order
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn Matcher>] {
        self.children.children()
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.children.validate(&self.id, Arity::AtLeastOne)
    }
}

impl_component!(AndMatcher);

impl Matcher for AndMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(results) = evaluate_children(&self.children, attribute, ctx)? else {
            return Ok(None);
        };
        let mut results = results.into_iter();
        let mut result = results.next().unwrap_or_default();
        for values in results {
            result.retain(|v| values.contains(v));
        }
        Ok(Some(result))
    }
}

/// Union of the children's results, in first-seen order
#[derive(Debug)]
pub struct OrMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    children: Composition<dyn Matcher>,
}

impl OrMatcher {
    /// Create the matcher with no children
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
        I: IntoIterator<Item = Arc<dyn Matcher>>,
    {
        self.children.set_children(&self.id, &self.lifecycle, children)
    }

    /// Children in configuration order
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn Matcher>] {
        self.children.children()
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.children.validate(&self.id, Arity::AtLeastOne)
    }
}

impl_component!(OrMatcher);

impl Matcher for OrMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(results) = evaluate_children(&self.children, attribute, ctx)? else {
            return Ok(None);
        };
        Ok(Some(results.into_iter().flatten().collect()))
    }
}

/// Complement of the child's result relative to the attribute's values
#[derive(Debug)]
pub struct NotMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    children: Composition<dyn Matcher>,
}

impl NotMatcher {
    /// Create the matcher with no child
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children: Composition::new(),
        }
    }

    /// Set the negated matcher.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_child(&mut self, child: Arc<dyn Matcher>) -> ComponentResult<()> {
        self.children.set_children(&self.id, &self.lifecycle, [child])
    }

    fn validate(&mut self) -> ComponentResult<()> {
        self.children.validate(&self.id, Arity::ExactlyOne)
    }
}

impl_component!(NotMatcher);

impl Matcher for NotMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(results) = evaluate_children(&self.children, attribute, ctx)? else {
            debug!(
                "{} negated matcher cannot be evaluated, no values match",
                self.id.log_prefix()
            );
            return Ok(None);
        };
        let mut result = attribute.value_set();
        for excluded in results {
            result.retain(|v| !excluded.contains(v));
        }
        Ok(Some(result))
    }
}

/// Results of every child, or `None` if any child could not be evaluated.
/// All children run even after one fails so lifecycle errors surface.
fn evaluate_children(
    children: &Composition<dyn Matcher>,
    attribute: &IdPAttribute,
    ctx: &AttributeFilterContext,
) -> ComponentResult<Option<Vec<ValueSet>>> {
    let results = children
        .children()
        .iter()
        .map(|child| child.evaluate(attribute, ctx))
        .collect::<ComponentResult<Vec<_>>>()?;
    Ok(results.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{AnyMatcher, ScopeMatchesShibMdScopeMatcher, ScriptedMatcher};
    use crate::script::{FnScript, ScriptError, ScriptInput, ScriptOutput};
    use crate::testing::{attribute, fixed, outbound, ready, strings};
    use idp_core::{ComponentError, IdPAttributeValue};
    use proptest::prelude::*;

    #[test]
    fn test_and_intersection() {
        let mut and = AndMatcher::new("and");
        and.set_children([fixed(["a", "b", "c"]), fixed(["b", "c", "d"])]).unwrap();
        let and = ready(and);
        let attr = attribute("x", ["a", "b", "c", "d"]);
        assert_eq!(and.matching_values(&attr, &outbound()).unwrap(), strings(["b", "c"]));
    }

    #[test]
    fn test_or_union_ordered() {
        let mut or = OrMatcher::new("or");
        or.set_children([fixed(["c"]), fixed(["a", "c"])]).unwrap();
        let or = ready(or);
        let attr = attribute("x", ["a", "b", "c"]);
        let result = or.matching_values(&attr, &outbound()).unwrap();
        let order: Vec<&IdPAttributeValue> = result.iter().collect();
        assert_eq!(
            order,
            vec![&IdPAttributeValue::string("c"), &IdPAttributeValue::string("a")]
        );
    }

    #[test]
    fn test_not_complement() {
        let mut not = NotMatcher::new("not");
        not.set_child(fixed(["illegalValue"])).unwrap();
        let not = ready(not);
        let attr = attribute("affiliation", ["employee", "staff", "illegalValue"]);
        assert_eq!(
            not.matching_values(&attr, &outbound()).unwrap(),
            strings(["employee", "staff"])
        );
    }

    fn broken_script() -> Arc<dyn Matcher> {
        let mut m = ScriptedMatcher::new("broken");
        m.set_script(Arc::new(FnScript::new("broken", |_: &ScriptInput<'_>| {
            Err::<ScriptOutput, _>(ScriptError::new("broken", "script raised"))
        })))
        .unwrap();
        ready(m)
    }

    fn negate(child: Arc<dyn Matcher>) -> Arc<NotMatcher> {
        let mut not = NotMatcher::new("not");
        not.set_child(child).unwrap();
        ready(not)
    }

    #[test]
    fn test_not_over_failing_script_releases_nothing() {
        let not = negate(broken_script());
        let attr = attribute("affiliation", ["employee", "staff", "illegalValue"]);
        assert_eq!(not.evaluate(&attr, &outbound()).unwrap(), None);
        assert!(not.matching_values(&attr, &outbound()).unwrap().is_empty());
    }

    #[test]
    fn test_not_over_scope_without_metadata_releases_nothing() {
        let not = negate(ready(ScopeMatchesShibMdScopeMatcher::new("scope")));
        let attr = IdPAttribute::new("eppn")
            .with_values([IdPAttributeValue::scoped("jsmith", "example.edu")]);
        assert!(not.matching_values(&attr, &outbound()).unwrap().is_empty());
    }

    #[test]
    fn test_failure_propagates_through_and_or() {
        let attr = attribute("affiliation", ["staff", "member"]);
        let mut and = AndMatcher::new("and");
        and.set_children([fixed(["staff"]), broken_script()]).unwrap();
        let and = ready(and);
        assert_eq!(and.evaluate(&attr, &outbound()).unwrap(), None);

        let mut or = OrMatcher::new("or");
        or.set_children([fixed(["staff"]), broken_script()]).unwrap();
        let or = ready(or);
        assert_eq!(or.evaluate(&attr, &outbound()).unwrap(), None);

        let not = negate(or);
        assert!(not.matching_values(&attr, &outbound()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_children_rejected() {
        let mut and = AndMatcher::new("and");
        assert!(matches!(and.initialize(), Err(ComponentError::Configuration { .. })));
        let mut or = OrMatcher::new("or");
        assert!(matches!(or.initialize(), Err(ComponentError::Configuration { .. })));
        let mut not = NotMatcher::new("not");
        assert!(matches!(not.initialize(), Err(ComponentError::Configuration { .. })));
    }

    #[test]
    fn test_reconfigure_after_init_rejected() {
        let mut and = AndMatcher::new("and");
        and.set_children([fixed(["a"])]).unwrap();
        and.initialize().unwrap();
        assert!(matches!(
            and.set_children([fixed(["b"])]),
            Err(ComponentError::AlreadyInitialized { .. })
        ));
        assert!(matches!(and.initialize(), Err(ComponentError::AlreadyInitialized { .. })));
        assert_eq!(and.children().len(), 1);
    }

    #[test]
    fn test_destroyed_child_surfaces() {
        let child = ready(AnyMatcher::new("any"));
        let mut or = OrMatcher::new("or");
        or.set_children([child.clone() as Arc<dyn Matcher>]).unwrap();
        let or = ready(or);
        child.destroy();
        let err = or.matching_values(&attribute("x", ["a"]), &outbound()).unwrap_err();
        assert_eq!(err, ComponentError::Destroyed { component: "any".to_string() });
    }

    fn subset(values: &[String]) -> impl Strategy<Value = Vec<String>> {
        proptest::sample::subsequence(values.to_vec(), 0..=values.len())
    }

    fn pool() -> Vec<String> {
        ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect()
    }

    fn fixed_owned(values: &[String]) -> Arc<dyn Matcher> {
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        match refs.as_slice() {
            [] => fixed([]),
            _ => {
                let mut or = OrMatcher::new("owned");
                or.set_children(refs.iter().map(|v| fixed([*v]))).unwrap();
                let or: Arc<dyn Matcher> = ready(or);
                or
            }
        }
    }

    proptest! {
        #[test]
        fn prop_algebra_laws(
            attr_values in subset(&pool()),
            left in subset(&pool()),
            right in subset(&pool()),
        ) {
            let attr = IdPAttribute::new("x").with_values(attr_values.clone());
            let ctx = outbound();
            let m1 = fixed_owned(&left);
            let m2 = fixed_owned(&right);
            let r1 = m1.matching_values(&attr, &ctx).unwrap();
            let r2 = m2.matching_values(&attr, &ctx).unwrap();
            let all = attr.value_set();

            let mut and = AndMatcher::new("and");
            and.set_children([m1.clone(), m2.clone()]).unwrap();
            let and = ready(and);
            let and_result = and.matching_values(&attr, &ctx).unwrap();
            let expected: ValueSet = r1.intersection(&r2).cloned().collect();
            prop_assert_eq!(&and_result, &expected);

            let mut or = OrMatcher::new("or");
            or.set_children([m1.clone(), m2.clone()]).unwrap();
            let or = ready(or);
            let or_result = or.matching_values(&attr, &ctx).unwrap();
            let expected: ValueSet = r1.union(&r2).cloned().collect();
            prop_assert_eq!(&or_result, &expected);

            let mut not = NotMatcher::new("not");
            not.set_child(m1.clone()).unwrap();
            let not = ready(not);
            let not_result = not.matching_values(&attr, &ctx).unwrap();
            let expected: ValueSet = all.difference(&r1).cloned().collect();
            prop_assert_eq!(&not_result, &expected);

            for result in [&and_result, &or_result, &not_result] {
                prop_assert!(result.iter().all(|v| all.contains(v)));
            }
        }
    }
}
