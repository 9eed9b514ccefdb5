//! Child management shared by the composed matchers and composed rules.
//!
//! Both algebras hold an ordered list of children behind `Arc`, configured
//! once before initialization and validated for arity and readiness. The
//! child type is the trait object of the algebra (`dyn Matcher` or
//! `dyn PolicyRequirementRule`), so the two stay distinct types.

use idp_core::{Component, ComponentError, ComponentId, ComponentResult, Lifecycle};
use std::sync::Arc;

/// Number of children a composite accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// AND / OR
    AtLeastOne,
    /// NOT
    ExactlyOne,
}

/// Ordered children of a composite component
#[derive(Debug)]
pub struct Composition<C: ?Sized> {
    children: Vec<Arc<C>>,
}

impl<C: ?Sized> Composition<C> {
    /// Create an empty composition
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Replace the children of the owning component.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error once the owner has been initialized
    pub fn set_children<I>(
        &mut self,
        owner: &ComponentId,
        lifecycle: &Lifecycle,
        children: I,
    ) -> ComponentResult<()>
    where
        I: IntoIterator<Item = Arc<C>>,
    {
        lifecycle.ensure_configurable(owner)?;
        self.children = children.into_iter().collect();
        Ok(())
    }

    /// Children in configuration order
    #[must_use]
    pub fn children(&self) -> &[Arc<C>] {
        &self.children
    }
}

impl<C: Component + ?Sized> Composition<C> {
    /// Check arity and that every child is ready for evaluation.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the owner
    pub fn validate(&self, owner: &ComponentId, arity: Arity) -> ComponentResult<()> {
        match arity {
            Arity::AtLeastOne if self.children.is_empty() => {
                return Err(ComponentError::configuration(
                    owner.as_str(),
                    "at least one child is required",
                ));
            }
            Arity::ExactlyOne if self.children.len() != 1 => {
                return Err(ComponentError::configuration(
                    owner.as_str(),
                    format!("exactly one child is required, {} configured", self.children.len()),
                ));
            }
            _ => {}
        }
        if let Some(child) = self.children.iter().find(|c| !c.is_initialized()) {
            return Err(ComponentError::configuration(
                owner.as_str(),
                format!("child '{}' is not initialized", child.id()),
            ));
        }
        Ok(())
    }
}

impl<C: ?Sized> Default for Composition<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements [`Component`] for a type with `id` and `lifecycle` fields and
/// an inherent `validate(&mut self) -> ComponentResult<()>`.
macro_rules! impl_component {
    ($ty:ty) => {
        impl ::idp_core::Component for $ty {
            fn id(&self) -> &::idp_core::ComponentId {
                &self.id
            }

            fn lifecycle(&self) -> &::idp_core::Lifecycle {
                &self.lifecycle
            }

            fn initialize(&mut self) -> ::idp_core::ComponentResult<()> {
                self.lifecycle.ensure_configurable(&self.id)?;
                self.validate()?;
                self.lifecycle.mark_initialized(&self.id)
            }
        }
    };
}

pub(crate) use impl_component;

/// Check that a single required child is configured and ready.
///
/// # Errors
///
/// Returns a configuration error naming the owner and the missing property
pub(crate) fn require_ready<C: Component + ?Sized>(
    owner: &ComponentId,
    property: &str,
    child: Option<&Arc<C>>,
) -> ComponentResult<()> {
    match child {
        None => Err(ComponentError::configuration(
            owner.as_str(),
            format!("{} is required", property),
        )),
        Some(child) if !child.is_initialized() => Err(ComponentError::configuration(
            owner.as_str(),
            format!("{} '{}' is not initialized", property, child.id()),
        )),
        Some(_) => Ok(()),
    }
}
