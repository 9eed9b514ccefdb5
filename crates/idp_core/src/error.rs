//! Component error types.

/// Result type for component configuration and lifecycle operations
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Errors raised by configurable components.
///
/// None of these describe an evaluation outcome. "Nothing matched" and
/// "could not be evaluated" are expressed through empty value sets and
/// [`crate::Tristate::Fail`]; these variants are operator or programming
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// Component used before `initialize` succeeded
    #[error("{component}: component has not been initialized")]
    Uninitialized {
        /// Component identifier
        component: String,
    },

    /// Component used after `destroy`
    #[error("{component}: component has been destroyed")]
    Destroyed {
        /// Component identifier
        component: String,
    },

    /// Attempt to reconfigure or re-initialize a live component
    #[error("{component}: component is already initialized and cannot be modified")]
    AlreadyInitialized {
        /// Component identifier
        component: String,
    },

    /// Invalid or missing configuration detected during `initialize`
    #[error("{component}: invalid configuration: {reason}")]
    Configuration {
        /// Component identifier
        component: String,
        /// What is wrong
        reason: String,
    },
}

impl ComponentError {
    /// Build a configuration error for a component
    #[must_use]
    pub fn configuration(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Identifier of the component that raised the error
    #[must_use]
    pub fn component(&self) -> &str {
        match self {
            Self::Uninitialized { component }
            | Self::Destroyed { component }
            | Self::AlreadyInitialized { component }
            | Self::Configuration { component, .. } => component,
        }
    }
}
