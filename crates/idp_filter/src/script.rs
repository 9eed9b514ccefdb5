//! Boundary to externally supplied scripts.
//!
//! The filter does not embed a scripting language. A script is anything
//! implementing [`ScriptEvaluator`]; scripted rules and matchers translate
//! its output into a tristate or a value set.

use crate::context::AttributeFilterContext;
use idp_core::{IdPAttribute, IdPAttributeValue};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// What a script sees
#[derive(Debug, Clone, Copy)]
pub struct ScriptInput<'a> {
    /// Filtering context
    pub context: &'a AttributeFilterContext,
    /// Attribute being filtered (matchers only)
    pub attribute: Option<&'a IdPAttribute>,
}

/// What a script returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutput {
    /// Boolean result (rules)
    Bool(bool),
    /// Value list (matchers)
    Values(Vec<IdPAttributeValue>),
    /// Anything else, described for logging
    Other(String),
}

/// Script evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("script '{script}' failed: {message}")]
pub struct ScriptError {
    /// Script name
    pub script: String,
    /// Failure description
    pub message: String,
}

impl ScriptError {
    /// Create a script error
    #[must_use]
    pub fn new(script: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            message: message.into(),
        }
    }
}

/// A script that can be evaluated against a filter request
pub trait ScriptEvaluator: Send + Sync + fmt::Debug {
    /// Script name, for logging
    fn name(&self) -> &str;

    /// Evaluate the script.
    ///
    /// # Errors
    ///
    /// Returns error if the script fails
    fn evaluate(&self, input: &ScriptInput<'_>) -> Result<ScriptOutput, ScriptError>;
}

/// Script backed by a Rust closure
pub struct FnScript<F> {
    name: String,
    f: F,
}

impl<F> FnScript<F>
where
    F: Fn(&ScriptInput<'_>) -> Result<ScriptOutput, ScriptError> + Send + Sync,
{
    /// Wrap a closure
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> fmt::Debug for FnScript<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScript").field("name", &self.name).finish()
    }
}

impl<F> ScriptEvaluator for FnScript<F>
where
    F: Fn(&ScriptInput<'_>) -> Result<ScriptOutput, ScriptError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, input: &ScriptInput<'_>) -> Result<ScriptOutput, ScriptError> {
        (self.f)(input)
    }
}

/// Named scripts available to policy configuration
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: IndexMap<String, Arc<dyn ScriptEvaluator>>,
}

impl ScriptRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script under its name, replacing any previous one
    #[must_use]
    pub fn with_script(mut self, script: Arc<dyn ScriptEvaluator>) -> Self {
        self.scripts.insert(script.name().to_string(), script);
        self
    }

    /// Look up a script
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ScriptEvaluator>> {
        self.scripts.get(name).cloned()
    }

    /// Check if a script is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}
