//! IdP Attribute Filter
//!
//! Rule-based release of identity attributes to relying parties.
//! Policies pair a tristate requirement rule with per-attribute value
//! matchers; the engine releases the values permitted by active policies
//! and denied by none. Every evaluation failure under-releases.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod composition;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod metadata;
pub mod policy;
pub mod rule;
pub mod script;
pub mod strings;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, PolicyCompiler, PolicyDocument};
pub use context::{AttributeFilterContext, Direction};
pub use engine::AttributeFilter;
pub use error::{FilterError, FilterResult};
pub use matcher::{AnyMatcher, Matcher};
pub use metadata::{AttributeConsumingService, EntityMetadata};
pub use policy::{AttributeFilterPolicy, AttributeRule};
pub use rule::{AnyRule, PolicyRequirementRule};
pub use script::{FnScript, ScriptEvaluator, ScriptRegistry};
