//! IdP Core Types
//!
//! This crate contains pure types and logic with no I/O: the attribute
//! model handed to the filter, three-valued logic, and the identity and
//! lifecycle helpers every configurable component holds.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod tristate;

// Re-exports
pub use attribute::{EmptyType, IdPAttribute, IdPAttributeValue, ValueSet};
pub use error::{ComponentError, ComponentResult};
pub use id::ComponentId;
pub use lifecycle::{Component, Lifecycle, LifecycleState};
pub use tristate::Tristate;
