//! Initialization lifecycle shared by every configurable component.
//!
//! A component is configured through `&mut self` setters, initialized once,
//! and then shared read-only (typically behind an `Arc`). The state moves
//! strictly forward: `Uninitialized -> Initialized -> Destroyed`.

use crate::error::{ComponentError, ComponentResult};
use crate::id::ComponentId;
use std::sync::atomic::{AtomicU8, Ordering};

const UNINITIALIZED: u8 = 0;
const INITIALIZED: u8 = 1;
const DESTROYED: u8 = 2;

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Being configured
    Uninitialized,
    /// Ready for evaluation
    Initialized,
    /// Retired, never usable again
    Destroyed,
}

/// Lifecycle guard held by a component.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    /// Create a guard in the `Uninitialized` state
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::Acquire) {
            UNINITIALIZED => LifecycleState::Uninitialized,
            INITIALIZED => LifecycleState::Initialized,
            _ => LifecycleState::Destroyed,
        }
    }

    /// Check whether `initialize` has completed and `destroy` has not run
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    /// Check whether `destroy` has run
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    /// Guard for setters: configuration is only allowed before initialization.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` or `Destroyed` once the component left
    /// the configuration phase
    pub fn ensure_configurable(&self, id: &ComponentId) -> ComponentResult<()> {
        match self.state() {
            LifecycleState::Uninitialized => Ok(()),
            LifecycleState::Initialized => Err(ComponentError::AlreadyInitialized {
                component: id.to_string(),
            }),
            LifecycleState::Destroyed => Err(ComponentError::Destroyed {
                component: id.to_string(),
            }),
        }
    }

    /// Guard for evaluation entry points.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` before initialization and `Destroyed` after
    /// destruction
    pub fn ensure_active(&self, id: &ComponentId) -> ComponentResult<()> {
        match self.state() {
            LifecycleState::Initialized => Ok(()),
            LifecycleState::Uninitialized => Err(ComponentError::Uninitialized {
                component: id.to_string(),
            }),
            LifecycleState::Destroyed => Err(ComponentError::Destroyed {
                component: id.to_string(),
            }),
        }
    }

    /// Transition `Uninitialized -> Initialized`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` on a second call and `Destroyed` after
    /// destruction
    pub fn mark_initialized(&self, id: &ComponentId) -> ComponentResult<()> {
        match self.state.compare_exchange(
            UNINITIALIZED,
            INITIALIZED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(INITIALIZED) => Err(ComponentError::AlreadyInitialized {
                component: id.to_string(),
            }),
            Err(_) => Err(ComponentError::Destroyed {
                component: id.to_string(),
            }),
        }
    }

    /// Transition to `Destroyed`. Idempotent.
    pub fn destroy(&self) {
        self.state.store(DESTROYED, Ordering::Release);
    }
}

/// A configurable, identifiable component with a lifecycle.
pub trait Component {
    /// Component identifier
    fn id(&self) -> &ComponentId;

    /// Lifecycle guard
    fn lifecycle(&self) -> &Lifecycle;

    /// Validate configuration and move to `Initialized`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the component is misconfigured, or a
    /// lifecycle error if it is not in the `Uninitialized` state
    fn initialize(&mut self) -> ComponentResult<()>;

    /// Retire the component
    fn destroy(&self) {
        self.lifecycle().destroy();
    }

    /// Check whether the component is ready for evaluation
    fn is_initialized(&self) -> bool {
        self.lifecycle().is_initialized()
    }

    /// Evaluation guard.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` or `Destroyed` when not ready
    fn ensure_active(&self) -> ComponentResult<()> {
        self.lifecycle().ensure_active(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ComponentId {
        ComponentId::new("test")
    }

    #[test]
    fn test_lifecycle_new() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
        assert!(lc.ensure_configurable(&id()).is_ok());
    }

    #[test]
    fn test_lifecycle_uninitialized_use() {
        let lc = Lifecycle::new();
        assert_eq!(
            lc.ensure_active(&id()),
            Err(ComponentError::Uninitialized {
                component: "test".to_string()
            })
        );
    }

    #[test]
    fn test_lifecycle_initialize_once() {
        let lc = Lifecycle::new();
        lc.mark_initialized(&id()).unwrap();
        assert!(lc.is_initialized());
        assert!(lc.ensure_active(&id()).is_ok());
        assert!(matches!(
            lc.mark_initialized(&id()),
            Err(ComponentError::AlreadyInitialized { .. })
        ));
        assert!(matches!(
            lc.ensure_configurable(&id()),
            Err(ComponentError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn test_lifecycle_destroyed() {
        let lc = Lifecycle::new();
        lc.mark_initialized(&id()).unwrap();
        lc.destroy();
        assert!(lc.is_destroyed());
        assert!(matches!(
            lc.ensure_active(&id()),
            Err(ComponentError::Destroyed { .. })
        ));
        assert!(matches!(
            lc.mark_initialized(&id()),
            Err(ComponentError::Destroyed { .. })
        ));
    }

    #[test]
    fn test_lifecycle_destroy_before_init() {
        let lc = Lifecycle::new();
        lc.destroy();
        assert!(matches!(
            lc.ensure_configurable(&id()),
            Err(ComponentError::Destroyed { .. })
        ));
    }
}
