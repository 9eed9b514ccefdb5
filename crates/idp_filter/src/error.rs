//! Filter engine errors.

use idp_core::ComponentError;

/// Errors returned by [`crate::AttributeFilter::filter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A component was used outside its initialized lifetime
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// The context already carries filtered attributes
    #[error("filtered attributes have already been set on this context")]
    AlreadyFiltered,
}

/// Filter result type
pub type FilterResult<T> = Result<T, FilterError>;
