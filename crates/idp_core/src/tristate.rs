//! Three-valued logic for policy requirement rules.

use serde::{Deserialize, Serialize};

/// Result of a policy requirement rule.
///
/// `Fail` means the rule could not be evaluated (missing context data,
/// script failure). It is not an error: callers decide how to treat it, and
/// the filter engine treats anything but `True` as "policy not active".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tristate {
    /// Rule holds
    True,
    /// Rule does not hold
    False,
    /// Rule could not be evaluated
    Fail,
}

impl Tristate {
    /// Conjunction. `False` beats `Fail`, `Fail` beats `True`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Fail, _) | (_, Self::Fail) => Self::Fail,
            (Self::True, Self::True) => Self::True,
        }
    }

    /// Disjunction. `True` beats `Fail`, `Fail` beats `False`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Fail, _) | (_, Self::Fail) => Self::Fail,
            (Self::False, Self::False) => Self::False,
        }
    }

    /// Negation. `Fail` stays `Fail`.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Fail => Self::Fail,
        }
    }

    /// Fold a sequence with [`Tristate::and`]. An empty sequence is `True`.
    #[must_use]
    pub fn all<I: IntoIterator<Item = Self>>(items: I) -> Self {
        items.into_iter().fold(Self::True, Self::and)
    }

    /// Fold a sequence with [`Tristate::or`]. An empty sequence is `False`.
    #[must_use]
    pub fn any<I: IntoIterator<Item = Self>>(items: I) -> Self {
        items.into_iter().fold(Self::False, Self::or)
    }

    /// Check for `True`
    #[must_use]
    pub fn is_true(self) -> bool {
        self == Self::True
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl std::ops::Not for Tristate {
    type Output = Self;

    fn not(self) -> Self {
        self.negate()
    }
}

impl std::fmt::Display for Tristate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "TRUE"),
            Self::False => write!(f, "FALSE"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
