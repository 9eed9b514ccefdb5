//! Identifiers for configured filter components.

use serde::{Deserialize, Serialize};

/// Identifier of a configured component (policy, rule, matcher).
///
/// The log prefix is derived once when the identifier is created and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ComponentId {
    id: String,
    log_prefix: String,
}

impl ComponentId {
    /// Create a new identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let log_prefix = format!("Attribute Filter '{}':", id);
        Self { id, log_prefix }
    }

    /// Get the identifier string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Prefix used on every log line emitted on behalf of this component
    #[must_use]
    pub fn log_prefix(&self) -> &str {
        &self.log_prefix
    }

    /// Derive a child identifier, e.g. `policy/attr/permit`
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        Self::new(format!("{}/{}", self.id, segment))
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<ComponentId> for String {
    fn from(id: ComponentId) -> Self {
        id.id
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_prefix_precomputed() {
        let id = ComponentId::new("releaseToSP");
        assert_eq!(id.log_prefix(), "Attribute Filter 'releaseToSP':");
        assert_eq!(id.to_string(), "releaseToSP");
    }

    #[test]
    fn test_child_id() {
        let id = ComponentId::new("policy").child("mail").child("permit");
        assert_eq!(id.as_str(), "policy/mail/permit");
        assert_eq!(id.log_prefix(), "Attribute Filter 'policy/mail/permit':");
    }

    #[test]
    fn test_serde_keeps_prefix() {
        let id = ComponentId::new("p1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"p1\"");
        let back: ComponentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert_eq!(back.log_prefix(), "Attribute Filter 'p1':");
    }
}
