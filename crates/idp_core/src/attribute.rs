//! Resolved identity attributes.
//!
//! Attributes are produced by the resolver, handed to the filter, and never
//! modified afterwards. Filtering produces new attributes carrying a subset
//! of the original values.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Insertion-ordered set of attribute values, deduplicated by equality.
pub type ValueSet = IndexSet<IdPAttributeValue>;

/// Kind of empty value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyType {
    /// Source had no value at all
    Null,
    /// Source had a zero-length string
    ZeroLength,
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ValueRepr", into = "ValueRepr")]
pub enum IdPAttributeValue {
    /// Plain string
    String(String),
    /// Value qualified by a security domain, e.g. `staff@example.edu`
    ScopedString {
        /// Unscoped value
        value: String,
        /// Scope
        scope: String,
    },
    /// Opaque XML content, kept in serialized form
    XmlObject(String),
    /// Explicitly empty value
    Empty(EmptyType),
}

impl IdPAttributeValue {
    /// Create a string value
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create a scoped string value
    #[must_use]
    pub fn scoped(value: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::ScopedString {
            value: value.into(),
            scope: scope.into(),
        }
    }

    /// Short name of the variant, for diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "StringAttributeValue",
            Self::ScopedString { .. } => "ScopedStringAttributeValue",
            Self::XmlObject(_) => "XMLObjectAttributeValue",
            Self::Empty(_) => "EmptyAttributeValue",
        }
    }

    /// Scope of a scoped value
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::ScopedString { scope, .. } => Some(scope),
            _ => None,
        }
    }
}

impl std::fmt::Display for IdPAttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::ScopedString { value, scope } => write!(f, "{}@{}", value, scope),
            Self::XmlObject(xml) => f.write_str(xml),
            Self::Empty(EmptyType::ZeroLength) => Ok(()),
            Self::Empty(EmptyType::Null) => f.write_str("(null)"),
        }
    }
}

impl From<&str> for IdPAttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for IdPAttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

// Plain strings serialize as JSON strings; the other variants as small objects.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Plain(String),
    Scoped { value: String, scope: String },
    Xml { xml: String },
    Empty { empty: EmptyType },
}

impl From<ValueRepr> for IdPAttributeValue {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Plain(value) => Self::String(value),
            ValueRepr::Scoped { value, scope } => Self::ScopedString { value, scope },
            ValueRepr::Xml { xml } => Self::XmlObject(xml),
            ValueRepr::Empty { empty } => Self::Empty(empty),
        }
    }
}

impl From<IdPAttributeValue> for ValueRepr {
    fn from(value: IdPAttributeValue) -> Self {
        match value {
            IdPAttributeValue::String(value) => Self::Plain(value),
            IdPAttributeValue::ScopedString { value, scope } => Self::Scoped { value, scope },
            IdPAttributeValue::XmlObject(xml) => Self::Xml { xml },
            IdPAttributeValue::Empty(empty) => Self::Empty { empty },
        }
    }
}

/// A resolved attribute: identifier plus ordered values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPAttribute {
    id: String,
    #[serde(default)]
    values: Vec<IdPAttributeValue>,
    /// Display names by language tag
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    display_names: IndexMap<String, String>,
    /// Display descriptions by language tag
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    display_descriptions: IndexMap<String, String>,
}

impl IdPAttribute {
    /// Create an attribute with no values
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
            display_names: IndexMap::new(),
            display_descriptions: IndexMap::new(),
        }
    }

    /// Set the values
    #[must_use]
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IdPAttributeValue>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Append a value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<IdPAttributeValue>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Add a display name
    #[must_use]
    pub fn with_display_name(mut self, lang: impl Into<String>, name: impl Into<String>) -> Self {
        self.display_names.insert(lang.into(), name.into());
        self
    }

    /// Add a display description
    #[must_use]
    pub fn with_display_description(
        mut self,
        lang: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.display_descriptions.insert(lang.into(), description.into());
        self
    }

    /// Attribute identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Values in resolver order
    #[must_use]
    pub fn values(&self) -> &[IdPAttributeValue] {
        &self.values
    }

    /// All values as a set
    #[must_use]
    pub fn value_set(&self) -> ValueSet {
        self.values.iter().cloned().collect()
    }

    /// Display names by language tag
    #[must_use]
    pub fn display_names(&self) -> &IndexMap<String, String> {
        &self.display_names
    }

    /// Display descriptions by language tag
    #[must_use]
    pub fn display_descriptions(&self) -> &IndexMap<String, String> {
        &self.display_descriptions
    }

    /// Copy of this attribute keeping only the values in `retained`.
    ///
    /// Value order follows this attribute, not `retained`; each retained
    /// value appears once.
    #[must_use]
    pub fn retain_values(&self, retained: &ValueSet) -> Self {
        let mut seen = ValueSet::new();
        let values = self
            .values
            .iter()
            .filter(|v| retained.contains(*v) && seen.insert((*v).clone()))
            .cloned()
            .collect();
        Self {
            id: self.id.clone(),
            values,
            display_names: self.display_names.clone(),
            display_descriptions: self.display_descriptions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_new() {
        let attr = IdPAttribute::new("mail").with_values(["a@example.edu", "b@example.edu"]);
        assert_eq!(attr.id(), "mail");
        assert_eq!(attr.values().len(), 2);
        assert_eq!(attr.values()[0], IdPAttributeValue::string("a@example.edu"));
    }

    #[test]
    fn test_value_equality_is_by_value() {
        assert_eq!(
            IdPAttributeValue::scoped("staff", "example.edu"),
            IdPAttributeValue::scoped("staff", "example.edu")
        );
        assert_ne!(
            IdPAttributeValue::string("staff"),
            IdPAttributeValue::scoped("staff", "example.edu")
        );
    }

    #[test]
    fn test_value_set_dedupes() {
        let attr = IdPAttribute::new("affiliation").with_values(["staff", "staff", "member"]);
        let set = attr.value_set();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_index(0), Some(&IdPAttributeValue::string("staff")));
    }

    #[test]
    fn test_retain_values_keeps_order() {
        let attr = IdPAttribute::new("affiliation")
            .with_values(["employee", "staff", "illegalValue"])
            .with_display_name("en", "Affiliation");
        let retained: ValueSet = [
            IdPAttributeValue::string("staff"),
            IdPAttributeValue::string("employee"),
        ]
        .into_iter()
        .collect();
        let filtered = attr.retain_values(&retained);
        assert_eq!(
            filtered.values(),
            &[
                IdPAttributeValue::string("employee"),
                IdPAttributeValue::string("staff")
            ]
        );
        assert_eq!(filtered.display_names().get("en").map(String::as_str), Some("Affiliation"));
    }

    #[test]
    fn test_retain_values_drops_duplicates() {
        let attr = IdPAttribute::new("affiliation").with_values(["staff", "member", "staff"]);
        let filtered = attr.retain_values(&attr.value_set());
        assert_eq!(filtered.values().len(), 2);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(
            IdPAttributeValue::scoped("staff", "example.edu").to_string(),
            "staff@example.edu"
        );
        assert_eq!(IdPAttributeValue::Empty(EmptyType::ZeroLength).to_string(), "");
    }

    #[test]
    fn test_value_json_forms() {
        let values: Vec<IdPAttributeValue> = serde_json::from_str(
            r#"["john", {"value": "staff", "scope": "example.edu"}, {"xml": "<a/>"}, {"empty": "zero_length"}]"#,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                IdPAttributeValue::string("john"),
                IdPAttributeValue::scoped("staff", "example.edu"),
                IdPAttributeValue::XmlObject("<a/>".to_string()),
                IdPAttributeValue::Empty(EmptyType::ZeroLength),
            ]
        );
        let json = serde_json::to_string(&values[1]).unwrap();
        assert_eq!(json, r#"{"value":"staff","scope":"example.edu"}"#);
    }
}
