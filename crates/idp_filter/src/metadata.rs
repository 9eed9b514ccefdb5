//! Typed snapshots of SAML metadata used by metadata-driven rules and
//! matchers.
//!
//! Metadata is resolved before filtering starts. The filter only reads the
//! pieces modelled here: the requester's `AttributeConsumingService`,
//! entity attributes, and `shibmd:Scope` extensions.

use chrono::{DateTime, SecondsFormat, Utc};
use idp_core::IdPAttributeValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified`
pub const NAME_FORMAT_UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";

/// `urn:oasis:names:tc:SAML:2.0:attrname-format:uri`
pub const NAME_FORMAT_URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

/// Metadata of one entity (SP or IdP).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Entity ID
    pub entity_id: String,
    /// Attribute consuming service selected for this request
    #[serde(default)]
    pub attribute_consuming_service: Option<AttributeConsumingService>,
    /// `mdattr:EntityAttributes` extension content
    #[serde(default)]
    pub entity_attributes: Vec<EntityAttribute>,
    /// `shibmd:Scope` extension content
    #[serde(default)]
    pub scopes: Vec<ShibMdScope>,
}

impl EntityMetadata {
    /// Create metadata for an entity
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    /// Set the attribute consuming service
    #[must_use]
    pub fn with_attribute_consuming_service(mut self, acs: AttributeConsumingService) -> Self {
        self.attribute_consuming_service = Some(acs);
        self
    }

    /// Add an entity attribute
    #[must_use]
    pub fn with_entity_attribute(mut self, attribute: EntityAttribute) -> Self {
        self.entity_attributes.push(attribute);
        self
    }

    /// Add a scope declaration
    #[must_use]
    pub fn with_scope(mut self, scope: ShibMdScope) -> Self {
        self.scopes.push(scope);
        self
    }
}

/// Entity attribute (e.g. an entity category)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttribute {
    /// SAML attribute name
    pub name: String,
    /// SAML name format
    #[serde(default)]
    pub name_format: Option<String>,
    /// Values as text
    #[serde(default)]
    pub values: Vec<String>,
}

impl EntityAttribute {
    /// Create an entity attribute
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            name_format: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the name format
    #[must_use]
    pub fn with_name_format(mut self, name_format: impl Into<String>) -> Self {
        self.name_format = Some(name_format.into());
        self
    }
}

/// `shibmd:Scope` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShibMdScope {
    /// Scope literal or regular expression
    pub value: String,
    /// Whether `value` is a regular expression
    #[serde(default)]
    pub regexp: bool,
}

impl ShibMdScope {
    /// Literal scope
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            regexp: false,
        }
    }

    /// Regular-expression scope
    #[must_use]
    pub fn regex(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            regexp: true,
        }
    }
}

/// `md:AttributeConsumingService`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeConsumingService {
    /// Service index
    #[serde(default)]
    pub index: u16,
    /// `md:RequestedAttribute` declarations as they appear in metadata
    #[serde(default)]
    pub requested_attributes: Vec<RequestedAttribute>,
    /// Requested attributes decoded to IdP attribute ids by the metadata
    /// layer, keyed by attribute id
    #[serde(default)]
    pub mapped_attributes: IndexMap<String, Vec<IdPRequestedAttribute>>,
}

impl AttributeConsumingService {
    /// Create an empty service
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requested attribute declaration
    #[must_use]
    pub fn with_requested_attribute(mut self, requested: RequestedAttribute) -> Self {
        self.requested_attributes.push(requested);
        self
    }

    /// Add a decoded requested attribute
    #[must_use]
    pub fn with_mapped_attribute(mut self, mapped: IdPRequestedAttribute) -> Self {
        self.mapped_attributes
            .entry(mapped.id.clone())
            .or_default()
            .push(mapped);
        self
    }

    /// Find a requested attribute by SAML name and name format.
    ///
    /// A missing name format on either side, or [`NAME_FORMAT_UNSPECIFIED`]
    /// on either side, matches any format.
    #[must_use]
    pub fn find_requested(
        &self,
        name: &str,
        name_format: Option<&str>,
    ) -> Option<&RequestedAttribute> {
        self.requested_attributes.iter().find(|requested| {
            if requested.name != name {
                return false;
            }
            match (name_format, requested.name_format.as_deref()) {
                (None | Some(NAME_FORMAT_UNSPECIFIED), _) => true,
                (_, None | Some(NAME_FORMAT_UNSPECIFIED)) => true,
                (Some(wanted), Some(declared)) => wanted == declared,
            }
        })
    }
}

/// `md:RequestedAttribute`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    /// SAML attribute name
    pub name: String,
    /// SAML name format
    #[serde(default)]
    pub name_format: Option<String>,
    /// Friendly name
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// `isRequired`
    #[serde(default)]
    pub is_required: bool,
    /// Requested values
    #[serde(default)]
    pub values: Vec<XmlValue>,
}

impl RequestedAttribute {
    /// Create a requested attribute with no values
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_format: None,
            friendly_name: None,
            is_required: false,
            values: Vec::new(),
        }
    }

    /// Set the name format
    #[must_use]
    pub fn with_name_format(mut self, name_format: impl Into<String>) -> Self {
        self.name_format = Some(name_format.into());
        self
    }

    /// Set `isRequired`
    #[must_use]
    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    /// Add a requested value
    #[must_use]
    pub fn with_value(mut self, value: XmlValue) -> Self {
        self.values.push(value);
        self
    }
}

/// Typed XML content of a requested attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum XmlValue {
    /// `xs:string`
    String(String),
    /// `xs:anyURI`
    Uri(String),
    /// `xs:boolean`
    Boolean(bool),
    /// `xs:integer`
    Integer(i64),
    /// `xs:dateTime`
    DateTime(DateTime<Utc>),
    /// `xs:base64Binary`, kept encoded
    Base64(String),
    /// Element of any type; text content only
    Any(Option<String>),
    /// Any other schema type
    Other(String),
}

impl XmlValue {
    /// Decode to the string form compared against attribute values.
    ///
    /// Returns `None` for types with no string form.
    #[must_use]
    pub fn decode(&self) -> Option<String> {
        match self {
            Self::String(s) | Self::Uri(s) | Self::Base64(s) => Some(s.clone()),
            Self::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::DateTime(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Any(text) => text.clone(),
            Self::Other(_) => None,
        }
    }

    /// Schema type name, for diagnostics
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::String(_) => "xs:string",
            Self::Uri(_) => "xs:anyURI",
            Self::Boolean(_) => "xs:boolean",
            Self::Integer(_) => "xs:integer",
            Self::DateTime(_) => "xs:dateTime",
            Self::Base64(_) => "xs:base64Binary",
            Self::Any(_) => "xs:any",
            Self::Other(name) => name,
        }
    }
}

/// Requested attribute after decoding to an IdP attribute id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPRequestedAttribute {
    /// IdP attribute id
    pub id: String,
    /// `isRequired`
    #[serde(default)]
    pub is_required: bool,
    /// Decoded requested values
    #[serde(default)]
    pub values: Vec<IdPAttributeValue>,
}

impl IdPRequestedAttribute {
    /// Create a decoded requested attribute
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_required: false,
            values: Vec::new(),
        }
    }

    /// Set `isRequired`
    #[must_use]
    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    /// Set the requested values
    #[must_use]
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IdPAttributeValue>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }
}
