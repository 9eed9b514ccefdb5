//! Release values the requester asks for in its metadata.

use super::Matcher;
use crate::composition::impl_component;
use crate::context::AttributeFilterContext;
use crate::metadata::{
    AttributeConsumingService, IdPRequestedAttribute, NAME_FORMAT_UNSPECIFIED, RequestedAttribute,
};
use idp_core::{
    Component, ComponentId, ComponentResult, IdPAttribute, IdPAttributeValue, Lifecycle, ValueSet,
};
use tracing::{debug, warn};

/// Matches values against the requester's `md:RequestedAttribute`
/// declarations.
///
/// With an `attribute_name` configured the SAML declarations are searched
/// by name; otherwise the declarations already mapped to IdP attribute ids
/// are looked up by the filtered attribute's id.
#[derive(Debug)]
pub struct AttributeInMetadataMatcher {
    id: ComponentId,
    lifecycle: Lifecycle,
    match_if_metadata_silent: bool,
    only_if_required: bool,
    attribute_name: Option<String>,
    attribute_name_format: Option<String>,
}

impl AttributeInMetadataMatcher {
    /// Create the matcher. `only_if_required` defaults to true.
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            match_if_metadata_silent: false,
            only_if_required: true,
            attribute_name: None,
            attribute_name_format: None,
        }
    }

    /// Release everything when the requester has no attribute consuming
    /// service.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_match_if_metadata_silent(&mut self, value: bool) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.match_if_metadata_silent = value;
        Ok(())
    }

    /// Only honour declarations marked `isRequired`.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_only_if_required(&mut self, value: bool) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.only_if_required = value;
        Ok(())
    }

    /// SAML attribute name to look up.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_name(&mut self, name: impl Into<String>) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.attribute_name = Some(name.into());
        Ok(())
    }

    /// SAML name format to look up. The `unspecified` format matches any
    /// declared format.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error after initialization
    pub fn set_attribute_name_format(
        &mut self,
        format: impl Into<String>,
    ) -> ComponentResult<()> {
        self.lifecycle.ensure_configurable(&self.id)?;
        let format = format.into();
        self.attribute_name_format = (format != NAME_FORMAT_UNSPECIFIED).then_some(format);
        Ok(())
    }

    fn validate(&mut self) -> ComponentResult<()> {
        Ok(())
    }

    fn by_name(
        &self,
        name: &str,
        attribute: &IdPAttribute,
        acs: &AttributeConsumingService,
    ) -> ValueSet {
        let Some(requested) = acs.find_requested(name, self.attribute_name_format.as_deref()) else {
            debug!(
                "{} attribute '{}' not found in metadata, no values match",
                self.id.log_prefix(),
                name
            );
            return ValueSet::new();
        };
        if self.only_if_required && !requested.is_required {
            debug!(
                "{} attribute '{}' is not required, no values match",
                self.id.log_prefix(),
                name
            );
            return ValueSet::new();
        }
        if requested.values.is_empty() {
            return attribute.value_set();
        }
        let declared = self.decode_declared(requested);
        attribute
            .values()
            .iter()
            .filter(|value| {
                comparable_string(value).is_some_and(|s| declared.iter().any(|d| *d == s))
            })
            .cloned()
            .collect()
    }

    fn decode_declared(&self, requested: &RequestedAttribute) -> Vec<String> {
        requested
            .values
            .iter()
            .filter_map(|value| {
                let decoded = value.decode();
                if decoded.is_none() {
                    warn!(
                        "{} cannot compare requested value of type {}, ignoring it",
                        self.id.log_prefix(),
                        value.type_name()
                    );
                }
                decoded
            })
            .collect()
    }

    fn by_id(&self, attribute: &IdPAttribute, mapped: &[IdPRequestedAttribute]) -> ValueSet {
        let mut result = ValueSet::new();
        for requested in mapped {
            if self.only_if_required && !requested.is_required {
                continue;
            }
            if requested.values.is_empty() {
                return attribute.value_set();
            }
            result.extend(
                attribute
                    .values()
                    .iter()
                    .filter(|value| requested.values.contains(value))
                    .cloned(),
            );
        }
        result
    }
}

impl_component!(AttributeInMetadataMatcher);

impl Matcher for AttributeInMetadataMatcher {
    fn evaluate(
        &self,
        attribute: &IdPAttribute,
        ctx: &AttributeFilterContext,
    ) -> ComponentResult<Option<ValueSet>> {
        self.ensure_active()?;
        let Some(acs) = ctx.attribute_consuming_service() else {
            debug!(
                "{} no attribute consuming service, metadata is silent",
                self.id.log_prefix()
            );
            return Ok(Some(if self.match_if_metadata_silent {
                attribute.value_set()
            } else {
                ValueSet::new()
            }));
        };
        if let Some(name) = &self.attribute_name {
            return Ok(Some(self.by_name(name, attribute, acs)));
        }
        let Some(mapped) = acs.mapped_attributes.get(attribute.id()) else {
            debug!(
                "{} attribute '{}' not requested, no values match",
                self.id.log_prefix(),
                attribute.id()
            );
            return Ok(Some(ValueSet::new()));
        };
        Ok(Some(self.by_id(attribute, mapped)))
    }
}

/// String form of a value compared with decoded metadata values
fn comparable_string(value: &IdPAttributeValue) -> Option<String> {
    match value {
        IdPAttributeValue::String(s) => Some(s.clone()),
        IdPAttributeValue::ScopedString { .. } => Some(value.to_string()),
        _ => None,
    }
}
