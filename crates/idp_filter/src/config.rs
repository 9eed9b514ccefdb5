//! Declarative policy documents.
//!
//! A policy document is JSON describing the policies, their requirement
//! rules and their attribute rules. [`PolicyCompiler`] turns it into an
//! initialized [`AttributeFilter`]. Rules and matchers are tagged by a
//! `"type"` field and may carry an explicit `"id"`; otherwise their id is
//! derived from their position, e.g. `release-to-sp/mail/permit/0`.

use crate::context::Direction;
use crate::engine::AttributeFilter;
use crate::matcher::{
    AndMatcher, AnyMatcher, AttributeInMetadataMatcher, Matcher, MatcherFromRule, NotMatcher,
    OrMatcher, RegexMatcher, ScopeMatchesShibMdScopeMatcher, ScriptedMatcher, StringMatcher,
    ValueTarget,
};
use crate::policy::{AttributeFilterPolicy, AttributeRule};
use crate::rule::{
    AndRule, AnyRule, DirectionRule, EntityAttributeRule, NotRule, NumOfAttributeValuesRule,
    OrRule, PolicyRequirementRule, RuleFromMatcher, RuleTarget, ScriptedRule, TargetRegexRule,
    TargetStringRule,
};
use crate::script::{ScriptEvaluator, ScriptRegistry};
use idp_core::{Component, ComponentError, ComponentId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Id given to the engine when the document has none
pub const DEFAULT_FILTER_ID: &str = "attribute-filter";

/// Policy document loading and compilation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Document could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON or does not have the expected shape
    #[error("invalid policy document: {0}")]
    Json(#[from] serde_json::Error),

    /// A scripted rule or matcher names a script that is not registered
    #[error("{component}: unknown script '{script}'")]
    UnknownScript {
        /// Component referring to the script
        component: String,
        /// Script name
        script: String,
    },

    /// Two policies share an id
    #[error("duplicate policy id '{0}'")]
    DuplicatePolicy(String),

    /// A component rejected its configuration
    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Top-level policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Engine id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Policies in evaluation order
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

impl PolicyDocument {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Json` if the text is not a policy document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Json` if it does not parse
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// One policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy id, unique within the document
    pub id: String,
    /// When the policy applies
    pub requirement: RuleConfig,
    /// What the policy releases
    #[serde(default)]
    pub attribute_rules: Vec<AttributeRuleConfig>,
}

/// Permit and deny matchers for one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRuleConfig {
    /// Explicit id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// IdP attribute id
    pub attribute_id: String,
    /// Values to release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit: Option<MatcherConfig>,
    /// Values to withhold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<MatcherConfig>,
}

/// Configured string comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringConfig {
    /// String to compare against
    pub value: String,
    /// Case-insensitive comparison
    #[serde(default)]
    pub ignore_case: bool,
}

/// Configured regular expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexConfig {
    /// Pattern, matched against whole strings
    pub regex: String,
}

/// A requirement rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Explicit id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Rule type and settings
    #[serde(flatten)]
    pub kind: RuleKind,
}

/// Requirement rule types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleKind {
    /// Always true
    #[serde(rename = "ANY")]
    Any,
    /// Conjunction
    #[serde(rename = "AND")]
    And {
        /// Children
        rules: Vec<RuleConfig>,
    },
    /// Disjunction
    #[serde(rename = "OR")]
    Or {
        /// Children
        rules: Vec<RuleConfig>,
    },
    /// Negation
    #[serde(rename = "NOT")]
    Not {
        /// Negated rule
        rule: Box<RuleConfig>,
    },
    /// Request direction
    Direction {
        /// Direction to match
        direction: Direction,
    },
    /// Requester equals
    Requester(StringConfig),
    /// Requester matches
    RequesterRegex(RegexConfig),
    /// Issuer equals
    Issuer(StringConfig),
    /// Issuer matches
    IssuerRegex(RegexConfig),
    /// Principal equals
    Principal(StringConfig),
    /// Principal matches
    PrincipalRegex(RegexConfig),
    /// An authentication method equals
    AuthenticationMethod(StringConfig),
    /// An authentication method matches
    AuthenticationMethodRegex(RegexConfig),
    /// A proxied requester equals
    ProxiedRequester(StringConfig),
    /// A proxied requester matches
    ProxiedRequesterRegex(RegexConfig),
    /// Attribute value count in range
    NumberOfAttributeValues {
        /// Counted attribute
        attribute_id: String,
        /// Lower bound
        #[serde(default)]
        minimum: usize,
        /// Upper bound, unbounded when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<usize>,
    },
    /// Requester entity attribute has a value
    EntityAttributeExactMatch {
        /// Entity attribute name
        attribute_name: String,
        /// Entity attribute name format
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name_format: Option<String>,
        /// Value
        value: String,
    },
    /// Requester entity attribute has a matching value
    EntityAttributeRegexMatch {
        /// Entity attribute name
        attribute_name: String,
        /// Entity attribute name format
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name_format: Option<String>,
        /// Value pattern
        regex: String,
    },
    /// A matcher selects some value of an attribute
    AttributeValueMatches {
        /// Attribute the matcher runs over
        attribute_id: String,
        /// Matcher
        matcher: Box<MatcherConfig>,
    },
    /// Registered script
    Script {
        /// Script name
        script: String,
    },
}

/// A value matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Explicit id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Matcher type and settings
    #[serde(flatten)]
    pub kind: MatcherKind,
}

/// Value matcher types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatcherKind {
    /// Every value
    #[serde(rename = "ANY")]
    Any,
    /// Intersection
    #[serde(rename = "AND")]
    And {
        /// Children
        matchers: Vec<MatcherConfig>,
    },
    /// Union
    #[serde(rename = "OR")]
    Or {
        /// Children
        matchers: Vec<MatcherConfig>,
    },
    /// Complement
    #[serde(rename = "NOT")]
    Not {
        /// Negated matcher
        matcher: Box<MatcherConfig>,
    },
    /// Value equals
    Value(StringConfig),
    /// Scope equals
    Scope(StringConfig),
    /// Value matches
    ValueRegex(RegexConfig),
    /// Scope matches
    ScopeRegex(RegexConfig),
    /// Scope declared in issuer metadata
    #[serde(rename = "ScopeMatchesShibMDScope")]
    ScopeMatchesShibMdScope,
    /// Value requested in requester metadata
    AttributeInMetadata {
        /// Release everything when metadata is silent
        #[serde(default)]
        match_if_metadata_silent: bool,
        /// Only honour required attributes
        #[serde(default = "default_true")]
        only_if_required: bool,
        /// SAML attribute name to look up
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute_name: Option<String>,
        /// SAML name format to look up
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute_name_format: Option<String>,
    },
    /// All values when a rule holds
    PolicyRule {
        /// Rule
        rule: Box<RuleConfig>,
    },
    /// Registered script
    Script {
        /// Script name
        script: String,
    },
}

fn default_true() -> bool {
    true
}

/// Builds the engine from policy documents
#[derive(Debug, Clone, Default)]
pub struct PolicyCompiler {
    scripts: ScriptRegistry,
}

impl PolicyCompiler {
    /// Create a compiler with no scripts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make scripts available to `Script` rules and matchers
    #[must_use]
    pub fn with_scripts(mut self, scripts: ScriptRegistry) -> Self {
        self.scripts = scripts;
        self
    }

    /// Compile a JSON document.
    ///
    /// # Errors
    ///
    /// See [`PolicyCompiler::compile`]
    pub fn compile_str(&self, json: &str) -> Result<AttributeFilter, ConfigError> {
        self.compile(&PolicyDocument::from_json(json)?)
    }

    /// Compile a JSON document file.
    ///
    /// # Errors
    ///
    /// See [`PolicyCompiler::compile`]
    pub fn compile_path(&self, path: impl AsRef<Path>) -> Result<AttributeFilter, ConfigError> {
        self.compile(&PolicyDocument::from_path(path)?)
    }

    /// Build and initialize the engine.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found
    pub fn compile(&self, document: &PolicyDocument) -> Result<AttributeFilter, ConfigError> {
        let mut seen = HashSet::new();
        let mut policies = Vec::with_capacity(document.policies.len());
        for policy in &document.policies {
            if !seen.insert(policy.id.as_str()) {
                return Err(ConfigError::DuplicatePolicy(policy.id.clone()));
            }
            policies.push(self.compile_policy(policy)?);
        }
        let mut filter = AttributeFilter::new(document.id.as_deref().unwrap_or(DEFAULT_FILTER_ID));
        filter.set_policies(policies)?;
        filter.initialize()?;
        Ok(filter)
    }

    fn compile_policy(&self, config: &PolicyConfig) -> Result<AttributeFilterPolicy, ConfigError> {
        let id = ComponentId::new(config.id.as_str());
        let mut policy = AttributeFilterPolicy::new(id.clone());
        policy.set_rule(self.compile_rule(id.child("requirement"), &config.requirement)?)?;
        let mut rules = Vec::with_capacity(config.attribute_rules.len());
        for rule in &config.attribute_rules {
            rules.push(self.compile_attribute_rule(&id, rule)?);
        }
        policy.set_attribute_rules(rules)?;
        policy.initialize()?;
        Ok(policy)
    }

    fn compile_attribute_rule(
        &self,
        policy: &ComponentId,
        config: &AttributeRuleConfig,
    ) -> Result<AttributeRule, ConfigError> {
        let id = match &config.id {
            Some(id) => ComponentId::new(id.as_str()),
            None => policy.child(&config.attribute_id),
        };
        let mut rule = AttributeRule::new(id.clone());
        rule.set_attribute_id(config.attribute_id.as_str())?;
        if let Some(permit) = &config.permit {
            rule.set_permit(self.compile_matcher(id.child("permit"), permit)?)?;
        }
        if let Some(deny) = &config.deny {
            rule.set_deny(self.compile_matcher(id.child("deny"), deny)?)?;
        }
        rule.initialize()?;
        Ok(rule)
    }

    fn compile_rule(
        &self,
        id: ComponentId,
        config: &RuleConfig,
    ) -> Result<Arc<dyn PolicyRequirementRule>, ConfigError> {
        let id = config.id.as_deref().map_or(id, ComponentId::new);
        match &config.kind {
            RuleKind::Any => rule(AnyRule::new(id)),
            RuleKind::And { rules } => {
                let mut and = AndRule::new(id.clone());
                and.set_children(self.compile_rules(&id, rules)?)?;
                rule(and)
            }
            RuleKind::Or { rules } => {
                let mut or = OrRule::new(id.clone());
                or.set_children(self.compile_rules(&id, rules)?)?;
                rule(or)
            }
            RuleKind::Not { rule: child } => {
                let mut not = NotRule::new(id.clone());
                not.set_child(self.compile_rule(id.child("0"), child)?)?;
                rule(not)
            }
            RuleKind::Direction { direction } => {
                let mut r = DirectionRule::new(id);
                r.set_direction(*direction)?;
                rule(r)
            }
            RuleKind::Requester(s) => target_string(id, RuleTarget::Requester, s),
            RuleKind::RequesterRegex(r) => target_regex(id, RuleTarget::Requester, r),
            RuleKind::Issuer(s) => target_string(id, RuleTarget::Issuer, s),
            RuleKind::IssuerRegex(r) => target_regex(id, RuleTarget::Issuer, r),
            RuleKind::Principal(s) => target_string(id, RuleTarget::Principal, s),
            RuleKind::PrincipalRegex(r) => target_regex(id, RuleTarget::Principal, r),
            RuleKind::AuthenticationMethod(s) => {
                target_string(id, RuleTarget::AuthenticationMethod, s)
            }
            RuleKind::AuthenticationMethodRegex(r) => {
                target_regex(id, RuleTarget::AuthenticationMethod, r)
            }
            RuleKind::ProxiedRequester(s) => target_string(id, RuleTarget::ProxiedRequester, s),
            RuleKind::ProxiedRequesterRegex(r) => target_regex(id, RuleTarget::ProxiedRequester, r),
            RuleKind::NumberOfAttributeValues {
                attribute_id,
                minimum,
                maximum,
            } => {
                let mut r = NumOfAttributeValuesRule::new(id);
                r.set_attribute_id(attribute_id.as_str())?;
                r.set_minimum(*minimum)?;
                if let Some(maximum) = maximum {
                    r.set_maximum(*maximum)?;
                }
                rule(r)
            }
            RuleKind::EntityAttributeExactMatch {
                attribute_name,
                name_format,
                value,
            } => entity_attribute(
                EntityAttributeRule::exact(id),
                attribute_name,
                name_format.as_deref(),
                value,
            ),
            RuleKind::EntityAttributeRegexMatch {
                attribute_name,
                name_format,
                regex,
            } => entity_attribute(
                EntityAttributeRule::regex(id),
                attribute_name,
                name_format.as_deref(),
                regex,
            ),
            RuleKind::AttributeValueMatches { attribute_id, matcher } => {
                let mut r = RuleFromMatcher::new(id.clone());
                r.set_attribute_id(attribute_id.as_str())?;
                r.set_matcher(self.compile_matcher(id.child("matcher"), matcher)?)?;
                rule(r)
            }
            RuleKind::Script { script } => {
                let mut r = ScriptedRule::new(id.clone());
                r.set_script(self.script(&id, script)?)?;
                rule(r)
            }
        }
    }

    fn compile_rules(
        &self,
        parent: &ComponentId,
        configs: &[RuleConfig],
    ) -> Result<Vec<Arc<dyn PolicyRequirementRule>>, ConfigError> {
        configs
            .iter()
            .enumerate()
            .map(|(i, config)| self.compile_rule(parent.child(&i.to_string()), config))
            .collect()
    }

    fn compile_matcher(
        &self,
        id: ComponentId,
        config: &MatcherConfig,
    ) -> Result<Arc<dyn Matcher>, ConfigError> {
        let id = config.id.as_deref().map_or(id, ComponentId::new);
        match &config.kind {
            MatcherKind::Any => matcher(AnyMatcher::new(id)),
            MatcherKind::And { matchers } => {
                let mut and = AndMatcher::new(id.clone());
                and.set_children(self.compile_matchers(&id, matchers)?)?;
                matcher(and)
            }
            MatcherKind::Or { matchers } => {
                let mut or = OrMatcher::new(id.clone());
                or.set_children(self.compile_matchers(&id, matchers)?)?;
                matcher(or)
            }
            MatcherKind::Not { matcher: child } => {
                let mut not = NotMatcher::new(id.clone());
                not.set_child(self.compile_matcher(id.child("0"), child)?)?;
                matcher(not)
            }
            MatcherKind::Value(s) => value_string(id, ValueTarget::Value, s),
            MatcherKind::Scope(s) => value_string(id, ValueTarget::Scope, s),
            MatcherKind::ValueRegex(r) => value_regex(id, ValueTarget::Value, r),
            MatcherKind::ScopeRegex(r) => value_regex(id, ValueTarget::Scope, r),
            MatcherKind::ScopeMatchesShibMdScope => {
                matcher(ScopeMatchesShibMdScopeMatcher::new(id))
            }
            MatcherKind::AttributeInMetadata {
                match_if_metadata_silent,
                only_if_required,
                attribute_name,
                attribute_name_format,
            } => {
                let mut m = AttributeInMetadataMatcher::new(id);
                m.set_match_if_metadata_silent(*match_if_metadata_silent)?;
                m.set_only_if_required(*only_if_required)?;
                if let Some(name) = attribute_name {
                    m.set_attribute_name(name.as_str())?;
                }
                if let Some(format) = attribute_name_format {
                    m.set_attribute_name_format(format.as_str())?;
                }
                matcher(m)
            }
            MatcherKind::PolicyRule { rule } => {
                let mut m = MatcherFromRule::new(id.clone());
                m.set_rule(self.compile_rule(id.child("rule"), rule)?)?;
                matcher(m)
            }
            MatcherKind::Script { script } => {
                let mut m = ScriptedMatcher::new(id.clone());
                m.set_script(self.script(&id, script)?)?;
                matcher(m)
            }
        }
    }

    fn compile_matchers(
        &self,
        parent: &ComponentId,
        configs: &[MatcherConfig],
    ) -> Result<Vec<Arc<dyn Matcher>>, ConfigError> {
        configs
            .iter()
            .enumerate()
            .map(|(i, config)| self.compile_matcher(parent.child(&i.to_string()), config))
            .collect()
    }

    fn script(
        &self,
        component: &ComponentId,
        name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>, ConfigError> {
        self.scripts.get(name).ok_or_else(|| ConfigError::UnknownScript {
            component: component.to_string(),
            script: name.to_string(),
        })
    }
}

fn rule<R: PolicyRequirementRule + 'static>(
    mut rule: R,
) -> Result<Arc<dyn PolicyRequirementRule>, ConfigError> {
    rule.initialize()?;
    Ok(Arc::new(rule))
}

fn matcher<M: Matcher + 'static>(mut matcher: M) -> Result<Arc<dyn Matcher>, ConfigError> {
    matcher.initialize()?;
    Ok(Arc::new(matcher))
}

fn target_string(
    id: ComponentId,
    target: RuleTarget,
    config: &StringConfig,
) -> Result<Arc<dyn PolicyRequirementRule>, ConfigError> {
    let mut r = TargetStringRule::new(id, target);
    r.set_match_string(config.value.as_str())?;
    r.set_ignore_case(config.ignore_case)?;
    rule(r)
}

fn target_regex(
    id: ComponentId,
    target: RuleTarget,
    config: &RegexConfig,
) -> Result<Arc<dyn PolicyRequirementRule>, ConfigError> {
    let mut r = TargetRegexRule::new(id, target);
    r.set_regex(config.regex.as_str())?;
    rule(r)
}

fn entity_attribute(
    mut r: EntityAttributeRule,
    attribute_name: &str,
    name_format: Option<&str>,
    value: &str,
) -> Result<Arc<dyn PolicyRequirementRule>, ConfigError> {
    r.set_attribute_name(attribute_name)?;
    if let Some(format) = name_format {
        r.set_name_format(format)?;
    }
    r.set_value(value)?;
    rule(r)
}

fn value_string(
    id: ComponentId,
    target: ValueTarget,
    config: &StringConfig,
) -> Result<Arc<dyn Matcher>, ConfigError> {
    let mut m = StringMatcher::new(id, target);
    m.set_match_string(config.value.as_str())?;
    m.set_ignore_case(config.ignore_case)?;
    matcher(m)
}

fn value_regex(
    id: ComponentId,
    target: ValueTarget,
    config: &RegexConfig,
) -> Result<Arc<dyn Matcher>, ConfigError> {
    let mut m = RegexMatcher::new(id, target);
    m.set_regex(config.regex.as_str())?;
    matcher(m)
}
