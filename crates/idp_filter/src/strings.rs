//! String and regular-expression comparison shared by leaf matchers and
//! leaf rules.

use idp_core::{ComponentError, ComponentId, ComponentResult};
use regex::Regex;

/// Compare two optional strings.
///
/// Two absent strings are equal; an absent string never equals a present
/// one.
#[must_use]
pub fn compare_strings(candidate: Option<&str>, target: Option<&str>, ignore_case: bool) -> bool {
    match (candidate, target) {
        (None, None) => true,
        (Some(candidate), Some(target)) => {
            if ignore_case {
                candidate.to_lowercase() == target.to_lowercase()
            } else {
                candidate == target
            }
        }
        _ => false,
    }
}

/// Configured match string plus case sensitivity.
#[derive(Debug, Clone, Default)]
pub struct StringMatch {
    match_string: Option<String>,
    ignore_case: bool,
}

impl StringMatch {
    /// Set the string to compare against
    pub fn set_match_string(&mut self, value: impl Into<String>) {
        self.match_string = Some(value.into());
    }

    /// Set case-insensitive comparison
    pub fn set_ignore_case(&mut self, ignore_case: bool) {
        self.ignore_case = ignore_case;
    }

    /// Configured match string
    #[must_use]
    pub fn match_string(&self) -> Option<&str> {
        self.match_string.as_deref()
    }

    /// Whether comparison ignores case
    #[must_use]
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Require a match string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when unset
    pub fn validate(&self, owner: &ComponentId) -> ComponentResult<()> {
        if self.match_string.is_none() {
            return Err(ComponentError::configuration(owner.as_str(), "match string is required"));
        }
        Ok(())
    }

    /// Compare a candidate
    #[must_use]
    pub fn matches(&self, candidate: Option<&str>) -> bool {
        compare_strings(candidate, self.match_string.as_deref(), self.ignore_case)
    }
}

/// Configured regular expression, compiled at initialization.
///
/// Matching is anchored at both ends: the whole candidate must match.
#[derive(Debug, Clone, Default)]
pub struct RegexMatch {
    pattern: Option<String>,
    compiled: Option<Regex>,
}

impl RegexMatch {
    /// Set the pattern
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = Some(pattern.into());
        self.compiled = None;
    }

    /// Configured pattern
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Compile the pattern.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern is unset or invalid
    pub fn compile(&mut self, owner: &ComponentId) -> ComponentResult<()> {
        let pattern = self.pattern.as_deref().ok_or_else(|| {
            ComponentError::configuration(owner.as_str(), "regular expression is required")
        })?;
        let compiled = full_match_regex(pattern).map_err(|e| {
            ComponentError::configuration(
                owner.as_str(),
                format!("invalid regular expression: {}", e),
            )
        })?;
        self.compiled = Some(compiled);
        Ok(())
    }

    /// Test a candidate. Always false before `compile`.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(candidate))
    }
}

/// Compile `pattern` so that it only matches whole strings.
///
/// # Errors
///
/// Returns the regex compilation error
pub fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_strings_absent() {
        assert!(compare_strings(None, None, false));
        assert!(!compare_strings(Some("a"), None, false));
        assert!(!compare_strings(None, Some("a"), true));
    }

    #[test]
    fn test_compare_strings_case() {
        assert!(compare_strings(Some("issuer"), Some("issuer"), false));
        assert!(!compare_strings(Some("Issuer"), Some("issuer"), false));
        assert!(compare_strings(Some("Issuer"), Some("issuer"), true));
    }

    #[test]
    fn test_string_match_requires_value() {
        let id = ComponentId::new("m");
        let mut m = StringMatch::default();
        assert!(m.validate(&id).is_err());
        m.set_match_string("staff");
        assert!(m.validate(&id).is_ok());
        assert!(m.matches(Some("staff")));
        assert!(!m.matches(None));
    }

    #[test]
    fn test_regex_full_match() {
        let id = ComponentId::new("r");
        let mut r = RegexMatch::default();
        r.set_pattern("emp");
        r.compile(&id).unwrap();
        assert!(r.matches("emp"));
        assert!(!r.matches("employee"));

        r.set_pattern("emp.*|staff");
        assert!(!r.matches("employee"));
        r.compile(&id).unwrap();
        assert!(r.matches("employee"));
        assert!(r.matches("staff"));
        assert!(!r.matches("xstaff"));
    }

    #[test]
    fn test_regex_invalid() {
        let id = ComponentId::new("r");
        let mut r = RegexMatch::default();
        assert!(r.compile(&id).is_err());
        r.set_pattern("(");
        let err = r.compile(&id).unwrap_err();
        assert!(err.to_string().contains("invalid regular expression"));
    }
}
