//! Endpoint permission rules for API keys

use serde::{Deserialize, Serialize};

/// A single endpoint permission rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionRule {
    /// Matches every endpoint path
    Wildcard,
    /// Matches on full path equality
    Exact(String),
    /// Matches any path starting with the base path
    Prefix(String),
}

impl PermissionRule {
    pub fn exact(path: impl Into<String>) -> Self {
        Self::Exact(path.into())
    }

    pub fn prefix(base: impl Into<String>) -> Self {
        Self::Prefix(base.into())
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Exact(p) => p == path,
            Self::Prefix(base) => path.starts_with(base.as_str()),
        }
    }
}

/// The permission rules granted to one API key.
///
/// Rules are evaluated in a fixed order regardless of how they were stored:
/// exact matches first, then prefix matches, then the wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    rules: Vec<PermissionRule>,
}

impl PermissionSet {
    pub fn new(rules: impl IntoIterator<Item = PermissionRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// A set containing only the wildcard rule
    pub fn allow_all() -> Self {
        Self::new([PermissionRule::Wildcard])
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the rule granting access to `path`, if any.
    pub fn matched_rule(&self, path: &str) -> Option<&PermissionRule> {
        let exact = self
            .rules
            .iter()
            .filter(|r| matches!(r, PermissionRule::Exact(_)));
        let prefixes = self
            .rules
            .iter()
            .filter(|r| matches!(r, PermissionRule::Prefix(_)));
        let wildcard = self
            .rules
            .iter()
            .filter(|r| matches!(r, PermissionRule::Wildcard));

        exact
            .chain(prefixes)
            .chain(wildcard)
            .find(|r| r.matches(path))
    }

    /// Check whether any rule grants access to `path`.
    pub fn allows(&self, path: &str) -> bool {
        self.matched_rule(path).is_some()
    }
}
