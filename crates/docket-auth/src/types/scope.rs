//! The fixed scope vocabulary.
//!
//! Scope strings from clients are filtered, never rejected token by token:
//! unknown values are dropped and only an empty result is an error.

use serde::{Deserialize, Serialize};

/// A supported scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "docs:read")]
    DocsRead,
    #[serde(rename = "docs:write")]
    DocsWrite,
    #[serde(rename = "tasks:read")]
    TasksRead,
    #[serde(rename = "tasks:write")]
    TasksWrite,
}

impl Scope {
    /// Every supported scope, in advertised order.
    pub const ALL: [Scope; 4] = [
        Scope::DocsRead,
        Scope::DocsWrite,
        Scope::TasksRead,
        Scope::TasksWrite,
    ];

    /// Returns the scope token.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocsRead => "docs:read",
            Self::DocsWrite => "docs:write",
            Self::TasksRead => "tasks:read",
            Self::TasksWrite => "tasks:write",
        }
    }

    /// Parses a single scope token. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == token)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, duplicate-free set of supported scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    /// Filters a space-separated scope string down to supported scopes.
    ///
    /// Order of first appearance is kept and duplicates are dropped.
    #[must_use]
    pub fn filter(requested: &str) -> Self {
        Self::from_tokens(requested.split_whitespace())
    }

    /// Builds a set from individual tokens, dropping unknown ones.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let mut scopes = Vec::new();
        for scope in tokens.into_iter().filter_map(Scope::parse) {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        Self(scopes)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }

    /// Scope tokens as owned strings, for persistence.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|s| s.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for ScopeSet {
    /// Space-separated, as in the `scope` parameter.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, scope) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(scope.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_unknown_scopes() {
        let scopes = ScopeSet::filter("docs:read invalid:scope tasks:read");
        assert_eq!(scopes.to_string(), "docs:read tasks:read");
    }

    #[test]
    fn test_filter_keeps_order_and_dedups() {
        let scopes = ScopeSet::filter("tasks:write docs:read tasks:write");
        assert_eq!(scopes.to_string(), "tasks:write docs:read");
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        assert!(ScopeSet::filter("DOCS:READ Docs:Read").is_empty());
    }

    #[test]
    fn test_filter_empty_and_whitespace() {
        assert!(ScopeSet::filter("").is_empty());
        assert!(ScopeSet::filter("   ").is_empty());
        assert_eq!(ScopeSet::filter("  docs:write\t").to_string(), "docs:write");
    }

    #[test]
    fn test_serializes_as_string_array() {
        let scopes = ScopeSet::filter("docs:read tasks:write");
        let json = serde_json::to_value(&scopes).unwrap();
        assert_eq!(json, serde_json::json!(["docs:read", "tasks:write"]));
    }
}
