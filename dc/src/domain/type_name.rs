//! Work item type names
//!
//! A type name is an arbitrary string key into the type rules
//! configuration ("Epic", "User Story", ...). It is validated once at
//! construction: surrounding whitespace is stripped and empty names are
//! rejected.

use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyError;

/// Validated work item type name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Validate and wrap a type name
    pub fn new(name: impl AsRef<str>) -> Result<Self, HierarchyError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(HierarchyError::InvalidTypeName(name.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Wrap a name known to be valid (non-empty, trimmed)
    pub(crate) fn from_trusted(name: &str) -> Self {
        debug_assert!(!name.trim().is_empty());
        Self(name.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw string
    pub fn matches_ignore_case(&self, other: &str) -> bool {
        fold_case(&self.0) == fold_case(other)
    }
}

/// Trimmed Unicode lowercase, the one folding rule for type names and titles
pub(crate) fn fold_case(s: &str) -> String {
    s.trim().to_lowercase()
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TypeName {
    type Error = HierarchyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for TypeName {
    type Error = HierarchyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TypeName> for String {
    fn from(t: TypeName) -> Self {
        t.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TypeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        let t = TypeName::new("  User Story ").unwrap();
        assert_eq!(t.as_str(), "User Story");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(TypeName::new("").is_err());
        assert!(TypeName::new("   ").is_err());
    }

    #[test]
    fn test_matches_ignore_case() {
        let t = TypeName::new("Feature").unwrap();
        assert!(t.matches_ignore_case("feature"));
        assert!(t.matches_ignore_case(" FEATURE "));
        assert!(!t.matches_ignore_case("Features"));
    }

    #[test]
    fn test_matches_ignore_case_non_ascii() {
        let t = TypeName::new("Épica").unwrap();
        assert!(t.matches_ignore_case("ÉPICA"));
        assert!(t.matches_ignore_case(" épica"));
        assert!(!t.matches_ignore_case("Epica"));
    }

    #[test]
    fn test_deserialize_rejects_blank() {
        let ok: Result<TypeName, _> = serde_json::from_str("\"Bug\"");
        assert_eq!(ok.unwrap(), "Bug");
        let bad: Result<TypeName, _> = serde_json::from_str("\"  \"");
        assert!(bad.is_err());
    }
}
