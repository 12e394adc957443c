//! Type rules configuration
//!
//! Maps each work item type to the types allowed as its direct children.
//! Rules are loaded from:
//! 1. Builtin (embedded in binary)
//! 2. A YAML types file named in the configuration
//!
//! ## Format
//!
//! ```yaml
//! Epic:
//!   allowed-child-types: [Feature]
//!   display-color: "#FF7B00"
//! Task:
//!   allowed-child-types: []
//! ```
//!
//! A type whose entry omits `allowed-child-types` (or has no entry at all)
//! is *not configured*; the fallback type is then offered as its only child
//! type. An explicit empty list means no children are allowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::TypeName;

/// Builtin type definitions (embedded in binary)
const BUILTIN_TYPES: &str = include_str!("builtin_types.yml");

/// Default fallback child type for unconfigured parents
pub const DEFAULT_FALLBACK_TYPE: &str = "Task";

/// A single type definition as loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDefinition {
    /// Allowed direct child types; `None` means not configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_child_types: Option<Vec<TypeName>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl TypeDefinition {
    /// Definition with an explicit child type list
    pub fn with_children(children: Vec<TypeName>) -> Self {
        Self {
            allowed_child_types: Some(children),
            ..Default::default()
        }
    }
}

/// Type name -> child type rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRules {
    types: BTreeMap<TypeName, TypeDefinition>,
    fallback_type: TypeName,
}

impl TypeRules {
    /// Build rules from a set of definitions
    pub fn new(types: BTreeMap<TypeName, TypeDefinition>) -> Self {
        Self {
            types,
            fallback_type: default_fallback_type(),
        }
    }

    /// Empty rule set: every parent offers only the fallback type
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    /// The builtin Epic/Feature/User Story/Task/Bug hierarchy
    pub fn builtin() -> Result<Self> {
        debug!("TypeRules::builtin: called");
        Self::from_yaml_str(BUILTIN_TYPES).context("Failed to parse builtin type rules")
    }

    /// Parse rules from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let types: BTreeMap<TypeName, TypeDefinition> =
            serde_yaml::from_str(content).context("Failed to parse type rules YAML")?;
        debug!(type_count = types.len(), "TypeRules::from_yaml_str: parsed");
        Ok(Self::new(types))
    }

    /// Load rules from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "TypeRules::load: called");
        let content =
            fs::read_to_string(path).context(format!("Failed to read types file {}", path.display()))?;
        Self::from_yaml_str(&content).context(format!("Invalid types file {}", path.display()))
    }

    /// Replace the fallback type
    pub fn with_fallback_type(mut self, fallback_type: TypeName) -> Self {
        self.fallback_type = fallback_type;
        self
    }

    pub fn fallback_type(&self) -> &TypeName {
        &self.fallback_type
    }

    /// All configured type names, sorted
    pub fn type_names(&self) -> Vec<&TypeName> {
        self.types.keys().collect()
    }

    pub fn definition(&self, item_type: &TypeName) -> Option<&TypeDefinition> {
        self.types.get(item_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeName, &TypeDefinition)> {
        self.types.iter()
    }

    /// Resolve a raw type name case-insensitively to its configured spelling
    pub fn resolve_type_name(&self, raw: &str) -> Option<&TypeName> {
        self.types.keys().find(|name| name.matches_ignore_case(raw))
    }

    /// Raw lookup: `None` when the type has no configured child list
    pub fn configured_child_types(&self, parent_type: &TypeName) -> Option<&[TypeName]> {
        self.types
            .get(parent_type)
            .and_then(|def| def.allowed_child_types.as_deref())
    }

    /// Allowed direct child types, with "not configured" reported as empty
    pub fn allowed_child_types(&self, parent_type: &TypeName) -> Vec<TypeName> {
        self.configured_child_types(parent_type)
            .map(<[TypeName]>::to_vec)
            .unwrap_or_default()
    }

    /// Child types a parent of this type can hold
    ///
    /// The configured list when one exists (possibly empty), otherwise the
    /// fallback type alone.
    pub fn child_types_for(&self, parent_type: &TypeName) -> Vec<TypeName> {
        match self.configured_child_types(parent_type) {
            Some(children) => children.to_vec(),
            None => vec![self.fallback_type.clone()],
        }
    }

    /// Check if a type is a legal direct child of another
    pub fn can_be_child_of(&self, child_type: &TypeName, parent_type: &TypeName) -> bool {
        self.child_types_for(parent_type).iter().any(|t| t == child_type)
    }
}

impl Default for TypeRules {
    fn default() -> Self {
        Self::empty()
    }
}

fn default_fallback_type() -> TypeName {
    TypeName::from_trusted(DEFAULT_FALLBACK_TYPE)
}
