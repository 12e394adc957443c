//! Configuration for decomposer

use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PathContext, TypeName};
use crate::rules::{DEFAULT_FALLBACK_TYPE, TypeRules};
use crate::shortcuts::BindingMap;

const CONFIG_FILE_NAME: &str = "decomposer.yml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// YAML type rules; the builtin set is used when unset
    pub types_file: Option<PathBuf>,

    /// Type of the item being decomposed
    pub root_type: Option<String>,

    /// Child type for types with no configured entry
    pub fallback_type: String,

    pub area_path: Option<String>,
    pub iteration_path: Option<String>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,

    /// Extra key bindings per shortcut context
    pub shortcuts: BindingMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            types_file: None,
            root_type: None,
            fallback_type: DEFAULT_FALLBACK_TYPE.to_string(),
            area_path: None,
            iteration_path: None,
            log_level: None,
            shortcuts: BindingMap::new(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    ///
    /// An explicit path must exist. Otherwise `./decomposer.yml` and then the
    /// user config directory are tried.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        debug!(?path, "Config::load: called");
        if let Some(config_path) = path {
            return Self::load_from(config_path);
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                debug!(path = %candidate.display(), "Config::load: found config");
                return Self::load_from(&candidate);
            }
        }

        debug!("Config::load: no config file, using defaults");
        Ok(Config::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(path: Option<&PathBuf>) -> Option<String> {
        Self::load(path).ok().and_then(|config| config.log_level)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content).context(format!("Failed to parse config file {}", path.display()))
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).context(format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("decomposer").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Type rules from the types file, or the builtin set
    pub fn rules(&self) -> Result<TypeRules> {
        let rules = match &self.types_file {
            Some(path) => TypeRules::load(path)?,
            None => TypeRules::builtin()?,
        };
        let fallback = TypeName::new(&self.fallback_type).map_err(|e| eyre!("Invalid fallback-type: {}", e))?;
        Ok(rules.with_fallback_type(fallback))
    }

    /// Root type resolved against `rules`, case-insensitively
    pub fn root_type(&self, rules: &TypeRules) -> Result<Option<TypeName>> {
        let Some(raw) = self.root_type.as_deref() else {
            return Ok(None);
        };
        match rules.resolve_type_name(raw) {
            Some(resolved) => Ok(Some(resolved.clone())),
            None => Err(eyre!(
                "Unknown root type '{}'. Valid types: {}",
                raw,
                rules.type_names().iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
            )),
        }
    }

    pub fn path_context(&self) -> PathContext {
        PathContext::new(self.area_path.clone(), self.iteration_path.clone())
    }
}
