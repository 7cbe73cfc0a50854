//! Compiler configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "iodine.toml";

/// Knobs controlling code generation and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Run the optimizer pipeline on every finished code object
    pub optimize: bool,

    /// Fold literal arithmetic before emitting binary expressions
    pub fold_constants: bool,

    /// Directory for `.bytecode` cache files
    pub cache_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            fold_constants: true,
            cache_dir: None,
        }
    }
}

impl CompilerConfig {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: CompilerConfig = toml::from_str(&content)?;
        config.load_from_env();
        Ok(config)
    }

    /// Loads `iodine.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            let mut config = Self::default();
            config.load_from_env();
            Ok(config)
        }
    }

    /// Applies `IODINE_*` environment overrides.
    fn load_from_env(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(key) = key.strip_prefix("IODINE_") {
                self.set(&key.to_lowercase(), &value);
            }
        }
    }

    /// Sets a single value by key; unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "optimize" => self.optimize = value == "true",
            "fold_constants" => self.fold_constants = value == "true",
            "cache_dir" => self.cache_dir = Some(PathBuf::from(value)),
            _ => {}
        }
    }
}
