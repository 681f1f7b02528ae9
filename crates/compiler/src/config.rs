//! Project configuration
//!
//! A `veld.toml` next to the source file (or passed with `--config`) can
//! override the output path and silence warnings:
//!
//! ```toml
//! [build]
//! output = "program.asm"
//!
//! [warnings]
//! missing-main = false
//! ```
//!
//! Everything is optional; an absent file means defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::codegen::Warning;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub warnings: WarningsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    /// Output path override. CLI `-o` still wins over this.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarningsSection {
    #[serde(rename = "missing-main", default = "default_true")]
    pub missing_main: bool,
}

impl Default for WarningsSection {
    fn default() -> Self {
        WarningsSection { missing_main: true }
    }
}

fn default_true() -> bool {
    true
}

impl ProjectConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    /// Find and load the `veld.toml` next to `input`, if there is one.
    pub fn discover(input: &Path) -> Result<Self, String> {
        let candidate = input.parent().map(|dir| dir.join("veld.toml"));
        match candidate {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(ProjectConfig::default()),
        }
    }

    /// Should this warning be reported?
    pub fn enabled(&self, warning: Warning) -> bool {
        match warning {
            Warning::MissingMain => self.warnings.missing_main,
        }
    }
}
