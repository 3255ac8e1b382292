// ⚙️ Configuration - TOML file, then CLI/env overrides
//
// Priority (highest first):
//   1. Command-line flag / environment variable (applied by the binaries)
//   2. TOML config file (--config / SQUAD_CONFIG)
//   3. Compiled defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ingest::{ConfirmationCounting, IngestOptions};
use crate::member::{validate_skill, Position, CHAT_PAYMENT_NOTE, DEFAULT_SKILL};
use crate::resolver::Resolver;

pub const DEFAULT_DATABASE_PATH: &str = "squad.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub default_skill: u8,
    pub default_position: Position,
    pub payment_note: String,
    pub confirmation_counting: ConfirmationCounting,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_skill: DEFAULT_SKILL,
            default_position: Position::default(),
            payment_note: CHAT_PAYMENT_NOTE.to_string(),
            confirmation_counting: ConfirmationCounting::default(),
        }
    }
}

impl Config {
    /// Parse TOML text. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load the file if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_skill(self.default_skill)
            .map_err(|e| Error::Config(format!("default_skill: {}", e)))?;

        if self.payment_note.trim().is_empty() {
            return Err(Error::Config("payment_note cannot be empty".to_string()));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("database_path cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            payment_note: self.payment_note.clone(),
            counting: self.confirmation_counting,
            resolver: Resolver::new(self.default_skill, self.default_position),
        }
    }
}
