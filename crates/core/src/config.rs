//! Huddle configuration
//!
//! Loaded from TOML; every field is optional and falls back to its default.
//!
//! ```toml
//! database_path = "/var/lib/huddle/huddle.db"
//! invite_code_length = 6
//! invite_code_attempts = 5
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::INVITE_CODE_LENGTH;

const DATABASE_FILE: &str = "huddle.db";
const MAX_INVITE_CODE_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    /// Database file; the platform data directory is used when unset
    pub database_path: Option<PathBuf>,
    /// Length of generated invite codes
    pub invite_code_length: usize,
    /// How many draws to try before accepting a code another group already holds
    pub invite_code_attempts: u32,
}

impl Default for HuddleConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            invite_code_length: INVITE_CODE_LENGTH,
            invite_code_attempts: 5,
        }
    }
}

impl HuddleConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: HuddleConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.invite_code_length == 0 || self.invite_code_length > MAX_INVITE_CODE_LENGTH {
            return Err(Error::InvalidInput(format!(
                "invite_code_length must be between 1 and {}, got {}",
                MAX_INVITE_CODE_LENGTH, self.invite_code_length
            )));
        }
        Ok(())
    }

    /// The configured database path, or `huddle.db` in the platform data directory
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("app", "huddle", "huddle").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().join(DATABASE_FILE))
    }
}
