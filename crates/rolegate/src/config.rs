//! Gate configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GateError, Result};

/// Lowest cost bcrypt accepts.
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Configuration for the [`Gate`](crate::Gate) and the maintenance binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    /// Catalog bootstrap options.
    pub bootstrap: BootstrapConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("rolegate.db"),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl GateConfig {
    /// Load a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GateError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| GateError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Cheap hashing for tests.
    pub fn for_tests() -> Self {
        Self {
            bcrypt_cost: MIN_BCRYPT_COST,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(GateError::Config(format!(
                "bcrypt_cost must be between {} and {}, got {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST, self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

/// Options for the catalog bootstrap.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Accounts to create if missing.
    pub accounts: Vec<AccountSeed>,
}

/// A default account created by the bootstrap.
///
/// Superusers join the administrator role, everyone else the regular-user
/// role.
#[derive(Clone, Deserialize)]
pub struct AccountSeed {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub superuser: bool,
}

impl std::fmt::Debug for AccountSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("superuser", &self.superuser)
            .finish_non_exhaustive()
    }
}
