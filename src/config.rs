//! AnonID configuration management
//!
//! Configuration is written in HCL (JSON is accepted as well):
//!
//! ```hcl
//! server {
//!   host = "0.0.0.0"
//!   port = 5000
//! }
//!
//! storage {
//!   database_path = "/var/lib/anonid/anonid.db"
//! }
//!
//! crypto {
//!   kdf_memory_kib = 19456
//! }
//! ```

use crate::crypto::KdfParams;
use crate::error::{AnonIdError, Result};
use crate::privacy::KeywordTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the encryption passphrase
pub const PASSPHRASE_ENV: &str = "ANONID_PASSPHRASE";

/// Passphrase used when neither config nor environment provides one
pub const DEMO_PASSPHRASE: &str = "AnonID_demo_passphrase_2025";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "anonid.hcl";

/// Main AnonID configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnonIdConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key derivation and encryption configuration
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Keyword tables for classification and scoring
    #[serde(default)]
    pub privacy: KeywordTable,
}

impl AnonIdConfig {
    /// Parse configuration from an HCL (or JSON) string
    pub fn from_hcl(content: &str) -> Result<Self> {
        if content.trim_start().starts_with('{') {
            return serde_json::from_str(content)
                .map_err(|e| AnonIdError::Config(format!("Failed to parse JSON config: {}", e)));
        }
        hcl::from_str(content)
            .map_err(|e| AnonIdError::Config(format!("Failed to parse HCL config: {}", e)))
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnonIdError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_hcl(&content)
    }

    /// Copy of the configuration safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.crypto.passphrase.is_some() {
            config.crypto.passphrase = Some("********".to_string());
        }
        config
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: base.join("anonid").join("anonid.db"),
        }
    }
}

/// Key derivation and encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Encryption passphrase; see [`CryptoConfig::resolve_passphrase`]
    pub passphrase: Option<String>,

    /// Argon2id memory cost in KiB
    pub kdf_memory_kib: u32,

    /// Argon2id passes
    pub kdf_iterations: u32,

    /// Argon2id lanes
    pub kdf_parallelism: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        let kdf = KdfParams::default();
        Self {
            passphrase: None,
            kdf_memory_kib: kdf.memory_kib,
            kdf_iterations: kdf.iterations,
            kdf_parallelism: kdf.parallelism,
        }
    }
}

impl CryptoConfig {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.kdf_memory_kib,
            iterations: self.kdf_iterations,
            parallelism: self.kdf_parallelism,
        }
    }

    /// Passphrase priority: config > `ANONID_PASSPHRASE` > demo default
    pub fn resolve_passphrase(&self) -> String {
        self.resolve_passphrase_with(std::env::var(PASSPHRASE_ENV).ok())
    }

    fn resolve_passphrase_with(&self, env_value: Option<String>) -> String {
        let non_empty = |s: &String| !s.trim().is_empty();
        if let Some(passphrase) = self.passphrase.clone().filter(non_empty) {
            return passphrase;
        }
        if let Some(passphrase) = env_value.filter(non_empty) {
            return passphrase;
        }
        tracing::warn!(
            "No passphrase configured; using the demo passphrase. Set {} for real deployments",
            PASSPHRASE_ENV
        );
        DEMO_PASSPHRASE.to_string()
    }
}

/// Load configuration using the standard priority chain.
///
/// Priority: explicit path > `./anonid.hcl` > `<config_dir>/anonid/config.hcl`
///           > default.
pub fn load_config(explicit_path: Option<&Path>) -> Result<(AnonIdConfig, Option<PathBuf>)> {
    if let Some(path) = explicit_path {
        tracing::info!("Loading config from {}", path.display());
        return Ok((AnonIdConfig::from_file(path)?, Some(path.to_path_buf())));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        tracing::info!("Loading config from ./{}", LOCAL_CONFIG_FILE);
        return Ok((AnonIdConfig::from_file(&local)?, Some(local)));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let hcl_path = config_dir.join("anonid").join("config.hcl");
        if hcl_path.exists() {
            tracing::info!("Loading config from {}", hcl_path.display());
            return Ok((AnonIdConfig::from_file(&hcl_path)?, Some(hcl_path)));
        }
    }

    tracing::info!("No config found, using defaults");
    Ok((AnonIdConfig::default(), None))
}
