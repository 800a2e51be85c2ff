//! Configuration parsing for review sessions
//!
//! A single TOML file tunes scoring, the recent documents registry, the
//! accepted upload formats and where session data is stored. Every field
//! has a default, so an empty file (or no file at all) is a valid config.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use risk_engine::ScoringConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{AcceptedFormats, MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT};
use crate::registry::{DEFAULT_CAPACITY, RECENT_DOCUMENTS_KEY};

/// Path of the config file to load when none is given explicitly
pub const CONFIG_ENV: &str = "LEXISCAN_CONFIG";
/// Overrides the data directory from the config file
pub const DATA_DIR_ENV: &str = "LEXISCAN_DATA_DIR";

const APP_DIR_NAME: &str = "lexiscan";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiscanConfig {
    /// Score thresholds and per-level deduction weights
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub formats: FormatsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl LexiscanConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed or
    /// the values fail [`LexiscanConfig::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use review_session::config::LexiscanConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = LexiscanConfig::from_str(r#"
    ///     [scoring]
    ///     critical_above = 50.0
    ///
    ///     [registry]
    ///     capacity = 5
    /// "#)?;
    /// assert_eq!(config.registry.capacity, 5);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, else from `$LEXISCAN_CONFIG`, else defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                Self::from_file(path)
            }
            None => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.scoring
            .validate()
            .context("Invalid [scoring] section")?;
        if self.registry.capacity == 0 {
            bail!("registry.capacity must be at least 1");
        }
        if self.registry.key.is_empty() {
            bail!("registry.key must not be empty");
        }
        if self.formats.accepted.is_empty() {
            bail!("formats.accepted must list at least one media type");
        }
        Ok(())
    }

    pub fn accepted_formats(&self) -> AcceptedFormats {
        AcceptedFormats::new(&self.formats.accepted)
    }

    /// Directory for session data.
    ///
    /// Precedence: `override_dir`, `$LEXISCAN_DATA_DIR`, `storage.data_dir`,
    /// then the platform data directory.
    pub fn data_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        let from_env = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        override_dir
            .map(Path::to_path_buf)
            .or(from_env)
            .or_else(|| self.storage.data_dir.clone())
            .unwrap_or_else(default_data_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Number of recent documents kept (default: 10)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Storage key for the list (default: "recent_documents")
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_key() -> String {
    RECENT_DOCUMENTS_KEY.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            key: default_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatsConfig {
    /// Declared media types accepted for upload
    #[serde(default = "default_accepted")]
    pub accepted: Vec<String>,
}

fn default_accepted() -> Vec<String> {
    vec![MEDIA_TYPE_PDF.to_string(), MEDIA_TYPE_TEXT.to_string()]
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            accepted: default_accepted(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    platform_data_dir(|name| env::var_os(name))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Per-user data directory for the current platform, from environment
/// variables read through `var`. Empty variables count as unset.
fn platform_data_dir<F>(var: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<std::ffi::OsString>,
{
    let path = |name: &str| var(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if cfg!(target_os = "macos") {
        path("HOME").map(|home| home.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        path("APPDATA")
    } else if cfg!(unix) {
        path("XDG_DATA_HOME")
            .or_else(|| path("HOME").map(|home| home.join(".local").join("share")))
    } else {
        None
    }
}
