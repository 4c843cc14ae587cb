//! Workspace configuration.
//!
//! Ripple reads `.ripple/config.yaml` from the workspace root. Every key is
//! optional; a missing file means all defaults.
//!
//! ```yaml
//! id-hex-length: 16
//! storage:
//!   database: .ripple/graph.db
//!   tables-dir: .ripple/tables
//! analysis:
//!   extensions: [py]
//!   exclude-dirs: [__pycache__, venv, .venv, build, dist, node_modules]
//!   batch-size: 100
//!   include-source: true
//! impact:
//!   default-max-depth: 5
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identity::{DEFAULT_HEX_LEN, IdScheme};
use crate::types::Language;

/// Name of the ripple directory
pub const RIPPLE_DIR_NAME: &str = ".ripple";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the gitignore file within .ripple
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Largest accepted `impact.default-max-depth`
pub const MAX_IMPACT_DEPTH: u32 = 64;

/// Configuration file structure for ripple
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct RippleConfig {
    /// Hex length of the hash part of entity IDs (12..=64)
    pub id_hex_length: usize,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Analysis configuration
    pub analysis: AnalysisConfig,

    /// Impact query configuration
    pub impact: ImpactConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// Graph database path, relative to the workspace root
    pub database: PathBuf,

    /// Default directory for exported bulk tables
    pub tables_dir: PathBuf,
}

/// Analysis configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnalysisConfig {
    /// File extensions to analyze, without the dot
    pub extensions: Vec<String>,

    /// Directory names skipped during discovery (hidden directories always are)
    pub exclude_dirs: Vec<String>,

    /// Files per write batch on the incremental path
    pub batch_size: usize,

    /// Store source excerpts on function and class nodes
    pub include_source: bool,
}

/// Impact query configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ImpactConfig {
    /// Depth used when a query gives none
    pub default_max_depth: u32,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            id_hex_length: DEFAULT_HEX_LEN,
            storage: StorageConfig::default(),
            analysis: AnalysisConfig::default(),
            impact: ImpactConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: Path::new(RIPPLE_DIR_NAME).join("graph.db"),
            tables_dir: Path::new(RIPPLE_DIR_NAME).join("tables"),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            exclude_dirs: ["__pycache__", "venv", ".venv", "build", "dist", "node_modules"]
                .into_iter()
                .map(String::from)
                .collect(),
            batch_size: 100,
            include_source: true,
        }
    }
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 5,
        }
    }
}

impl RippleConfig {
    /// Path of the config file for a workspace.
    #[must_use]
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(RIPPLE_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load configuration from a file and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load the workspace configuration, or the defaults if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but is invalid.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = Self::path_for(root);
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        IdScheme::new(self.id_hex_length)?;

        if self.analysis.batch_size == 0 {
            return Err(Error::Config("analysis.batch-size must be at least 1".to_string()));
        }
        if self.analysis.extensions.is_empty() {
            return Err(Error::Config(
                "analysis.extensions must name at least one extension".to_string(),
            ));
        }
        for ext in &self.analysis.extensions {
            if Language::from_extension(ext.trim_start_matches('.')).is_none() {
                return Err(Error::Config(format!(
                    "analysis.extensions: unsupported extension '{ext}'"
                )));
            }
        }
        if self.impact.default_max_depth == 0 || self.impact.default_max_depth > MAX_IMPACT_DEPTH {
            return Err(Error::Config(format!(
                "impact.default-max-depth must be between 1 and {MAX_IMPACT_DEPTH}, got {}",
                self.impact.default_max_depth
            )));
        }
        Ok(())
    }

    /// The ID scheme these settings select.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `id-hex-length` is out of range.
    pub fn id_scheme(&self) -> Result<IdScheme> {
        IdScheme::new(self.id_hex_length)
    }

    /// Whether a file extension is configured for analysis.
    #[must_use]
    pub fn analyzes_extension(&self, ext: &str) -> bool {
        self.analysis
            .extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Whether a directory name is excluded from discovery.
    #[must_use]
    pub fn excludes_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.analysis.exclude_dirs.iter().any(|d| d == name)
    }
}

/// Write the default configuration for a workspace.
///
/// Creates `.ripple/config.yaml` and a `.ripple/.gitignore` that keeps the
/// database and exported tables out of version control.
///
/// # Errors
///
/// Returns `Error::Config` if a config file already exists, or an I/O error.
pub fn init(root: &Path) -> Result<PathBuf> {
    let path = RippleConfig::path_for(root);
    if path.exists() {
        return Err(Error::Config(format!(
            "Ripple is already initialized in this directory. Found existing '{}'",
            path.display()
        )));
    }

    RippleConfig::default().save(&path)?;
    fs::write(
        root.join(RIPPLE_DIR_NAME).join(GITIGNORE_FILE_NAME),
        "# Generated graph data\ngraph.db*\ntables/\n",
    )?;
    Ok(path)
}
