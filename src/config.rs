//! Analyzer configuration.
//!
//! Every field has a default so an empty (or missing) YAML file yields a
//! working configuration for a conventional Laravel layout.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the project root when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "openapi-laravel.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Route files handed to the route supplier
    pub route_files: Vec<RouteFileConfig>,
    /// Directory names skipped while scanning the project
    pub excluded_dirs: Vec<String>,
    /// Namespace used for `'Controller@method'` route actions
    pub controller_namespace: String,
    pub cache: CacheConfig,
    pub runtime: RuntimeConfig,
    pub auth: AuthConfig,
    /// Stop the run at the first recorded failure
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouteFileConfig {
    pub path: PathBuf,
    /// URI prefix applied to every route in the file
    pub prefix: String,
    /// Middleware group applied to every route in the file
    pub middleware: Vec<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// PHP binary used for the dynamic-invocation fallback; disabled when unset
    pub php_binary: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Extra middleware token -> security scheme mappings
    pub schemes: BTreeMap<String, CustomSchemeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomSchemeConfig {
    /// Name under which the scheme is registered
    pub name: String,
    /// `http`, `apiKey`, `oauth2`
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub bearer_format: Option<String>,
    /// Header/query/cookie name for `apiKey` schemes
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            route_files: vec![
                RouteFileConfig {
                    path: PathBuf::from("routes/api.php"),
                    prefix: "api".to_string(),
                    middleware: vec!["api".to_string()],
                    enabled: true,
                },
                RouteFileConfig {
                    path: PathBuf::from("routes/web.php"),
                    prefix: String::new(),
                    middleware: vec!["web".to_string()],
                    enabled: false,
                },
            ],
            excluded_dirs: ["vendor", "node_modules", "storage", "bootstrap/cache"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            controller_namespace: "App\\Http\\Controllers".to_string(),
            cache: CacheConfig::default(),
            runtime: RuntimeConfig::default(),
            auth: AuthConfig::default(),
            fail_fast: false,
        }
    }
}

impl Default for RouteFileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("routes/api.php"),
            prefix: String::new(),
            middleware: Vec::new(),
            enabled: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            php_binary: None,
            timeout_secs: 10,
        }
    }
}

impl AnalyzerConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse analyzer configuration")
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load `<project>/openapi-laravel.yaml` if present, otherwise defaults
    pub fn discover(project_root: &Path) -> Result<Self> {
        let candidate = project_root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            info!("Using configuration file {}", candidate.display());
            Self::load(&candidate)
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    /// Whether a directory name is excluded from scanning
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.excluded_dirs.iter().any(|dir| {
            let dir = dir.trim_end_matches('/');
            relative == dir || relative.starts_with(&format!("{}/", dir))
        })
    }
}
