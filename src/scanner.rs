use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for traversing a Laravel project.
///
/// The `FileScanner` recursively walks the project directory to find all PHP source files.
/// It skips hidden directories (those starting with `.`) and every directory listed in
/// the exclusion list, which by default covers `vendor`, `node_modules`, `storage` and
/// `bootstrap/cache`.
///
/// # Example
///
/// ```no_run
/// use openapi_from_laravel::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-app"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} PHP files", result.php_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    excluded_dirs: Vec<String>,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Paths to all discovered `.php` files, sorted
    pub php_files: Vec<PathBuf>,
    /// Warning messages for paths that could not be accessed
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a scanner with the default exclusion list.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            excluded_dirs: ["vendor", "node_modules", "storage", "bootstrap/cache"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replaces the exclusion list. Entries are paths relative to the root,
    /// using `/` as separator.
    pub fn with_excluded_dirs(mut self, excluded_dirs: Vec<String>) -> Self {
        self.excluded_dirs = excluded_dirs;
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root_path) else {
            return false;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.excluded_dirs.iter().any(|dir| {
            let dir = dir.trim_end_matches('/');
            relative == dir || relative.starts_with(&format!("{}/", dir))
        })
    }

    /// Scans the directory tree and collects all `.php` files.
    ///
    /// Inaccessible entries are logged and recorded in the result while
    /// scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(anyhow::anyhow!(
                "Project directory does not exist: {}",
                self.root_path.display()
            ))
            .context("Failed to scan project");
        }

        let mut php_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                let is_hidden = file_name.starts_with('.');
                !is_hidden && !(e.file_type().is_dir() && self.is_excluded(e.path()))
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("php") {
                        php_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        php_files.sort();
        debug!(
            "Scanned {}: {} PHP files",
            self.root_path.display(),
            php_files.len()
        );

        Ok(ScanResult {
            php_files,
            warnings,
        })
    }
}
