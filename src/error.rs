use log::warn;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used inside the analyzers
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Categorical error kinds reported to the warning sink.
///
/// The kind, not the Rust error type, is what callers filter on when they
/// summarise a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    ClassNotFound,
    FileNotFound,
    ParseError,
    ClassNodeNotFound,
    MethodNodeError,
    InvalidParentClass,
    UnsupportedFeature,
    ReflectionError,
    AnalysisError,
    UnexpectedError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::ClassNotFound => "class_not_found",
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::ClassNodeNotFound => "class_node_not_found",
            ErrorKind::MethodNodeError => "method_node_error",
            ErrorKind::InvalidParentClass => "invalid_parent_class",
            ErrorKind::UnsupportedFeature => "unsupported_feature",
            ErrorKind::ReflectionError => "reflection_error",
            ErrorKind::AnalysisError => "analysis_error",
            ErrorKind::UnexpectedError => "unexpected_error",
        };
        f.write_str(name)
    }
}

/// Error types produced by individual analysis steps
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to parse {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error("class `{class}` not found in {}", .file.display())]
    ClassNodeNotFound { class: String, file: PathBuf },

    #[error("method `{method}` not found on {class}")]
    MethodNotFound { class: String, method: String },

    #[error("{class} does not extend {expected}")]
    InvalidParentClass { class: String, expected: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("reflection failed for {class}: {message}")]
    Reflection { class: String, message: String },

    #[error("{0}")]
    Analysis(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Category used when the error is reported to the sink
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::ClassNotFound(_) => ErrorKind::ClassNotFound,
            AnalyzerError::FileNotFound(_) => ErrorKind::FileNotFound,
            AnalyzerError::Parse { .. } => ErrorKind::ParseError,
            AnalyzerError::ClassNodeNotFound { .. } => ErrorKind::ClassNodeNotFound,
            AnalyzerError::MethodNotFound { .. } => ErrorKind::MethodNodeError,
            AnalyzerError::InvalidParentClass { .. } => ErrorKind::InvalidParentClass,
            AnalyzerError::Unsupported(_) => ErrorKind::UnsupportedFeature,
            AnalyzerError::Reflection { .. } => ErrorKind::ReflectionError,
            AnalyzerError::Analysis(_) => ErrorKind::AnalysisError,
            AnalyzerError::Io(_) => ErrorKind::UnexpectedError,
        }
    }

    /// Contextual key/value pairs derived from the error itself
    fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            AnalyzerError::ClassNotFound(class) => vec![("class", class.clone())],
            AnalyzerError::FileNotFound(file) => vec![("file", file.display().to_string())],
            AnalyzerError::Parse { file, .. } => vec![("file", file.display().to_string())],
            AnalyzerError::ClassNodeNotFound { class, file } => vec![
                ("class", class.clone()),
                ("file", file.display().to_string()),
            ],
            AnalyzerError::MethodNotFound { class, method } => {
                vec![("class", class.clone()), ("method", method.clone())]
            }
            AnalyzerError::InvalidParentClass { class, expected } => {
                vec![("class", class.clone()), ("expected", expected.clone())]
            }
            AnalyzerError::Reflection { class, .. } => vec![("class", class.clone())],
            _ => Vec::new(),
        }
    }
}

/// Empty context for `ErrorCollector::record` / `report` calls
pub fn no_context() -> std::iter::Empty<(&'static str, String)> {
    std::iter::empty()
}

/// One structured entry in the warning sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    /// Component that produced the entry (e.g. `FormRequestAnalyzer`)
    pub component: String,
    /// Free-text description
    pub message: String,
    /// Error category
    pub kind: ErrorKind,
    /// Class, file, method and similar locating information
    pub context: BTreeMap<String, String>,
}

/// Collects warnings for one analysis run.
///
/// Owned by the run's `AnalysisContext` and handed to every analyzer; it is
/// never shared between runs.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    entries: RefCell<Vec<AnalysisWarning>>,
    fail_fast: bool,
}

impl ErrorCollector {
    pub fn new(fail_fast: bool) -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            fail_fast,
        }
    }

    /// Record an entry and emit it through the log facade.
    pub fn record<I, K>(&self, component: &str, kind: ErrorKind, message: impl Into<String>, context: I)
    where
        I: IntoIterator<Item = (K, String)>,
        K: Into<String>,
    {
        let message = message.into();
        let context: BTreeMap<String, String> =
            context.into_iter().map(|(k, v)| (k.into(), v)).collect();

        warn!("[{}] {} ({}) {:?}", component, message, kind, context);

        self.entries.borrow_mut().push(AnalysisWarning {
            component: component.to_string(),
            message,
            kind,
            context,
        });
    }

    /// Record an `AnalyzerError`, merging its own context with extra pairs.
    pub fn report<I, K>(&self, component: &str, error: &AnalyzerError, extra: I)
    where
        I: IntoIterator<Item = (K, String)>,
        K: Into<String>,
    {
        let mut context: Vec<(String, String)> = error
            .context()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        for (k, v) in extra {
            let key = k.into();
            if !context.iter().any(|(existing, _)| *existing == key) {
                context.push((key, v));
            }
        }
        self.record(component, error.kind(), error.to_string(), context);
    }

    pub fn entries(&self) -> Vec<AnalysisWarning> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.entries.borrow().iter().filter(|e| e.kind == kind).count()
    }

    /// Remove and return everything collected so far
    pub fn drain(&self) -> Vec<AnalysisWarning> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// Whether the orchestrator asked to stop at the first failure
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_stores_structured_entry() {
        let collector = ErrorCollector::default();
        collector.record(
            "ResourceAnalyzer",
            ErrorKind::MethodNodeError,
            "toArray not found",
            [("class", "App\\Http\\Resources\\UserResource".to_string())],
        );

        let entries = collector.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].component, "ResourceAnalyzer");
        assert_eq!(entries[0].kind, ErrorKind::MethodNodeError);
        assert_eq!(
            entries[0].context.get("class").map(String::as_str),
            Some("App\\Http\\Resources\\UserResource")
        );
    }

    #[test]
    fn test_report_uses_error_kind_and_context() {
        let collector = ErrorCollector::default();
        let error = AnalyzerError::MethodNotFound {
            class: "App\\Http\\Controllers\\UserController".to_string(),
            method: "index".to_string(),
        };
        collector.report("ControllerAnalyzer", &error, [("file", "x.php".to_string())]);

        let entries = collector.entries();
        assert_eq!(entries[0].kind, ErrorKind::MethodNodeError);
        assert_eq!(entries[0].context.len(), 3);
        assert_eq!(collector.count_of(ErrorKind::MethodNodeError), 1);
    }

    #[test]
    fn test_drain_empties_collector() {
        let collector = ErrorCollector::new(true);
        collector.record("X", ErrorKind::AnalysisError, "boom", no_context());
        assert!(collector.fail_fast());
        assert_eq!(collector.drain().len(), 1);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_io_error_maps_to_unexpected() {
        let error = AnalyzerError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(error.kind(), ErrorKind::UnexpectedError);
    }
}
