//! Serialization of analysis reports to YAML or JSON.
//!
//! The output is a dump of the analysis model, suitable as input for a
//! document generator or for review in version control.

use crate::report::AnalysisReport;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a report to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(report: &AnalysisReport) -> Result<String> {
    debug!("Serializing analysis report to YAML");
    serde_yaml::to_string(report).context("Failed to serialize analysis report to YAML")
}

/// Serializes a report to pretty-printed JSON.
pub fn serialize_json(report: &AnalysisReport) -> Result<String> {
    debug!("Serializing analysis report to JSON");
    serde_json::to_string_pretty(report).context("Failed to serialize analysis report to JSON")
}

/// Writes string content to a file, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisWarning, ErrorKind};
    use crate::model::{
        AuthenticationInfo, ControllerActionResult, HttpMethod, ResponseInfo, RouteDescriptor,
        SecurityRequirement, SecurityScheme,
    };
    use crate::report::RouteReport;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_report() -> AnalysisReport {
        let mut route = RouteDescriptor::new("api/users/{user}", vec![HttpMethod::Get, HttpMethod::Head]);
        route.controller = Some("App\\Http\\Controllers\\UserController".to_string());
        route.action = Some("show".to_string());
        route.middleware = vec!["api".to_string(), "auth:sanctum".to_string()];

        let mut action = ControllerActionResult::new("App\\Http\\Controllers\\UserController", "show");
        action.response = Some(ResponseInfo::Void { status: 204 });

        let mut report = AnalysisReport::default();
        report
            .security_schemes
            .register("sanctum", SecurityScheme::bearer(None, "Laravel Sanctum token"));
        report.routes.push(RouteReport {
            route,
            authentication: AuthenticationInfo {
                required: true,
                requirements: vec![SecurityRequirement {
                    scheme: "sanctum".to_string(),
                    scopes: Vec::new(),
                }],
                middleware: vec!["auth:sanctum".to_string()],
            },
            action: Some(action),
        });
        report.warnings.push(AnalysisWarning {
            component: "ControllerAnalyzer".to_string(),
            message: "method nowhere not found".to_string(),
            kind: ErrorKind::MethodNodeError,
            context: BTreeMap::new(),
        });
        report
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_report()).unwrap();

        assert!(yaml.contains("routes:"));
        assert!(yaml.contains("api/users/{user}"));
        assert!(yaml.contains("- GET"));
        assert!(yaml.contains("security_schemes:"));
        assert!(yaml.contains("sanctum"));
        assert!(yaml.contains("MethodNodeError"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_report()).unwrap();
        assert!(json.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let route = &parsed["routes"][0];
        assert_eq!(route["uri"], "api/users/{user}");
        assert_eq!(route["methods"][1], "HEAD");
        assert_eq!(route["authentication"]["requirements"][0]["scheme"], "sanctum");
        assert_eq!(route["action"], "show");
        assert_eq!(route["analysis"]["method"], "show");
        assert_eq!(json.matches("\"action\"").count(), 1);
    }

    #[test]
    fn test_roundtrip_yaml_serialization() {
        let report = create_test_report();
        let yaml = serialize_yaml(&report).unwrap();
        let deserialized: AnalysisReport = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized, report);
    }

    #[test]
    fn test_roundtrip_json_serialization() {
        let report = create_test_report();
        let json = serialize_json(&report).unwrap();
        let deserialized: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, report);
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let json = serialize_json(&AnalysisReport::default()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("warnings").is_none());
        assert!(parsed.get("security_schemes").is_none());
        assert_eq!(parsed["routes"], serde_json::json!([]));
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("report.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("report.json");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }
}
