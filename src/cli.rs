use crate::config::AnalyzerConfig;
use crate::report::{self, AnalysisReport};
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Laravel API analyzer - Recover routes, parameters, responses and auth from Laravel source
#[derive(Parser, Debug)]
#[command(name = "openapi-from-laravel")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Laravel project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Configuration file (defaults to <PROJECT_PATH>/openapi-laravel.yaml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Disable result caching
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Stop at the first analysis failure
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Configuration from `--config`, the project default file, or defaults,
/// with command line switches applied on top
pub fn load_config(args: &CliArgs) -> Result<AnalyzerConfig> {
    let mut config = match &args.config_path {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::discover(&args.project_path)?,
    };
    if args.no_cache {
        config.cache.enabled = false;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    Ok(config)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting analysis...");
    let config = load_config(&args)?;
    let root = args
        .project_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.project_path.display()))?;

    let report = report::analyze_project(&root, config)?;

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&report)?,
        OutputFormat::Json => serialize_json(&report)?,
    };

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote analysis report to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    summarize(&report);
    Ok(())
}

fn summarize(report: &AnalysisReport) {
    let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for warning in &report.warnings {
        *by_kind.entry(warning.kind.to_string()).or_default() += 1;
    }

    info!("Analysis complete!");
    info!("Summary:");
    info!("  - Routes found: {}", report.routes.len());
    info!("  - Controller actions: {}", report.actions().count());
    info!("  - Security schemes: {}", report.security_schemes.len());
    if by_kind.is_empty() {
        info!("  - Warnings: 0");
    }
    for (kind, count) in by_kind {
        warn!("  - {}: {}", kind, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(project: &std::path::Path, extra: &[&str]) -> CliArgs {
        let mut argv = vec!["openapi-from-laravel".to_string(), project.display().to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let temp = TempDir::new().unwrap();
        let args = args(temp.path(), &[]);
        assert!(matches!(args.output_format, OutputFormat::Yaml));
        assert!(args.output_path.is_none());
        assert!(!args.no_cache && !args.fail_fast && !args.verbose);
    }

    #[test]
    fn test_missing_project_is_rejected() {
        let temp = TempDir::new().unwrap();
        let args = args(&temp.path().join("nope"), &[]);
        assert!(parse_args_from_parsed(args).is_err());
    }

    #[test]
    fn test_flags_override_discovered_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("openapi-laravel.yaml"), "controller_namespace: App\\Api\n").unwrap();
        let config = load_config(&args(temp.path(), &["--no-cache", "--fail-fast", "-f", "json"])).unwrap();
        assert_eq!(config.controller_namespace, "App\\Api");
        assert!(!config.cache.enabled);
        assert!(config.fail_fast);
    }

    #[test]
    fn test_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        fs::write(&path, "excluded_dirs: [legacy]\n").unwrap();
        let config = load_config(&args(temp.path(), &["-c", path.to_str().unwrap()])).unwrap();
        assert_eq!(config.excluded_dirs, vec!["legacy".to_string()]);
    }

    #[test]
    fn test_run_writes_report() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::write(root.join("routes/api.php"), "<?php\nRoute::get('/ping', fn () => 'pong');\n").unwrap();
        let output = root.join("out/report.json");

        run(args(root, &["-f", "json", "-o", output.to_str().unwrap()])).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(parsed["routes"][0]["uri"], "api/ping");
    }
}
