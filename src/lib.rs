//! Laravel API analyzer - Reconstructs API descriptions from Laravel source code.
//!
//! This library reads a Laravel application's PHP sources statically and
//! recovers, per route: the HTTP surface, the request parameters implied by
//! validation rules and request accessors, the response shape implied by
//! resources, transformers and return statements, and the authentication
//! implied by middleware. Nothing from the application is executed unless a
//! PHP runtime fallback is configured explicitly.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans the project for PHP files
//! 2. [`parser`] - Parses PHP with tree-sitter and lowers it into the typed [`ast`]
//! 3. [`workspace`] - Locates classes by name and answers reflection-style queries
//! 4. [`routes`] - Extracts route definitions from the route files
//! 5. [`analyzers`] - Validation, enum, resource, response and auth analyzers,
//!    orchestrated per controller action by [`analyzers::ControllerAnalyzer`]
//! 6. [`inference`] - Type inference from expressions, rules and field names
//! 7. [`report`] - Joins everything into an [`report::AnalysisReport`]
//! 8. [`serializer`] - Serializes the report to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_laravel::{config::AnalyzerConfig, report, serializer::serialize_yaml};
//! use std::path::Path;
//!
//! let config = AnalyzerConfig::discover(Path::new("./my-laravel-app")).unwrap();
//! let report = report::analyze_project(Path::new("./my-laravel-app"), config).unwrap();
//! for warning in &report.warnings {
//!     eprintln!("{}: {}", warning.kind, warning.message);
//! }
//! println!("{}", serialize_yaml(&report).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod analyzers;
pub mod ast;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod inference;
pub mod model;
pub mod parser;
pub mod printer;
pub mod report;
pub mod routes;
pub mod runtime;
pub mod scanner;
pub mod serializer;
pub mod symbols;
pub mod visit;
pub mod workspace;
