//! Route discovery.
//!
//! This module turns the project's route files into [`RouteDescriptor`]s.
//! Route files are read statically: nothing from the application is
//! executed, so only routes registered through the `Route` facade in
//! literal form are found.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_laravel::config::AnalyzerConfig;
//! use openapi_from_laravel::context::AnalysisContext;
//! use openapi_from_laravel::routes::RouteAnalyzer;
//! use std::path::Path;
//!
//! let ctx = AnalysisContext::for_project(Path::new("./my-app"), AnalyzerConfig::default()).unwrap();
//! let routes = RouteAnalyzer::new(&ctx).analyze(true);
//! println!("Found {} routes", routes.len());
//! ```

pub mod laravel;

pub use laravel::LaravelRouteExtractor;

use crate::ast::PhpFile;
use crate::cache::cached;
use crate::config::RouteFileConfig;
use crate::context::AnalysisContext;
use crate::error::AnalyzerError;
use crate::model::RouteDescriptor;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

const COMPONENT: &str = "RouteAnalyzer";

/// Extracts routes from one parsed route file.
pub trait RouteExtractor {
    /// Routes registered by `file`, with `group` applied as the enclosing
    /// attributes
    fn extract_routes(&self, file: &PhpFile, group: &RouteGroup) -> Vec<RouteDescriptor>;
}

/// Attributes a route inherits from the groups around it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGroup {
    /// URI prefix without surrounding slashes
    pub prefix: String,
    pub middleware: Vec<String>,
    pub excluded_middleware: Vec<String>,
    /// Prepended to route names (`admin.`)
    pub name_prefix: String,
    /// Controller set by `Route::controller()`
    pub controller: Option<String>,
    /// Namespace for string controller references
    pub namespace: Option<String>,
    /// Parameter patterns from `where()` and friends
    pub wheres: BTreeMap<String, String>,
    /// Route file the routes come from, relative to the project root
    pub source_file: Option<String>,
}

impl RouteGroup {
    /// The outermost group of a configured route file
    pub fn for_file(config: &RouteFileConfig) -> Self {
        Self {
            prefix: config.prefix.trim_matches('/').to_string(),
            middleware: config.middleware.clone(),
            source_file: Some(config.path.to_string_lossy().replace('\\', "/")),
            ..Self::default()
        }
    }
}

/// Combine a prefix and path, handling slashes correctly
pub fn combine_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, path),
    }
}

/// Collects the routes of every enabled route file of the configuration.
pub struct RouteAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> RouteAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Deduplicated routes, in registration order. A `(methods, uri)` pair
    /// registered twice keeps its first registration.
    pub fn analyze(&self, use_cache: bool) -> Vec<RouteDescriptor> {
        if !use_cache {
            return self.collect();
        }
        let key = self
            .ctx
            .repository
            .root()
            .map(|root| root.display().to_string())
            .unwrap_or_default();
        cached(self.ctx.cache(), "routes", &key, || self.collect())
    }

    fn collect(&self) -> Vec<RouteDescriptor> {
        let extractor = LaravelRouteExtractor::new(self.ctx);
        let mut routes = Vec::new();
        for config in self.ctx.config.route_files.iter().filter(|f| f.enabled) {
            let path = self.path_of(config);
            let parser = self.ctx.repository.parser();
            if !parser.has_source(&path) && !path.exists() {
                debug!("Route file {} not present", path.display());
                continue;
            }
            match parser.try_parse_file(&path) {
                Ok(file) => {
                    let found = extractor.extract_routes(&file, &RouteGroup::for_file(config));
                    info!("{} routes in {}", found.len(), config.path.display());
                    routes.extend(found);
                }
                Err(e) => self.report(&e, &path),
            }
        }
        dedup(routes)
    }

    fn path_of(&self, config: &RouteFileConfig) -> PathBuf {
        match self.ctx.repository.root() {
            Some(root) if config.path.is_relative() => root.join(&config.path),
            _ => config.path.clone(),
        }
    }

    fn report(&self, error: &AnalyzerError, path: &std::path::Path) {
        self.ctx
            .errors
            .report(COMPONENT, error, [("file", path.display().to_string())]);
    }
}

fn dedup(routes: Vec<RouteDescriptor>) -> Vec<RouteDescriptor> {
    let mut seen = HashSet::new();
    routes
        .into_iter()
        .filter(|route| seen.insert((route.methods.clone(), route.uri.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::HttpMethod;

    #[test]
    fn test_combine_paths() {
        assert_eq!(combine_paths("api", "/users"), "api/users");
        assert_eq!(combine_paths("/api/", ""), "api");
        assert_eq!(combine_paths("", "users/{id}"), "users/{id}");
    }

    #[test]
    fn test_route_files_and_dedup() {
        let ctx = AnalysisContext::in_memory(&[
            (
                "routes/api.php",
                r#"<?php
use App\Http\Controllers\UserController;
use Illuminate\Support\Facades\Route;

Route::get('/users', [UserController::class, 'index']);
Route::get('users', [UserController::class, 'list']);
Route::post('/users', [UserController::class, 'store'])->middleware('auth:sanctum');
"#,
            ),
            ("routes/web.php", "<?php\nRoute::get('/', fn () => view('welcome'));\n"),
        ]);
        let routes = RouteAnalyzer::new(&ctx).analyze(false);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].uri, "api/users");
        assert_eq!(routes[0].action.as_deref(), Some("index"));
        assert_eq!(routes[0].methods, vec![HttpMethod::Get, HttpMethod::Head]);
        assert_eq!(routes[1].middleware, vec!["api".to_string(), "auth:sanctum".to_string()]);
        assert_eq!(routes[1].source_file.as_deref(), Some("routes/api.php"));
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn test_unparsable_route_file_is_reported() {
        let ctx = AnalysisContext::in_memory(&[("routes/api.php", "<?php\nRoute::get('/x', [X::class, 'y']\n")]);
        assert!(RouteAnalyzer::new(&ctx).analyze(false).is_empty());
        assert_eq!(ctx.errors.count_of(ErrorKind::ParseError), 1);
    }
}
