//! Whole-project analysis: routes joined with their controller results and
//! authentication requirements.

use crate::analyzers::{AuthenticationAnalyzer, ControllerAnalyzer};
use crate::config::AnalyzerConfig;
use crate::context::AnalysisContext;
use crate::error::AnalysisWarning;
use crate::model::{AuthenticationInfo, ControllerActionResult, RouteDescriptor, SchemeRegistry};
use crate::routes::RouteAnalyzer;
use anyhow::{bail, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything recovered for one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    #[serde(flatten)]
    pub route: RouteDescriptor,
    #[serde(default, skip_serializing_if = "AuthenticationInfo::is_empty")]
    pub authentication: AuthenticationInfo,
    /// `None` for closure, view and redirect routes. Serialized as
    /// `analysis` next to the descriptor's `action` method name.
    #[serde(rename = "analysis", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ControllerActionResult>,
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub routes: Vec<RouteReport>,
    #[serde(default, skip_serializing_if = "SchemeRegistry::is_empty")]
    pub security_schemes: SchemeRegistry,
    /// Failures accumulated over the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalysisWarning>,
}

impl AnalysisReport {
    /// Routes that resolved to a controller action
    pub fn actions(&self) -> impl Iterator<Item = &ControllerActionResult> {
        self.routes.iter().filter_map(|r| r.action.as_ref())
    }

    pub fn route(&self, uri: &str) -> Option<&RouteReport> {
        self.routes.iter().find(|r| r.route.uri == uri)
    }
}

/// Index the project at `root` and analyze every route it registers
pub fn analyze_project(root: &Path, config: AnalyzerConfig) -> Result<AnalysisReport> {
    info!("Analyzing Laravel project at {}", root.display());
    let ctx = AnalysisContext::for_project(root, config)?;
    analyze(&ctx)
}

/// Analyze every route of an already built context.
///
/// With `fail_fast` configured the run stops with an error at the first
/// recorded warning; otherwise warnings are collected into the report.
pub fn analyze(ctx: &AnalysisContext) -> Result<AnalysisReport> {
    let routes = RouteAnalyzer::new(ctx).analyze(ctx.config.cache.enabled);
    info!("Found {} routes", routes.len());
    check_fail_fast(ctx)?;

    let controllers = ControllerAnalyzer::new(ctx);
    let authentication = AuthenticationAnalyzer::new(&ctx.config.auth);
    let mut report = AnalysisReport::default();

    for route in routes {
        debug!("Analyzing route {:?} {}", route.methods, route.uri);
        let auth = authentication.analyze(&route.middleware, &mut report.security_schemes);
        let action = match (&route.controller, &route.action) {
            (Some(controller), Some(method)) => Some(controllers.analyze_to_result(controller, method)),
            _ => None,
        };
        check_fail_fast(ctx)?;
        report.routes.push(RouteReport {
            route,
            authentication: auth,
            action,
        });
    }

    report.warnings = ctx.errors.drain();
    info!(
        "Analyzed {} routes with {} warnings",
        report.routes.len(),
        report.warnings.len()
    );
    Ok(report)
}

fn check_fail_fast(ctx: &AnalysisContext) -> Result<()> {
    if !ctx.errors.fail_fast() {
        return Ok(());
    }
    if let Some(first) = ctx.errors.entries().first() {
        bail!("Stopping at first failure ({}): [{}] {}", first.kind, first.component, first.message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::ResponseInfo;
    use crate::workspace::ClassRepository;
    use pretty_assertions::assert_eq;

    const ROUTES: &str = r#"<?php
use App\Http\Controllers\PostController;
use Illuminate\Support\Facades\Route;

Route::get('/posts', [PostController::class, 'index']);
Route::delete('/posts/{post}', [PostController::class, 'destroy'])->middleware('auth:sanctum');
Route::get('/missing', [PostController::class, 'nowhere']);
Route::get('/health', fn () => ['ok' => true]);
"#;

    const CONTROLLER: &str = r#"<?php
namespace App\Http\Controllers;

class PostController
{
    public function index()
    {
        return response()->json(['data' => []]);
    }

    public function destroy($post)
    {
        return response()->noContent();
    }
}
"#;

    fn context(fail_fast: bool) -> AnalysisContext {
        let repository = ClassRepository::new();
        repository.add_source("routes/api.php", ROUTES);
        repository.add_source("app/Http/Controllers/PostController.php", CONTROLLER);
        let mut config = AnalyzerConfig::default();
        config.cache.enabled = false;
        config.fail_fast = fail_fast;
        AnalysisContext::new(repository, config)
    }

    #[test]
    fn test_report_joins_routes_actions_and_auth() {
        let report = analyze(&context(false)).unwrap();
        assert_eq!(report.routes.len(), 4);

        let destroy = report.route("api/posts/{post}").unwrap();
        assert!(destroy.authentication.required);
        assert_eq!(
            destroy.action.as_ref().and_then(|a| a.response.clone()),
            Some(ResponseInfo::Void { status: 204 })
        );
        assert!(report.security_schemes.get("sanctum").is_some());

        assert!(report.route("api/health").unwrap().action.is_none());
        assert_eq!(report.actions().count(), 3);
        let missing: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.kind == ErrorKind::MethodNodeError)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].context.get("method").map(String::as_str), Some("nowhere"));
    }

    #[test]
    fn test_fail_fast_stops_at_first_warning() {
        let error = analyze(&context(true)).unwrap_err();
        assert!(error.to_string().starts_with("Stopping at first failure"));
    }
}
