//! Per-action orchestration.
//!
//! `ControllerAnalyzer` runs every leaf analyzer over one controller action
//! and folds their findings into a [`ControllerActionResult`]. Each step
//! degrades on its own: a step that fails leaves its field empty and the
//! remaining steps still run.

use super::callbacks::CallbackAnalyzer;
use super::enums::EnumAnalyzer;
use super::form_request::FormRequestAnalyzer;
use super::fractal::FractalAnalyzer;
use super::header_params::HeaderParameterAnalyzer;
use super::inline_validation::InlineValidationAnalyzer;
use super::pagination::PaginationAnalyzer;
use super::parameters::ParameterBuilder;
use super::query_params::QueryParameterAnalyzer;
use super::resource::ResourceAnalyzer;
use super::response::ResponseAnalyzer;
use super::response_links::ResponseLinkAnalyzer;
use crate::ast::{doc_summary, MethodDecl, Param};
use crate::cache::cached;
use crate::context::AnalysisContext;
use crate::error::ErrorKind;
use crate::model::{ControllerActionResult, EnumParameter, ParameterLocation, ResourceSchema};
use crate::workspace::LoadedClass;
use log::{debug, info};
use regex::Regex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

const COMPONENT: &str = "ControllerAnalyzer";

/// Types that never name a class
const BUILTIN_TYPES: &[&str] = &[
    "int", "integer", "float", "double", "string", "bool", "boolean", "array", "object", "mixed", "callable", "iterable",
    "null", "void", "never", "self", "static", "false", "true",
];

fn deprecated_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@deprecated\b").expect("valid regex"))
}

/// `new UserResource(`, `UserResource::make(`, `UserResource::collection(`
fn resource_usage_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:new\s+\\?([\w\\]+(?:Resource|Collection))\s*\(|\\?([\w\\]+(?:Resource|Collection))::(?:make|collection)\s*\()")
            .expect("valid regex")
    })
}

fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.iter().any(|t| t.eq_ignore_ascii_case(name.trim_start_matches('\\')))
}

pub struct ControllerAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> ControllerAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Outermost entry point: never panics, a panic inside the pipeline
    /// becomes an empty result plus one `UnexpectedError` entry
    pub fn analyze_to_result(&self, controller: &str, method: &str) -> ControllerActionResult {
        match catch_unwind(AssertUnwindSafe(|| self.analyze(controller, method))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "analysis panicked".to_string());
                self.ctx.errors.record(
                    COMPONENT,
                    ErrorKind::UnexpectedError,
                    message,
                    [("class", controller.to_string()), ("method", method.to_string())],
                );
                ControllerActionResult::new(controller, method)
            }
        }
    }

    pub fn analyze(&self, controller: &str, method: &str) -> ControllerActionResult {
        let controller = controller.trim_start_matches('\\');
        let key = format!("{}@{}", controller, method);
        cached(self.ctx.cache(), "controller", &key, || self.analyze_uncached(controller, method))
    }

    fn analyze_uncached(&self, controller: &str, method_name: &str) -> ControllerActionResult {
        let mut result = ControllerActionResult::new(controller, method_name);
        if let Err(e) = self.ctx.load_class(controller) {
            self.ctx.errors.report(COMPONENT, &e, [("method", method_name.to_string())]);
            return result;
        }
        let Some(found) = self.ctx.repository.find_method(controller, method_name) else {
            self.ctx.errors.record(
                COMPONENT,
                ErrorKind::MethodNodeError,
                format!("method {} not found on {}", method_name, controller),
                [("class", controller.to_string()), ("method", method_name.to_string())],
            );
            return result;
        };
        // names inside an inherited or trait method resolve in its own file
        let scope = &found.owner;
        let method = found.method();
        info!("Analyzing {}::{}", controller, method_name);

        let form_request = self.form_request(scope, method);
        if let Some(class) = &form_request {
            result.form_request = Some(class.fqn.clone());
            let rules = FormRequestAnalyzer::new(self.ctx).analyze_with_conditional_rules(&class.fqn);
            result.form_request_rules = Some(rules);
        }
        result.enum_parameters = self.enum_parameters(scope, method);

        let inline = InlineValidationAnalyzer::new(self.ctx).analyze(scope, method);
        if !inline.is_empty() {
            result.inline_rules = Some(inline);
        }

        let resources = self.declared_resources(scope, method);
        match resources.len() {
            0 => result.resource = self.resource_from_source(scope, method),
            1 => result.resource = resources.into_iter().next(),
            _ => {
                result.resource = resources.first().cloned();
                result.resource_union = resources;
            }
        }
        result.fractal = FractalAnalyzer::new(self.ctx).analyze_usage(&method.source, scope);
        result.pagination = PaginationAnalyzer::new(self.ctx).analyze(scope, method);

        // rules resolve their class names where they were written
        let rules_scope = match (&form_request, result.form_request_rules.as_ref()) {
            (Some(class), Some(rules)) if !rules.is_empty() => class.clone(),
            _ => scope.clone(),
        };
        let builder = ParameterBuilder::new(self.ctx, Some(rules_scope));
        let validation = result.validation().cloned();
        result.query_parameters =
            QueryParameterAnalyzer::new(self.ctx).analyze(scope, method, validation.as_ref(), &builder);
        result.header_parameters = HeaderParameterAnalyzer::new().analyze(scope, method);
        if let Some(rules) = &validation {
            result.body_parameters = builder
                .build(rules, ParameterLocation::Body)
                .into_iter()
                .filter(|p| !result.query_parameters.iter().any(|q| q.name == p.name))
                .collect();
        }

        let response = ResponseAnalyzer::new(self.ctx).analyze(scope, method);
        if !response.is_unknown() {
            result.response = Some(response);
        }

        let doc = method.doc_comment.as_deref();
        result.deprecated =
            doc.is_some_and(|d| deprecated_regex().is_match(d)) || method.attribute("Deprecated").is_some();
        result.summary = doc.and_then(doc_summary);
        result.callbacks = CallbackAnalyzer::new(self.ctx).analyze(scope, method);
        result.links = ResponseLinkAnalyzer::new(self.ctx).analyze(scope, method);

        debug!(
            "{}::{}: {} query, {} header, {} body parameters",
            controller,
            method_name,
            result.query_parameters.len(),
            result.header_parameters.len(),
            result.body_parameters.len()
        );
        result
    }

    /// First parameter typed with a FormRequest subclass
    fn form_request(&self, scope: &LoadedClass, method: &MethodDecl) -> Option<LoadedClass> {
        let requests = FormRequestAnalyzer::new(self.ctx);
        for param in &method.params {
            let Some(hint) = &param.type_hint else { continue };
            if hint.is_union() || hint.is_intersection() {
                let names: Vec<String> = hint
                    .names()
                    .into_iter()
                    .filter(|n| !is_builtin(n))
                    .map(|n| self.ctx.resolve_in(n, scope))
                    .collect();
                if names.iter().any(|n| requests.is_form_request(n)) {
                    self.ctx.errors.record(
                        COMPONENT,
                        ErrorKind::UnsupportedFeature,
                        format!("parameter ${} has a union or intersection type; skipped", param.name),
                        [
                            ("class", scope.fqn.clone()),
                            ("method", method.name.clone()),
                            ("parameter", param.name.clone()),
                        ],
                    );
                }
                continue;
            }
            let Some(name) = hint.single_name().filter(|n| !is_builtin(n)) else { continue };
            let fqn = self.ctx.resolve_in(name, scope);
            if !requests.is_form_request(&fqn) {
                continue;
            }
            match self.ctx.load_class(&fqn) {
                Ok(loaded) => return Some(loaded),
                Err(e) => {
                    self.ctx.errors.report(COMPONENT, &e, [("method", method.name.clone())]);
                    return None;
                }
            }
        }
        None
    }

    /// Enum-typed parameters (implicit enum route binding)
    fn enum_parameters(&self, scope: &LoadedClass, method: &MethodDecl) -> Vec<EnumParameter> {
        let enums = EnumAnalyzer::new(self.ctx);
        let requests = FormRequestAnalyzer::new(self.ctx);
        method
            .params
            .iter()
            .filter_map(|param: &Param| {
                let name = param.type_hint.as_ref()?.single_name().filter(|n| !is_builtin(n))?;
                let fqn = self.ctx.resolve_in(name, scope);
                if requests.is_form_request(&fqn) {
                    return None;
                }
                let info = enums.enum_info(&fqn)?;
                Some(EnumParameter {
                    name: param.name.clone(),
                    info,
                })
            })
            .collect()
    }

    /// Resources named by the declared return type, union members included
    fn declared_resources(&self, scope: &LoadedClass, method: &MethodDecl) -> Vec<ResourceSchema> {
        let Some(hint) = &method.return_type else { return Vec::new() };
        let resources = ResourceAnalyzer::new(self.ctx);
        hint.names()
            .into_iter()
            .filter(|n| !is_builtin(n))
            .map(|n| self.ctx.resolve_in(n, scope))
            .filter(|fqn| resources.is_resource(fqn))
            .map(|fqn| resources.analyze(&fqn))
            .collect()
    }

    fn resource_from_source(&self, scope: &LoadedClass, method: &MethodDecl) -> Option<ResourceSchema> {
        let resources = ResourceAnalyzer::new(self.ctx);
        resource_usage_regex()
            .captures_iter(&method.source)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| self.ctx.resolve_in(m.as_str(), scope))
            .find(|fqn| resources.is_resource(fqn))
            .map(|fqn| resources.analyze(&fqn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResponseInfo, SchemaType};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    const SOURCES: &[(&str, &str)] = &[
        (
            "app/Http/Controllers/PostController.php",
            r#"<?php
namespace App\Http\Controllers;

use App\Enums\Status;
use App\Http\Requests\StorePostRequest;
use App\Http\Requests\UpdatePostRequest;
use App\Http\Resources\PostResource;
use App\Models\Post;
use Illuminate\Http\Request;

class PostController extends Controller
{
    /**
     * List posts.
     *
     * @deprecated use search instead
     */
    public function index(Request $request)
    {
        $request->validate(['status' => 'required|in:active,inactive']);
        $status = $request->query('status');
        return PostResource::collection(Post::paginate(15));
    }

    public function store(StorePostRequest $request): PostResource
    {
        $post = Post::create($request->validated());
        return new PostResource($post);
    }

    public function update(StorePostRequest|UpdatePostRequest $request, Post $post)
    {
        return response()->noContent();
    }

    public function byStatus(Status $status)
    {
        return ['status' => $status->value];
    }

    public function broken()
    {
        return match_this();
    }
}
"#,
        ),
        (
            "app/Http/Requests/StorePostRequest.php",
            r#"<?php
namespace App\Http\Requests;

use Illuminate\Foundation\Http\FormRequest;

class StorePostRequest extends FormRequest
{
    public function rules(): array
    {
        return ['title' => 'required|string|max:120', 'body' => 'nullable|string'];
    }
}
"#,
        ),
        (
            "app/Http/Requests/UpdatePostRequest.php",
            "<?php\nnamespace App\\Http\\Requests;\nuse Illuminate\\Foundation\\Http\\FormRequest;\nclass UpdatePostRequest extends FormRequest {}\n",
        ),
        ("vendor/FormRequest.php", "<?php\nnamespace Illuminate\\Foundation\\Http;\nclass FormRequest {}\n"),
        (
            "app/Http/Resources/PostResource.php",
            r#"<?php
namespace App\Http\Resources;

use Illuminate\Http\Resources\Json\JsonResource;

class PostResource extends JsonResource
{
    public function toArray($request): array
    {
        return ['id' => $this->id, 'title' => $this->title];
    }
}
"#,
        ),
        ("vendor/JsonResource.php", "<?php\nnamespace Illuminate\\Http\\Resources\\Json;\nclass JsonResource {}\n"),
        (
            "app/Models/Post.php",
            "<?php\nnamespace App\\Models;\nuse Illuminate\\Database\\Eloquent\\Model;\nclass Post extends Model { protected $fillable = ['title']; }\n",
        ),
        ("vendor/Model.php", "<?php\nnamespace Illuminate\\Database\\Eloquent;\nclass Model {}\n"),
        (
            "app/Enums/Status.php",
            "<?php\nnamespace App\\Enums;\nenum Status: string { case Active = 'active'; case Inactive = 'inactive'; }\n",
        ),
    ];

    fn analyze(method: &str) -> (ControllerActionResult, AnalysisContext) {
        let ctx = AnalysisContext::in_memory(SOURCES);
        let result = ControllerAnalyzer::new(&ctx).analyze_to_result("App\\Http\\Controllers\\PostController", method);
        (result, ctx)
    }

    #[test]
    fn test_inline_rules_merge_into_query() {
        let (result, _) = analyze("index");
        assert!(result.deprecated);
        assert_eq!(result.summary.as_deref(), Some("List posts."));
        let status: Vec<_> = result.query_parameters.iter().filter(|p| p.name == "status").collect();
        assert_eq!(status.len(), 1);
        assert!(status[0].required);
        assert_eq!(
            status[0].enum_values,
            Some(vec![Value::from("active"), Value::from("inactive")])
        );
        assert!(result.body_parameters.is_empty());
        assert_eq!(result.resource.as_ref().map(|r| r.class.as_str()), Some("App\\Http\\Resources\\PostResource"));
        assert!(result.pagination.is_some());
    }

    #[test]
    fn test_form_request_and_declared_resource() {
        let (result, ctx) = analyze("store");
        assert_eq!(result.form_request.as_deref(), Some("App\\Http\\Requests\\StorePostRequest"));
        let names: Vec<&str> = result.body_parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["body", "title"]);
        let title = &result.body_parameters[1];
        assert!(title.required);
        assert_eq!(title.constraints.max_length, Some(120));
        assert_eq!(result.resource.as_ref().map(|r| r.properties.len()), Some(2));
        assert!(!result.deprecated);
        assert_eq!(ctx.errors.count_of(ErrorKind::UnexpectedError), 0);
    }

    #[test]
    fn test_union_request_is_skipped() {
        let (result, ctx) = analyze("update");
        assert!(result.form_request.is_none());
        assert_eq!(ctx.errors.count_of(ErrorKind::UnsupportedFeature), 1);
        assert_eq!(result.response, Some(ResponseInfo::Void { status: 204 }));
    }

    #[test]
    fn test_enum_parameter_and_unknown_response() {
        let (result, _) = analyze("byStatus");
        assert_eq!(result.enum_parameters.len(), 1);
        assert_eq!(result.enum_parameters[0].info.value_type, SchemaType::String);

        let (result, _) = analyze("broken");
        assert!(result.response.is_none());
        assert!(result.is_empty());
    }

    #[test]
    fn test_missing_method_is_reported() {
        let (result, ctx) = analyze("nope");
        assert!(result.is_empty());
        assert_eq!(ctx.errors.count_of(ErrorKind::MethodNodeError), 1);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let ctx = AnalysisContext::in_memory(SOURCES);
        let analyzer = ControllerAnalyzer::new(&ctx);
        let first = serde_json::to_string(&analyzer.analyze("App\\Http\\Controllers\\PostController", "store")).unwrap();
        let second = serde_json::to_string(&analyzer.analyze("App\\Http\\Controllers\\PostController", "store")).unwrap();
        assert_eq!(first, second);
    }
}
