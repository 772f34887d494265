//! Response shape of a controller action, read from its return statements.
//!
//! Each returned expression is run through [`RESPONSE_PATTERNS`] in order
//! and the first pattern that recognises it decides the shape. Across
//! several return statements the first non-unknown shape wins; distinct
//! shapes on other branches are not merged.

use super::literal::const_string;
use super::mime::{mime_for_filename, DEFAULT_MIME_TYPE};
use super::model::ModelAnalyzer;
use super::resource::ResourceAnalyzer;
use crate::ast::{short_name, string_key, Arg, ArrayItem, Expr, MethodDecl, NewTarget, Param, Stmt};
use crate::context::AnalysisContext;
use crate::inference::property_from_expr;
use crate::model::{PaginationInfo, PropertyInfo, ResponseInfo, SchemaType};
use crate::visit::{AssignmentTracker, ReturnCollector};
use crate::workspace::LoadedClass;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

/// What one action's return statements are interpreted against
pub struct Scope<'s> {
    ctx: &'s AnalysisContext,
    controller: &'s LoadedClass,
    params: &'s [Param],
    assignments: AssignmentTracker<'s>,
}

impl<'s> Scope<'s> {
    /// Follow `$var` to the value last assigned to it
    fn resolve<'e>(&self, expr: &'e Expr) -> &'e Expr
    where
        's: 'e,
    {
        let mut current = expr;
        for _ in 0..4 {
            let Expr::Variable(name) = current else { break };
            match self.assignments.last(name) {
                Some(value) => current = value,
                None => break,
            }
        }
        current
    }

    fn class(&self, name: &str) -> String {
        self.ctx.resolve_in(name, self.controller)
    }

    /// Model class of a type-hinted action parameter (`show(User $user)`)
    fn param_model(&self, variable: &str) -> Option<String> {
        let param = self.params.iter().find(|p| p.name == variable)?;
        let hint = param.type_hint.as_ref()?.single_name()?;
        let fqn = self.class(hint);
        ModelAnalyzer::new(self.ctx).is_model(&fqn).then_some(fqn)
    }

    fn model(&self, class: &Expr) -> Option<String> {
        let Expr::Name(name) = class else { return None };
        let fqn = self.class(name);
        ModelAnalyzer::new(self.ctx).is_model(&fqn).then_some(fqn)
    }
}

/// Start of a fluent chain
enum Root<'e> {
    Func(&'e str, &'e [Arg]),
    Static(&'e str, &'e str, &'e [Arg]),
    New(&'e str, &'e [Arg]),
    Variable(&'e str),
    Other,
}

/// A fluent call chain, calls after the root in call order
struct Chain<'e> {
    root: Root<'e>,
    calls: Vec<(&'e str, &'e [Arg])>,
}

impl<'e> Chain<'e> {
    fn of(expr: &'e Expr) -> Chain<'e> {
        let mut calls = Vec::new();
        let mut current = expr;
        while let Expr::MethodCall { object, method, args, .. } = current {
            calls.push((method.as_str(), args.as_slice()));
            current = object;
        }
        calls.reverse();
        let root = match current {
            Expr::FuncCall { name, args } => Root::Func(short_name(name), args.as_slice()),
            Expr::StaticCall { class, method, args } => match class.as_ref() {
                Expr::Name(class) => Root::Static(class.as_str(), method.as_str(), args.as_slice()),
                _ => Root::Other,
            },
            Expr::New {
                target: NewTarget::Named(class),
                args,
            } => Root::New(class.as_str(), args.as_slice()),
            Expr::Variable(name) => Root::Variable(name.as_str()),
            _ => Root::Other,
        };
        Chain { root, calls }
    }

    fn first(&self) -> Option<(&'e str, &'e [Arg])> {
        self.calls.first().copied()
    }

    fn last_method(&self) -> Option<&'e str> {
        match (&self.root, self.calls.last()) {
            (_, Some((method, _))) => Some(*method),
            (Root::Static(_, method, _), None) => Some(*method),
            _ => None,
        }
    }

    fn find(&self, method: &str) -> Option<&'e [Arg]> {
        self.calls
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(method))
            .map(|(_, args)| *args)
    }

    /// `response()` with no arguments
    fn is_response_factory(&self) -> bool {
        match self.root {
            Root::Func(name, args) => name.eq_ignore_ascii_case("response") && args.is_empty(),
            _ => false,
        }
    }

    /// The factory method called on `response()` / `Response::`
    fn factory_call(&self) -> Option<(&'e str, &'e [Arg])> {
        match self.root {
            Root::Static(class, method, args) if short_name(class) == "Response" => Some((method, args)),
            _ if self.is_response_factory() => self.first(),
            _ => None,
        }
    }

    /// `->setStatusCode(201)` anywhere on the chain
    fn status_override(&self) -> Option<u16> {
        self.find("setStatusCode").and_then(|args| positional(args, 0)).and_then(status_code)
    }

    /// Content type set through `->header()` or `->withHeaders()`
    fn content_type_header(&self) -> Option<String> {
        self.calls.iter().find_map(|(method, args)| match method.to_ascii_lowercase().as_str() {
            "header" => {
                let name = positional(args, 0)?.as_str()?;
                name.eq_ignore_ascii_case("content-type")
                    .then(|| positional(args, 1)?.as_str().map(str::to_string))
                    .flatten()
            }
            "withheaders" => positional(args, 0).and_then(header_content_type),
            _ => None,
        })
    }
}

fn positional(args: &[Arg], position: usize) -> Option<&Expr> {
    args.iter().filter(|a| a.name.is_none()).nth(position).map(|a| &a.value)
}

/// `201`, `Response::HTTP_CREATED` and the like
fn status_code(expr: &Expr) -> Option<u16> {
    if let Some(code) = expr.as_int() {
        return u16::try_from(code).ok();
    }
    let Expr::ClassConst { name, .. } = expr else { return None };
    let code = match name.as_str() {
        "HTTP_OK" => 200,
        "HTTP_CREATED" => 201,
        "HTTP_ACCEPTED" => 202,
        "HTTP_NO_CONTENT" => 204,
        "HTTP_PARTIAL_CONTENT" => 206,
        _ => return None,
    };
    Some(code)
}

/// `Content-Type` value of a literal header map
fn header_content_type(headers: &Expr) -> Option<String> {
    headers.as_array()?.iter().find_map(|item| {
        let key = string_key(item)?;
        key.eq_ignore_ascii_case("content-type")
            .then(|| item.value.as_str().map(str::to_string))
            .flatten()
    })
}

fn array_properties(items: &[ArrayItem]) -> BTreeMap<String, PropertyInfo> {
    items
        .iter()
        .filter_map(|item| {
            let key = string_key(item)?;
            let property = match &item.value {
                Expr::Array(nested) if nested.iter().any(|i| string_key(i).is_some()) => {
                    let properties = array_properties(nested);
                    let example = Value::Object(
                        properties
                            .iter()
                            .map(|(name, p)| (name.clone(), p.example.clone().unwrap_or(Value::Null)))
                            .collect(),
                    );
                    let mut property = PropertyInfo::new(SchemaType::Object).with_example(example);
                    property.properties = Some(properties);
                    property
                }
                value => property_from_expr(key, value),
            };
            Some((key.to_string(), property))
        })
        .collect()
}

type Pattern = fn(&Scope<'_>, &Expr) -> Option<ResponseInfo>;

/// Evaluated top to bottom, first match wins
pub const RESPONSE_PATTERNS: &[(&str, Pattern)] = &[
    ("inline_json", inline_json),
    ("file_download", file_download),
    ("stream", stream),
    ("custom_content_type", custom_content_type),
    ("array_literal", array_literal),
    ("model_lookup", model_lookup),
    ("collection_chain", collection_chain),
    ("resource", resource),
];

/// Shape of a data argument handed to `json()` and friends
fn data_shape(scope: &Scope<'_>, data: Option<&Expr>, status: u16) -> ResponseInfo {
    let Some(data) = data.map(|d| scope.resolve(d)) else {
        return ResponseInfo::Object {
            status,
            properties: BTreeMap::new(),
        };
    };
    if let Expr::Array(items) = data {
        return ResponseInfo::Object {
            status,
            properties: array_properties(items),
        };
    }
    let fallbacks: [Pattern; 3] = [resource, model_lookup, collection_chain];
    let analyzed = fallbacks
        .iter()
        .find_map(|pattern| pattern(scope, data));
    match analyzed {
        Some(ResponseInfo::Resource { class, is_collection, .. }) => ResponseInfo::Resource {
            status,
            class,
            is_collection,
        },
        Some(ResponseInfo::Object { properties, .. }) => ResponseInfo::Object { status, properties },
        Some(ResponseInfo::Collection {
            element_class,
            element,
            pagination,
            ..
        }) => ResponseInfo::Collection {
            status,
            element_class,
            element,
            pagination,
        },
        _ => ResponseInfo::Object {
            status,
            properties: BTreeMap::new(),
        },
    }
}

/// `response()->json($data, 201)`, `Response::json(...)`, `new JsonResponse(...)`,
/// `response()->noContent()` and `response($data, 201)`
fn inline_json(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let chain = Chain::of(expr);
    let (data, status) = match (&chain.root, chain.factory_call()) {
        (_, Some((method, args))) if method.eq_ignore_ascii_case("json") => {
            (positional(args, 0), positional(args, 1).and_then(status_code))
        }
        (_, Some((method, args))) if method.eq_ignore_ascii_case("noContent") => {
            let status = positional(args, 0).and_then(status_code).unwrap_or(204);
            return Some(ResponseInfo::Void { status });
        }
        (Root::New(class, args), _) if short_name(class) == "JsonResponse" => {
            (positional(args, 0), positional(args, 1).and_then(status_code))
        }
        (Root::Func(name, args), _) if name.eq_ignore_ascii_case("response") && !args.is_empty() => {
            let headers = positional(args, 2).and_then(header_content_type);
            if headers.is_some() || chain.content_type_header().is_some() {
                return None;
            }
            let data = positional(args, 0);
            if data.is_some_and(|d| matches!(scope.resolve(d), Expr::Literal(_) | Expr::Interpolated(_))) {
                return None;
            }
            (data, positional(args, 1).and_then(status_code))
        }
        _ => return None,
    };
    let status = chain.status_override().or(status).unwrap_or(200);
    Some(data_shape(scope, data, status))
}

/// File name written as a literal, or the base name of a literal path
fn file_name(scope: &Scope<'_>, expr: Option<&Expr>) -> Option<String> {
    let text = const_string(scope.resolve(expr?), scope.controller, scope.ctx)?;
    let base = text.rsplit(['/', '\\']).next().unwrap_or(&text);
    (!base.is_empty()).then(|| base.to_string())
}

/// `response()->download($path, $name)`, `response()->file($path)`,
/// `Storage::download(...)` and `Storage::disk(...)->download(...)`
fn file_download(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let chain = Chain::of(expr);
    let (method, args) = match (&chain.root, chain.factory_call()) {
        (_, Some(call)) => call,
        (Root::Static(class, method, args), _) if short_name(class) == "Storage" => match chain.find("download") {
            Some(args) => ("download", args),
            None => (*method, *args),
        },
        _ => return None,
    };
    let attachment = match method.to_ascii_lowercase().as_str() {
        "download" => true,
        "file" => false,
        _ => return None,
    };
    let filename = file_name(scope, positional(args, 1)).or_else(|| file_name(scope, positional(args, 0)));
    let content_type = positional(args, 2)
        .and_then(header_content_type)
        .or_else(|| filename.as_deref().map(|f| mime_for_filename(f).to_string()))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    Some(ResponseInfo::BinaryFile {
        content_type,
        filename,
        attachment,
    })
}

/// `response()->stream(...)`, `response()->streamDownload(...)`,
/// `response()->eventStream(...)` and `new StreamedResponse(...)`
fn stream(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let chain = Chain::of(expr);
    let (content_type, filename) = match (&chain.root, chain.factory_call()) {
        (_, Some((method, args))) => match method.to_ascii_lowercase().as_str() {
            "stream" => (positional(args, 2).and_then(header_content_type), None),
            "streamdownload" => (
                positional(args, 2).and_then(header_content_type),
                file_name(scope, positional(args, 1)),
            ),
            "eventstream" => (Some("text/event-stream".to_string()), None),
            _ => return None,
        },
        (Root::New(class, args), _) if short_name(class) == "StreamedResponse" => {
            (positional(args, 2).and_then(header_content_type), None)
        }
        _ => return None,
    };
    let content_type = content_type
        .or_else(|| chain.content_type_header())
        .or_else(|| filename.as_deref().map(|f| mime_for_filename(f).to_string()))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    Some(ResponseInfo::Streamed { content_type, filename })
}

/// `response($xml, 200, ['Content-Type' => ...])`, `->header('Content-Type', ...)`
/// and `new Response($body, 200, [...])`
fn custom_content_type(_scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let chain = Chain::of(expr);
    let (args, from_args) = match &chain.root {
        Root::Func(name, args) if name.eq_ignore_ascii_case("response") => (*args, true),
        Root::New(class, args) if short_name(class) == "Response" => (*args, true),
        _ if chain.is_response_factory() => (&[][..], false),
        _ => return None,
    };
    let from_headers = if from_args {
        positional(args, 2).and_then(header_content_type)
    } else {
        None
    };
    let content_type = from_headers.or_else(|| chain.content_type_header())?;
    let status = chain
        .status_override()
        .or_else(|| positional(args, 1).and_then(status_code))
        .unwrap_or(200);
    Some(ResponseInfo::Custom { status, content_type })
}

fn array_literal(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let Expr::Array(items) = scope.resolve(expr) else { return None };
    Some(ResponseInfo::Object {
        status: 200,
        properties: array_properties(items),
    })
}

const SINGLE_MODEL_METHODS: &[&str] = &[
    "find",
    "findorfail",
    "findornew",
    "first",
    "firstorfail",
    "firstwhere",
    "sole",
    "create",
    "firstorcreate",
    "updateorcreate",
    "forcecreate",
];

const MODEL_RELOAD_METHODS: &[&str] = &["load", "loadmissing", "loadcount", "fresh", "refresh"];

/// `User::findOrFail($id)`, `User::where(...)->first()`, `User::create(...)`
/// and a route-bound `$user` (optionally `->load(...)`)
fn model_lookup(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let expr = scope.resolve(expr);
    let chain = Chain::of(expr);
    let (model, method) = match &chain.root {
        Root::Static(class, _, _) => {
            let method = chain.last_method()?.to_ascii_lowercase();
            if !SINGLE_MODEL_METHODS.contains(&method.as_str()) {
                return None;
            }
            let class_expr = match expr.chain_root() {
                Expr::StaticCall { class, .. } => class.as_ref(),
                _ => return None,
            };
            let model = scope.model(class_expr).or_else(|| {
                debug!("{} is not a model", class);
                None
            })?;
            (model, method)
        }
        Root::Variable(name) => {
            let reloads_only = chain
                .calls
                .iter()
                .all(|(m, _)| MODEL_RELOAD_METHODS.contains(&m.to_ascii_lowercase().as_str()));
            if !reloads_only {
                return None;
            }
            (scope.param_model(name)?, String::new())
        }
        _ => return None,
    };
    let status = if method.contains("create") { 201 } else { 200 };
    let schema = ModelAnalyzer::new(scope.ctx).analyze(&model);
    Some(ResponseInfo::Object {
        status,
        properties: schema.properties,
    })
}

const COLLECTION_METHODS: &[&str] = &["get", "all", "paginate", "simplepaginate", "cursorpaginate"];

/// `User::all()`, `User::where(...)->get()` and paginator chains
fn collection_chain(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let expr = scope.resolve(expr);
    let chain = Chain::of(expr);
    let Root::Static(..) = chain.root else { return None };
    let method = chain.last_method()?.to_ascii_lowercase();
    if !COLLECTION_METHODS.contains(&method.as_str()) {
        return None;
    }
    let Expr::StaticCall { class, .. } = expr.chain_root() else { return None };
    let model = scope.model(class)?;
    let pagination = paginator(expr);
    let element = ModelAnalyzer::new(scope.ctx).analyze(&model);
    Some(ResponseInfo::Collection {
        status: 200,
        element_class: Some(model.clone()),
        element: Some(element),
        pagination: pagination.map(|(kind, per_page)| PaginationInfo {
            kind,
            per_page,
            model: Some(model),
            resource: None,
            source: "call".to_string(),
        }),
    })
}

fn paginator(expr: &Expr) -> Option<(crate::model::PaginationKind, Option<i64>)> {
    use crate::model::PaginationKind;
    let (method, args) = match expr {
        Expr::MethodCall { method, args, .. } | Expr::StaticCall { method, args, .. } => (method, args),
        _ => return None,
    };
    let kind = match method.to_ascii_lowercase().as_str() {
        "paginate" => PaginationKind::LengthAware,
        "simplepaginate" => PaginationKind::Simple,
        "cursorpaginate" => PaginationKind::Cursor,
        _ => return None,
    };
    Some((kind, crate::ast::find_arg(args, "perPage", 0).and_then(Expr::as_int)))
}

/// `new UserResource($user)`, `UserResource::make(...)`,
/// `UserResource::collection(...)`, optionally `->response()->setStatusCode(201)`
fn resource(scope: &Scope<'_>, expr: &Expr) -> Option<ResponseInfo> {
    let expr = scope.resolve(expr);
    let chain = Chain::of(expr);
    let (class, collection) = match chain.root {
        Root::New(class, _) => (class, None),
        Root::Static(class, method, _) => match method {
            "collection" => (class, Some(true)),
            "make" => (class, None),
            _ => return None,
        },
        _ => return None,
    };
    let allowed = ["response", "setstatuscode", "additional", "withresponse", "header", "withheaders"];
    if !chain
        .calls
        .iter()
        .all(|(m, _)| allowed.contains(&m.to_ascii_lowercase().as_str()))
    {
        return None;
    }
    let fqn = scope.class(class);
    let resources = ResourceAnalyzer::new(scope.ctx);
    if !resources.is_resource(&fqn) {
        return None;
    }
    Some(ResponseInfo::Resource {
        status: chain.status_override().unwrap_or(200),
        is_collection: collection.unwrap_or_else(|| resources.is_collection_class(&fqn)),
        class: fqn,
    })
}

pub struct ResponseAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> ResponseAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    pub fn analyze(&self, controller: &LoadedClass, method: &MethodDecl) -> ResponseInfo {
        let stmts: &[Stmt] = method.statements();
        let returns = ReturnCollector::collect(stmts);
        if returns.returns.is_empty() {
            return ResponseInfo::Void { status: 200 };
        }
        let scope = Scope {
            ctx: self.ctx,
            controller,
            params: &method.params,
            assignments: AssignmentTracker::collect(stmts),
        };
        for value in &returns.returns {
            let matched = RESPONSE_PATTERNS
                .iter()
                .find_map(|(name, pattern)| pattern(&scope, value).map(|info| (*name, info)));
            match matched {
                Some((name, info)) if !info.is_unknown() => {
                    debug!("{}::{} returns {} via {}", controller.fqn, method.name, info.tag(), name);
                    return info;
                }
                _ => debug!("Unrecognised return in {}::{}: {}", controller.fqn, method.name, value),
            }
        }
        ResponseInfo::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTROLLER: &str = r#"<?php
namespace App\Http\Controllers;

use App\Http\Resources\UserResource;
use App\Models\User;
use Illuminate\Http\Response;
use Illuminate\Support\Facades\Storage;

class UserController extends Controller
{
    public function index()
    {
        return User::where('active', true)->paginate(20);
    }

    public function all()
    {
        return User::all();
    }

    public function show(User $user)
    {
        return $user->load('posts');
    }

    public function find($id)
    {
        return User::findOrFail($id);
    }

    public function store()
    {
        $user = User::create(request()->all());
        return (new UserResource($user))->response()->setStatusCode(201);
    }

    public function stats()
    {
        return response()->json(['total' => 10, 'meta' => ['generated_at' => now()]], 202);
    }

    public function ping()
    {
        return ['ok' => true];
    }

    public function destroy(User $user)
    {
        $user->delete();
        return response()->noContent();
    }

    public function export()
    {
        return response()->download(storage_path('exports/users.csv'), 'users.csv');
    }

    public function avatar()
    {
        return Storage::disk('s3')->download('avatars/me.png');
    }

    public function report()
    {
        return response()->streamDownload(function () {
            echo 'x';
        }, 'report.pdf');
    }

    public function feed()
    {
        return response($this->xml(), 200)->header('Content-Type', 'application/rss+xml');
    }

    public function collection()
    {
        return UserResource::collection(User::all());
    }

    public function nothing()
    {
        User::query()->delete();
    }

    public function mystery()
    {
        return $this->service->handle();
    }
}
"#;

    fn analyze(method: &str) -> ResponseInfo {
        let ctx = AnalysisContext::in_memory(&[
            ("app/Http/Controllers/UserController.php", CONTROLLER),
            (
                "app/Models/User.php",
                "<?php\nnamespace App\\Models;\nuse Illuminate\\Database\\Eloquent\\Model;\nclass User extends Model { protected $fillable = ['name', 'email']; }\n",
            ),
            ("vendor/Model.php", "<?php\nnamespace Illuminate\\Database\\Eloquent;\nclass Model {}\n"),
            (
                "app/Http/Resources/UserResource.php",
                "<?php\nnamespace App\\Http\\Resources;\nuse Illuminate\\Http\\Resources\\Json\\JsonResource;\nclass UserResource extends JsonResource {}\n",
            ),
            ("vendor/JsonResource.php", "<?php\nnamespace Illuminate\\Http\\Resources\\Json;\nclass JsonResource {}\n"),
        ]);
        let controller = ctx.load_class("App\\Http\\Controllers\\UserController").unwrap();
        let decl = controller.class().method(method).unwrap().clone();
        ResponseAnalyzer::new(&ctx).analyze(&controller, &decl)
    }

    #[test]
    fn test_model_collections() {
        match analyze("index") {
            ResponseInfo::Collection {
                element_class,
                pagination: Some(pagination),
                element: Some(element),
                ..
            } => {
                assert_eq!(element_class.as_deref(), Some("App\\Models\\User"));
                assert_eq!(pagination.per_page, Some(20));
                assert!(element.properties.contains_key("email"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(analyze("all"), ResponseInfo::Collection { pagination: None, .. }));
    }

    #[test]
    fn test_single_models() {
        match analyze("show") {
            ResponseInfo::Object { status, properties } => {
                assert_eq!(status, 200);
                assert!(properties.contains_key("name"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(analyze("find"), ResponseInfo::Object { status: 200, .. }));
    }

    #[test]
    fn test_resources() {
        assert_eq!(
            analyze("store"),
            ResponseInfo::Resource {
                status: 201,
                class: "App\\Http\\Resources\\UserResource".into(),
                is_collection: false,
            }
        );
        assert!(matches!(analyze("collection"), ResponseInfo::Resource { is_collection: true, .. }));
    }

    #[test]
    fn test_inline_json_and_arrays() {
        match analyze("stats") {
            ResponseInfo::Object { status, properties } => {
                assert_eq!(status, 202);
                assert_eq!(properties["total"].schema_type, SchemaType::Integer);
                assert_eq!(properties["meta"].schema_type, SchemaType::Object);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(analyze("ping"), ResponseInfo::Object { status: 200, .. }));
        assert_eq!(analyze("destroy"), ResponseInfo::Void { status: 204 });
        assert_eq!(analyze("nothing"), ResponseInfo::Void { status: 200 });
    }

    #[test]
    fn test_files_and_streams() {
        assert_eq!(
            analyze("export"),
            ResponseInfo::BinaryFile {
                content_type: "text/csv".into(),
                filename: Some("users.csv".into()),
                attachment: true,
            }
        );
        assert_eq!(
            analyze("avatar"),
            ResponseInfo::BinaryFile {
                content_type: "image/png".into(),
                filename: Some("me.png".into()),
                attachment: true,
            }
        );
        assert_eq!(
            analyze("report"),
            ResponseInfo::Streamed {
                content_type: "application/pdf".into(),
                filename: Some("report.pdf".into()),
            }
        );
        assert_eq!(
            analyze("feed"),
            ResponseInfo::Custom {
                status: 200,
                content_type: "application/rss+xml".into(),
            }
        );
    }

    #[test]
    fn test_unrecognised_return_is_unknown() {
        assert!(analyze("mystery").is_unknown());
    }
}
