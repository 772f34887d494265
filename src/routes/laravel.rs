use super::{combine_paths, RouteExtractor, RouteGroup};
use crate::analyzers::literal::string_list;
use crate::ast::{find_arg, short_name, string_key, Arg, ArrayItem, Expr, PhpFile, Stmt};
use crate::context::AnalysisContext;
use crate::model::{HttpMethod, RouteDescriptor};
use crate::symbols::NameResolver;
use log::{debug, warn};
use std::collections::BTreeMap;

const UUID_PATTERN: &str = r"[\da-fA-F]{8}-[\da-fA-F]{4}-[\da-fA-F]{4}-[\da-fA-F]{4}-[\da-fA-F]{12}";
const ULID_PATTERN: &str = "[0-7][0-9a-hjkmnp-tv-zA-HJKMNP-TV-Z]{25}";

/// Resource actions: name, methods, URI suffix, whether `apiResource` keeps it
const RESOURCE_ACTIONS: &[(&str, &[HttpMethod], &str, bool)] = &[
    ("index", &[HttpMethod::Get], "", true),
    ("create", &[HttpMethod::Get], "create", false),
    ("store", &[HttpMethod::Post], "", true),
    ("show", &[HttpMethod::Get], "{}", true),
    ("edit", &[HttpMethod::Get], "{}/edit", false),
    ("update", &[HttpMethod::Put, HttpMethod::Patch], "{}", true),
    ("destroy", &[HttpMethod::Delete], "{}", true),
];

/// `Route` facade extractor
pub struct LaravelRouteExtractor<'a> {
    ctx: &'a AnalysisContext,
}

impl RouteExtractor for LaravelRouteExtractor<'_> {
    fn extract_routes(&self, file: &PhpFile, group: &RouteGroup) -> Vec<RouteDescriptor> {
        let mut routes = Vec::new();
        self.walk(&file.statements, group, file, &mut routes);
        routes
    }
}

/// One call of a `Route::...` chain
#[derive(Clone, Copy)]
struct Call<'e> {
    method: &'e str,
    args: &'e [Arg],
}

/// `Route::a()->b()->c()` as `[a, b, c]`; `None` when the chain does not
/// start at the facade
fn route_chain(expr: &Expr) -> Option<Vec<Call<'_>>> {
    let mut calls = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::MethodCall { object, method, args, .. } => {
                calls.push(Call { method, args });
                current = object.as_ref();
            }
            Expr::StaticCall { class, method, args } if is_route_facade(class) => {
                calls.push(Call { method, args });
                calls.reverse();
                return Some(calls);
            }
            _ => return None,
        }
    }
}

fn is_route_facade(class: &Expr) -> bool {
    matches!(class, Expr::Name(name) if short_name(name) == "Route")
}

fn positional(args: &[Arg], position: usize) -> Option<&Expr> {
    args.iter().filter(|a| a.name.is_none()).nth(position).map(|a| &a.value)
}

/// Every string argument, flattening array arguments
fn string_args(args: &[Arg]) -> Vec<String> {
    args.iter().flat_map(|a| string_list(&a.value)).collect()
}

/// Laravel adds HEAD to every GET route
fn with_head(mut methods: Vec<HttpMethod>) -> Vec<HttpMethod> {
    if methods.contains(&HttpMethod::Get) && !methods.contains(&HttpMethod::Head) {
        methods.push(HttpMethod::Head);
    }
    methods
}

fn singular(word: &str) -> String {
    let word = word.replace('-', "_");
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["ses", "xes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') && !stem.is_empty() => stem.to_string(),
        _ => word,
    }
}

/// Route-level attributes applied after registration (`->name('x')`)
#[derive(Default)]
struct Modifiers {
    name: Option<String>,
    middleware: Vec<String>,
    excluded_middleware: Vec<String>,
    wheres: BTreeMap<String, String>,
}

struct ResourceSpec<'e> {
    name: String,
    controller: Option<&'e Expr>,
    api: bool,
    only: Option<Vec<String>>,
    except: Vec<String>,
    names: BTreeMap<String, String>,
    parameters: BTreeMap<String, String>,
}

enum Registration<'e> {
    Single {
        methods: Vec<HttpMethod>,
        uri: String,
        action: Option<&'e Expr>,
    },
    Resource(ResourceSpec<'e>),
}

impl<'a> LaravelRouteExtractor<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    fn walk(&self, stmts: &[Stmt], group: &RouteGroup, file: &PhpFile, out: &mut Vec<RouteDescriptor>) {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(expr) => self.expression(expr, group, file, out),
                Stmt::Block(body) => self.walk(body, group, file, out),
                // routes registered conditionally are still routes of the app
                Stmt::If { then, else_ifs, otherwise, .. } => {
                    self.walk(then, group, file, out);
                    for (_, body) in else_ifs {
                        self.walk(body, group, file, out);
                    }
                    if let Some(body) = otherwise {
                        self.walk(body, group, file, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn expression(&self, expr: &Expr, group: &RouteGroup, file: &PhpFile, out: &mut Vec<RouteDescriptor>) {
        let Some(chain) = route_chain(expr) else { return };
        let mut pending = group.clone();
        let mut registrations: Vec<Registration> = Vec::new();
        let mut modifiers = Modifiers::default();

        for call in chain {
            let registered = !registrations.is_empty();
            let lower = call.method.to_ascii_lowercase();
            match lower.as_str() {
                "get" | "post" | "put" | "patch" | "delete" | "options" => {
                    if let (Some(uri), Some(method)) = (positional(call.args, 0).and_then(Expr::as_str), HttpMethod::parse(&lower)) {
                        registrations.push(Registration::Single {
                            methods: vec![method],
                            uri: uri.to_string(),
                            action: find_arg(call.args, "action", 1),
                        });
                    }
                }
                "any" => {
                    if let Some(uri) = positional(call.args, 0).and_then(Expr::as_str) {
                        registrations.push(Registration::Single {
                            methods: HttpMethod::all(),
                            uri: uri.to_string(),
                            action: find_arg(call.args, "action", 1),
                        });
                    }
                }
                "match" => {
                    let methods: Vec<HttpMethod> = positional(call.args, 0)
                        .map(string_list)
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|m| HttpMethod::parse(m))
                        .collect();
                    if let (Some(uri), false) = (positional(call.args, 1).and_then(Expr::as_str), methods.is_empty()) {
                        registrations.push(Registration::Single {
                            methods,
                            uri: uri.to_string(),
                            action: find_arg(call.args, "action", 2),
                        });
                    }
                }
                "view" => {
                    if let Some(uri) = positional(call.args, 0).and_then(Expr::as_str) {
                        registrations.push(Registration::Single {
                            methods: vec![HttpMethod::Get],
                            uri: uri.to_string(),
                            action: None,
                        });
                    }
                }
                "redirect" | "permanentredirect" => {
                    if let Some(uri) = positional(call.args, 0).and_then(Expr::as_str) {
                        registrations.push(Registration::Single {
                            methods: HttpMethod::all(),
                            uri: uri.to_string(),
                            action: None,
                        });
                    }
                }
                "resource" | "apiresource" => {
                    if let Some(name) = positional(call.args, 0).and_then(Expr::as_str) {
                        registrations.push(Registration::Resource(ResourceSpec {
                            name: name.to_string(),
                            controller: positional(call.args, 1),
                            api: lower == "apiresource",
                            only: None,
                            except: Vec::new(),
                            names: BTreeMap::new(),
                            parameters: BTreeMap::new(),
                        }));
                    }
                }
                "resources" | "apiresources" => {
                    let Some(items) = positional(call.args, 0).and_then(Expr::as_array) else { continue };
                    for item in items {
                        let Some(name) = string_key(item) else { continue };
                        registrations.push(Registration::Resource(ResourceSpec {
                            name: name.to_string(),
                            controller: Some(&item.value),
                            api: lower == "apiresources",
                            only: None,
                            except: Vec::new(),
                            names: BTreeMap::new(),
                            parameters: BTreeMap::new(),
                        }));
                    }
                }
                "only" | "except" | "names" | "parameters" => {
                    for registration in &mut registrations {
                        if let Registration::Resource(spec) = registration {
                            resource_option(spec, &lower, call.args);
                        }
                    }
                }
                "prefix" => {
                    if let Some(prefix) = positional(call.args, 0).and_then(Expr::as_str) {
                        pending.prefix = combine_paths(&pending.prefix, prefix);
                    }
                }
                "middleware" if registered => modifiers.middleware.extend(string_args(call.args)),
                "middleware" => pending.middleware.extend(string_args(call.args)),
                "withoutmiddleware" if registered => modifiers.excluded_middleware.extend(string_args(call.args)),
                "withoutmiddleware" => pending.excluded_middleware.extend(string_args(call.args)),
                "name" | "as" if registered => {
                    modifiers.name = positional(call.args, 0).and_then(Expr::as_str).map(str::to_string);
                }
                "name" | "as" => {
                    if let Some(name) = positional(call.args, 0).and_then(Expr::as_str) {
                        pending.name_prefix.push_str(name);
                    }
                }
                "controller" => {
                    pending.controller = positional(call.args, 0).and_then(|e| self.controller_class(e, &pending, file));
                }
                "namespace" => {
                    if let Some(namespace) = positional(call.args, 0).and_then(Expr::as_str) {
                        pending.namespace = Some(nest_namespace(pending.namespace.as_deref(), namespace));
                    }
                }
                "group" => {
                    let (attributes, body) = match (positional(call.args, 0), positional(call.args, 1)) {
                        (Some(Expr::Array(items)), Some(body)) => (Some(items.as_slice()), Some(body)),
                        (Some(body), _) => (None, Some(body)),
                        _ => (None, None),
                    };
                    if let Some(items) = attributes {
                        self.group_attributes(items, &mut pending, file);
                    }
                    match body {
                        Some(Expr::Closure { body, .. }) => self.walk(body, &pending, file, out),
                        Some(other) => debug!("Route group body not followed: {}", other),
                        None => {}
                    }
                }
                name if name.starts_with("where") => {
                    let target = if registered { &mut modifiers.wheres } else { &mut pending.wheres };
                    where_constraints(name, call.args, target);
                }
                _ => debug!("Ignoring route call {}", call.method),
            }
        }

        for registration in registrations {
            let routes = match registration {
                Registration::Single { methods, uri, action } => {
                    vec![self.route(methods, &uri, action, &pending, file)]
                }
                Registration::Resource(spec) => self.resource(&spec, &pending, file),
            };
            for mut route in routes {
                apply_modifiers(&mut route, &modifiers, &pending);
                out.push(route);
            }
        }
    }

    /// `Route::group(['prefix' => ..., 'middleware' => ...], fn)`
    fn group_attributes(&self, items: &[ArrayItem], group: &mut RouteGroup, file: &PhpFile) {
        for item in items {
            let Some(key) = string_key(item) else { continue };
            match key {
                "prefix" => {
                    if let Some(prefix) = item.value.as_str() {
                        group.prefix = combine_paths(&group.prefix, prefix);
                    }
                }
                "middleware" => group.middleware.extend(string_list(&item.value)),
                "excluded_middleware" | "withoutMiddleware" => group.excluded_middleware.extend(string_list(&item.value)),
                "as" => {
                    if let Some(name) = item.value.as_str() {
                        group.name_prefix.push_str(name);
                    }
                }
                "namespace" => {
                    if let Some(namespace) = item.value.as_str() {
                        group.namespace = Some(nest_namespace(group.namespace.as_deref(), namespace));
                    }
                }
                "controller" => group.controller = self.controller_class(&item.value, group, file),
                "where" => {
                    if let Expr::Array(wheres) = &item.value {
                        for pair in wheres {
                            if let (Some(name), Some(pattern)) = (string_key(pair), pair.value.as_str()) {
                                group.wheres.insert(name.to_string(), pattern.to_string());
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn route(
        &self,
        methods: Vec<HttpMethod>,
        uri: &str,
        action: Option<&Expr>,
        group: &RouteGroup,
        file: &PhpFile,
    ) -> RouteDescriptor {
        let mut route = RouteDescriptor::new(normalize_uri(&combine_paths(&group.prefix, uri)), with_head(methods));
        let (controller, method) = self.action(action, group, file);
        route.controller = controller;
        route.action = method;
        route.source_file = group.source_file.clone();
        route
    }

    /// Controller class and method of a route action
    fn action(&self, action: Option<&Expr>, group: &RouteGroup, file: &PhpFile) -> (Option<String>, Option<String>) {
        let Some(action) = action else {
            return (None, None);
        };
        match action {
            // [UserController::class, 'index']
            Expr::Array(items) if items.len() == 2 && items.iter().all(|i| i.key.is_none()) => {
                let controller = self.controller_class(&items[0].value, group, file);
                let method = items[1].value.as_str().map(str::to_string);
                (controller, method)
            }
            // ['as' => 'users.index', 'uses' => 'UserController@index']
            Expr::Array(items) => match items.iter().find(|i| string_key(i) == Some("uses")) {
                Some(uses) => self.action(Some(&uses.value), group, file),
                None => (None, None),
            },
            Expr::Literal(_) => {
                let Some(text) = action.as_str() else { return (None, None) };
                match text.split_once('@') {
                    Some((class, method)) => (Some(self.string_class(class, group, file)), Some(method.to_string())),
                    // a method of the group controller, or an invokable class
                    None => match &group.controller {
                        Some(controller) => (Some(controller.clone()), Some(text.to_string())),
                        None => (Some(self.string_class(text, group, file)), Some("__invoke".to_string())),
                    },
                }
            }
            Expr::ClassConst { .. } => (self.controller_class(action, group, file), Some("__invoke".to_string())),
            Expr::Closure { .. } => (None, None),
            other => {
                warn!("Unrecognised route action: {}", other);
                (None, None)
            }
        }
    }

    fn controller_class(&self, expr: &Expr, group: &RouteGroup, file: &PhpFile) -> Option<String> {
        if let Some(name) = expr.class_reference() {
            let exists = |fqn: &str| self.ctx.repository.exists(fqn);
            return Some(NameResolver::for_file(file).resolve_lenient(name, exists));
        }
        expr.as_str().map(|name| self.string_class(name, group, file))
    }

    /// Class named in a string action, qualified by the group namespace or
    /// the configured controller namespace
    fn string_class(&self, name: &str, group: &RouteGroup, file: &PhpFile) -> String {
        if let Some(absolute) = name.strip_prefix('\\') {
            return absolute.to_string();
        }
        if let Some(namespace) = &group.namespace {
            return format!("{}\\{}", namespace, name);
        }
        let repository = &self.ctx.repository;
        let resolved = NameResolver::for_file(file).resolve_lenient(name, |fqn| repository.exists(fqn));
        if repository.exists(&resolved) {
            return resolved;
        }
        let conventional = format!("{}\\{}", self.ctx.config.controller_namespace.trim_end_matches('\\'), name);
        if repository.exists(&conventional) {
            conventional
        } else {
            resolved
        }
    }

    fn resource(&self, spec: &ResourceSpec, group: &RouteGroup, file: &PhpFile) -> Vec<RouteDescriptor> {
        let controller = spec.controller.and_then(|c| self.controller_class(c, group, file));
        let segments: Vec<&str> = spec.name.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Vec::new();
        };
        let parameter = |segment: &str| {
            spec.parameters
                .get(segment)
                .cloned()
                .unwrap_or_else(|| singular(segment.rsplit('/').next().unwrap_or(segment)))
        };
        let mut base = String::new();
        for parent in parents {
            base = combine_paths(&base, &format!("{}/{{{}}}", parent, parameter(*parent)));
        }
        base = combine_paths(&base, last);
        let member = format!("{{{}}}", parameter(*last));
        let route_base = spec.name.replace('/', ".");

        RESOURCE_ACTIONS
            .iter()
            .filter(|(action, _, _, in_api)| {
                (!spec.api || *in_api)
                    && spec.only.as_ref().map_or(true, |only| only.iter().any(|o| o == action))
                    && !spec.except.iter().any(|e| e == action)
            })
            .map(|(action, methods, suffix, _)| {
                let uri = combine_paths(&base, &suffix.replace("{}", &member));
                let mut route = self.route(methods.to_vec(), &uri, None, group, file);
                route.controller = controller.clone();
                route.action = Some(action.to_string());
                let name = spec
                    .names
                    .get(*action)
                    .cloned()
                    .unwrap_or_else(|| format!("{}.{}", route_base, action));
                route.name = Some(format!("{}{}", group.name_prefix, name));
                route
            })
            .collect()
    }
}

fn resource_option(spec: &mut ResourceSpec, option: &str, args: &[Arg]) {
    match option {
        "only" => spec.only = Some(string_args(args)),
        "except" => spec.except.extend(string_args(args)),
        "names" | "parameters" => {
            let Some(Expr::Array(items)) = positional(args, 0) else { return };
            let target = if option == "names" { &mut spec.names } else { &mut spec.parameters };
            for item in items {
                if let (Some(key), Some(value)) = (string_key(item), item.value.as_str()) {
                    target.insert(key.to_string(), value.to_string());
                }
            }
        }
        _ => {}
    }
}

fn where_constraints(method: &str, args: &[Arg], target: &mut BTreeMap<String, String>) {
    let fixed = match method {
        "wherenumber" => Some("[0-9]+"),
        "wherealpha" => Some("[a-zA-Z]+"),
        "wherealphanumeric" => Some("[a-zA-Z0-9]+"),
        "whereuuid" => Some(UUID_PATTERN),
        "whereulid" => Some(ULID_PATTERN),
        _ => None,
    };
    if let Some(pattern) = fixed {
        for name in string_args(args) {
            target.insert(name, pattern.to_string());
        }
        return;
    }
    match (method, positional(args, 0), positional(args, 1)) {
        ("where", Some(Expr::Array(items)), _) => {
            for item in items {
                if let (Some(name), Some(pattern)) = (string_key(item), item.value.as_str()) {
                    target.insert(name.to_string(), pattern.to_string());
                }
            }
        }
        ("where", Some(name), Some(pattern)) => {
            if let (Some(name), Some(pattern)) = (name.as_str(), pattern.as_str()) {
                target.insert(name.to_string(), pattern.to_string());
            }
        }
        ("wherein", Some(name), Some(values)) => {
            if let Some(name) = name.as_str() {
                let alternatives: Vec<String> = string_list(values).iter().map(|v| regex::escape(v)).collect();
                target.insert(name.to_string(), alternatives.join("|"));
            }
        }
        _ => debug!("Ignoring route constraint {}", method),
    }
}

fn apply_modifiers(route: &mut RouteDescriptor, modifiers: &Modifiers, group: &RouteGroup) {
    if let Some(name) = &modifiers.name {
        route.name = Some(format!("{}{}", group.name_prefix, name));
    }
    let excluded: Vec<&String> = group
        .excluded_middleware
        .iter()
        .chain(&modifiers.excluded_middleware)
        .collect();
    route.middleware = group
        .middleware
        .iter()
        .chain(&modifiers.middleware)
        .filter(|m| !excluded.contains(m))
        .cloned()
        .collect();
    for parameter in &mut route.parameters {
        let pattern = modifiers
            .wheres
            .get(&parameter.name)
            .or_else(|| group.wheres.get(&parameter.name));
        if let Some(pattern) = pattern {
            parameter.pattern = Some(pattern.clone());
        }
    }
}

fn nest_namespace(parent: Option<&str>, namespace: &str) -> String {
    match (parent, namespace.strip_prefix('\\')) {
        (_, Some(absolute)) => absolute.to_string(),
        (Some(parent), None) => format!("{}\\{}", parent, namespace.trim_matches('\\')),
        (None, None) => namespace.trim_matches('\\').to_string(),
    }
}

fn normalize_uri(uri: &str) -> String {
    let uri = uri.trim_matches('/');
    if uri.is_empty() {
        "/".to_string()
    } else {
        uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn extract(source: &str) -> Vec<RouteDescriptor> {
        let ctx = AnalysisContext::in_memory(&[(
            "app/Http/Controllers/UserController.php",
            "<?php\nnamespace App\\Http\\Controllers;\nclass UserController {}\n",
        )]);
        let file = parse_source(Path::new("routes/api.php"), source).unwrap();
        let group = RouteGroup {
            prefix: "api".to_string(),
            middleware: vec!["api".to_string()],
            ..RouteGroup::default()
        };
        LaravelRouteExtractor::new(&ctx).extract_routes(&file, &group)
    }

    fn summary(routes: &[RouteDescriptor]) -> Vec<String> {
        routes
            .iter()
            .map(|r| {
                let methods: Vec<&str> = r.methods.iter().map(HttpMethod::as_str).collect();
                format!("{} {} {}", methods.join("|"), r.uri, r.action.as_deref().unwrap_or("-"))
            })
            .collect()
    }

    #[test]
    fn test_action_forms() {
        let routes = extract(
            r#"<?php
use App\Http\Controllers\UserController;

Route::get('/users', [UserController::class, 'index'])->name('users.index');
Route::post('/users', 'UserController@store');
Route::match(['put', 'patch'], '/users/{user}', [UserController::class, 'update']);
Route::get('/ping', fn () => 'pong');
Route::post('/avatar', UserController::class);
"#,
        );
        assert_eq!(
            summary(&routes),
            vec![
                "GET|HEAD api/users index",
                "POST api/users store",
                "PUT|PATCH api/users/{user} update",
                "GET|HEAD api/ping -",
                "POST api/avatar __invoke",
            ]
        );
        assert_eq!(routes[0].name.as_deref(), Some("users.index"));
        assert_eq!(routes[1].controller.as_deref(), Some("App\\Http\\Controllers\\UserController"));
        assert!(routes[3].controller.is_none());
    }

    #[test]
    fn test_groups_nest_attributes() {
        let routes = extract(
            r#"<?php
use App\Http\Controllers\UserController;

Route::prefix('v1')->middleware('auth:sanctum')->name('v1.')->group(function () {
    Route::controller(UserController::class)->group(function () {
        Route::get('/me', 'me')->name('me');
        Route::delete('/me', 'destroy')->withoutMiddleware('auth:sanctum');
    });
    Route::group(['prefix' => 'admin', 'middleware' => ['can:admin']], function () {
        Route::get('/stats/{period?}', [UserController::class, 'stats'])->whereIn('period', ['day', 'week']);
    });
});
"#,
        );
        assert_eq!(
            summary(&routes),
            vec![
                "GET|HEAD api/v1/me me",
                "DELETE api/v1/me destroy",
                "GET|HEAD api/v1/admin/stats/{period?} stats",
            ]
        );
        assert_eq!(routes[0].name.as_deref(), Some("v1.me"));
        assert_eq!(routes[0].middleware, vec!["api", "auth:sanctum"]);
        assert_eq!(routes[1].middleware, vec!["api"]);
        assert_eq!(routes[2].middleware, vec!["api", "auth:sanctum", "can:admin"]);
        assert!(!routes[2].parameters[0].required);
        assert_eq!(routes[2].parameters[0].pattern.as_deref(), Some("day|week"));
    }

    #[test]
    fn test_resources() {
        let routes = extract(
            r#"<?php
use App\Http\Controllers\UserController;

Route::apiResource('users', UserController::class)->except(['destroy']);
Route::resource('categories.posts', UserController::class)->only('index', 'edit');
"#,
        );
        assert_eq!(
            summary(&routes),
            vec![
                "GET|HEAD api/users index",
                "POST api/users store",
                "GET|HEAD api/users/{user} show",
                "PUT|PATCH api/users/{user} update",
                "GET|HEAD api/categories/{category}/posts index",
                "GET|HEAD api/categories/{category}/posts/{post}/edit edit",
            ]
        );
        assert_eq!(routes[2].name.as_deref(), Some("users.show"));
        assert_eq!(routes[5].name.as_deref(), Some("categories.posts.edit"));
    }

    #[test]
    fn test_where_constraints() {
        let routes = extract(
            r#"<?php
Route::get('/orders/{order}/{code}', [OrderController::class, 'show'])
    ->whereNumber('order')
    ->where('code', '[A-Z]{3}');
"#,
        );
        assert_eq!(routes[0].parameters[0].pattern.as_deref(), Some("[0-9]+"));
        assert_eq!(routes[0].parameters[1].pattern.as_deref(), Some("[A-Z]{3}"));
    }

    #[test]
    fn test_singular() {
        assert_eq!(singular("users"), "user");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("blog-posts"), "blog_post");
        assert_eq!(singular("news"), "new");
        assert_eq!(singular("class"), "class");
    }
}
