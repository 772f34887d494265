use openapi_from_laravel::{
    config::AnalyzerConfig,
    error::ErrorKind,
    model::{HttpMethod, ParameterInfo, ParameterLocation, ResponseInfo},
    report::{analyze_project, AnalysisReport, RouteReport},
    serializer::{serialize_json, serialize_yaml},
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

/// Helper function to create a temporary Laravel project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn shop_project() -> TempDir {
    create_test_project(vec![
        ("composer.json", include_str!("fixtures/laravel/composer.json")),
        ("routes/api.php", include_str!("fixtures/laravel/api.php")),
        (
            "app/Http/Controllers/OrderController.php",
            include_str!("fixtures/laravel/OrderController.php"),
        ),
        (
            "app/Http/Controllers/UserController.php",
            include_str!("fixtures/laravel/UserController.php"),
        ),
        (
            "app/Http/Requests/StoreOrderRequest.php",
            include_str!("fixtures/laravel/StoreOrderRequest.php"),
        ),
        (
            "app/Http/Resources/OrderResource.php",
            include_str!("fixtures/laravel/OrderResource.php"),
        ),
        ("app/Enums/Status.php", include_str!("fixtures/laravel/Status.php")),
        ("app/Models/Order.php", include_str!("fixtures/laravel/Order.php")),
        ("app/Models/User.php", include_str!("fixtures/laravel/User.php")),
        // never scanned
        ("vendor/acme/broken/src/Broken.php", "<?php class Broken {"),
    ])
}

fn uncached() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.cache.enabled = false;
    config
}

fn analyze_shop() -> (TempDir, AnalysisReport) {
    let project = shop_project();
    let report = analyze_project(project.path(), uncached()).expect("analysis should succeed");
    (project, report)
}

fn route<'r>(report: &'r AnalysisReport, method: HttpMethod, uri: &str) -> &'r RouteReport {
    report
        .routes
        .iter()
        .find(|r| r.route.uri == uri && r.route.methods.contains(&method))
        .unwrap_or_else(|| panic!("no route {} {}", method, uri))
}

fn param<'p>(params: &'p [ParameterInfo], name: &str) -> &'p ParameterInfo {
    params
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("no parameter {}", name))
}

#[test]
fn test_routes_are_discovered() {
    let (_project, report) = analyze_shop();

    let uris: Vec<String> = report
        .routes
        .iter()
        .map(|r| {
            let methods: Vec<&str> = r.route.methods.iter().map(HttpMethod::as_str).collect();
            format!("{} {}", methods.join("|"), r.route.uri)
        })
        .collect();
    assert_eq!(
        uris,
        vec![
            "GET|HEAD api/health",
            "GET|HEAD api/orders",
            "POST api/orders",
            "GET|HEAD api/orders/{order}",
            "POST api/orders/{order}/receipt",
            "GET|HEAD api/orders/{order}/audit",
            "GET|HEAD api/users",
            "GET|HEAD api/users/{user}",
        ]
    );

    let show = route(&report, HttpMethod::Get, "api/orders/{order}");
    assert_eq!(show.route.parameters[0].pattern.as_deref(), Some("[0-9]+"));
    assert_eq!(show.route.middleware, vec!["api", "auth:sanctum"]);
    assert!(show.authentication.required);
    assert_eq!(route(&report, HttpMethod::Get, "api/users").route.name.as_deref(), Some("users.index"));
    assert!(route(&report, HttpMethod::Get, "api/health").action.is_none());
    assert!(report.security_schemes.get("sanctum").is_some());
}

#[test]
fn test_inline_validation_merges_with_query_usage() {
    let (_project, report) = analyze_shop();
    let index = route(&report, HttpMethod::Get, "api/orders").action.as_ref().unwrap();

    let status: Vec<&ParameterInfo> = index.query_parameters.iter().filter(|p| p.name == "status").collect();
    assert_eq!(status.len(), 1);
    assert!(status[0].required);
    assert_eq!(
        status[0].enum_values,
        Some(vec![Value::from("active"), Value::from("inactive")])
    );

    let per_page = param(&index.query_parameters, "per_page");
    assert_eq!(per_page.default, Some(Value::from(15)));
    assert!(!per_page.required);

    assert_eq!(index.summary.as_deref(), Some("List orders, optionally filtered by status."));
    assert!(index.pagination.is_some());
    assert!(index.body_parameters.is_empty());
}

#[test]
fn test_conditional_form_request_rules() {
    let (_project, report) = analyze_shop();
    let store = route(&report, HttpMethod::Post, "api/orders").action.as_ref().unwrap();
    assert_eq!(store.form_request.as_deref(), Some("App\\Http\\Requests\\StoreOrderRequest"));

    let password = param(&store.body_parameters, "password");
    assert!(password.required);
    assert_eq!(password.constraints.min_length, Some(6));
    assert_eq!(password.location, ParameterLocation::Body);

    // `St` is an alias imported in the request class
    let status = param(&store.body_parameters, "status");
    assert_eq!(status.enum_class.as_deref(), Some("App\\Enums\\Status"));
    assert_eq!(status.enum_values, Some(vec![Value::from("active"), Value::from("inactive")]));

    let email = param(&store.body_parameters, "customer_email");
    assert!(email.description.starts_with("Customer email address"));
}

#[test]
fn test_file_upload_and_conditional_requirement() {
    let (_project, report) = analyze_shop();
    let receipt = route(&report, HttpMethod::Post, "api/orders/{order}/receipt")
        .action
        .as_ref()
        .unwrap();

    let file = param(&receipt.body_parameters, "receipt");
    let upload = file.file.as_ref().unwrap();
    assert_eq!(upload.max_size, Some(5120 * 1024));
    assert_eq!(file.format.as_deref(), Some("binary"));

    assert!(!param(&receipt.body_parameters, "note").required);

    let version = param(&receipt.header_parameters, "X-Api-Version");
    assert_eq!(version.default, Some(Value::from("v1")));

    assert!(matches!(receipt.response, Some(ResponseInfo::Object { status: 201, .. })));
}

#[test]
fn test_resource_conditional_field() {
    let (_project, report) = analyze_shop();
    let show = route(&report, HttpMethod::Get, "api/orders/{order}").action.as_ref().unwrap();

    let resource = show.resource.as_ref().unwrap();
    assert_eq!(resource.class, "App\\Http\\Resources\\OrderResource");
    let phone = &resource.properties["phone"];
    assert!(phone.conditional);
    assert!(phone.condition.as_deref().is_some_and(|c| !c.is_empty()));
    assert!(!resource.properties["id"].conditional);
}

#[test]
fn test_failures_do_not_abort_the_run() {
    let (_project, report) = analyze_shop();

    let audit = route(&report, HttpMethod::Get, "api/orders/{order}/audit");
    assert!(audit.action.as_ref().is_some_and(|a| a.is_empty()));
    let missing: Vec<_> = report
        .warnings
        .iter()
        .filter(|w| w.kind == ErrorKind::MethodNodeError)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].context.get("method").map(String::as_str), Some("audit"));

    // later routes were still analyzed
    assert!(route(&report, HttpMethod::Get, "api/users").action.is_some());
}

#[test]
fn test_fail_fast_stops_the_run() {
    let project = shop_project();
    let mut config = uncached();
    config.fail_fast = true;
    assert!(analyze_project(project.path(), config).is_err());
}

#[test]
fn test_analysis_is_idempotent() {
    let project = shop_project();
    let first = serialize_json(&analyze_project(project.path(), uncached()).unwrap()).unwrap();
    let second = serialize_json(&analyze_project(project.path(), uncached()).unwrap()).unwrap();
    assert_eq!(first, second);

    let cached = serialize_json(&analyze_project(project.path(), AnalyzerConfig::default()).unwrap()).unwrap();
    assert_eq!(first, cached);
}

#[test]
fn test_report_serializes_to_yaml_and_json() {
    let (_project, report) = analyze_shop();

    let yaml = serialize_yaml(&report).unwrap();
    assert!(yaml.contains("uri: api/orders"));
    assert!(yaml.contains("security_schemes:"));

    let json: Value = serde_json::from_str(&serialize_json(&report).unwrap()).unwrap();
    assert_eq!(json["routes"][1]["action"], "index");
    assert_eq!(json["routes"][1]["analysis"]["method"], "index");

    // duplicate mapping keys are rejected by the YAML reader
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed["routes"][1]["action"].as_str(), Some("index"));
}

#[test]
fn test_project_config_file_is_respected() {
    let project = create_test_project(vec![
        (
            "openapi-laravel.yaml",
            "route_files:\n  - path: routes/partner.php\n    prefix: partner/v2\n    middleware: [partner]\n    enabled: true\nauth:\n  schemes:\n    partner:\n      name: partnerKey\n      type: apiKey\n      parameter: X-Partner-Key\n      location: header\n",
        ),
        ("routes/partner.php", "<?php\nRoute::get('/stock', fn () => []);\n"),
    ]);
    let config = AnalyzerConfig::discover(project.path()).unwrap();
    let report = analyze_project(project.path(), config).unwrap();

    assert_eq!(report.routes.len(), 1);
    assert_eq!(report.routes[0].route.uri, "partner/v2/stock");
    assert_eq!(report.routes[0].authentication.requirements[0].scheme, "partnerKey");
    assert_eq!(
        report.security_schemes.get("partnerKey").and_then(|s| s.name.as_deref()),
        Some("X-Partner-Key")
    );
}
