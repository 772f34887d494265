//! Request headers read by a controller action.

use super::literal::literal_value;
use super::query_params::is_request_receiver;
use crate::ast::{Arg, Expr, MethodDecl, Param};
use crate::inference::example_for;
use crate::model::{InferredType, ParameterInfo, ParameterLocation, SchemaType};
use crate::visit::CallCollector;
use crate::workspace::LoadedClass;
use log::debug;

fn positional(args: &[Arg], position: usize) -> Option<&Expr> {
    args.iter().filter(|a| a.name.is_none()).nth(position).map(|a| &a.value)
}

/// Functions that abort the request when their first argument is false
const GUARDS: &[&str] = &["abort_unless", "throw_unless"];

#[derive(Default)]
pub struct HeaderParameterAnalyzer;

impl HeaderParameterAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, controller: &LoadedClass, method: &MethodDecl) -> Vec<ParameterInfo> {
        let calls = CallCollector::collect(method.statements());
        let mut headers: Vec<ParameterInfo> = Vec::new();
        let mut required: Vec<String> = Vec::new();

        for call in &calls.calls {
            if let Expr::FuncCall { name, args } = call {
                if GUARDS.iter().any(|g| name.eq_ignore_ascii_case(g)) {
                    if let Some(header) = positional(args, 0).and_then(|c| guarded_header(c, &method.params)) {
                        required.push(header.to_ascii_lowercase());
                    }
                }
                continue;
            }
            let Some(param) = header_read(call, &method.params) else { continue };
            match headers.iter_mut().find(|h| h.name.eq_ignore_ascii_case(&param.name)) {
                Some(existing) => {
                    if existing.default.is_none() {
                        existing.default = param.default;
                    }
                }
                None => headers.push(param),
            }
        }

        for header in &mut headers {
            if required.contains(&header.name.to_ascii_lowercase()) {
                header.required = true;
            }
        }
        debug!("{}::{} reads {} headers", controller.fqn, method.name, headers.len());
        headers
    }
}

/// `$request->hasHeader('X')` inside a guard condition
fn guarded_header<'e>(condition: &'e Expr, params: &[Param]) -> Option<&'e str> {
    match condition {
        Expr::MethodCall { object, method, args, .. }
            if method.eq_ignore_ascii_case("hasHeader") && is_request_receiver(object, params) =>
        {
            positional(args, 0)?.as_str()
        }
        Expr::MethodCall { object, method, .. }
            if method.eq_ignore_ascii_case("bearerToken") && is_request_receiver(object, params) =>
        {
            Some("Authorization")
        }
        _ => None,
    }
}

fn is_request_facade(class: &Expr) -> bool {
    matches!(class, Expr::Name(n) if n.trim_start_matches('\\') == "Request" || n.ends_with("\\Request"))
}

fn header_read(call: &Expr, params: &[Param]) -> Option<ParameterInfo> {
    let (method, args, source) = match call {
        Expr::MethodCall { object, method, args, .. } if is_request_receiver(object, params) => {
            (method.as_str(), args.as_slice(), format!("$request->{}()", method))
        }
        // Request::header('X') through the facade
        Expr::StaticCall { class, method, args } if is_request_facade(class) => {
            (method.as_str(), args.as_slice(), format!("Request::{}()", method))
        }
        _ => return None,
    };
    let lower = method.to_ascii_lowercase();
    let (name, default) = match lower.as_str() {
        "header" | "hasheader" => {
            let name = positional(args, 0)?.as_str()?.to_string();
            let default = if lower == "header" {
                positional(args, 1).and_then(literal_value)
            } else {
                None
            };
            (name, default)
        }
        "bearertoken" => ("Authorization".to_string(), None),
        _ => return None,
    };
    let mut param = ParameterInfo::new(&name, ParameterLocation::Header, source);
    param.schema_type = SchemaType::String;
    param.description = if lower == "bearertoken" {
        "Bearer token".to_string()
    } else {
        format!("{} header", name)
    };
    param.example = Some(match &default {
        Some(value) if !value.is_null() => value.clone(),
        _ if lower == "bearertoken" => serde_json::Value::from("Bearer <token>"),
        _ => example_for(&name, &InferredType::new(SchemaType::String)),
    });
    param.default = default;
    Some(param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalysisContext;

    const CONTROLLER: &str = r#"<?php
namespace App\Http\Controllers;

use Illuminate\Http\Request;

class WebhookController extends Controller
{
    public function handle(Request $request)
    {
        abort_unless($request->hasHeader('X-Signature'), 401);
        $signature = $request->header('X-Signature');
        $version = $request->header('X-Api-Version', 'v1');
        $token = $request->bearerToken();
        $locale = \Request::header('Accept-Language');
        return response()->noContent();
    }
}
"#;

    #[test]
    fn test_headers_and_guards() {
        let ctx = AnalysisContext::in_memory(&[("app/Http/Controllers/WebhookController.php", CONTROLLER)]);
        let controller = ctx.load_class("App\\Http\\Controllers\\WebhookController").unwrap();
        let method = controller.class().method("handle").unwrap().clone();
        let headers = HeaderParameterAnalyzer::new().analyze(&controller, &method);

        let names: Vec<&str> = headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["X-Signature", "X-Api-Version", "Authorization", "Accept-Language"]);
        assert!(headers[0].required);
        assert!(!headers[1].required);
        assert_eq!(headers[1].default, Some(serde_json::Value::from("v1")));
        assert_eq!(headers[2].source, "$request->bearerToken()");
        assert!(headers.iter().all(|h| h.location == ParameterLocation::Header));
    }
}
