//! Query parameters read by a controller action.
//!
//! Usage detection gives the names and a heuristic type. Where the action's
//! validation rules cover the same field, the rules win and the usage only
//! contributes its default.

use super::enums::EnumAnalyzer;
use super::literal::literal_value;
use super::parameters::{humanize, ParameterBuilder};
use crate::ast::{short_name, Arg, Expr, MethodDecl, Param};
use crate::context::AnalysisContext;
use crate::inference::{example_for, type_from_name};
use crate::model::{InferredType, ParameterInfo, ParameterLocation, SchemaType, ValidationRuleSet};
use crate::visit::CallCollector;
use crate::workspace::LoadedClass;
use log::debug;
use serde_json::Value;

/// Request accessors and the type each one implies
const QUERY_ACCESSORS: &[(&str, Option<SchemaType>, Option<&str>)] = &[
    ("query", None, None),
    ("get", None, None),
    ("has", None, None),
    ("filled", None, None),
    ("boolean", Some(SchemaType::Boolean), None),
    ("integer", Some(SchemaType::Integer), None),
    ("float", Some(SchemaType::Number), None),
    ("date", Some(SchemaType::String), Some("date-time")),
    ("enum", Some(SchemaType::String), None),
];

/// `$request`, any parameter typed as a request, `request()` or `$this->request`
pub(crate) fn is_request_receiver(expr: &Expr, params: &[Param]) -> bool {
    match expr {
        Expr::Variable(name) if name == "request" => true,
        Expr::Variable(name) => params.iter().any(|p| {
            p.name == *name
                && p.type_hint
                    .as_ref()
                    .and_then(|h| h.single_name())
                    .is_some_and(|t| short_name(t).ends_with("Request"))
        }),
        Expr::FuncCall { name, args } => name.eq_ignore_ascii_case("request") && args.is_empty(),
        Expr::PropertyFetch { object, name, .. } => object.is_this() && name == "request",
        _ => false,
    }
}

fn positional(args: &[Arg], position: usize) -> Option<&Expr> {
    args.iter().filter(|a| a.name.is_none()).nth(position).map(|a| &a.value)
}

/// One detected read of a query value
#[derive(Debug, Clone, PartialEq)]
struct Usage {
    name: String,
    accessor: String,
    inferred: Option<InferredType>,
    default: Option<Value>,
    enum_class: Option<String>,
}

pub struct QueryParameterAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> QueryParameterAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// One parameter per query name, in first-use order
    pub fn analyze(
        &self,
        controller: &LoadedClass,
        method: &MethodDecl,
        validation: Option<&ValidationRuleSet>,
        builder: &ParameterBuilder,
    ) -> Vec<ParameterInfo> {
        let usages = self.usages(controller, method);
        usages
            .into_iter()
            .map(|usage| match validation.and_then(|rules| {
                rules
                    .effective_rules()
                    .get(&usage.name)
                    .map(|tokens| (rules, tokens.as_slice()))
            }) {
                Some((rules, tokens)) => {
                    let mut param = builder.parameter(&usage.name, tokens, rules, ParameterLocation::Query);
                    if param.default.is_none() {
                        param.default = usage.default.clone();
                    }
                    param
                        .context
                        .insert("accessor".to_string(), Value::from(usage.accessor.clone()));
                    param
                }
                None => self.heuristic_parameter(usage),
            })
            .collect()
    }

    fn heuristic_parameter(&self, usage: Usage) -> ParameterInfo {
        let inferred = usage
            .inferred
            .clone()
            .or_else(|| usage.default.as_ref().and_then(type_of_value))
            .unwrap_or_else(|| type_from_name(&usage.name));
        let mut param = ParameterInfo::new(
            &usage.name,
            ParameterLocation::Query,
            format!("$request->{}()", usage.accessor),
        );
        if let Some(class) = &usage.enum_class {
            if let Some(info) = EnumAnalyzer::new(self.ctx).enum_info(class) {
                param.schema_type = info.value_type;
                param.example = info.values.first().cloned();
                param.enum_values = Some(info.values);
                param.enum_class = Some(info.class);
            }
        }
        if param.enum_class.is_none() {
            param.schema_type = inferred.schema_type;
            param.format = inferred.format.clone();
            param.example = Some(match &usage.default {
                Some(default) if !default.is_null() => default.clone(),
                _ => example_for(&usage.name, &inferred),
            });
        }
        param.default = usage.default;
        param.description = humanize(&usage.name);
        param
    }

    fn usages(&self, controller: &LoadedClass, method: &MethodDecl) -> Vec<Usage> {
        let calls = CallCollector::collect(method.statements());
        let mut usages: Vec<Usage> = Vec::new();
        for call in &calls.calls {
            let Some(usage) = self.usage(call, controller, &method.params) else { continue };
            match usages.iter_mut().find(|u| u.name == usage.name) {
                // a typed accessor is better evidence than `query()`
                Some(existing) => {
                    if existing.inferred.is_none() {
                        existing.inferred = usage.inferred;
                        existing.enum_class = existing.enum_class.take().or(usage.enum_class);
                    }
                    if existing.default.is_none() {
                        existing.default = usage.default;
                    }
                }
                None => usages.push(usage),
            }
        }
        debug!("{}::{} reads {} query values", controller.fqn, method.name, usages.len());
        usages
    }

    fn usage(&self, call: &Expr, controller: &LoadedClass, params: &[Param]) -> Option<Usage> {
        let (accessor, args) = match call {
            Expr::MethodCall { object, method, args, .. } if is_request_receiver(object, params) => {
                (method.as_str(), args.as_slice())
            }
            // request('page', 1)
            Expr::FuncCall { name, args } if name.eq_ignore_ascii_case("request") && !args.is_empty() => {
                ("query", args.as_slice())
            }
            _ => return None,
        };
        let lower = accessor.to_ascii_lowercase();
        let (_, schema_type, format) = QUERY_ACCESSORS.iter().find(|(name, _, _)| *name == lower)?;
        let name = positional(args, 0)?.as_str()?.to_string();
        let (default, enum_class) = if lower == "enum" {
            let class = positional(args, 1)
                .and_then(Expr::class_reference)
                .map(|c| self.ctx.resolve_in(c, controller));
            (None, class)
        } else if matches!(lower.as_str(), "has" | "filled") {
            (None, None)
        } else {
            (positional(args, 1).and_then(literal_value), None)
        };
        let inferred = schema_type.map(|t| InferredType {
            schema_type: t,
            format: format.map(str::to_string),
            ..InferredType::default()
        });
        Some(Usage {
            name,
            accessor: accessor.to_string(),
            inferred,
            default,
            enum_class,
        })
    }
}

/// Type implied by a literal default value
fn type_of_value(value: &Value) -> Option<InferredType> {
    let schema_type = match value {
        Value::Bool(_) => SchemaType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => SchemaType::Integer,
        Value::Number(_) => SchemaType::Number,
        Value::String(_) => SchemaType::String,
        Value::Array(_) => SchemaType::Array,
        Value::Object(_) => SchemaType::Object,
        Value::Null => return None,
    };
    Some(InferredType::new(schema_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::inline_validation::InlineValidationAnalyzer;

    const CONTROLLER: &str = r#"<?php
namespace App\Http\Controllers;

use App\Enums\Sort;
use Illuminate\Http\Request;

class PostController extends Controller
{
    public function index(Request $request)
    {
        $request->validate(['status' => 'required|in:active,inactive']);
        $status = $request->query('status');
        $page = $request->query('page', 1);
        $mine = $request->boolean('mine');
        $sort = $request->enum('sort', Sort::class);
        if ($request->has('status')) {
            $search = request('q');
        }
        return Post::query()->paginate();
    }
}
"#;

    const SORT: &str = "<?php\nnamespace App\\Enums;\nenum Sort: string { case Newest = 'newest'; case Oldest = 'oldest'; }\n";

    #[test]
    fn test_validation_overrides_usage() {
        let ctx = AnalysisContext::in_memory(&[
            ("app/Http/Controllers/PostController.php", CONTROLLER),
            ("app/Enums/Sort.php", SORT),
        ]);
        let controller = ctx.load_class("App\\Http\\Controllers\\PostController").unwrap();
        let method = controller.class().method("index").unwrap().clone();
        let rules = InlineValidationAnalyzer::new(&ctx).analyze(&controller, &method);
        let builder = ParameterBuilder::new(&ctx, Some(controller.clone()));
        let params = QueryParameterAnalyzer::new(&ctx).analyze(&controller, &method, Some(&rules), &builder);

        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["status", "page", "mine", "sort", "q"]);

        let status = &params[0];
        assert!(status.required);
        assert_eq!(status.enum_values, Some(vec![Value::from("active"), Value::from("inactive")]));
        assert_eq!(params.iter().filter(|p| p.name == "status").count(), 1);

        assert_eq!(params[1].schema_type, SchemaType::Integer);
        assert_eq!(params[1].default, Some(Value::from(1)));
        assert!(!params[1].required);
        assert_eq!(params[2].schema_type, SchemaType::Boolean);
        assert_eq!(params[3].enum_class.as_deref(), Some("App\\Enums\\Sort"));
        assert_eq!(params[3].example, Some(Value::from("newest")));
        assert_eq!(params[4].source, "$request->query()");
    }
}
