//! User-defined validation rule classes.
//!
//! Strategies, in strict order: a self-describing schema method, a
//! declarative schema attribute on the class, then a scan of the rule's
//! properties (constructor arguments and defaults) against
//! [`PROPERTY_CONSTRAINTS`].

use super::literal::literal_value;
use crate::ast::{doc_summary, find_arg, short_name, Expr, NewTarget};
use crate::context::AnalysisContext;
use crate::inference::strip_delimiters;
use crate::model::{CustomRuleInfo, RuleToken, SchemaType};
use crate::parser::parse_expression;
use crate::visit::{returned_array, ReturnCollector};
use crate::workspace::LoadedClass;
use log::debug;
use serde_json::{Map, Value};

/// Methods a rule may implement to describe its own schema
const SCHEMA_METHODS: &[&str] = &["openApiSchema", "toOpenApiSchema", "getOpenApiSchema"];

/// Class attributes carrying a declarative schema
const SCHEMA_ATTRIBUTES: &[&str] = &["OpenApiRule", "OpenApiSchema", "RuleSchema"];

/// Framework rules handled by their own analyzers
const BUILTIN_RULES: &[&str] = &[
    "Enum",
    "Password",
    "In",
    "NotIn",
    "Unique",
    "Exists",
    "Dimensions",
    "File",
    "ImageFile",
    "RequiredIf",
    "ExcludeIf",
    "ProhibitedIf",
    "Can",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    Min,
    Max,
    MinLength,
    MaxLength,
    Pattern,
    Format,
}

const PROPERTY_CONSTRAINTS: &[(&str, Constraint)] = &[
    ("min", Constraint::Min),
    ("minimum", Constraint::Min),
    ("max", Constraint::Max),
    ("maximum", Constraint::Max),
    ("minLength", Constraint::MinLength),
    ("min_length", Constraint::MinLength),
    ("maxLength", Constraint::MaxLength),
    ("max_length", Constraint::MaxLength),
    ("pattern", Constraint::Pattern),
    ("regex", Constraint::Pattern),
    ("format", Constraint::Format),
];

pub struct CustomRuleAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> CustomRuleAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Analyze one rule token naming a custom rule instance
    pub fn analyze(&self, token: &RuleToken, scope: Option<&LoadedClass>) -> Option<CustomRuleInfo> {
        let (class_name, values) = match token {
            RuleToken::Object(object) => {
                if object.class.starts_with("Illuminate\\") {
                    return None;
                }
                (object.class.clone(), Some(object.properties.clone()))
            }
            RuleToken::Expression(text) => {
                let Some(Expr::New {
                    target: NewTarget::Named(name),
                    ..
                }) = parse_expression(text)
                else {
                    return None;
                };
                (name, None)
            }
            RuleToken::Text(_) => return None,
        };
        if BUILTIN_RULES.contains(&short_name(&class_name)) {
            return None;
        }

        let fqn = match scope {
            Some(scope) => self.ctx.resolve_in(&class_name, scope),
            None => class_name.trim_start_matches('\\').to_string(),
        };
        let loaded = match self.ctx.load_class(&fqn) {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!("Custom rule {} has no source: {}", fqn, e);
                return values.and_then(|values| {
                    let values: Map<String, Value> = values.into_iter().collect();
                    from_properties(&fqn, &values)
                });
            }
        };

        let values = match values {
            Some(values) => values.into_iter().collect(),
            None => self.instance_values(&loaded, token),
        };

        let result = self
            .self_described(&loaded)
            .or_else(|| self.from_attribute(&loaded))
            .or_else(|| from_properties(&loaded.fqn, &values));
        result.map(|mut info| {
            if info.description.is_none() {
                info.description = summary(&loaded);
            }
            info
        })
    }

    /// First custom rule among a field's tokens
    pub fn analyze_tokens(&self, tokens: &[RuleToken], scope: Option<&LoadedClass>) -> Option<CustomRuleInfo> {
        tokens.iter().find_map(|token| self.analyze(token, scope))
    }

    fn self_described(&self, loaded: &LoadedClass) -> Option<CustomRuleInfo> {
        let method = SCHEMA_METHODS
            .iter()
            .find_map(|name| self.ctx.repository.find_method(&loaded.fqn, name))?;
        let stmts = method.method().statements();
        let returns = ReturnCollector::collect(stmts);
        let items = returns
            .returns
            .iter()
            .find_map(|value| returned_array(value, stmts))?;
        let Some(Value::Object(schema)) = literal_value(&Expr::Array(items.to_vec())) else {
            return None;
        };
        from_schema_map(&loaded.fqn, "self_describing", &schema)
    }

    fn from_attribute(&self, loaded: &LoadedClass) -> Option<CustomRuleInfo> {
        let attribute = SCHEMA_ATTRIBUTES
            .iter()
            .find_map(|name| loaded.class().attribute(name))?;
        let schema: Map<String, Value> = attribute
            .args
            .iter()
            .filter_map(|arg| Some((arg.name.clone()?, literal_value(&arg.value)?)))
            .collect();
        from_schema_map(&loaded.fqn, "attribute", &schema)
    }

    /// Property values of `new Rule(...)`: bound constructor arguments first,
    /// then declared defaults
    fn instance_values(&self, loaded: &LoadedClass, token: &RuleToken) -> Map<String, Value> {
        let mut values = Map::new();
        let args = match token {
            RuleToken::Expression(text) => match parse_expression(text) {
                Some(Expr::New { args, .. }) => args,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        for (position, param) in self
            .ctx
            .repository
            .constructor_params(&loaded.fqn)
            .iter()
            .enumerate()
        {
            let value = find_arg(&args, &param.name, position)
                .or(param.default.as_ref())
                .and_then(literal_value);
            if let Some(value) = value {
                values.insert(param.name.clone(), value);
            }
        }
        for property in &loaded.class().properties {
            if values.contains_key(&property.name) {
                continue;
            }
            if let Some(value) = property.default.as_ref().and_then(literal_value) {
                values.insert(property.name.clone(), value);
            }
        }
        values
    }
}

fn parse_schema_type(name: &str) -> Option<SchemaType> {
    match name.to_ascii_lowercase().as_str() {
        "string" => Some(SchemaType::String),
        "integer" | "int" => Some(SchemaType::Integer),
        "number" | "float" | "numeric" => Some(SchemaType::Number),
        "boolean" | "bool" => Some(SchemaType::Boolean),
        "array" => Some(SchemaType::Array),
        "object" => Some(SchemaType::Object),
        _ => None,
    }
}

fn from_schema_map(class: &str, strategy: &str, schema: &Map<String, Value>) -> Option<CustomRuleInfo> {
    let mut info = CustomRuleInfo {
        class: class.to_string(),
        strategy: strategy.to_string(),
        schema_type: schema.get("type").and_then(Value::as_str).and_then(parse_schema_type),
        format: schema.get("format").and_then(Value::as_str).map(str::to_string),
        constraints: Default::default(),
        description: schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    let number = |keys: &[&str]| keys.iter().find_map(|k| schema.get(*k).and_then(Value::as_f64));
    let count = |keys: &[&str]| keys.iter().find_map(|k| schema.get(*k).and_then(Value::as_u64));
    info.constraints.minimum = number(&["minimum", "min"]);
    info.constraints.maximum = number(&["maximum", "max"]);
    info.constraints.min_length = count(&["minLength", "min_length"]);
    info.constraints.max_length = count(&["maxLength", "max_length"]);
    info.constraints.pattern = ["pattern", "regex"]
        .iter()
        .find_map(|k| schema.get(*k).and_then(Value::as_str))
        .map(strip_delimiters);
    if info.schema_type.is_none()
        && (info.constraints.minimum.is_some() || info.constraints.maximum.is_some())
    {
        info.schema_type = Some(SchemaType::Number);
    }
    (!info.is_empty()).then_some(info)
}

fn from_properties(class: &str, values: &Map<String, Value>) -> Option<CustomRuleInfo> {
    let mut info = CustomRuleInfo {
        class: class.to_string(),
        strategy: "properties".to_string(),
        schema_type: None,
        format: None,
        constraints: Default::default(),
        description: None,
    };
    let mut bounds: Vec<&Value> = Vec::new();

    for (name, value) in values {
        let Some((_, constraint)) = PROPERTY_CONSTRAINTS.iter().find(|(n, _)| n == name) else {
            continue;
        };
        match constraint {
            Constraint::Min if value.is_number() => {
                info.constraints.minimum = value.as_f64();
                bounds.push(value);
            }
            Constraint::Max if value.is_number() => {
                info.constraints.maximum = value.as_f64();
                bounds.push(value);
            }
            Constraint::MinLength => info.constraints.min_length = value.as_u64(),
            Constraint::MaxLength => info.constraints.max_length = value.as_u64(),
            Constraint::Pattern => {
                info.constraints.pattern = value.as_str().map(strip_delimiters)
            }
            Constraint::Format => info.format = value.as_str().map(str::to_string),
            _ => {}
        }
    }

    info.schema_type = if !bounds.is_empty() {
        if bounds.iter().all(|v| v.is_i64() || v.is_u64()) {
            Some(SchemaType::Integer)
        } else {
            Some(SchemaType::Number)
        }
    } else if info.constraints.min_length.is_some()
        || info.constraints.max_length.is_some()
        || info.constraints.pattern.is_some()
        || info.format.is_some()
    {
        Some(SchemaType::String)
    } else {
        None
    };
    (!info.is_empty()).then_some(info)
}

fn summary(loaded: &LoadedClass) -> Option<String> {
    loaded.class().doc_comment.as_deref().and_then(doc_summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RuleObject;
    use std::collections::BTreeMap;

    const RULES: &[(&str, &str)] = &[
        (
            "app/Rules/Slug.php",
            r#"<?php
namespace App\Rules;

use Illuminate\Contracts\Validation\ValidationRule;

/**
 * A URL-safe slug.
 */
class Slug implements ValidationRule
{
    public function openApiSchema(): array
    {
        return ['type' => 'string', 'pattern' => '^[a-z0-9-]+$', 'maxLength' => 80];
    }
}
"#,
        ),
        (
            "app/Rules/Percentage.php",
            r#"<?php
namespace App\Rules;

#[OpenApiRule(format: 'float', minimum: 0, maximum: 100, description: 'A percentage')]
class Percentage
{
}
"#,
        ),
        (
            "app/Rules/Between.php",
            r#"<?php
namespace App\Rules;

class Between
{
    public function __construct(private int $min, private int $max = 10) {}
}
"#,
        ),
    ];

    #[test]
    fn test_self_describing_rule_wins() {
        let ctx = AnalysisContext::in_memory(RULES);
        let info = CustomRuleAnalyzer::new(&ctx)
            .analyze(&RuleToken::Expression("new \\App\\Rules\\Slug()".into()), None)
            .unwrap();
        assert_eq!(info.strategy, "self_describing");
        assert_eq!(info.schema_type, Some(SchemaType::String));
        assert_eq!(info.constraints.max_length, Some(80));
        assert_eq!(info.description.as_deref(), Some("A URL-safe slug."));
    }

    #[test]
    fn test_attribute_strategy() {
        let ctx = AnalysisContext::in_memory(RULES);
        let info = CustomRuleAnalyzer::new(&ctx)
            .analyze(&RuleToken::Expression("new App\\Rules\\Percentage()".into()), None)
            .unwrap();
        assert_eq!(info.strategy, "attribute");
        assert_eq!(info.schema_type, Some(SchemaType::Number));
        assert_eq!(info.description.as_deref(), Some("A percentage"));
        assert_eq!(info.constraints.maximum, Some(100.0));
    }

    #[test]
    fn test_constructor_arguments_are_scanned() {
        let ctx = AnalysisContext::in_memory(RULES);
        let info = CustomRuleAnalyzer::new(&ctx)
            .analyze(&RuleToken::Expression("new App\\Rules\\Between(3)".into()), None)
            .unwrap();
        assert_eq!(info.strategy, "properties");
        assert_eq!(info.schema_type, Some(SchemaType::Integer));
        assert_eq!(info.constraints.minimum, Some(3.0));
        assert_eq!(info.constraints.maximum, Some(10.0));
    }

    #[test]
    fn test_runtime_object_with_fractional_bound() {
        let ctx = AnalysisContext::in_memory(&[]);
        let token = RuleToken::Object(RuleObject {
            class: "Vendor\\Rules\\Price".into(),
            properties: BTreeMap::from([
                ("min".to_string(), Value::from(0.5)),
                ("max".to_string(), Value::from(10)),
            ]),
        });
        let info = CustomRuleAnalyzer::new(&ctx).analyze(&token, None).unwrap();
        assert_eq!(info.schema_type, Some(SchemaType::Number));
    }

    #[test]
    fn test_builtin_and_unmatched_rules() {
        let ctx = AnalysisContext::in_memory(RULES);
        let analyzer = CustomRuleAnalyzer::new(&ctx);
        assert!(analyzer
            .analyze(&RuleToken::Expression("new Enum(Status::class)".into()), None)
            .is_none());
        assert!(analyzer.analyze(&RuleToken::text("required"), None).is_none());
    }
}
