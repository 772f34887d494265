//! Expression form of type inference.
//!
//! [`EXPRESSION_PATTERNS`] is evaluated top to bottom and the first match
//! wins. Naming conventions are only consulted for bare property and
//! variable reads, after every structural pattern has declined.

use super::field_name::infer_field_type;
use crate::ast::{CastKind, Expr, Literal};
use crate::model::{InferredType, SchemaType};

type ExprPattern = fn(&Expr) -> Option<InferredType>;

const EXPRESSION_PATTERNS: &[(&str, ExprPattern)] = &[
    ("cast", infer_cast),
    ("coercing_function", infer_coercing_function),
    ("literal", infer_literal),
    ("array_literal", infer_array_literal),
    ("property_access", infer_property_access),
    ("conditional", infer_conditional),
    ("known_method", infer_known_method),
];

/// Infer the type of one expression; falls back to `string`
pub fn infer_expr(expr: &Expr) -> InferredType {
    infer_expr_matching(expr)
        .map(|(_, inferred)| inferred)
        .unwrap_or_else(|| InferredType::new(SchemaType::String))
}

/// Like [`infer_expr`], also naming the pattern that matched
pub fn infer_expr_matching(expr: &Expr) -> Option<(&'static str, InferredType)> {
    EXPRESSION_PATTERNS
        .iter()
        .find_map(|(name, pattern)| pattern(expr).map(|inferred| (*name, inferred)))
}

fn infer_cast(expr: &Expr) -> Option<InferredType> {
    let Expr::Cast { kind, .. } = expr else { return None };
    let schema_type = match kind {
        CastKind::Int => SchemaType::Integer,
        CastKind::Float => SchemaType::Number,
        CastKind::String => SchemaType::String,
        CastKind::Bool => SchemaType::Boolean,
        CastKind::Array => SchemaType::Array,
        CastKind::Object => SchemaType::Object,
        CastKind::Unset => return Some(InferredType::new(SchemaType::String).nullable()),
    };
    Some(InferredType::new(schema_type))
}

const COERCING_FUNCTIONS: &[(&str, SchemaType, Option<&str>)] = &[
    ("intval", SchemaType::Integer, None),
    ("count", SchemaType::Integer, None),
    ("strlen", SchemaType::Integer, None),
    ("mb_strlen", SchemaType::Integer, None),
    ("floatval", SchemaType::Number, None),
    ("round", SchemaType::Number, None),
    ("boolval", SchemaType::Boolean, None),
    ("in_array", SchemaType::Boolean, None),
    ("array_key_exists", SchemaType::Boolean, None),
    ("is_null", SchemaType::Boolean, None),
    ("empty", SchemaType::Boolean, None),
    ("isset", SchemaType::Boolean, None),
    ("strval", SchemaType::String, None),
    ("implode", SchemaType::String, None),
    ("sprintf", SchemaType::String, None),
    ("trim", SchemaType::String, None),
    ("json_encode", SchemaType::String, None),
    ("__", SchemaType::String, None),
    ("trans", SchemaType::String, None),
    ("url", SchemaType::String, Some("uri")),
    ("route", SchemaType::String, Some("uri")),
    ("asset", SchemaType::String, Some("uri")),
    ("now", SchemaType::String, Some("date-time")),
    ("explode", SchemaType::Array, None),
    ("array_map", SchemaType::Array, None),
    ("array_filter", SchemaType::Array, None),
    ("array_values", SchemaType::Array, None),
    ("array_keys", SchemaType::Array, None),
    ("array_merge", SchemaType::Array, None),
    ("compact", SchemaType::Array, None),
    ("range", SchemaType::Array, None),
];

fn infer_coercing_function(expr: &Expr) -> Option<InferredType> {
    let Expr::FuncCall { name, .. } = expr else { return None };
    let name = name.trim_start_matches('\\').to_ascii_lowercase();
    // both the stdClass and the associative-array form serialise as objects
    if name == "json_decode" {
        return Some(InferredType::new(SchemaType::Object));
    }
    COERCING_FUNCTIONS
        .iter()
        .find(|(candidate, _, _)| *candidate == name)
        .map(|(_, schema_type, format)| match format {
            Some(format) => InferredType::with_format(*schema_type, format),
            None => InferredType::new(*schema_type),
        })
}

fn infer_literal(expr: &Expr) -> Option<InferredType> {
    let literal = match expr {
        Expr::Literal(literal) => literal,
        Expr::Interpolated(_) => return Some(InferredType::new(SchemaType::String)),
        Expr::Unary { op, .. } if op == "!" => return Some(InferredType::new(SchemaType::Boolean)),
        Expr::Unary { op, expr } if op == "-" => return infer_literal(expr),
        _ => return None,
    };
    Some(match literal {
        Literal::String(_) => InferredType::new(SchemaType::String),
        Literal::Int(_) => InferredType::new(SchemaType::Integer),
        Literal::Float(_) => InferredType::new(SchemaType::Number),
        Literal::Bool(_) => InferredType::new(SchemaType::Boolean),
        Literal::Null => InferredType::new(SchemaType::String).nullable(),
    })
}

fn infer_array_literal(expr: &Expr) -> Option<InferredType> {
    let Expr::Array(items) = expr else { return None };
    if items.iter().any(|item| matches!(item.key, Some(Expr::Literal(Literal::String(_))))) {
        Some(InferredType::new(SchemaType::Object))
    } else {
        Some(InferredType::new(SchemaType::Array))
    }
}

fn accessed_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::PropertyFetch { name, .. } => Some(name.as_str()),
        Expr::Variable(name) if name != "this" => Some(name.as_str()),
        Expr::ArrayAccess {
            index: Some(index), ..
        } => index.as_str(),
        _ => None,
    }
}

fn infer_property_access(expr: &Expr) -> Option<InferredType> {
    let name = accessed_name(expr)?;
    let nullsafe = matches!(expr, Expr::PropertyFetch { nullsafe: true, .. });
    let mut inferred = match infer_field_type(name) {
        Some(hint) => InferredType {
            schema_type: hint.schema_type,
            format: hint.format.map(str::to_string),
            ..InferredType::default()
        },
        None => InferredType::new(SchemaType::String),
    };
    inferred.nullable = nullsafe;
    Some(inferred)
}

fn infer_conditional(expr: &Expr) -> Option<InferredType> {
    match expr {
        Expr::Ternary {
            condition,
            then,
            otherwise,
        } => {
            let truthy = then.as_deref().unwrap_or(condition);
            let mut inferred = infer_expr(truthy);
            if matches!(otherwise.as_ref(), Expr::Literal(Literal::Null)) {
                inferred.nullable = true;
            }
            Some(inferred)
        }
        Expr::Coalesce { left, .. } => Some(infer_expr(left).nullable()),
        _ => None,
    }
}

const KNOWN_METHODS: &[(&str, SchemaType, Option<&str>)] = &[
    ("toiso8601string", SchemaType::String, Some("date-time")),
    ("toatomstring", SchemaType::String, Some("date-time")),
    ("todatetimestring", SchemaType::String, Some("date-time")),
    ("torfc3339string", SchemaType::String, Some("date-time")),
    ("tojson", SchemaType::String, None),
    ("todatestring", SchemaType::String, Some("date")),
    ("totimestring", SchemaType::String, None),
    ("format", SchemaType::String, None),
    ("diffforhumans", SchemaType::String, None),
    ("tostring", SchemaType::String, None),
    ("toarray", SchemaType::Array, None),
    ("all", SchemaType::Array, None),
    ("pluck", SchemaType::Array, None),
    ("keys", SchemaType::Array, None),
    ("values", SchemaType::Array, None),
    ("count", SchemaType::Integer, None),
    ("getkey", SchemaType::Integer, None),
    ("sum", SchemaType::Number, None),
    ("avg", SchemaType::Number, None),
    ("exists", SchemaType::Boolean, None),
    ("isempty", SchemaType::Boolean, None),
    ("isnotempty", SchemaType::Boolean, None),
];

fn infer_known_method(expr: &Expr) -> Option<InferredType> {
    let method = match expr {
        Expr::MethodCall { method, .. } | Expr::StaticCall { method, .. } => method,
        _ => return None,
    };
    if let Expr::StaticCall { class, method, .. } = expr {
        let is_carbon = matches!(class.as_ref(), Expr::Name(n) if n.ends_with("Carbon") || n == "Date");
        if is_carbon && matches!(method.to_ascii_lowercase().as_str(), "now" | "parse" | "today") {
            return Some(InferredType::with_format(SchemaType::String, "date-time"));
        }
    }
    let lower = method.to_ascii_lowercase();
    if let Some((_, schema_type, format)) = KNOWN_METHODS.iter().find(|(name, _, _)| *name == lower) {
        return Some(match format {
            Some(format) => InferredType::with_format(*schema_type, format),
            None => InferredType::new(*schema_type),
        });
    }
    let is_predicate = ["is", "has", "can"].iter().any(|prefix| {
        lower.starts_with(prefix)
            && method[prefix.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase())
    });
    is_predicate.then(|| InferredType::new(SchemaType::Boolean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::visit::ReturnCollector;
    use std::path::Path;

    /// Parse `return <code>;` inside a method and hand back the expression
    fn expr(code: &str) -> Expr {
        let source = format!("<?php\nclass T {{ public function f() {{ return {}; }} }}\n", code);
        let file = parse_source(Path::new("t.php"), &source).unwrap();
        let method = file.classes[0].method("f").unwrap();
        ReturnCollector::collect(method.statements()).returns[0].clone()
    }

    #[test]
    fn test_cast_beats_field_name() {
        let inferred = infer_expr(&expr("(string) $this->user_id"));
        assert_eq!(inferred.schema_type, SchemaType::String);
        assert_eq!(infer_expr_matching(&expr("(int) $this->title")).unwrap().0, "cast");
    }

    #[test]
    fn test_property_access_uses_field_name() {
        assert_eq!(infer_expr(&expr("$this->id")).schema_type, SchemaType::Integer);
        assert_eq!(infer_expr(&expr("$this->is_active")).schema_type, SchemaType::Boolean);
        let created = infer_expr(&expr("$this->created_at"));
        assert_eq!(created.format.as_deref(), Some("date-time"));
        assert!(infer_expr(&expr("$this->owner?->name")).nullable);
    }

    #[test]
    fn test_array_literals() {
        assert_eq!(infer_expr(&expr("['a' => 1]")).schema_type, SchemaType::Object);
        assert_eq!(infer_expr(&expr("[1, 2]")).schema_type, SchemaType::Array);
        assert_eq!(infer_expr(&expr("json_decode($this->meta, true)")).schema_type, SchemaType::Object);
    }

    #[test]
    fn test_conditional_and_methods() {
        let inferred = infer_expr(&expr("$this->count ?? 0"));
        assert_eq!(inferred.schema_type, SchemaType::Integer);
        assert!(inferred.nullable);
        let inferred = infer_expr(&expr("$this->published_at?->toIso8601String()"));
        assert_eq!(inferred.format.as_deref(), Some("date-time"));
        assert_eq!(infer_expr(&expr("$this->roles->pluck('name')")).schema_type, SchemaType::Array);
        assert_eq!(infer_expr(&expr("$this->isAdmin()")).schema_type, SchemaType::Boolean);
        assert_eq!(infer_expr(&expr("$this->doSomething()")).schema_type, SchemaType::String);
    }
}
