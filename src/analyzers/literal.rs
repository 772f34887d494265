//! Constant folding of literal PHP expressions into JSON values.

use crate::ast::{string_key, Expr, Literal};
use crate::context::AnalysisContext;
use crate::workspace::LoadedClass;
use serde_json::{Map, Value};

/// JSON value of a literal expression (scalars and nested literal arrays)
pub fn literal_value(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(Literal::String(s)) => Some(Value::from(s.clone())),
        Expr::Literal(Literal::Int(i)) => Some(Value::from(*i)),
        Expr::Literal(Literal::Float(f)) => serde_json::Number::from_f64(*f).map(Value::Number),
        Expr::Literal(Literal::Bool(b)) => Some(Value::Bool(*b)),
        Expr::Literal(Literal::Null) => Some(Value::Null),
        Expr::Unary { op, expr } if op == "-" => match literal_value(expr)? {
            Value::Number(n) => n
                .as_i64()
                .map(|i| Value::from(-i))
                .or_else(|| n.as_f64().and_then(|f| serde_json::Number::from_f64(-f)).map(Value::Number)),
            _ => None,
        },
        Expr::Array(items) => {
            let keyed = items.iter().any(|item| item.key.is_some());
            if keyed {
                let mut map = Map::new();
                for item in items {
                    let key = match &item.key {
                        Some(Expr::Literal(Literal::String(s))) => s.clone(),
                        Some(Expr::Literal(Literal::Int(i))) => i.to_string(),
                        _ => return None,
                    };
                    map.insert(key, literal_value(&item.value)?);
                }
                Some(Value::Object(map))
            } else {
                items
                    .iter()
                    .map(|item| literal_value(&item.value))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array)
            }
        }
        _ => None,
    }
}

/// Strings of a literal list (`['a', 'b']`), skipping anything else
pub fn string_list(expr: &Expr) -> Vec<String> {
    match expr {
        Expr::Array(items) => items
            .iter()
            .filter_map(|item| item.value.as_str().map(str::to_string))
            .collect(),
        Expr::Literal(Literal::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// String-keyed string pairs of a literal map (`['a' => 'x']`)
pub fn string_map(expr: &Expr) -> Vec<(String, String)> {
    let Expr::Array(items) = expr else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| Some((string_key(item)?.to_string(), item.value.as_str()?.to_string())))
        .collect()
}

/// Fold an expression to a string, following `self::CONST` references and
/// `.` concatenation inside `scope`
pub fn const_string(expr: &Expr, scope: &LoadedClass, ctx: &AnalysisContext) -> Option<String> {
    const_string_inner(expr, scope, ctx, 0)
}

fn const_string_inner(expr: &Expr, scope: &LoadedClass, ctx: &AnalysisContext, depth: usize) -> Option<String> {
    if depth > 8 {
        return None;
    }
    match expr {
        Expr::Literal(Literal::String(s)) => Some(s.clone()),
        Expr::Literal(Literal::Int(i)) => Some(i.to_string()),
        Expr::Literal(Literal::Float(f)) => Some(f.to_string()),
        Expr::Binary { op, left, right } if op == "." => Some(format!(
            "{}{}",
            const_string_inner(left, scope, ctx, depth + 1)?,
            const_string_inner(right, scope, ctx, depth + 1)?
        )),
        Expr::ClassConst { class, name } if !name.eq_ignore_ascii_case("class") => {
            let Expr::Name(class_name) = class.as_ref() else { return None };
            let owner = if matches!(class_name.to_ascii_lowercase().as_str(), "self" | "static") {
                scope.clone()
            } else {
                let fqn = ctx.resolve_class_name(class_name, &scope.file, Some(scope.class()))?;
                ctx.load_class(&fqn).ok()?
            };
            let constant = owner.class().constant(name)?;
            const_string_inner(&constant.value, &owner, ctx, depth + 1)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use serde_json::json;

    #[test]
    fn test_literal_values() {
        let expr = parse_expression("['a' => 1, 'b' => [true, null], 'c' => -2.5]").unwrap();
        assert_eq!(literal_value(&expr), Some(json!({"a": 1, "b": [true, null], "c": -2.5})));
        assert_eq!(literal_value(&parse_expression("$x").unwrap()), None);
        assert_eq!(string_list(&parse_expression("['id', 'name', 3]").unwrap()), vec!["id", "name"]);
    }

    #[test]
    fn test_const_string_follows_class_constants() {
        let ctx = AnalysisContext::in_memory(&[(
            "app/Rules.php",
            "<?php\nnamespace App;\nclass Rules { const MAX = 255; const PREFIX = 'max:'; }\n",
        )]);
        let scope = ctx.load_class("App\\Rules").unwrap();
        let expr = parse_expression("self::PREFIX . self::MAX").unwrap();
        assert_eq!(const_string(&expr, &scope, &ctx).as_deref(), Some("max:255"));
    }
}
