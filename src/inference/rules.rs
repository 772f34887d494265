//! Rule-token form of type inference.
//!
//! Each validation rule name maps to a type and an optional format through
//! [`RULE_TYPE_TABLE`]. Adding a rule is one table row.

use crate::model::{Constraints, InferredType, RuleToken, SchemaType};
use serde_json::Value;

/// How strongly a rule pins the type; a stronger rule replaces a weaker one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Strength {
    /// Only a format hint (`email` implies a string)
    Format,
    /// An explicit type rule
    Explicit,
    /// Container or file rules that override scalar hints
    Structural,
}

struct RuleType {
    name: &'static str,
    schema_type: SchemaType,
    format: Option<&'static str>,
    strength: Strength,
}

const fn rule(
    name: &'static str,
    schema_type: SchemaType,
    format: Option<&'static str>,
    strength: Strength,
) -> RuleType {
    RuleType {
        name,
        schema_type,
        format,
        strength,
    }
}

use SchemaType::*;
use Strength::*;

const RULE_TYPE_TABLE: &[RuleType] = &[
    rule("string", String, None, Explicit),
    rule("email", String, Some("email"), Format),
    rule("url", String, Some("uri"), Format),
    rule("active_url", String, Some("uri"), Format),
    rule("uuid", String, Some("uuid"), Format),
    rule("ulid", String, Some("ulid"), Format),
    rule("date", String, Some("date"), Format),
    rule("date_format", String, Some("date-time"), Format),
    rule("before", String, Some("date"), Format),
    rule("after", String, Some("date"), Format),
    rule("before_or_equal", String, Some("date"), Format),
    rule("after_or_equal", String, Some("date"), Format),
    rule("date_equals", String, Some("date"), Format),
    rule("timezone", String, Some("timezone"), Format),
    rule("ip", String, Some("ip"), Format),
    rule("ipv4", String, Some("ipv4"), Format),
    rule("ipv6", String, Some("ipv6"), Format),
    rule("mac_address", String, Some("mac"), Format),
    rule("json", String, Some("json"), Format),
    rule("hex_color", String, Some("hex-color"), Format),
    rule("alpha", String, None, Format),
    rule("alpha_num", String, None, Format),
    rule("alpha_dash", String, None, Format),
    rule("lowercase", String, None, Format),
    rule("uppercase", String, None, Format),
    rule("starts_with", String, None, Format),
    rule("ends_with", String, None, Format),
    rule("integer", Integer, None, Explicit),
    rule("int", Integer, None, Explicit),
    rule("digits", Integer, None, Explicit),
    rule("digits_between", Integer, None, Explicit),
    rule("multiple_of", Number, None, Explicit),
    rule("numeric", Number, None, Explicit),
    rule("decimal", Number, Some("float"), Explicit),
    rule("boolean", Boolean, None, Explicit),
    rule("bool", Boolean, None, Explicit),
    rule("accepted", Boolean, None, Explicit),
    rule("declined", Boolean, None, Explicit),
    rule("array", Array, None, Structural),
    rule("list", Array, None, Structural),
    rule("file", String, Some("binary"), Structural),
    rule("image", String, Some("binary"), Structural),
    rule("mimes", String, Some("binary"), Structural),
    rule("mimetypes", String, Some("binary"), Structural),
    rule("extensions", String, Some("binary"), Structural),
];

fn lookup(name: &str) -> Option<&'static RuleType> {
    RULE_TYPE_TABLE.iter().find(|entry| entry.name == name)
}

/// Everything the rule tokens of one field say about it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleInference {
    pub inferred: InferredType,
    pub constraints: Constraints,
    pub enum_values: Option<Vec<Value>>,
    pub required: bool,
    /// A rule named the type; naming heuristics must not override it
    pub explicit_type: bool,
    /// Element type under `field.*` rules
    pub items: Option<SchemaType>,
}

/// Infer type, format and bounds from one field's rule tokens
pub fn infer_from_rules(tokens: &[RuleToken]) -> RuleInference {
    let mut result = RuleInference::default();
    let mut strength: Option<Strength> = None;

    for token in tokens {
        let Some(name) = token.name() else { continue };
        let Some(entry) = lookup(&name) else { continue };
        let replaces = match strength {
            None => true,
            Some(current) if entry.strength > current => true,
            Some(current) if entry.strength == current => {
                // `numeric|integer` narrows to integer; never widen back
                entry.schema_type == Integer && result.inferred.schema_type == Number
            }
            Some(_) => false,
        };
        if replaces {
            let keeps_format =
                entry.format.is_none() && entry.schema_type == result.inferred.schema_type;
            result.inferred.schema_type = entry.schema_type;
            strength = Some(entry.strength);
            if !keeps_format {
                result.inferred.format = entry.format.map(str::to_string);
            }
        } else if result.inferred.format.is_none() && entry.schema_type == result.inferred.schema_type {
            result.inferred.format = entry.format.map(str::to_string);
        }
    }
    result.explicit_type = strength.is_some();

    result.required = crate::model::rules::is_required(tokens);
    result.inferred.nullable = crate::model::rules::is_nullable(tokens);

    for token in tokens {
        apply_constraint(&mut result, token);
    }
    result
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn parse_count(text: &str) -> Option<u64> {
    text.trim().parse::<u64>().ok()
}

fn apply_constraint(result: &mut RuleInference, token: &RuleToken) {
    let Some(name) = token.name() else { return };
    let args = token.arguments();
    let schema_type = result.inferred.schema_type;
    let is_file = result.inferred.format.as_deref() == Some("binary");

    match name.as_str() {
        "min" | "max" | "size" if !is_file => {
            let Some(arg) = args.first() else { return };
            let (lower, upper) = match name.as_str() {
                "min" => (Some(*arg), None),
                "max" => (None, Some(*arg)),
                _ => (Some(*arg), Some(*arg)),
            };
            set_bounds(&mut result.constraints, schema_type, lower, upper);
        }
        "between" if !is_file && args.len() == 2 => {
            set_bounds(&mut result.constraints, schema_type, Some(args[0]), Some(args[1]));
        }
        "digits" => {
            if let Some(n) = args.first().and_then(|a| parse_count(a)) {
                result.constraints.min_length = Some(n);
                result.constraints.max_length = Some(n);
            }
        }
        "digits_between" if args.len() == 2 => {
            result.constraints.min_length = parse_count(args[0]);
            result.constraints.max_length = parse_count(args[1]);
        }
        "gt" | "gte" | "lt" | "lte" if schema_type.is_numeric() => {
            let Some(value) = args.first().and_then(|a| parse_number(a)) else { return };
            if name.starts_with('g') {
                result.constraints.minimum = Some(value);
            } else {
                result.constraints.maximum = Some(value);
            }
        }
        "regex" => {
            if let Some(pattern) = token.argument() {
                result.constraints.pattern = Some(strip_delimiters(pattern));
            }
        }
        "in" => {
            let values: Vec<Value> = args
                .iter()
                .map(|a| enum_value(a.trim_matches('"'), schema_type))
                .collect();
            if !values.is_empty() {
                result.enum_values = Some(values);
            }
        }
        _ => {}
    }
}

fn set_bounds(constraints: &mut Constraints, schema_type: SchemaType, lower: Option<&str>, upper: Option<&str>) {
    match schema_type {
        Integer | Number => {
            if let Some(value) = lower.and_then(parse_number) {
                constraints.minimum = Some(value);
            }
            if let Some(value) = upper.and_then(parse_number) {
                constraints.maximum = Some(value);
            }
        }
        Array => {
            if let Some(value) = lower.and_then(parse_count) {
                constraints.min_items = Some(value);
            }
            if let Some(value) = upper.and_then(parse_count) {
                constraints.max_items = Some(value);
            }
        }
        _ => {
            if let Some(value) = lower.and_then(parse_count) {
                constraints.min_length = Some(value);
            }
            if let Some(value) = upper.and_then(parse_count) {
                constraints.max_length = Some(value);
            }
        }
    }
}

fn enum_value(raw: &str, schema_type: SchemaType) -> Value {
    if schema_type == Integer {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
    }
    Value::from(raw.to_string())
}

/// `/^[a-z]+$/i` becomes `^[a-z]+$`
pub fn strip_delimiters(pattern: &str) -> std::string::String {
    let pattern = pattern.trim();
    let mut chars = pattern.chars();
    let Some(delimiter) = chars.next() else {
        return std::string::String::new();
    };
    if delimiter.is_alphanumeric() || delimiter == '\\' {
        return pattern.to_string();
    }
    match pattern.rfind(delimiter) {
        Some(end) if end > 0 => pattern[delimiter.len_utf8()..end].to_string(),
        _ => pattern.to_string(),
    }
}
