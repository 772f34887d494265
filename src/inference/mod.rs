//! Type inference engine.
//!
//! Two entry points share one output type: [`infer_expr`] for an AST
//! expression and [`infer_from_rules`] for a validation rule-token list.
//! Structural evidence always wins; [`infer_field_type`] is the naming
//! fallback both of them defer to.

pub mod examples;
pub mod field_name;
pub mod rules;
pub mod types;

pub use examples::example_for;
pub use field_name::{infer_field_type, to_snake_case, to_studly_case, FieldHint};
pub use rules::{infer_from_rules, strip_delimiters, RuleInference};
pub use types::{infer_expr, infer_expr_matching};

use crate::ast::Expr;
use crate::model::{InferredType, PropertyInfo};

/// Build a response property for `field` from the expression producing it
pub fn property_from_expr(field: &str, expr: &Expr) -> PropertyInfo {
    property_from_type(field, infer_expr(expr))
}

/// Build a response property from an already inferred type, adding an example
pub fn property_from_type(field: &str, inferred: InferredType) -> PropertyInfo {
    let example = example_for(field, &inferred);
    PropertyInfo::from_inferred(inferred).with_example(example)
}

/// Type for a field whose only evidence is its name
pub fn type_from_name(field: &str) -> InferredType {
    match infer_field_type(field) {
        Some(hint) => InferredType {
            schema_type: hint.schema_type,
            format: hint.format.map(str::to_string),
            ..InferredType::default()
        },
        None => InferredType::default(),
    }
}
