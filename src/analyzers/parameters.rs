//! Parameters from a validation rule set.
//!
//! Per field, evidence is layered: rule tokens first, then file, enum,
//! password and custom-rule analyzers, and the naming heuristic only where
//! no rule named a type.

use super::custom_rule::CustomRuleAnalyzer;
use super::enums::EnumAnalyzer;
use super::file_upload::FileUploadAnalyzer;
use super::password_rule::PasswordRuleAnalyzer;
use crate::context::AnalysisContext;
use crate::inference::{example_for, infer_field_type, infer_from_rules};
use crate::model::rules::is_required;
use crate::model::{InferredType, ParameterInfo, ParameterLocation, RuleToken, SchemaType, ValidationRuleSet};
use crate::workspace::LoadedClass;
use serde_json::Value;

pub struct ParameterBuilder<'a> {
    ctx: &'a AnalysisContext,
    scope: Option<LoadedClass>,
}

impl<'a> ParameterBuilder<'a> {
    /// `scope` is the class the rules were written in, used to resolve enum
    /// and rule class names
    pub fn new(ctx: &'a AnalysisContext, scope: Option<LoadedClass>) -> Self {
        Self { ctx, scope }
    }

    /// One parameter per top-level field. `field.*` rules describe the
    /// elements of `field` when it has rules of its own.
    pub fn build(&self, rules: &ValidationRuleSet, location: ParameterLocation) -> Vec<ParameterInfo> {
        let effective = rules.effective_rules();
        effective
            .iter()
            .filter(|(field, _)| {
                field
                    .strip_suffix(".*")
                    .map_or(true, |parent| !effective.contains_key(parent))
            })
            .map(|(field, tokens)| self.parameter(field, tokens, rules, location))
            .collect()
    }

    pub fn parameter(
        &self,
        field: &str,
        tokens: &[RuleToken],
        rules: &ValidationRuleSet,
        location: ParameterLocation,
    ) -> ParameterInfo {
        let scope = self.scope.as_ref();
        let source = rules.source.clone().unwrap_or_else(|| "validation".to_string());
        let mut param = ParameterInfo::new(field, location, source);

        let inference = infer_from_rules(tokens);
        let mut inferred = inference.inferred.clone();
        match infer_field_type(field) {
            Some(hint) if !inference.explicit_type => {
                inferred.schema_type = hint.schema_type;
                inferred.format = hint.format.map(str::to_string);
            }
            Some(hint) if inferred.format.is_none() && hint.schema_type == inferred.schema_type => {
                inferred.format = hint.format.map(str::to_string);
            }
            _ => {}
        }
        param.constraints = inference.constraints.clone();
        param.enum_values = inference.enum_values.clone();
        param.required = rules.is_required(field);
        param.nullable = inferred.nullable;
        param.validation_rules = Some(tokens.iter().map(RuleToken::to_string).collect());

        if let Some(file) = FileUploadAnalyzer::analyze(field, tokens) {
            inferred = InferredType::with_format(SchemaType::String, "binary");
            param.file = Some(file);
        }

        if let Some(info) = EnumAnalyzer::new(self.ctx).analyze_tokens(tokens, scope) {
            inferred.schema_type = info.value_type;
            inferred.format = None;
            param.enum_values = Some(info.values.clone());
            param.enum_class = Some(info.class.clone());
        }

        let mut notes: Vec<String> = Vec::new();
        if let Some(password) = PasswordRuleAnalyzer::from_tokens(tokens) {
            inferred = InferredType::with_format(SchemaType::String, "password");
            if param.constraints.min_length.is_none() {
                param.constraints.min_length = password.min_length;
            }
            if param.constraints.max_length.is_none() {
                param.constraints.max_length = password.max_length;
            }
            notes.push(password.describe());
            param.password = Some(password);
        }

        if let Some(custom) = CustomRuleAnalyzer::new(self.ctx).analyze_tokens(tokens, scope) {
            if !inference.explicit_type {
                if let Some(schema_type) = custom.schema_type {
                    inferred.schema_type = schema_type;
                }
            }
            if inferred.format.is_none() {
                inferred.format = custom.format.clone();
            }
            param.constraints.merge_missing(&custom.constraints);
            if let Some(description) = &custom.description {
                notes.push(description.clone());
            }
            param
                .context
                .insert("custom_rule".to_string(), Value::from(custom.class.clone()));
        }

        if inferred.schema_type == SchemaType::Array {
            let element_field = format!("{}.*", field);
            param.items = rules
                .effective_rules()
                .get(&element_field)
                .map(|element| element_type(&element_field, element))
                .or(inference.items);
        }

        if let Some(conditional) = &rules.conditional {
            let required_when: Vec<Value> = conditional
                .branches
                .iter()
                .filter(|branch| branch.rules.get(field).is_some_and(|t| is_required(t)))
                .map(|branch| Value::from(branch.description()))
                .collect();
            if !required_when.is_empty() && required_when.len() < conditional.branches.len() {
                param
                    .context
                    .insert("required_when".to_string(), Value::Array(required_when));
            }
        }

        param.schema_type = inferred.schema_type;
        param.format = inferred.format.clone();
        param.example = Some(match param.enum_values.as_ref().and_then(|v| v.first()) {
            Some(first) => first.clone(),
            None => example_for(field, &inferred),
        });
        param.description = describe(field, rules.attributes.get(field).map(String::as_str), &notes);
        param
    }
}

fn element_type(field: &str, tokens: &[RuleToken]) -> SchemaType {
    let inference = infer_from_rules(tokens);
    if inference.explicit_type {
        return inference.inferred.schema_type;
    }
    infer_field_type(field).map_or(SchemaType::String, |hint| hint.schema_type)
}

/// `user_name` becomes `User name`
pub fn humanize(field: &str) -> String {
    let last = field.rsplit('.').find(|s| *s != "*").unwrap_or(field);
    let words = last.replace(['_', '-'], " ");
    let mut chars = words.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn describe(field: &str, label: Option<&str>, notes: &[String]) -> String {
    let mut description = match label {
        Some(label) => humanize(label),
        None => humanize(field),
    };
    for note in notes {
        description.push_str(". ");
        description.push_str(note);
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rules::split_rule_string;
    use std::collections::BTreeMap;

    fn rule_set(pairs: &[(&str, &str)]) -> ValidationRuleSet {
        ValidationRuleSet {
            rules: pairs
                .iter()
                .map(|(field, rules)| (field.to_string(), split_rule_string(rules)))
                .collect(),
            ..ValidationRuleSet::default()
        }
    }

    fn build(rules: &ValidationRuleSet) -> BTreeMap<String, ParameterInfo> {
        let ctx = AnalysisContext::in_memory(&[]);
        ParameterBuilder::new(&ctx, None)
            .build(rules, ParameterLocation::Body)
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect()
    }

    #[test]
    fn test_conditional_required_tokens_never_require() {
        let params = build(&rule_set(&[
            ("a", "required_if:type,admin|string"),
            ("b", "required_with:a"),
            ("c", "required_unless:x,y|integer"),
            ("d", "required|email"),
        ]));
        assert!(!params["a"].required);
        assert!(!params["b"].required);
        assert!(!params["c"].required);
        assert!(params["d"].required);
        assert_eq!(params["d"].format.as_deref(), Some("email"));
    }

    #[test]
    fn test_rules_override_naming() {
        let params = build(&rule_set(&[("user_id", "required|string"), ("created_at", "nullable")]));
        assert_eq!(params["user_id"].schema_type, SchemaType::String);
        assert_eq!(params["created_at"].format.as_deref(), Some("date-time"));
        assert!(params["created_at"].nullable);
    }

    #[test]
    fn test_array_items_and_file_fields() {
        let params = build(&rule_set(&[
            ("tags", "array|max:5"),
            ("tags.*", "integer"),
            ("avatar", "image|max:2048"),
        ]));
        assert_eq!(params.len(), 2);
        assert_eq!(params["tags"].items, Some(SchemaType::Integer));
        assert_eq!(params["tags"].constraints.max_items, Some(5));
        let avatar = &params["avatar"];
        assert_eq!(avatar.format.as_deref(), Some("binary"));
        assert_eq!(avatar.file.as_ref().and_then(|f| f.max_size), Some(2048 * 1024));
    }

    #[test]
    fn test_password_and_enum_values() {
        let mut rules = rule_set(&[("status", "required|in:active,inactive")]);
        rules.rules.insert(
            "password".into(),
            vec![RuleToken::text("required"), RuleToken::Expression("Password::min(10)->symbols()".into())],
        );
        rules.attributes.insert("status".into(), "account status".into());
        let params = build(&rules);
        assert_eq!(params["status"].enum_values, Some(vec![Value::from("active"), Value::from("inactive")]));
        assert_eq!(params["status"].example, Some(Value::from("active")));
        assert_eq!(params["status"].description, "Account status");
        let password = &params["password"];
        assert_eq!(password.constraints.min_length, Some(10));
        assert!(password.description.contains("at least one symbol"));
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("user_name"), "User name");
        assert_eq!(humanize("items.*.unit-price"), "Unit price");
    }
}
