//! Turning rule-producing PHP expressions into rule tokens.
//!
//! Source analysis yields expressions; the runtime fallback yields JSON.
//! Both end up as the same `field -> [RuleToken]` map.

use super::conditional::RuleWalker;
use super::literal::const_string;
use crate::ast::{find_arg, string_key, ArrayItem, Expr, Literal};
use crate::context::AnalysisContext;
use crate::model::rules::split_rule_string;
use crate::model::{ConditionalRuleSet, RuleBranch, RuleObject, RuleToken};
use crate::workspace::LoadedClass;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

pub type RuleMap = BTreeMap<String, Vec<RuleToken>>;

/// Array-valued local variables visible at a point of a rules body
pub type Locals = BTreeMap<String, RuleMap>;

/// Depth limit for `parent::rules()` / `$this->baseRules()` delegation
const MAX_DELEGATION_DEPTH: usize = 4;

/// `Rule::` factories that reduce to a plain text rule
const TEXT_RULE_FACTORIES: &[(&str, &str)] = &[("in", "in"), ("notin", "not_in")];

pub struct RuleExtractor<'a> {
    ctx: &'a AnalysisContext,
    scope: LoadedClass,
    depth: usize,
}

impl<'a> RuleExtractor<'a> {
    pub fn new(ctx: &'a AnalysisContext, scope: &LoadedClass) -> Self {
        Self {
            ctx,
            scope: scope.clone(),
            depth: 0,
        }
    }

    pub fn ctx(&self) -> &'a AnalysisContext {
        self.ctx
    }

    pub fn scope(&self) -> &LoadedClass {
        &self.scope
    }

    /// Execution paths of a method returning rules, or `None` when the
    /// class has no such method
    pub fn method_branches(&self, method: &str) -> Option<Vec<RuleBranch>> {
        let found = self.ctx.repository.find_method(&self.scope.fqn, method)?;
        let extractor = RuleExtractor {
            ctx: self.ctx,
            scope: found.owner.clone(),
            depth: self.depth,
        };
        Some(RuleWalker::new(&extractor).walk(found.method().statements()))
    }

    /// Field name of an array key, folding constants
    pub fn field_key(&self, key: &Expr) -> Option<String> {
        const_string(key, &self.scope, self.ctx)
    }

    /// Tokens of one field's rule value
    pub fn tokens(&self, value: &Expr) -> Vec<RuleToken> {
        match value {
            Expr::Array(items) => items
                .iter()
                .filter(|item| !item.spread)
                .filter_map(|item| self.token(&item.value))
                .collect(),
            other => match const_string(other, &self.scope, self.ctx) {
                Some(text) => split_rule_string(&text),
                None => self.token(other).into_iter().collect(),
            },
        }
    }

    /// A single array element of a rule list
    fn token(&self, value: &Expr) -> Option<RuleToken> {
        if let Some(text) = const_string(value, &self.scope, self.ctx) {
            let text = text.trim();
            return (!text.is_empty()).then(|| RuleToken::text(text));
        }
        if let Expr::StaticCall { class, method, args } = value {
            let is_rule_facade = matches!(class.as_ref(), Expr::Name(n) if crate::ast::short_name(n) == "Rule");
            let factory = TEXT_RULE_FACTORIES
                .iter()
                .find(|(name, _)| method.eq_ignore_ascii_case(name));
            if let (true, Some((_, rule))) = (is_rule_facade, factory) {
                let values = in_values(args);
                if !values.is_empty() {
                    return Some(RuleToken::text(format!("{}:{}", rule, values.join(","))));
                }
            }
        }
        Some(RuleToken::Expression(value.to_string()))
    }

    /// Rule map produced by an expression, or `None` when it does not build one
    pub fn rules_map(&self, expr: &Expr, locals: &Locals) -> Option<RuleMap> {
        match expr {
            Expr::Array(items) => Some(self.rules_from_items(items, locals)),
            Expr::Variable(name) => locals.get(name).cloned(),
            Expr::FuncCall { name, args } if name.eq_ignore_ascii_case("array_merge") => {
                let mut merged = RuleMap::new();
                for arg in args {
                    merged.extend(self.rules_map(&arg.value, locals)?);
                }
                Some(merged)
            }
            Expr::Binary { op, left, right } if op == "+" => {
                let mut merged = self.rules_map(left, locals)?;
                for (field, tokens) in self.rules_map(right, locals)? {
                    merged.entry(field).or_insert(tokens);
                }
                Some(merged)
            }
            Expr::StaticCall { class, method, .. } => {
                let Expr::Name(owner) = class.as_ref() else {
                    return None;
                };
                if owner.eq_ignore_ascii_case("parent") {
                    let parent = self.scope.class().extends.as_deref()?;
                    let parent = self.ctx.resolve_in(parent, &self.scope);
                    self.delegate(&parent, method)
                } else if matches!(owner.to_ascii_lowercase().as_str(), "self" | "static") {
                    self.delegate(&self.scope.fqn.clone(), method)
                } else {
                    None
                }
            }
            Expr::MethodCall { object, method, .. } if object.is_this() => {
                self.delegate(&self.scope.fqn.clone(), method)
            }
            _ => None,
        }
    }

    fn rules_from_items(&self, items: &[ArrayItem], locals: &Locals) -> RuleMap {
        let mut rules = RuleMap::new();
        for item in items {
            if item.spread {
                if let Some(spread) = self.rules_map(&item.value, locals) {
                    rules.extend(spread);
                }
                continue;
            }
            let Some(key) = item.key.as_ref() else { continue };
            match self.field_key(key) {
                Some(field) => {
                    rules.insert(field, self.tokens(&item.value));
                }
                None => debug!(
                    "Skipping rule with non-constant key {} in {}",
                    key, self.scope.fqn
                ),
            }
        }
        rules
    }

    /// Rules returned by another method, merged over its branches
    fn delegate(&self, class: &str, method: &str) -> Option<RuleMap> {
        if self.depth >= MAX_DELEGATION_DEPTH {
            debug!("Rule delegation too deep at {}::{}", class, method);
            return None;
        }
        let found = self.ctx.repository.find_method(class, method)?;
        let extractor = RuleExtractor {
            ctx: self.ctx,
            scope: found.owner.clone(),
            depth: self.depth + 1,
        };
        let branches = RuleWalker::new(&extractor).walk(found.method().statements());
        Some(ConditionalRuleSet::from_branches(branches).merged)
    }

    /// Literal string map returned by `attributes()` / `messages()`
    pub fn string_method(&self, method: &str) -> BTreeMap<String, String> {
        let Some(found) = self.ctx.repository.find_method(&self.scope.fqn, method) else {
            return BTreeMap::new();
        };
        let stmts = found.method().statements();
        crate::visit::ReturnCollector::collect(stmts)
            .returns
            .iter()
            .find_map(|value| crate::visit::returned_array(value, stmts))
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let key = match item.key.as_ref() {
                            Some(key) => string_key(item)
                                .map(str::to_string)
                                .or_else(|| const_string(key, &found.owner, self.ctx))?,
                            None => return None,
                        };
                        Some((key, const_string(&item.value, &found.owner, self.ctx)?))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Values of `Rule::in([...])` / `Rule::in('a', 'b')`
fn in_values(args: &[crate::ast::Arg]) -> Vec<String> {
    let scalar = |expr: &Expr| match expr {
        Expr::Literal(Literal::String(s)) => Some(s.clone()),
        Expr::Literal(Literal::Int(i)) => Some(i.to_string()),
        _ => None,
    };
    match find_arg(args, "values", 0) {
        Some(Expr::Array(items)) => items.iter().map(|i| scalar(&i.value)).collect::<Option<Vec<_>>>(),
        Some(_) => args.iter().map(|a| scalar(&a.value)).collect::<Option<Vec<_>>>(),
        None => None,
    }
    .unwrap_or_default()
}

/// Rule map from the runtime's JSON export of `rules()`
pub fn rules_from_value(value: &Value) -> RuleMap {
    let Value::Object(fields) = value else {
        return RuleMap::new();
    };
    fields
        .iter()
        .map(|(field, rules)| (field.clone(), tokens_from_value(rules)))
        .collect()
}

/// Tokens of one exported rule value
pub fn tokens_from_value(value: &Value) -> Vec<RuleToken> {
    match value {
        Value::String(text) => split_rule_string(text),
        Value::Array(items) => items.iter().filter_map(token_from_value).collect(),
        Value::Object(_) => token_from_value(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn token_from_value(value: &Value) -> Option<RuleToken> {
    match value {
        Value::String(text) => Some(RuleToken::text(text.trim())),
        Value::Object(map) => {
            let class = map.get("__class")?.as_str()?.to_string();
            if let Some(text) = map.get("__string").and_then(Value::as_str) {
                return Some(RuleToken::text(text.replace('"', "")));
            }
            let properties = map
                .iter()
                .filter(|(key, _)| !key.starts_with("__"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Some(RuleToken::Object(RuleObject { class, properties }))
        }
        other => literal_string(other).map(RuleToken::text),
    }
}

fn literal_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use serde_json::json;

    const REQUEST: &str = r#"<?php
namespace App\Http\Requests;

use Illuminate\Foundation\Http\FormRequest;
use Illuminate\Validation\Rule;

class BaseRequest extends FormRequest
{
    const NAME = 'name';

    public function rules(): array
    {
        return [self::NAME => 'required|string|max:' . 255];
    }
}
"#;

    const CHILD: &str = r#"<?php
namespace App\Http\Requests;

use Illuminate\Validation\Rule;

class ChildRequest extends BaseRequest
{
    public function rules(): array
    {
        return array_merge(parent::rules(), [
            'status' => ['required', Rule::in(['active', 'inactive'])],
            'role' => Rule::enum(Role::class),
        ]);
    }

    public function attributes(): array
    {
        return ['status' => 'account status'];
    }
}
"#;

    fn context() -> AnalysisContext {
        AnalysisContext::in_memory(&[
            ("app/Http/Requests/BaseRequest.php", REQUEST),
            ("app/Http/Requests/ChildRequest.php", CHILD),
        ])
    }

    #[test]
    fn test_parent_rules_and_rule_factories() {
        let ctx = context();
        let scope = ctx.load_class("App\\Http\\Requests\\ChildRequest").unwrap();
        let extractor = RuleExtractor::new(&ctx, &scope);
        let branches = extractor.method_branches("rules").unwrap();
        assert_eq!(branches.len(), 1);
        let rules = &branches[0].rules;

        let name: Vec<String> = rules["name"].iter().map(|t| t.to_string()).collect();
        assert_eq!(name, vec!["required", "string", "max:255"]);
        assert_eq!(rules["status"][1], RuleToken::text("in:active,inactive"));
        assert_eq!(rules["role"], vec![RuleToken::Expression("Rule::enum(Role::class)".into())]);
        assert_eq!(
            extractor.string_method("attributes").get("status").map(String::as_str),
            Some("account status")
        );
    }

    #[test]
    fn test_merge_operator_keeps_left_keys() {
        let ctx = context();
        let scope = ctx.load_class("App\\Http\\Requests\\BaseRequest").unwrap();
        let extractor = RuleExtractor::new(&ctx, &scope);
        let expr = parse_expression("['a' => 'required'] + ['a' => 'nullable', 'b' => 'integer']").unwrap();
        let rules = extractor.rules_map(&expr, &Locals::new()).unwrap();
        assert_eq!(rules["a"], vec![RuleToken::text("required")]);
        assert_eq!(rules["b"], vec![RuleToken::text("integer")]);
    }

    #[test]
    fn test_runtime_export_to_tokens() {
        let value = json!({
            "email": "required|email",
            "status": [
                "required",
                {"__class": "Illuminate\\Validation\\Rules\\In", "__string": "in:\"active\",\"inactive\""},
                {"__class": "Illuminate\\Validation\\Rules\\Enum", "type": "App\\Enums\\Status"}
            ]
        });
        let rules = rules_from_value(&value);
        assert_eq!(rules["email"].len(), 2);
        assert_eq!(rules["status"][1], RuleToken::text("in:active,inactive"));
        match &rules["status"][2] {
            RuleToken::Object(object) => {
                assert_eq!(object.short_class(), "Enum");
                assert_eq!(object.property("type"), Some(&json!("App\\Enums\\Status")));
            }
            other => panic!("expected object token, got {:?}", other),
        }
    }
}
