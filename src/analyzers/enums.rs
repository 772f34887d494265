//! Backed-enum rules and casts.
//!
//! Five surface forms are recognised: a live `Rules\Enum` object, the
//! `enum:Class` string, printed `Rule::enum(X::class)` and
//! `new Enum(X::class)` calls, and model attribute casts. Each resolves the
//! class the same way and reads its cases from the declaration.

use crate::ast::{ClassKind, Expr, Literal};
use crate::context::AnalysisContext;
use crate::model::{EnumInfo, RuleToken, SchemaType};
use crate::workspace::LoadedClass;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn enum_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:Rule::enum|new\s+\\?(?:[\w\\]*\\)?Enum)\s*\(\s*(?:type:\s*)?\\?([\w\\]+)::class")
            .expect("valid regex")
    })
}

pub struct EnumAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> EnumAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Enum referenced by one rule token. `scope` is the class the rule was
    /// written in, used to resolve short and aliased names.
    pub fn analyze_validation_rule(&self, token: &RuleToken, scope: Option<&LoadedClass>) -> Option<EnumInfo> {
        let class_name = match token {
            RuleToken::Object(object) => {
                if object.short_class() != "Enum" {
                    return None;
                }
                object.property("type")?.as_str()?.to_string()
            }
            RuleToken::Text(_) => {
                if !token.is("enum") {
                    return None;
                }
                token.arguments().first()?.to_string()
            }
            RuleToken::Expression(text) => enum_call_regex()
                .captures(text)
                .and_then(|c| c.get(1))?
                .as_str()
                .to_string(),
        };
        let fqn = self.resolve(&class_name, scope)?;
        self.enum_info(&fqn)
    }

    /// First enum among a field's rule tokens
    pub fn analyze_tokens(&self, tokens: &[RuleToken], scope: Option<&LoadedClass>) -> Option<EnumInfo> {
        tokens
            .iter()
            .find_map(|token| self.analyze_validation_rule(token, scope))
    }

    /// Model cast value (`Status::class` as written, or its FQN)
    pub fn analyze_cast(&self, cast: &str, model: &LoadedClass) -> Option<EnumInfo> {
        let cast = cast.trim();
        let class_name = cast
            .strip_prefix("enum:")
            .unwrap_or(cast)
            .trim_end_matches("::class");
        if class_name.is_empty() || !class_name.chars().next().is_some_and(|c| c.is_ascii_uppercase() || c == '\\') {
            return None;
        }
        let fqn = self.resolve(class_name, Some(model))?;
        self.enum_info(&fqn)
    }

    /// Resolve a class name written in `scope`, or accept it verbatim when it
    /// is known to the repository
    pub fn resolve(&self, name: &str, scope: Option<&LoadedClass>) -> Option<String> {
        match scope {
            Some(scope) => self
                .ctx
                .resolve_class_name(name, &scope.file, Some(scope.class())),
            None => {
                let name = name.trim_start_matches('\\');
                self.ctx.repository.exists(name).then(|| name.to_string())
            }
        }
    }

    /// Cases of an enum declaration; `None` for anything that is not an enum
    pub fn enum_info(&self, fqn: &str) -> Option<EnumInfo> {
        let loaded = match self.ctx.load_class(fqn) {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!("Enum {} not loadable: {}", fqn, e);
                return None;
            }
        };
        let decl = loaded.class();
        if decl.kind != ClassKind::Enum {
            debug!("{} is not an enum", fqn);
            return None;
        }

        let value_type = match decl.backing_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("int") => SchemaType::Integer,
            _ => SchemaType::String,
        };
        let values: Vec<Value> = decl
            .cases
            .iter()
            .filter_map(|case| match (&case.value, decl.backing_type.is_some()) {
                (Some(Expr::Literal(Literal::String(s))), _) => Some(Value::from(s.clone())),
                (Some(value), _) => value.as_int().map(Value::from),
                (None, false) => Some(Value::from(case.name.clone())),
                (None, true) => None,
            })
            .collect();

        Some(EnumInfo {
            class: loaded.fqn.clone(),
            value_type,
            values,
        })
    }
}
