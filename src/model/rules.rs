use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A live rule object returned by the runtime fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleObject {
    pub class: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl RuleObject {
    pub fn short_class(&self) -> &str {
        crate::ast::short_name(&self.class)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// One validation rule as recovered from source or runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RuleToken {
    /// `required`, `max:255`, `in:a,b`
    Text(String),
    /// A rule built in code, rendered as PHP (`Rule::enum(Status::class)`)
    Expression(String),
    Object(RuleObject),
}

impl RuleToken {
    pub fn text(value: impl Into<String>) -> Self {
        RuleToken::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RuleToken::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Rule name of a text token, lowercased, without its arguments
    pub fn name(&self) -> Option<String> {
        let text = self.as_text()?;
        let name = text.split_once(':').map_or(text, |(name, _)| name);
        Some(name.trim().to_ascii_lowercase())
    }

    /// Raw argument string of a text token (`max:255` gives `255`)
    pub fn argument(&self) -> Option<&str> {
        self.as_text()?.split_once(':').map(|(_, arg)| arg.trim())
    }

    /// Comma-separated arguments
    pub fn arguments(&self) -> Vec<&str> {
        self.argument()
            .map(|arg| arg.split(',').map(str::trim).filter(|a| !a.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name().as_deref() == Some(name)
    }
}

impl fmt::Display for RuleToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuleToken::Text(text) | RuleToken::Expression(text) => f.write_str(text),
            RuleToken::Object(object) => write!(f, "object:{}", object.class),
        }
    }
}

/// Split a pipe-delimited rule string.
///
/// `regex:` and `not_regex:` take the remainder of the string, since their
/// patterns may contain `|`.
pub fn split_rule_string(rules: &str) -> Vec<RuleToken> {
    let mut tokens = Vec::new();
    let mut rest = rules;
    while !rest.is_empty() {
        let trimmed = rest.trim_start();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("regex:") || lower.starts_with("not_regex:") {
            tokens.push(RuleToken::text(trimmed.trim_end()));
            break;
        }
        let (head, tail) = match trimmed.split_once('|') {
            Some((head, tail)) => (head, tail),
            None => (trimmed, ""),
        };
        let head = head.trim();
        if !head.is_empty() {
            tokens.push(RuleToken::text(head));
        }
        rest = tail;
    }
    tokens
}

/// Whether a token list makes its field unconditionally required.
///
/// Only a bare `required` counts; `sometimes` cancels it.
pub fn is_required(tokens: &[RuleToken]) -> bool {
    tokens.iter().any(|t| t.is("required")) && !tokens.iter().any(|t| t.is("sometimes"))
}

pub fn is_nullable(tokens: &[RuleToken]) -> bool {
    tokens.iter().any(|t| t.is("nullable"))
}

/// A branch condition of a conditional rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Condition as written (`$this->isMethod('POST')`)
    pub expression: String,
    /// The branch is taken when the condition is false
    #[serde(default)]
    pub negated: bool,
    /// HTTP method tested by `isMethod()` / `method() ===`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
}

impl RuleCondition {
    pub fn description(&self) -> String {
        if self.negated {
            format!("!({})", self.expression)
        } else {
            self.expression.clone()
        }
    }
}

/// Rules in effect on one execution path
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleBranch {
    pub conditions: Vec<RuleCondition>,
    pub rules: BTreeMap<String, Vec<RuleToken>>,
}

impl RuleBranch {
    pub fn description(&self) -> String {
        if self.conditions.is_empty() {
            "always".to_string()
        } else {
            self.conditions
                .iter()
                .map(RuleCondition::description)
                .collect::<Vec<_>>()
                .join(" && ")
        }
    }
}

/// Rule sets that differ per branch, plus their merged view
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalRuleSet {
    pub branches: Vec<RuleBranch>,
    /// Per field, the union of tokens over all branches in branch order; a
    /// later token with the same rule name replaces the earlier one
    pub merged: BTreeMap<String, Vec<RuleToken>>,
    /// Fields unconditionally required in at least one branch
    pub required: BTreeSet<String>,
}

impl ConditionalRuleSet {
    pub fn from_branches(branches: Vec<RuleBranch>) -> Self {
        let mut merged: BTreeMap<String, Vec<RuleToken>> = BTreeMap::new();
        let mut required = BTreeSet::new();
        for branch in &branches {
            for (field, tokens) in &branch.rules {
                if is_required(tokens) {
                    required.insert(field.clone());
                }
                let entry = merged.entry(field.clone()).or_default();
                for token in tokens {
                    let existing = match token.name() {
                        Some(name) => entry.iter().position(|t| t.name().as_deref() == Some(name.as_str())),
                        None => entry.iter().position(|t| t == token),
                    };
                    match existing {
                        Some(index) => entry[index] = token.clone(),
                        None => entry.push(token.clone()),
                    }
                }
            }
        }
        Self {
            branches,
            merged,
            required,
        }
    }

    /// More than one distinct rule set exists
    pub fn has_variants(&self) -> bool {
        self.branches.len() > 1
    }
}

/// Validation rules of one rule-producing method
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRuleSet {
    /// Field (dot path, `*` wildcards allowed) to ordered rule tokens
    pub rules: BTreeMap<String, Vec<RuleToken>>,
    /// Display labels from `attributes()`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Custom messages from `messages()`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRuleSet>,
    /// Class or method the rules came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ValidationRuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, field: &str) -> Option<&[RuleToken]> {
        self.rules.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Whether the field is required, taking conditional branches into account
    pub fn is_required(&self, field: &str) -> bool {
        match &self.conditional {
            Some(conditional) => conditional.required.contains(field),
            None => self.get(field).is_some_and(is_required),
        }
    }

    /// Rules used for type inference: the merged view when conditional
    pub fn effective_rules(&self) -> &BTreeMap<String, Vec<RuleToken>> {
        match &self.conditional {
            Some(conditional) => &conditional.merged,
            None => &self.rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_rule_string() {
        let tokens = split_rule_string("required|string|max:255");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].name().as_deref(), Some("max"));
        assert_eq!(tokens[2].argument(), Some("255"));

        let tokens = split_rule_string("nullable|regex:/^(a|b)$/");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].as_text(), Some("regex:/^(a|b)$/"));
    }

    #[test]
    fn test_required_only_for_bare_required() {
        assert!(is_required(&split_rule_string("required|email")));
        assert!(!is_required(&split_rule_string("required_if:type,admin")));
        assert!(!is_required(&split_rule_string("required_with:a|string")));
        assert!(!is_required(&split_rule_string("sometimes|required")));
    }

    #[test]
    fn test_conditional_merge() {
        let post = RuleBranch {
            conditions: vec![RuleCondition {
                expression: "$this->isMethod('POST')".into(),
                negated: false,
                http_method: Some("POST".into()),
            }],
            rules: BTreeMap::from([("password".to_string(), split_rule_string("required|min:6"))]),
        };
        let other = RuleBranch {
            conditions: vec![RuleCondition {
                negated: true,
                ..post.conditions[0].clone()
            }],
            rules: BTreeMap::from([("password".to_string(), split_rule_string("sometimes|min:8"))]),
        };
        let set = ConditionalRuleSet::from_branches(vec![post, other]);
        assert!(set.required.contains("password"));
        let merged: Vec<String> = set.merged["password"].iter().map(|t| t.to_string()).collect();
        assert_eq!(merged, vec!["required", "min:8", "sometimes"]);
        assert_eq!(set.branches[1].description(), "!($this->isMethod('POST'))");
    }
}
