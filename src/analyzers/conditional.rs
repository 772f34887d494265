//! Path-sensitive walk over a rules method.
//!
//! Each `if`/`elseif`/`else`, `switch` arm, `match` arm and returned ternary
//! forks the current execution path. A path accumulates the conditions that
//! led to it and the rule arrays held in local variables, and ends at the
//! `return` that produced its rule set.

use super::rule_extraction::{Locals, RuleExtractor, RuleMap};
use crate::ast::{Expr, Literal, Stmt};
use crate::model::{RuleBranch, RuleCondition};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Paths beyond this many are dropped
const MAX_PATHS: usize = 32;

fn is_method_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)->isMethod\(\s*'(\w+)'\s*\)").expect("valid regex"))
}

fn method_compare_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)->(?:getMethod|method)\(\)\s*(?:===|==)\s*'(\w+)'|'(\w+)'\s*(?:===|==)\s*\S+->(?:getMethod|method)\(\)")
            .expect("valid regex")
    })
}

/// HTTP method tested by a condition, uppercased
pub fn detect_http_method(condition: &str) -> Option<String> {
    if let Some(caps) = is_method_regex().captures(condition) {
        return Some(caps[1].to_ascii_uppercase());
    }
    method_compare_regex().captures(condition).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_ascii_uppercase())
    })
}

fn condition(expr: &Expr, negated: bool) -> RuleCondition {
    let expression = expr.to_string();
    RuleCondition {
        http_method: detect_http_method(&expression),
        expression,
        negated,
    }
}

#[derive(Debug, Clone, Default)]
struct ExecPath {
    conditions: Vec<RuleCondition>,
    locals: Locals,
    returned: Option<RuleMap>,
}

impl ExecPath {
    fn fork(&self, extra: impl IntoIterator<Item = RuleCondition>) -> ExecPath {
        let mut path = self.clone();
        path.conditions.extend(extra);
        path
    }
}

pub struct RuleWalker<'e, 'a> {
    extractor: &'e RuleExtractor<'a>,
}

impl<'e, 'a> RuleWalker<'e, 'a> {
    pub fn new(extractor: &'e RuleExtractor<'a>) -> Self {
        Self { extractor }
    }

    /// One branch per distinct returned rule set. A single branch carries no
    /// conditions.
    pub fn walk(&self, stmts: &[Stmt]) -> Vec<RuleBranch> {
        let paths = self.walk_block(stmts, vec![ExecPath::default()]);

        let mut branches: Vec<RuleBranch> = Vec::new();
        for path in paths {
            let Some(rules) = path.returned else { continue };
            if branches.iter().any(|b| b.rules == rules) {
                continue;
            }
            branches.push(RuleBranch {
                conditions: path.conditions,
                rules,
            });
        }
        if let [only] = branches.as_mut_slice() {
            only.conditions.clear();
        }
        branches
    }

    fn walk_block(&self, stmts: &[Stmt], mut paths: Vec<ExecPath>) -> Vec<ExecPath> {
        for stmt in stmts {
            let (done, live): (Vec<ExecPath>, Vec<ExecPath>) =
                paths.into_iter().partition(|p| p.returned.is_some());
            if live.is_empty() {
                return done;
            }
            let mut next = done;
            next.extend(self.walk_stmt(stmt, live));
            if next.len() > MAX_PATHS {
                debug!(
                    "Rule paths in {} exceed {}, dropping the rest",
                    self.extractor.scope().fqn,
                    MAX_PATHS
                );
                next.truncate(MAX_PATHS);
            }
            paths = next;
        }
        paths
    }

    fn walk_stmt(&self, stmt: &Stmt, paths: Vec<ExecPath>) -> Vec<ExecPath> {
        match stmt {
            Stmt::Expr(expr) => paths
                .into_iter()
                .map(|mut path| {
                    self.apply_expr(expr, &mut path.locals);
                    path
                })
                .collect(),
            Stmt::Return { value, .. } => paths
                .into_iter()
                .flat_map(|path| self.apply_return(value.as_ref(), path))
                .collect(),
            Stmt::If {
                condition: first,
                then,
                else_ifs,
                otherwise,
            } => {
                let mut out = Vec::new();
                for path in paths {
                    let mut previous: Vec<&Expr> = Vec::new();
                    let arms = std::iter::once((first, then)).chain(else_ifs.iter().map(|(c, b)| (c, b)));
                    for (test, body) in arms {
                        let forked = path.fork(
                            previous
                                .iter()
                                .map(|e| condition(e, true))
                                .chain(std::iter::once(condition(test, false))),
                        );
                        out.extend(self.walk_block(body, vec![forked]));
                        previous.push(test);
                    }
                    let fallback = path.fork(previous.iter().map(|e| condition(e, true)));
                    match otherwise {
                        Some(body) => out.extend(self.walk_block(body, vec![fallback])),
                        None => out.push(fallback),
                    }
                }
                out
            }
            Stmt::Switch { subject, cases } => {
                let mut out = Vec::new();
                for path in paths {
                    let mut has_default = false;
                    for (index, case) in cases.iter().enumerate() {
                        // Empty cases fall through to the next body
                        if case.body.is_empty() {
                            continue;
                        }
                        let test = match &case.test {
                            Some(test) => RuleCondition {
                                expression: format!("{} === {}", subject, test),
                                negated: false,
                                http_method: http_method_of_case(subject, test),
                            },
                            None => {
                                has_default = true;
                                RuleCondition {
                                    expression: format!("{} is any other value", subject),
                                    negated: false,
                                    http_method: None,
                                }
                            }
                        };
                        let forked = path.fork(std::iter::once(test));
                        let body: Vec<Stmt> = cases[index..]
                            .iter()
                            .flat_map(|c| c.body.iter().cloned())
                            .take_while(|s| !matches!(s, Stmt::Other(raw) if raw.trim_start().starts_with("break")))
                            .collect();
                        out.extend(self.walk_block(&body, vec![forked]));
                    }
                    if !has_default {
                        out.push(path);
                    }
                }
                out
            }
            Stmt::Block(body) | Stmt::Foreach { body, .. } | Stmt::Loop { body, .. } => {
                self.walk_block(body, paths)
            }
            Stmt::Try { body, finally, .. } => {
                let paths = self.walk_block(body, paths);
                match finally {
                    Some(finally) => self.walk_block(finally, paths),
                    None => paths,
                }
            }
            Stmt::Echo(_) | Stmt::Declaration(_) | Stmt::Other(_) => paths,
        }
    }

    fn apply_return(&self, value: Option<&Expr>, path: ExecPath) -> Vec<ExecPath> {
        let Some(value) = value else {
            return vec![ExecPath {
                returned: Some(RuleMap::new()),
                ..path
            }];
        };
        match value {
            Expr::Ternary {
                condition: test,
                then: Some(then),
                otherwise,
            } => {
                let mut out = self.apply_return(Some(then), path.fork(std::iter::once(condition(test, false))));
                out.extend(self.apply_return(Some(otherwise), path.fork(std::iter::once(condition(test, true)))));
                out
            }
            Expr::Match { subject, arms } => arms
                .iter()
                .flat_map(|arm| {
                    let expression = if arm.conditions.is_empty() {
                        format!("{} is any other value", subject)
                    } else {
                        let values: Vec<String> = arm.conditions.iter().map(|c| c.to_string()).collect();
                        format!("{} in [{}]", subject, values.join(", "))
                    };
                    let http_method = arm
                        .conditions
                        .first()
                        .and_then(|test| http_method_of_case(subject, test));
                    self.apply_return(
                        Some(&arm.body),
                        path.fork(std::iter::once(RuleCondition {
                            expression,
                            negated: false,
                            http_method,
                        })),
                    )
                })
                .collect(),
            other => {
                let rules = self
                    .extractor
                    .rules_map(other, &path.locals)
                    .unwrap_or_default();
                vec![ExecPath {
                    returned: Some(rules),
                    ..path
                }]
            }
        }
    }

    /// Track assignments that build rule arrays
    fn apply_expr(&self, expr: &Expr, locals: &mut Locals) {
        let Expr::Assign { target, op, value } = expr else {
            return;
        };
        match (target.as_ref(), op.as_deref()) {
            (Expr::Variable(name), None) => match self.extractor.rules_map(value, locals) {
                Some(rules) => {
                    locals.insert(name.clone(), rules);
                }
                None => {
                    locals.remove(name);
                }
            },
            (Expr::Variable(name), Some("+=")) => {
                if let (Some(extra), Some(existing)) = (self.extractor.rules_map(value, locals), locals.get_mut(name)) {
                    for (field, tokens) in extra {
                        existing.entry(field).or_insert(tokens);
                    }
                }
            }
            (Expr::ArrayAccess { object, index: Some(key) }, None) => {
                let Expr::Variable(name) = object.as_ref() else { return };
                let Some(field) = self.extractor.field_key(key) else { return };
                if let Some(rules) = locals.get_mut(name) {
                    rules.insert(field, self.extractor.tokens(value));
                }
            }
            (Expr::ArrayAccess { object, index: None }, None) => {
                let Expr::ArrayAccess {
                    object: inner,
                    index: Some(key),
                } = object.as_ref()
                else {
                    return;
                };
                let Expr::Variable(name) = inner.as_ref() else { return };
                let Some(field) = self.extractor.field_key(key) else { return };
                if let Some(rules) = locals.get_mut(name) {
                    rules.entry(field).or_default().extend(self.extractor.tokens(value));
                }
            }
            _ => {}
        }
    }
}

/// `switch ($this->method()) { case 'POST': ... }`
fn http_method_of_case(subject: &Expr, test: &Expr) -> Option<String> {
    let subject = subject.to_string();
    if !(subject.ends_with("->method()") || subject.ends_with("->getMethod()")) {
        return None;
    }
    match test {
        Expr::Literal(Literal::String(m)) => Some(m.to_ascii_uppercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalysisContext;
    use crate::model::rules::is_required;
    use crate::model::{ConditionalRuleSet, RuleToken};

    fn branches(body: &str) -> Vec<RuleBranch> {
        let source = format!(
            "<?php\nnamespace App\\Http\\Requests;\n\nclass UserRequest\n{{\n    public function rules(): array\n    {{\n{}\n    }}\n}}\n",
            body
        );
        let ctx = AnalysisContext::in_memory(&[("app/Http/Requests/UserRequest.php", source.as_str())]);
        let scope = ctx.load_class("App\\Http\\Requests\\UserRequest").unwrap();
        RuleExtractor::new(&ctx, &scope).method_branches("rules").unwrap()
    }

    #[test]
    fn test_http_method_detection() {
        assert_eq!(detect_http_method("$this->isMethod('post')").as_deref(), Some("POST"));
        assert_eq!(detect_http_method("$this->method() === 'PUT'").as_deref(), Some("PUT"));
        assert_eq!(detect_http_method("'PATCH' == $request->getMethod()").as_deref(), Some("PATCH"));
        assert_eq!(detect_http_method("$this->has('x')"), None);
    }

    #[test]
    fn test_if_else_returns_fork() {
        let branches = branches(
            r#"
        if ($this->isMethod('POST')) {
            return ['password' => 'required|min:6'];
        }
        return ['password' => 'sometimes|min:6'];
"#,
        );
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].conditions[0].http_method.as_deref(), Some("POST"));
        assert!(!branches[0].conditions[0].negated);
        assert!(branches[1].conditions[0].negated);
        assert!(is_required(&branches[0].rules["password"]));
        assert!(!is_required(&branches[1].rules["password"]));

        let set = ConditionalRuleSet::from_branches(branches);
        assert!(set.required.contains("password"));
        assert!(set.merged["password"].contains(&RuleToken::text("min:6")));
    }

    #[test]
    fn test_variable_built_rules() {
        let branches = branches(
            r#"
        $rules = ['name' => 'required|string'];
        if ($this->user()->isAdmin()) {
            $rules['role'] = ['required', 'string'];
        } else {
            $rules['name'][] = 'max:50';
        }
        $rules += ['email' => 'email'];
        return $rules;
"#,
        );
        assert_eq!(branches.len(), 2);
        assert!(branches[0].rules.contains_key("role"));
        assert!(branches[0].rules.contains_key("email"));
        assert_eq!(branches[1].rules["name"].last(), Some(&RuleToken::text("max:50")));
        assert_eq!(branches[1].description(), "!($this->user()->isAdmin())");
    }

    #[test]
    fn test_unconditional_body_has_single_branch() {
        let branches = branches(
            r#"
        if ($this->has('x')) {
            logger('x');
        }
        return ['title' => 'required'];
"#,
        );
        assert_eq!(branches.len(), 1);
        assert!(branches[0].conditions.is_empty());
    }

    #[test]
    fn test_match_on_method_forks() {
        let branches = branches(
            r#"
        return match ($this->method()) {
            'POST' => ['name' => 'required'],
            default => ['name' => 'sometimes'],
        };
"#,
        );
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].conditions[0].http_method.as_deref(), Some("POST"));
    }
}
