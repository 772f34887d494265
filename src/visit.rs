//! Read-only traversal over the PHP AST.
//!
//! Each method of [`Visit`] has a default implementation that recurses via
//! the matching `walk_*` function, so a visitor only overrides the node kinds
//! it is interested in. Overriding without calling `walk_*` prunes the
//! subtree.

use crate::ast::*;

pub trait Visit<'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    /// Closure and arrow-function bodies
    fn visit_closure(&mut self, params: &'ast [Param], body: &'ast [Stmt]) {
        walk_closure(self, params, body);
    }

    /// Class declarations nested in a body, including anonymous classes
    fn visit_class(&mut self, class: &'ast ClassDecl) {
        walk_class(self, class);
    }
}

/// Apply a visitor to every statement of a list
pub fn traverse<'ast, V>(stmts: &'ast [Stmt], visitor: &mut V)
where
    V: Visit<'ast> + ?Sized,
{
    for stmt in stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V>(v: &mut V, stmt: &'ast Stmt)
where
    V: Visit<'ast> + ?Sized,
{
    match stmt {
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::If {
            condition,
            then,
            else_ifs,
            otherwise,
        } => {
            v.visit_expr(condition);
            traverse(then, v);
            for (cond, body) in else_ifs {
                v.visit_expr(cond);
                traverse(body, v);
            }
            if let Some(otherwise) = otherwise {
                traverse(otherwise, v);
            }
        }
        Stmt::Foreach {
            subject,
            key,
            value,
            body,
        } => {
            v.visit_expr(subject);
            if let Some(key) = key {
                v.visit_expr(key);
            }
            v.visit_expr(value);
            traverse(body, v);
        }
        Stmt::Loop { condition, body } => {
            if let Some(condition) = condition {
                v.visit_expr(condition);
            }
            traverse(body, v);
        }
        Stmt::Switch { subject, cases } => {
            v.visit_expr(subject);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                traverse(&case.body, v);
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            traverse(body, v);
            for catch in catches {
                traverse(catch, v);
            }
            if let Some(finally) = finally {
                traverse(finally, v);
            }
        }
        Stmt::Block(body) => traverse(body, v),
        Stmt::Echo(exprs) => {
            for expr in exprs {
                v.visit_expr(expr);
            }
        }
        Stmt::Declaration(class) => v.visit_class(class),
        Stmt::Other(_) => {}
    }
}

fn walk_args<'ast, V>(v: &mut V, args: &'ast [Arg])
where
    V: Visit<'ast> + ?Sized,
{
    for arg in args {
        v.visit_expr(&arg.value);
    }
}

pub fn walk_expr<'ast, V>(v: &mut V, expr: &'ast Expr)
where
    V: Visit<'ast> + ?Sized,
{
    match expr {
        Expr::Variable(_)
        | Expr::Literal(_)
        | Expr::Interpolated(_)
        | Expr::Name(_)
        | Expr::Other(_) => {}
        Expr::Array(items) => {
            for item in items {
                if let Some(key) = &item.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&item.value);
            }
        }
        Expr::ClassConst { class, .. } | Expr::StaticProp { class, .. } => v.visit_expr(class),
        Expr::PropertyFetch { object, .. } => v.visit_expr(object),
        Expr::MethodCall { object, args, .. } => {
            v.visit_expr(object);
            walk_args(v, args);
        }
        Expr::StaticCall { class, args, .. } => {
            v.visit_expr(class);
            walk_args(v, args);
        }
        Expr::FuncCall { args, .. } => walk_args(v, args),
        Expr::New { target, args } => {
            match target {
                NewTarget::Anonymous(class) => v.visit_class(class),
                NewTarget::Dynamic(expr) => v.visit_expr(expr),
                NewTarget::Named(_) => {}
            }
            walk_args(v, args);
        }
        Expr::Cast { expr, .. } | Expr::Unary { expr, .. } => v.visit_expr(expr),
        Expr::Ternary {
            condition,
            then,
            otherwise,
        } => {
            v.visit_expr(condition);
            if let Some(then) = then {
                v.visit_expr(then);
            }
            v.visit_expr(otherwise);
        }
        Expr::Coalesce { left, right } | Expr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Closure { params, body, .. } => v.visit_closure(params, body),
        Expr::Match { subject, arms } => {
            v.visit_expr(subject);
            for arm in arms {
                for condition in &arm.conditions {
                    v.visit_expr(condition);
                }
                v.visit_expr(&arm.body);
            }
        }
        Expr::ArrayAccess { object, index } => {
            v.visit_expr(object);
            if let Some(index) = index {
                v.visit_expr(index);
            }
        }
    }
}

pub fn walk_closure<'ast, V>(v: &mut V, params: &'ast [Param], body: &'ast [Stmt])
where
    V: Visit<'ast> + ?Sized,
{
    for param in params {
        if let Some(default) = &param.default {
            v.visit_expr(default);
        }
    }
    traverse(body, v);
}

pub fn walk_class<'ast, V>(v: &mut V, class: &'ast ClassDecl)
where
    V: Visit<'ast> + ?Sized,
{
    for method in &class.methods {
        traverse(method.statements(), v);
    }
}

/// Collects the values of `return` statements of one function body.
///
/// Closures and nested classes have their own returns and are skipped.
#[derive(Default)]
pub struct ReturnCollector<'ast> {
    pub returns: Vec<&'ast Expr>,
    /// `return;` statements without a value
    pub bare_returns: usize,
}

impl<'ast> ReturnCollector<'ast> {
    pub fn collect(stmts: &'ast [Stmt]) -> Self {
        let mut collector = Self::default();
        traverse(stmts, &mut collector);
        collector
    }
}

impl<'ast> Visit<'ast> for ReturnCollector<'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Return { value: Some(value), .. } => self.returns.push(value),
            Stmt::Return { value: None, .. } => self.bare_returns += 1,
            other => walk_stmt(self, other),
        }
    }

    fn visit_expr(&mut self, _expr: &'ast Expr) {}

    fn visit_class(&mut self, _class: &'ast ClassDecl) {}
}

/// Collects every call expression (method, static and function calls),
/// including those inside closures.
#[derive(Default)]
pub struct CallCollector<'ast> {
    pub calls: Vec<&'ast Expr>,
}

impl<'ast> CallCollector<'ast> {
    pub fn collect(stmts: &'ast [Stmt]) -> Self {
        let mut collector = Self::default();
        traverse(stmts, &mut collector);
        collector
    }

    /// Method calls with the given name, in source order
    pub fn method_calls<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'ast Expr> + 'a {
        self.calls.iter().copied().filter(move |c| {
            matches!(c, Expr::MethodCall { method, .. } if method.eq_ignore_ascii_case(name))
        })
    }
}

impl<'ast> Visit<'ast> for CallCollector<'ast> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if matches!(
            expr,
            Expr::MethodCall { .. } | Expr::StaticCall { .. } | Expr::FuncCall { .. }
        ) {
            self.calls.push(expr);
        }
        walk_expr(self, expr);
    }

    fn visit_class(&mut self, _class: &'ast ClassDecl) {}
}

/// Finds anonymous class declarations anywhere in a statement list
#[derive(Default)]
pub struct AnonymousClassFinder<'ast> {
    pub classes: Vec<&'ast ClassDecl>,
}

impl<'ast> AnonymousClassFinder<'ast> {
    pub fn collect(stmts: &'ast [Stmt]) -> Self {
        let mut finder = Self::default();
        traverse(stmts, &mut finder);
        finder
    }
}

impl<'ast> Visit<'ast> for AnonymousClassFinder<'ast> {
    fn visit_class(&mut self, class: &'ast ClassDecl) {
        if class.name.is_none() {
            self.classes.push(class);
        }
        walk_class(self, class);
    }
}

/// Tracks the last value assigned to each local variable, in statement order.
///
/// Only straight-line, plain `=` assignments count; an assignment inside a
/// branch overwrites the tracked value all the same.
#[derive(Default)]
pub struct AssignmentTracker<'ast> {
    assignments: Vec<(&'ast str, &'ast Expr)>,
}

impl<'ast> AssignmentTracker<'ast> {
    pub fn collect(stmts: &'ast [Stmt]) -> Self {
        let mut tracker = Self::default();
        traverse(stmts, &mut tracker);
        tracker
    }

    /// Last value assigned to `$name`
    pub fn last(&self, name: &str) -> Option<&'ast Expr> {
        self.assignments
            .iter()
            .rev()
            .find(|(var, _)| *var == name)
            .map(|(_, value)| *value)
    }
}

impl<'ast> Visit<'ast> for AssignmentTracker<'ast> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Assign {
            target,
            op: None,
            value,
        } = expr
        {
            if let Expr::Variable(name) = target.as_ref() {
                self.assignments.push((name.as_str(), value.as_ref()));
            }
        }
        walk_expr(self, expr);
    }

    fn visit_closure(&mut self, _params: &'ast [Param], _body: &'ast [Stmt]) {}

    fn visit_class(&mut self, _class: &'ast ClassDecl) {}
}

/// Resolve a returned expression to a literal array, following one level of
/// `$var = [...]; return $var;`.
pub fn returned_array<'ast>(value: &'ast Expr, stmts: &'ast [Stmt]) -> Option<&'ast [ArrayItem]> {
    match value {
        Expr::Array(items) => Some(items),
        Expr::Variable(name) => AssignmentTracker::collect(stmts)
            .last(name)
            .and_then(Expr::as_array),
        _ => None,
    }
}
