//! Canonical PHP rendering of AST expressions.
//!
//! The rendering is what non-literal rule objects are serialised to
//! (`Rule::enum(Status::class)`, `Password::min(8)->mixedCase()`) and what
//! condition descriptions are built from.

use crate::ast::*;
use std::fmt::{self, Display, Formatter, Write};

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => {
                f.write_char('\'')?;
                for c in s.chars() {
                    if c == '\'' || c == '\\' {
                        f.write_char('\\')?;
                    }
                    f.write_char(c)?;
                }
                f.write_char('\'')
            }
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Literal::Bool(true) => f.write_str("true"),
            Literal::Bool(false) => f.write_str("false"),
            Literal::Null => f.write_str("null"),
        }
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        if self.unpack {
            f.write_str("...")?;
        }
        write!(f, "{}", self.value)
    }
}

impl Display for ArrayItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.spread {
            f.write_str("...")?;
        }
        if let Some(key) = &self.key {
            write!(f, "{} => ", key)?;
        }
        if self.by_ref {
            f.write_char('&')?;
        }
        write!(f, "{}", self.value)
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(hint) = &self.type_hint {
            write!(f, "{} ", hint)?;
        }
        if self.by_ref {
            f.write_char('&')?;
        }
        if self.variadic {
            f.write_str("...")?;
        }
        write!(f, "${}", self.name)?;
        if let Some(default) = &self.default {
            write!(f, " = {}", default)?;
        }
        Ok(())
    }
}

impl Display for TypeHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Named(name) => f.write_str(name),
            TypeHint::Nullable(inner) => write!(f, "?{}", inner),
            TypeHint::Union(members) => write_joined(f, members, "|"),
            TypeHint::Intersection(members) => write_joined(f, members, "&"),
        }
    }
}

fn write_joined<T: Display>(f: &mut Formatter<'_>, items: &[T], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_args(f: &mut Formatter<'_>, args: &[Arg]) -> fmt::Result {
    f.write_char('(')?;
    write_joined(f, args, ", ")?;
    f.write_char(')')
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Variable(name) => write!(f, "${}", name),
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Interpolated(raw) => {
                if raw.starts_with("<<<") {
                    f.write_str(raw)
                } else {
                    write!(f, "\"{}\"", raw)
                }
            }
            Expr::Array(items) => {
                f.write_char('[')?;
                write_joined(f, items, ", ")?;
                f.write_char(']')
            }
            Expr::Name(name) => f.write_str(name),
            Expr::ClassConst { class, name } => write!(f, "{}::{}", class, name),
            Expr::StaticProp { class, name } => write!(f, "{}::${}", class, name),
            Expr::PropertyFetch {
                object,
                name,
                nullsafe,
            } => write!(f, "{}{}{}", object, if *nullsafe { "?->" } else { "->" }, name),
            Expr::MethodCall {
                object,
                method,
                args,
                nullsafe,
            } => {
                write!(f, "{}{}{}", object, if *nullsafe { "?->" } else { "->" }, method)?;
                write_args(f, args)
            }
            Expr::StaticCall {
                class,
                method,
                args,
            } => {
                write!(f, "{}::{}", class, method)?;
                write_args(f, args)
            }
            Expr::FuncCall { name, args } => {
                f.write_str(name)?;
                write_args(f, args)
            }
            Expr::New { target, args } => {
                match target {
                    NewTarget::Named(name) => write!(f, "new {}", name)?,
                    NewTarget::Anonymous(_) => f.write_str("new class")?,
                    NewTarget::Dynamic(expr) => write!(f, "new {}", expr)?,
                }
                write_args(f, args)
            }
            Expr::Cast { kind, expr } => write!(f, "({}) {}", kind.keyword(), expr),
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => match then {
                Some(then) => write!(f, "{} ? {} : {}", condition, then, otherwise),
                None => write!(f, "{} ?: {}", condition, otherwise),
            },
            Expr::Coalesce { left, right } => write!(f, "{} ?? {}", left, right),
            Expr::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Unary { op, expr } => write!(f, "{}{}", op, expr),
            Expr::Assign { target, op, value } => {
                write!(f, "{} {} {}", target, op.as_deref().unwrap_or("="), value)
            }
            Expr::Closure { params, arrow, body } => {
                if *arrow {
                    f.write_str("fn (")?;
                    write_joined(f, params, ", ")?;
                    f.write_str(") => ")?;
                    match body.first() {
                        Some(Stmt::Return {
                            value: Some(value), ..
                        }) => write!(f, "{}", value),
                        _ => f.write_str("null"),
                    }
                } else {
                    f.write_str("function (")?;
                    write_joined(f, params, ", ")?;
                    f.write_str(") { ... }")
                }
            }
            Expr::Match { subject, arms } => {
                write!(f, "match ({}) {{ ", subject)?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if arm.conditions.is_empty() {
                        f.write_str("default")?;
                    } else {
                        write_joined(f, &arm.conditions, ", ")?;
                    }
                    write!(f, " => {}", arm.body)?;
                }
                f.write_str(" }")
            }
            Expr::ArrayAccess { object, index } => match index {
                Some(index) => write!(f, "{}[{}]", object, index),
                None => write!(f, "{}[]", object),
            },
            Expr::Other(raw) => f.write_str(raw.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_source;
    use crate::ast::Stmt;
    use std::path::Path;

    fn render(expr_source: &str) -> String {
        let code = format!("<?php {};", expr_source);
        let file = parse_source(Path::new("t.php"), &code).unwrap();
        match &file.statements[0] {
            Stmt::Expr(expr) => expr.to_string(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_render_rule_objects() {
        assert_eq!(render("Rule::enum(Status::class)"), "Rule::enum(Status::class)");
        assert_eq!(
            render("Password::min(8)->mixedCase()->numbers()"),
            "Password::min(8)->mixedCase()->numbers()"
        );
        assert_eq!(render("new Enum(\\App\\Enums\\Status::class)"), "new Enum(App\\Enums\\Status::class)");
        assert_eq!(render("Rule::in(['a', 'b'])"), "Rule::in(['a', 'b'])");
    }

    #[test]
    fn test_render_conditions() {
        assert_eq!(render("$this->isMethod('POST')"), "$this->isMethod('POST')");
        assert_eq!(render("!$request->has('x')"), "!$request->has('x')");
        assert_eq!(render("$a ?? 'b'"), "$a ?? 'b'");
        assert_eq!(render("$user?->name"), "$user?->name");
    }
}
