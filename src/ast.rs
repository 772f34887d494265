//! Owned, typed PHP syntax tree.
//!
//! The tree-sitter concrete syntax tree is lowered into these types once per
//! file (see [`crate::parser`]). Analyzers only ever match on this AST.

use std::path::PathBuf;

/// A parsed PHP source file
#[derive(Debug, Clone, PartialEq)]
pub struct PhpFile {
    pub path: PathBuf,
    /// Raw source text, kept for the text-based fallbacks
    pub source: String,
    /// First namespace declared in the file
    pub namespace: Option<String>,
    pub uses: Vec<UseStatement>,
    /// Named class-like declarations (classes, interfaces, traits, enums)
    pub classes: Vec<ClassDecl>,
    /// Top-level statements other than declarations (route files, scripts)
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Class,
    Function,
    Const,
}

/// One imported name; grouped imports are flattened into several of these
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseStatement {
    /// Fully-qualified name without leading backslash
    pub name: String,
    pub alias: Option<String>,
    pub kind: UseKind,
}

impl UseStatement {
    /// The name this import is visible under
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias.as_str(),
            None => short_name(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// `None` for anonymous classes
    pub name: Option<String>,
    pub kind: ClassKind,
    /// Namespace the declaration lives in
    pub namespace: Option<String>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub traits: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub is_abstract: bool,
    pub methods: Vec<MethodDecl>,
    pub properties: Vec<PropertyDecl>,
    pub constants: Vec<ConstDecl>,
    pub cases: Vec<EnumCase>,
    /// `string` / `int` for backed enums
    pub backing_type: Option<String>,
    pub doc_comment: Option<String>,
    /// 1-based line of the declaration
    pub start_line: usize,
    pub end_line: usize,
}

impl ClassDecl {
    /// Fully-qualified name of a named declaration
    pub fn fqn(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        Some(match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, name),
            _ => name.clone(),
        })
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstDecl> {
        self.constants.iter().find(|c| c.name == name)
    }

    pub fn attribute(&self, short: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| short_name(&a.name).eq_ignore_ascii_case(short))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    /// `None` for abstract and interface methods
    pub body: Option<Vec<Stmt>>,
    pub attributes: Vec<Attribute>,
    pub doc_comment: Option<String>,
    /// Full source text of the method declaration
    pub source: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl MethodDecl {
    pub fn statements(&self) -> &[Stmt] {
        self.body.as_deref().unwrap_or(&[])
    }

    pub fn attribute(&self, short: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| short_name(&a.name).eq_ignore_ascii_case(short))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Name without the leading `$`
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub variadic: bool,
    pub by_ref: bool,
    /// Set for constructor property promotion
    pub promoted: Option<Visibility>,
    pub attributes: Vec<Attribute>,
}

/// A declared type as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Named(String),
    Nullable(Box<TypeHint>),
    Union(Vec<TypeHint>),
    Intersection(Vec<TypeHint>),
}

impl TypeHint {
    /// Parse a type as written (`?Foo`, `A|B`, `A&B`, `(A&B)|null`)
    pub fn parse(text: &str) -> Option<TypeHint> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(rest) = text.strip_prefix('?') {
            return TypeHint::parse(rest).map(|inner| TypeHint::Nullable(Box::new(inner)));
        }
        let parts = split_top_level(text, '|');
        if parts.len() > 1 {
            let members: Vec<TypeHint> = parts.iter().filter_map(|p| TypeHint::parse(p)).collect();
            return Some(TypeHint::Union(members));
        }
        let inner = text.trim_start_matches('(').trim_end_matches(')');
        let parts = split_top_level(inner, '&');
        if parts.len() > 1 {
            let members: Vec<TypeHint> = parts.iter().filter_map(|p| TypeHint::parse(p)).collect();
            return Some(TypeHint::Intersection(members));
        }
        Some(TypeHint::Named(inner.trim().to_string()))
    }

    /// Every named type mentioned, in order
    pub fn names(&self) -> Vec<&str> {
        match self {
            TypeHint::Named(name) => vec![name.as_str()],
            TypeHint::Nullable(inner) => inner.names(),
            TypeHint::Union(members) | TypeHint::Intersection(members) => {
                members.iter().flat_map(|m| m.names()).collect()
            }
        }
    }

    /// The single named type, looking through `?T` and `T|null`
    pub fn single_name(&self) -> Option<&str> {
        match self {
            TypeHint::Named(name) => Some(name.as_str()),
            TypeHint::Nullable(inner) => inner.single_name(),
            TypeHint::Union(members) => {
                let mut non_null = members
                    .iter()
                    .filter(|m| !matches!(m, TypeHint::Named(n) if n.eq_ignore_ascii_case("null")));
                match (non_null.next(), non_null.next()) {
                    (Some(only), None) => only.single_name(),
                    _ => None,
                }
            }
            TypeHint::Intersection(_) => None,
        }
    }

    pub fn is_union(&self) -> bool {
        match self {
            TypeHint::Union(members) => {
                members
                    .iter()
                    .filter(|m| !matches!(m, TypeHint::Named(n) if n.eq_ignore_ascii_case("null")))
                    .count()
                    > 1
            }
            TypeHint::Nullable(inner) => inner.is_union(),
            _ => false,
        }
    }

    pub fn is_intersection(&self) -> bool {
        match self {
            TypeHint::Intersection(_) => true,
            TypeHint::Nullable(inner) => inner.is_intersection(),
            TypeHint::Union(members) => members.iter().any(|m| m.is_intersection()),
            TypeHint::Named(_) => false,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            TypeHint::Nullable(_) => true,
            TypeHint::Union(members) => members
                .iter()
                .any(|m| matches!(m, TypeHint::Named(n) if n.eq_ignore_ascii_case("null"))),
            TypeHint::Named(n) => n.eq_ignore_ascii_case("mixed") || n.eq_ignore_ascii_case("null"),
            TypeHint::Intersection(_) => false,
        }
    }
}

fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c == separator && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    /// Name without the leading `$`
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub doc_comment: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumCase {
    pub name: String,
    pub value: Option<Expr>,
}

/// `#[Name(args)]`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<Arg>,
}

impl Attribute {
    /// Argument by name, falling back to position
    pub fn arg(&self, name: &str, position: usize) -> Option<&Expr> {
        find_arg(&self.args, name, position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// Named-argument label (`name: value`)
    pub name: Option<String>,
    pub value: Expr,
    pub unpack: bool,
}

/// Look up a call argument by name, falling back to its position among the
/// positional arguments.
pub fn find_arg<'a>(args: &'a [Arg], name: &str, position: usize) -> Option<&'a Expr> {
    if let Some(arg) = args.iter().find(|a| a.name.as_deref() == Some(name)) {
        return Some(&arg.value);
    }
    args.iter()
        .filter(|a| a.name.is_none())
        .nth(position)
        .map(|a| &a.value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Return {
        value: Option<Expr>,
        line: usize,
    },
    If {
        condition: Expr,
        then: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    Foreach {
        subject: Expr,
        key: Option<Expr>,
        value: Expr,
        body: Vec<Stmt>,
    },
    /// `for`, `while` and `do … while`
    Loop {
        condition: Option<Expr>,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<Vec<Stmt>>,
        finally: Option<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    Echo(Vec<Expr>),
    /// A nested class/function declaration inside a body
    Declaration(Box<ClassDecl>),
    /// Statements the analyzers never inspect
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

impl CastKind {
    pub fn from_keyword(keyword: &str) -> Option<CastKind> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(CastKind::Int),
            "float" | "double" | "real" => Some(CastKind::Float),
            "string" | "binary" => Some(CastKind::String),
            "bool" | "boolean" => Some(CastKind::Bool),
            "array" => Some(CastKind::Array),
            "object" => Some(CastKind::Object),
            "unset" => Some(CastKind::Unset),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            CastKind::Int => "int",
            CastKind::Float => "float",
            CastKind::String => "string",
            CastKind::Bool => "bool",
            CastKind::Array => "array",
            CastKind::Object => "object",
            CastKind::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub spread: bool,
}

/// Target of a `new` expression
#[derive(Debug, Clone, PartialEq)]
pub enum NewTarget {
    Named(String),
    Anonymous(Box<ClassDecl>),
    Dynamic(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    /// Empty for `default`
    pub conditions: Vec<Expr>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `$name` (stored without the `$`)
    Variable(String),
    Literal(Literal),
    /// Double-quoted string or heredoc containing interpolation (raw inner text)
    Interpolated(String),
    Array(Vec<ArrayItem>),
    /// Bare or qualified name (constants, class names used as values)
    Name(String),
    /// `Class::CONST` and `Class::class`
    ClassConst {
        class: Box<Expr>,
        name: String,
    },
    StaticProp {
        class: Box<Expr>,
        name: String,
    },
    PropertyFetch {
        object: Box<Expr>,
        name: String,
        nullsafe: bool,
    },
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Arg>,
        nullsafe: bool,
    },
    StaticCall {
        class: Box<Expr>,
        method: String,
        args: Vec<Arg>,
    },
    FuncCall {
        name: String,
        args: Vec<Arg>,
    },
    New {
        target: NewTarget,
        args: Vec<Arg>,
    },
    Cast {
        kind: CastKind,
        expr: Box<Expr>,
    },
    /// `cond ? then : otherwise`; `then` is `None` for the `?:` shorthand
    Ternary {
        condition: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    Coalesce {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        /// Compound operator (`.=`, `??=`), `None` for plain `=`
        op: Option<String>,
        value: Box<Expr>,
    },
    /// `function () {}` and `fn () =>` (arrow bodies become one `return`)
    Closure {
        params: Vec<Param>,
        body: Vec<Stmt>,
        arrow: bool,
    },
    Match {
        subject: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    ArrayAccess {
        object: Box<Expr>,
        index: Option<Box<Expr>>,
    },
    /// Anything the lowering does not model, as raw source
    Other(String),
}

impl Expr {
    pub fn string(value: impl Into<String>) -> Expr {
        Expr::Literal(Literal::String(value.into()))
    }

    /// Value of a plain string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Literal(Literal::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::Literal(Literal::Int(i)) => Some(*i),
            Expr::Unary { op, expr } if op == "-" => expr.as_int().map(|i| -i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ArrayItem]> {
        match self {
            Expr::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Class named by `Foo::class`, `new Foo` or a bare `Foo`
    pub fn class_reference(&self) -> Option<&str> {
        match self {
            Expr::ClassConst { class, name } if name.eq_ignore_ascii_case("class") => {
                match class.as_ref() {
                    Expr::Name(n) => Some(n.as_str()),
                    _ => None,
                }
            }
            Expr::New {
                target: NewTarget::Named(name),
                ..
            } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_this(&self) -> bool {
        matches!(self, Expr::Variable(v) if v == "this")
    }

    /// Whether the expression is a literal (recursively for arrays)
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Array(items) => items
                .iter()
                .all(|i| i.value.is_constant() && i.key.as_ref().map_or(true, |k| k.is_constant())),
            Expr::Unary { op, expr } if op == "-" => expr.is_constant(),
            _ => false,
        }
    }

    /// Walk down a fluent chain to the expression it starts from
    pub fn chain_root(&self) -> &Expr {
        match self {
            Expr::MethodCall { object, .. } | Expr::PropertyFetch { object, .. } => object.chain_root(),
            other => other,
        }
    }

    /// Method names of a fluent chain, innermost first, including a
    /// static call at the root
    pub fn chain_methods(&self) -> Vec<&str> {
        let mut methods = Vec::new();
        let mut current = self;
        loop {
            match current {
                Expr::MethodCall { object, method, .. } => {
                    methods.push(method.as_str());
                    current = object;
                }
                Expr::StaticCall { method, .. } => {
                    methods.push(method.as_str());
                    break;
                }
                _ => break,
            }
        }
        methods.reverse();
        methods
    }
}

/// Array item keyed by a string literal
pub fn string_key(item: &ArrayItem) -> Option<&str> {
    item.key.as_ref().and_then(Expr::as_str)
}

/// First prose line of a `/** ... */` comment
pub fn doc_summary(doc: &str) -> Option<String> {
    doc.lines()
        .map(|line| line.trim().trim_start_matches("/**").trim_end_matches("*/").trim_start_matches('*').trim())
        .find(|line| !line.is_empty() && !line.starts_with('@') && *line != "/")
        .map(str::to_string)
}

/// Trailing segment of a namespaced name
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_hint_parse_variants() {
        assert_eq!(TypeHint::parse("int"), Some(TypeHint::Named("int".into())));
        assert!(TypeHint::parse("?UserResource").unwrap().is_nullable());
        let union = TypeHint::parse("UserResource|AdminResource").unwrap();
        assert!(union.is_union());
        assert_eq!(union.names(), vec!["UserResource", "AdminResource"]);
        let nullable_union = TypeHint::parse("UserResource|null").unwrap();
        assert!(!nullable_union.is_union());
        assert_eq!(nullable_union.single_name(), Some("UserResource"));
        assert!(TypeHint::parse("A&B").unwrap().is_intersection());
        assert!(TypeHint::parse("(A&B)|null").unwrap().is_intersection());
    }

    #[test]
    fn test_use_statement_local_name() {
        let plain = UseStatement {
            name: "App\\Enums\\Status".into(),
            alias: None,
            kind: UseKind::Class,
        };
        assert_eq!(plain.local_name(), "Status");
        let aliased = UseStatement {
            alias: Some("St".into()),
            ..plain
        };
        assert_eq!(aliased.local_name(), "St");
    }

    #[test]
    fn test_find_arg_by_name_and_position() {
        let args = vec![
            Arg {
                name: None,
                value: Expr::string("a"),
                unpack: false,
            },
            Arg {
                name: Some("status".into()),
                value: Expr::Literal(Literal::Int(201)),
                unpack: false,
            },
        ];
        assert_eq!(find_arg(&args, "data", 0).and_then(Expr::as_str), Some("a"));
        assert_eq!(find_arg(&args, "status", 1).and_then(Expr::as_int), Some(201));
        assert!(find_arg(&args, "headers", 2).is_none());
    }

    #[test]
    fn test_chain_methods() {
        let expr = Expr::MethodCall {
            object: Box::new(Expr::StaticCall {
                class: Box::new(Expr::Name("User".into())),
                method: "where".into(),
                args: vec![],
            }),
            method: "get".into(),
            args: vec![],
            nullsafe: false,
        };
        assert_eq!(expr.chain_methods(), vec!["where", "get"]);
    }
}
