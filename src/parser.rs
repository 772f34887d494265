use crate::ast::*;
use crate::error::AnalyzerError;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tree_sitter::{Node, Parser};

/// AST parser for PHP source files.
///
/// The `AstParser` uses `tree-sitter-php` to build a concrete syntax tree and
/// lowers it into the owned [`PhpFile`] AST. Results are memoized per path;
/// a memoized file is never mutated afterwards, so the `Rc` can be handed to
/// any number of analyzers.
///
/// In-memory sources registered with [`AstParser::add_source`] shadow the file
/// system, which is how tests and editor integrations feed unsaved text.
#[derive(Default)]
pub struct AstParser {
    overlay: RefCell<HashMap<PathBuf, String>>,
    cache: RefCell<HashMap<PathBuf, CachedParse>>,
}

#[derive(Clone)]
enum CachedParse {
    Parsed(Rc<PhpFile>),
    Missing,
    Invalid(String),
}

impl AstParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register source text for a path, replacing any cached parse.
    pub fn add_source(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
        let path = path.into();
        self.cache.borrow_mut().remove(&path);
        self.overlay.borrow_mut().insert(path, source.into());
    }

    /// Source text for a path, from the overlay or the file system
    pub fn read_source(&self, path: &Path) -> Option<String> {
        if let Some(source) = self.overlay.borrow().get(path) {
            return Some(source.clone());
        }
        fs::read_to_string(path).ok()
    }

    /// Whether the parser knows a file at this path
    pub fn has_source(&self, path: &Path) -> bool {
        self.overlay.borrow().contains_key(path) || path.is_file()
    }

    /// Paths registered through the overlay
    pub fn overlay_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.overlay.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Parses a PHP file, returning `None` (with a logged warning) when the
    /// file cannot be read or contains syntax errors.
    pub fn parse_file(&self, path: &Path) -> Option<Rc<PhpFile>> {
        match self.try_parse_file(path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Parses a PHP file, keeping the failure reason.
    pub fn try_parse_file(&self, path: &Path) -> Result<Rc<PhpFile>, AnalyzerError> {
        if let Some(cached) = self.cache.borrow().get(path) {
            return match cached {
                CachedParse::Parsed(file) => Ok(Rc::clone(file)),
                CachedParse::Missing => Err(AnalyzerError::FileNotFound(path.to_path_buf())),
                CachedParse::Invalid(message) => Err(AnalyzerError::Parse {
                    file: path.to_path_buf(),
                    message: message.clone(),
                }),
            };
        }

        debug!("Parsing file: {}", path.display());
        let entry = match self.read_source(path) {
            None => CachedParse::Missing,
            Some(source) => match parse_source(path, &source) {
                Ok(file) => CachedParse::Parsed(Rc::new(file)),
                Err(AnalyzerError::Parse { message, .. }) => CachedParse::Invalid(message),
                Err(other) => CachedParse::Invalid(other.to_string()),
            },
        };
        self.cache
            .borrow_mut()
            .insert(path.to_path_buf(), entry.clone());

        match entry {
            CachedParse::Parsed(file) => Ok(file),
            CachedParse::Missing => Err(AnalyzerError::FileNotFound(path.to_path_buf())),
            CachedParse::Invalid(message) => Err(AnalyzerError::Parse {
                file: path.to_path_buf(),
                message,
            }),
        }
    }

    /// Parses several files, continuing past failures.
    pub fn parse_files(&self, paths: &[PathBuf]) -> Vec<Option<Rc<PhpFile>>> {
        debug!("Parsing {} files", paths.len());
        let results: Vec<Option<Rc<PhpFile>>> = paths.iter().map(|p| self.parse_file(p)).collect();
        let success_count = results.iter().filter(|r| r.is_some()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );
        results
    }
}

/// Parse PHP source text into the owned AST.
pub fn parse_source(path: &Path, source: &str) -> Result<PhpFile, AnalyzerError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
        .map_err(|e| AnalyzerError::Parse {
            file: path.to_path_buf(),
            message: format!("failed to load PHP grammar: {}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| AnalyzerError::Parse {
        file: path.to_path_buf(),
        message: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let position = first_error(root)
            .map(|n| {
                let p = n.start_position();
                format!("line {}, column {}", p.row + 1, p.column + 1)
            })
            .unwrap_or_else(|| "unknown position".to_string());
        return Err(AnalyzerError::Parse {
            file: path.to_path_buf(),
            message: format!("syntax error at {}", position),
        });
    }

    let mut file = PhpFile {
        path: path.to_path_buf(),
        source: source.to_string(),
        namespace: None,
        uses: Vec::new(),
        classes: Vec::new(),
        statements: Vec::new(),
    };
    let mut lowerer = Lowerer {
        src: source,
        namespace: None,
    };
    for child in named_children(root) {
        lowerer.lower_top_level(child, &mut file);
    }
    Ok(file)
}

/// Parse a single PHP expression, such as a printed rule object
pub fn parse_expression(text: &str) -> Option<Expr> {
    let source = format!("<?php\nreturn {};\n", text.trim().trim_end_matches(';'));
    let file = parse_source(Path::new("expression.php"), &source).ok()?;
    match file.statements.into_iter().next()? {
        Stmt::Return { value, .. } => value,
        _ => None,
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

fn all_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children
}

fn find_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

struct Lowerer<'s> {
    src: &'s str,
    namespace: Option<String>,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn lower_top_level(&mut self, node: Node, file: &mut PhpFile) {
        match node.kind() {
            "php_tag" | "text" | "text_interpolation" | "empty_statement" => {}
            "namespace_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).trim().trim_start_matches('\\').to_string());
                if file.namespace.is_none() {
                    file.namespace = name.clone();
                }
                self.namespace = name;
                if let Some(body) = node.child_by_field_name("body") {
                    for child in named_children(body) {
                        self.lower_top_level(child, file);
                    }
                }
            }
            "namespace_use_declaration" => {
                file.uses.extend(parse_use_declaration(self.text(node)));
            }
            "class_declaration" | "interface_declaration" | "trait_declaration"
            | "enum_declaration" => {
                let class = self.lower_class(node);
                file.classes.push(class);
            }
            _ => {
                if let Some(stmt) = self.lower_stmt(node) {
                    file.statements.push(stmt);
                }
            }
        }
    }

    fn doc_comment(&self, node: Node) -> Option<String> {
        let prev = node.prev_sibling()?;
        if prev.kind() == "comment" {
            let text = self.text(prev);
            if text.starts_with("/**") {
                return Some(text.to_string());
            }
        }
        None
    }

    fn lower_class(&mut self, node: Node) -> ClassDecl {
        let kind = match node.kind() {
            "interface_declaration" => ClassKind::Interface,
            "trait_declaration" => ClassKind::Trait,
            "enum_declaration" => ClassKind::Enum,
            _ => ClassKind::Class,
        };
        let name_node = node.child_by_field_name("name");
        let name = name_node.map(|n| self.text(n).to_string());

        let children = named_children(node);
        let names_in = |clause: Option<&Node>| -> Vec<String> {
            clause
                .map(|c| {
                    named_children(*c)
                        .into_iter()
                        .filter(|n| matches!(n.kind(), "name" | "qualified_name"))
                        .map(|n| self.text(n).trim().to_string())
                        .collect()
                })
                .unwrap_or_default()
        };
        let base_clause = children.iter().find(|c| c.kind() == "base_clause");
        let interface_clause = children.iter().find(|c| c.kind() == "class_interface_clause");
        let mut extends_list = names_in(base_clause);
        let mut implements = names_in(interface_clause);
        let extends = match kind {
            ClassKind::Interface => {
                // Interfaces list their parents after `extends`
                implements.append(&mut extends_list);
                None
            }
            _ => extends_list.into_iter().next(),
        };

        let mut attributes = Vec::new();
        for child in children.iter().filter(|c| c.kind() == "attribute_list") {
            self.collect_attributes(*child, &mut attributes);
        }
        let is_abstract = children.iter().any(|c| c.kind() == "abstract_modifier");

        let body = node.child_by_field_name("body").or_else(|| {
            children
                .iter()
                .copied()
                .find(|c| matches!(c.kind(), "declaration_list" | "enum_declaration_list"))
        });

        let backing_type = if kind == ClassKind::Enum {
            children
                .iter()
                .find(|c| c.kind() == "primitive_type")
                .map(|c| self.text(*c).to_string())
                .or_else(|| {
                    let start = name_node?.end_byte();
                    let end = body?.start_byte();
                    let header = self.src.get(start..end)?.trim_start();
                    let rest = header.strip_prefix(':')?.trim_start();
                    let word: String = rest.chars().take_while(|c| c.is_alphanumeric()).collect();
                    (!word.is_empty()).then_some(word)
                })
        } else {
            None
        };

        let mut class = ClassDecl {
            name,
            kind,
            namespace: self.namespace.clone(),
            extends,
            implements,
            traits: Vec::new(),
            attributes,
            is_abstract,
            methods: Vec::new(),
            properties: Vec::new(),
            constants: Vec::new(),
            cases: Vec::new(),
            backing_type,
            doc_comment: self.doc_comment(node),
            start_line: line_of(node),
            end_line: node.end_position().row + 1,
        };

        if let Some(body) = body {
            for member in named_children(body) {
                self.lower_member(member, &mut class);
            }
        }
        class
    }

    fn lower_member(&mut self, member: Node, class: &mut ClassDecl) {
        match member.kind() {
            "method_declaration" => {
                if let Some(method) = self.lower_method(member) {
                    class.methods.push(method);
                }
            }
            "property_declaration" => {
                class.properties.extend(self.lower_properties(member));
            }
            "const_declaration" => {
                for element in named_children(member)
                    .into_iter()
                    .filter(|c| c.kind() == "const_element")
                {
                    let parts = named_children(element);
                    if let (Some(first), Some(last)) = (parts.first(), parts.last()) {
                        if first.id() != last.id() {
                            class.constants.push(ConstDecl {
                                name: self.text(*first).to_string(),
                                value: self.lower_expr(*last),
                            });
                        }
                    }
                }
            }
            "use_declaration" => {
                for child in named_children(member) {
                    if matches!(child.kind(), "name" | "qualified_name") {
                        class.traits.push(self.text(child).trim().to_string());
                    }
                }
            }
            "enum_case" => {
                let name_node = member
                    .child_by_field_name("name")
                    .or_else(|| find_kind(member, "name"));
                if let Some(name_node) = name_node {
                    let value = member.child_by_field_name("value").or_else(|| {
                        named_children(member).into_iter().find(|c| {
                            c.id() != name_node.id() && c.kind() != "attribute_list"
                        })
                    });
                    class.cases.push(EnumCase {
                        name: self.text(name_node).to_string(),
                        value: value.map(|v| self.lower_expr(v)),
                    });
                }
            }
            _ => {}
        }
    }

    fn modifiers(&self, node: Node) -> (Visibility, bool, bool) {
        let mut visibility = Visibility::Public;
        let mut is_static = false;
        let mut is_abstract = false;
        for child in named_children(node) {
            match child.kind() {
                "visibility_modifier" => {
                    visibility = parse_visibility(self.text(child));
                }
                "static_modifier" => is_static = true,
                "abstract_modifier" => is_abstract = true,
                _ => {}
            }
        }
        (visibility, is_static, is_abstract)
    }

    fn lower_method(&mut self, node: Node) -> Option<MethodDecl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let (visibility, is_static, is_abstract) = self.modifiers(node);
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.lower_params(p))
            .unwrap_or_default();
        let return_type = node
            .child_by_field_name("return_type")
            .and_then(|t| TypeHint::parse(self.text(t)));
        let body = node
            .child_by_field_name("body")
            .map(|b| self.lower_block(b));
        let mut attributes = Vec::new();
        for child in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "attribute_list")
        {
            self.collect_attributes(child, &mut attributes);
        }

        Some(MethodDecl {
            name,
            visibility,
            is_static,
            is_abstract,
            params,
            return_type,
            body,
            attributes,
            doc_comment: self.doc_comment(node),
            source: self.text(node).to_string(),
            start_line: line_of(node),
            end_line: node.end_position().row + 1,
        })
    }

    fn lower_params(&mut self, node: Node) -> Vec<Param> {
        let mut params = Vec::new();
        for param in named_children(node) {
            let kind = param.kind();
            if !matches!(
                kind,
                "simple_parameter" | "variadic_parameter" | "property_promotion_parameter"
            ) {
                continue;
            }
            let Some(name_node) = param.child_by_field_name("name") else {
                continue;
            };
            let raw_name = self.text(name_node);
            let name = raw_name
                .trim_start_matches('&')
                .trim()
                .trim_start_matches('$')
                .to_string();
            let by_ref = raw_name.starts_with('&')
                || param.child_by_field_name("reference_modifier").is_some();
            let type_hint = param
                .child_by_field_name("type")
                .and_then(|t| TypeHint::parse(self.text(t)));
            let default = param
                .child_by_field_name("default_value")
                .map(|d| self.lower_expr(d));
            let promoted = param
                .child_by_field_name("visibility")
                .map(|v| parse_visibility(self.text(v)))
                .or_else(|| (kind == "property_promotion_parameter").then_some(Visibility::Public));
            let mut attributes = Vec::new();
            for child in named_children(param)
                .into_iter()
                .filter(|c| c.kind() == "attribute_list")
            {
                self.collect_attributes(child, &mut attributes);
            }
            params.push(Param {
                name,
                type_hint,
                default,
                variadic: kind == "variadic_parameter",
                by_ref,
                promoted,
                attributes,
            });
        }
        params
    }

    fn lower_properties(&mut self, node: Node) -> Vec<PropertyDecl> {
        let (visibility, is_static, _) = self.modifiers(node);
        let type_hint = node
            .child_by_field_name("type")
            .and_then(|t| TypeHint::parse(self.text(t)));
        let doc_comment = self.doc_comment(node);

        let mut properties = Vec::new();
        for element in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "property_element")
        {
            let parts = named_children(element);
            let Some(name_node) = element
                .child_by_field_name("name")
                .or_else(|| parts.iter().copied().find(|c| c.kind() == "variable_name"))
            else {
                continue;
            };
            let default_node = element.child_by_field_name("default_value").or_else(|| {
                parts.iter().copied().find_map(|c| {
                    if c.kind() == "property_initializer" {
                        named_children(c).into_iter().next()
                    } else if c.id() != name_node.id() {
                        Some(c)
                    } else {
                        None
                    }
                })
            });
            properties.push(PropertyDecl {
                name: self.text(name_node).trim_start_matches('$').to_string(),
                visibility,
                is_static,
                type_hint: type_hint.clone(),
                default: default_node.map(|d| self.lower_expr(d)),
                doc_comment: doc_comment.clone(),
                line: line_of(element),
            });
        }
        properties
    }

    fn collect_attributes(&mut self, node: Node, out: &mut Vec<Attribute>) {
        for child in named_children(node) {
            match child.kind() {
                "attribute" => {
                    let parts = named_children(child);
                    let Some(name_node) = parts
                        .iter()
                        .find(|c| matches!(c.kind(), "name" | "qualified_name"))
                    else {
                        continue;
                    };
                    let args_node = child
                        .child_by_field_name("parameters")
                        .or_else(|| parts.iter().copied().find(|c| c.kind() == "arguments"));
                    out.push(Attribute {
                        name: self.text(*name_node).trim_start_matches('\\').to_string(),
                        args: self.lower_args(args_node),
                    });
                }
                "attribute_group" | "attribute_list" => self.collect_attributes(child, out),
                _ => {}
            }
        }
    }

    fn lower_block(&mut self, node: Node) -> Vec<Stmt> {
        match node.kind() {
            "compound_statement" | "colon_block" => named_children(node)
                .into_iter()
                .filter_map(|c| self.lower_stmt(c))
                .collect(),
            _ => self.lower_stmt(node).into_iter().collect(),
        }
    }

    fn lower_stmt(&mut self, node: Node) -> Option<Stmt> {
        let stmt = match node.kind() {
            "comment" | "empty_statement" | "php_tag" | "text" | "text_interpolation" => {
                return None
            }
            "expression_statement" => {
                let expr = named_children(node).into_iter().next()?;
                Stmt::Expr(self.lower_expr(expr))
            }
            "return_statement" => Stmt::Return {
                value: named_children(node)
                    .into_iter()
                    .next()
                    .map(|e| self.lower_expr(e)),
                line: line_of(node),
            },
            "compound_statement" => Stmt::Block(self.lower_block(node)),
            "if_statement" => self.lower_if(node)?,
            "foreach_statement" => self.lower_foreach(node)?,
            "for_statement" | "while_statement" | "do_statement" => Stmt::Loop {
                condition: node
                    .child_by_field_name("condition")
                    .map(|c| self.lower_expr(c)),
                body: node
                    .child_by_field_name("body")
                    .map(|b| self.lower_block(b))
                    .unwrap_or_default(),
            },
            "switch_statement" => self.lower_switch(node)?,
            "try_statement" => {
                let body = node
                    .child_by_field_name("body")
                    .map(|b| self.lower_block(b))
                    .unwrap_or_default();
                let mut catches = Vec::new();
                let mut finally = None;
                for child in named_children(node) {
                    match child.kind() {
                        "catch_clause" => catches.push(
                            child
                                .child_by_field_name("body")
                                .map(|b| self.lower_block(b))
                                .unwrap_or_default(),
                        ),
                        "finally_clause" => {
                            finally = child
                                .child_by_field_name("body")
                                .map(|b| self.lower_block(b))
                        }
                        _ => {}
                    }
                }
                Stmt::Try {
                    body,
                    catches,
                    finally,
                }
            }
            "echo_statement" => Stmt::Echo(
                named_children(node)
                    .into_iter()
                    .map(|e| self.lower_expr(e))
                    .collect(),
            ),
            "class_declaration" | "interface_declaration" | "trait_declaration"
            | "enum_declaration" => Stmt::Declaration(Box::new(self.lower_class(node))),
            _ => Stmt::Other(self.text(node).to_string()),
        };
        Some(stmt)
    }

    fn lower_if(&mut self, node: Node) -> Option<Stmt> {
        let condition = self.lower_expr(node.child_by_field_name("condition")?);
        let then = node
            .child_by_field_name("body")
            .map(|b| self.lower_block(b))
            .unwrap_or_default();
        let mut else_ifs = Vec::new();
        let mut otherwise = None;
        for child in named_children(node) {
            match child.kind() {
                "else_if_clause" => {
                    if let Some(cond) = child.child_by_field_name("condition") {
                        let cond = self.lower_expr(cond);
                        let body = child
                            .child_by_field_name("body")
                            .map(|b| self.lower_block(b))
                            .unwrap_or_default();
                        else_ifs.push((cond, body));
                    }
                }
                "else_clause" => {
                    otherwise = Some(
                        child
                            .child_by_field_name("body")
                            .map(|b| self.lower_block(b))
                            .unwrap_or_default(),
                    );
                }
                _ => {}
            }
        }
        Some(Stmt::If {
            condition,
            then,
            else_ifs,
            otherwise,
        })
    }

    fn lower_foreach(&mut self, node: Node) -> Option<Stmt> {
        let parts = named_children(node);
        let body_node = node.child_by_field_name("body");
        let mut exprs = parts
            .iter()
            .copied()
            .filter(|p| Some(p.id()) != body_node.map(|b| b.id()));
        let subject = self.lower_expr(exprs.next()?);
        let binding = exprs.next()?;
        let (key, value) = if binding.kind() == "pair" {
            let pair_parts = named_children(binding);
            let key = pair_parts.first().map(|k| self.lower_expr(*k));
            let value = pair_parts
                .last()
                .map(|v| self.lower_expr(*v))
                .unwrap_or_else(|| Expr::Other(self.text(binding).to_string()));
            (key, value)
        } else {
            (None, self.lower_expr(binding))
        };
        let body = body_node
            .map(|b| self.lower_block(b))
            .unwrap_or_default();
        Some(Stmt::Foreach {
            subject,
            key,
            value,
            body,
        })
    }

    fn lower_switch(&mut self, node: Node) -> Option<Stmt> {
        let subject = self.lower_expr(node.child_by_field_name("condition")?);
        let mut cases = Vec::new();
        if let Some(block) = node.child_by_field_name("body") {
            for case in named_children(block) {
                match case.kind() {
                    "case_statement" => {
                        let value = case.child_by_field_name("value");
                        let body = named_children(case)
                            .into_iter()
                            .filter(|c| Some(c.id()) != value.map(|v| v.id()))
                            .filter_map(|c| self.lower_stmt(c))
                            .collect();
                        cases.push(SwitchCase {
                            test: value.map(|v| self.lower_expr(v)),
                            body,
                        });
                    }
                    "default_statement" => {
                        let body = named_children(case)
                            .into_iter()
                            .filter_map(|c| self.lower_stmt(c))
                            .collect();
                        cases.push(SwitchCase { test: None, body });
                    }
                    _ => {}
                }
            }
        }
        Some(Stmt::Switch { subject, cases })
    }

    fn lower_args(&mut self, node: Option<Node>) -> Vec<Arg> {
        let Some(node) = node else {
            return Vec::new();
        };
        let mut args = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "argument" => {
                    let name_node = child.child_by_field_name("name");
                    let value_node = named_children(child)
                        .into_iter()
                        .filter(|c| Some(c.id()) != name_node.map(|n| n.id()))
                        .last();
                    let Some(value_node) = value_node else {
                        continue;
                    };
                    let (value, unpack) = if value_node.kind() == "variadic_unpacking" {
                        match named_children(value_node).into_iter().next() {
                            Some(inner) => (self.lower_expr(inner), true),
                            None => continue,
                        }
                    } else {
                        let unpack = self.text(child).trim_start().starts_with("...");
                        (self.lower_expr(value_node), unpack)
                    };
                    args.push(Arg {
                        name: name_node.map(|n| self.text(n).to_string()),
                        value,
                        unpack,
                    });
                }
                "variadic_placeholder" => {}
                "variadic_unpacking" => {
                    if let Some(inner) = named_children(child).into_iter().next() {
                        args.push(Arg {
                            name: None,
                            value: self.lower_expr(inner),
                            unpack: true,
                        });
                    }
                }
                _ => args.push(Arg {
                    name: None,
                    value: self.lower_expr(child),
                    unpack: false,
                }),
            }
        }
        args
    }

    fn lower_array(&mut self, node: Node) -> Vec<ArrayItem> {
        let mut items = Vec::new();
        for element in named_children(node) {
            if element.kind() != "array_element_initializer" {
                continue;
            }
            let parts = named_children(element);
            let has_arrow = all_children(element)
                .iter()
                .any(|c| !c.is_named() && c.kind() == "=>");
            let (key_node, value_node) = if has_arrow && parts.len() >= 2 {
                (parts.first().copied(), parts.last().copied())
            } else {
                (None, parts.first().copied())
            };
            let Some(mut value_node) = value_node else {
                continue;
            };
            let mut by_ref = false;
            let mut spread = false;
            match value_node.kind() {
                "by_ref" => {
                    by_ref = true;
                    if let Some(inner) = named_children(value_node).into_iter().next() {
                        value_node = inner;
                    }
                }
                "variadic_unpacking" => {
                    spread = true;
                    if let Some(inner) = named_children(value_node).into_iter().next() {
                        value_node = inner;
                    }
                }
                _ => {
                    spread = key_node.is_none() && self.text(element).trim_start().starts_with("...");
                }
            }
            items.push(ArrayItem {
                key: key_node.map(|k| self.lower_expr(k)),
                value: self.lower_expr(value_node),
                by_ref,
                spread,
            });
        }
        items
    }

    fn member_name(&mut self, node: Node) -> String {
        node.child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default()
    }

    fn lower_new(&mut self, node: Node) -> Expr {
        if let Some(anonymous) = find_kind(node, "anonymous_class") {
            let args = self.lower_args(find_kind(anonymous, "arguments"));
            let class = self.lower_class(anonymous);
            return Expr::New {
                target: NewTarget::Anonymous(Box::new(class)),
                args,
            };
        }
        if find_kind(node, "declaration_list").is_some() {
            let args = self.lower_args(find_kind(node, "arguments"));
            let class = self.lower_class(node);
            return Expr::New {
                target: NewTarget::Anonymous(Box::new(class)),
                args,
            };
        }

        let args = self.lower_args(find_kind(node, "arguments"));
        let target = named_children(node)
            .into_iter()
            .find(|c| !matches!(c.kind(), "arguments" | "attribute_list"));
        let target = match target {
            Some(t) if matches!(t.kind(), "name" | "qualified_name" | "relative_scope") => {
                NewTarget::Named(self.text(t).trim_start_matches('\\').to_string())
            }
            Some(t) => NewTarget::Dynamic(Box::new(self.lower_expr(t))),
            None => NewTarget::Dynamic(Box::new(Expr::Other(self.text(node).to_string()))),
        };
        Expr::New { target, args }
    }

    fn lower_expr(&mut self, node: Node) -> Expr {
        let boxed = |lowerer: &mut Self, n: Option<Node>| -> Box<Expr> {
            Box::new(match n {
                Some(n) => lowerer.lower_expr(n),
                None => Expr::Other(String::new()),
            })
        };

        match node.kind() {
            "parenthesized_expression" | "error_suppression_expression" => {
                match named_children(node).into_iter().next() {
                    Some(inner) => self.lower_expr(inner),
                    None => Expr::Other(self.text(node).to_string()),
                }
            }
            "variable_name" => Expr::Variable(self.text(node).trim_start_matches('$').to_string()),
            "string" => Expr::Literal(Literal::String(unescape_single_quoted(self.text(node)))),
            "encapsed_string" => {
                let interpolated = named_children(node).iter().any(|c| {
                    !matches!(c.kind(), "string_content" | "string_value" | "escape_sequence")
                });
                let inner = strip_quotes(self.text(node), '"');
                if interpolated {
                    Expr::Interpolated(inner.to_string())
                } else {
                    Expr::Literal(Literal::String(unescape_double_quoted(inner)))
                }
            }
            "heredoc" | "nowdoc" => Expr::Interpolated(self.text(node).to_string()),
            "integer" => match parse_int(self.text(node)) {
                Some(value) => Expr::Literal(Literal::Int(value)),
                None => Expr::Other(self.text(node).to_string()),
            },
            "float" => match self.text(node).replace('_', "").parse::<f64>() {
                Ok(value) => Expr::Literal(Literal::Float(value)),
                Err(_) => Expr::Other(self.text(node).to_string()),
            },
            "boolean" => Expr::Literal(Literal::Bool(self.text(node).eq_ignore_ascii_case("true"))),
            "null" => Expr::Literal(Literal::Null),
            "name" | "qualified_name" | "relative_scope" => {
                let text = self.text(node).trim_start_matches('\\');
                match text.to_ascii_lowercase().as_str() {
                    "true" => Expr::Literal(Literal::Bool(true)),
                    "false" => Expr::Literal(Literal::Bool(false)),
                    "null" => Expr::Literal(Literal::Null),
                    _ => Expr::Name(text.to_string()),
                }
            }
            "array_creation_expression" => Expr::Array(self.lower_array(node)),
            "member_access_expression" | "nullsafe_member_access_expression" => {
                let object = boxed(self, node.child_by_field_name("object"));
                Expr::PropertyFetch {
                    object,
                    name: self.member_name(node),
                    nullsafe: node.kind().starts_with("nullsafe"),
                }
            }
            "member_call_expression" | "nullsafe_member_call_expression" => {
                let object = boxed(self, node.child_by_field_name("object"));
                let method = self.member_name(node);
                let args = self.lower_args(node.child_by_field_name("arguments"));
                Expr::MethodCall {
                    object,
                    method,
                    args,
                    nullsafe: node.kind().starts_with("nullsafe"),
                }
            }
            "scoped_call_expression" => {
                let class = boxed(self, node.child_by_field_name("scope"));
                let method = self.member_name(node);
                let args = self.lower_args(node.child_by_field_name("arguments"));
                Expr::StaticCall {
                    class,
                    method,
                    args,
                }
            }
            "scoped_property_access_expression" => {
                let class = boxed(self, node.child_by_field_name("scope"));
                Expr::StaticProp {
                    class,
                    name: self.member_name(node).trim_start_matches('$').to_string(),
                }
            }
            "class_constant_access_expression" => {
                let parts = named_children(node);
                match (parts.first(), parts.last()) {
                    (Some(first), Some(last)) if first.id() != last.id() => {
                        let class = Box::new(self.lower_expr(*first));
                        Expr::ClassConst {
                            class,
                            name: self.text(*last).to_string(),
                        }
                    }
                    _ => {
                        // `::class` is an anonymous keyword token in some grammar versions
                        let text = self.text(node);
                        match text.rsplit_once("::") {
                            Some((class, name)) => Expr::ClassConst {
                                class: Box::new(Expr::Name(
                                    class.trim().trim_start_matches('\\').to_string(),
                                )),
                                name: name.trim().to_string(),
                            },
                            None => Expr::Other(text.to_string()),
                        }
                    }
                }
            }
            "function_call_expression" => {
                let function = node.child_by_field_name("function");
                let args = self.lower_args(node.child_by_field_name("arguments"));
                match function {
                    Some(f) if matches!(f.kind(), "name" | "qualified_name") => Expr::FuncCall {
                        name: self.text(f).trim_start_matches('\\').to_string(),
                        args,
                    },
                    _ => Expr::Other(self.text(node).to_string()),
                }
            }
            "object_creation_expression" => self.lower_new(node),
            "cast_expression" => {
                let kind = node
                    .child_by_field_name("type")
                    .and_then(|t| CastKind::from_keyword(self.text(t)));
                let value = node
                    .child_by_field_name("value")
                    .or_else(|| named_children(node).into_iter().last());
                match (kind, value) {
                    (Some(kind), Some(value)) => Expr::Cast {
                        kind,
                        expr: Box::new(self.lower_expr(value)),
                    },
                    _ => Expr::Other(self.text(node).to_string()),
                }
            }
            "conditional_expression" => {
                let condition = boxed(self, node.child_by_field_name("condition"));
                let then = node
                    .child_by_field_name("body")
                    .map(|b| Box::new(self.lower_expr(b)));
                let otherwise = boxed(self, node.child_by_field_name("alternative"));
                Expr::Ternary {
                    condition,
                    then,
                    otherwise,
                }
            }
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o).to_string())
                    .unwrap_or_default();
                let left = boxed(self, node.child_by_field_name("left"));
                let right = boxed(self, node.child_by_field_name("right"));
                if op == "??" {
                    Expr::Coalesce { left, right }
                } else {
                    Expr::Binary {
                        op: op.to_ascii_lowercase(),
                        left,
                        right,
                    }
                }
            }
            "unary_op_expression" => {
                let op = all_children(node)
                    .into_iter()
                    .find(|c| !c.is_named())
                    .map(|c| self.text(c).to_string())
                    .unwrap_or_default();
                match named_children(node).into_iter().last() {
                    Some(operand) => Expr::Unary {
                        op,
                        expr: Box::new(self.lower_expr(operand)),
                    },
                    None => Expr::Other(self.text(node).to_string()),
                }
            }
            "assignment_expression" | "reference_assignment_expression" => {
                let target = boxed(self, node.child_by_field_name("left"));
                let value = boxed(self, node.child_by_field_name("right"));
                Expr::Assign {
                    target,
                    op: None,
                    value,
                }
            }
            "augmented_assignment_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o).to_string());
                let target = boxed(self, node.child_by_field_name("left"));
                let value = boxed(self, node.child_by_field_name("right"));
                Expr::Assign { target, op, value }
            }
            "anonymous_function" | "anonymous_function_creation_expression" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.lower_params(p))
                    .unwrap_or_default();
                let body = node
                    .child_by_field_name("body")
                    .map(|b| self.lower_block(b))
                    .unwrap_or_default();
                Expr::Closure {
                    params,
                    body,
                    arrow: false,
                }
            }
            "arrow_function" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.lower_params(p))
                    .unwrap_or_default();
                let value = node.child_by_field_name("body").map(|b| self.lower_expr(b));
                Expr::Closure {
                    params,
                    body: vec![Stmt::Return {
                        value,
                        line: line_of(node),
                    }],
                    arrow: true,
                }
            }
            "match_expression" => {
                let subject = boxed(self, node.child_by_field_name("condition"));
                let mut arms = Vec::new();
                if let Some(block) = node.child_by_field_name("body") {
                    for arm in named_children(block) {
                        let Some(result) = arm.child_by_field_name("return_expression") else {
                            continue;
                        };
                        let conditions = match arm.kind() {
                            "match_conditional_expression" => arm
                                .child_by_field_name("conditional_expressions")
                                .map(|list| {
                                    named_children(list)
                                        .into_iter()
                                        .map(|c| self.lower_expr(c))
                                        .collect()
                                })
                                .unwrap_or_default(),
                            _ => Vec::new(),
                        };
                        arms.push(MatchArm {
                            conditions,
                            body: self.lower_expr(result),
                        });
                    }
                }
                Expr::Match { subject, arms }
            }
            "subscript_expression" => {
                let parts = named_children(node);
                match parts.first() {
                    Some(object) => {
                        let object = Box::new(self.lower_expr(*object));
                        let index = parts.get(1).map(|i| Box::new(self.lower_expr(*i)));
                        Expr::ArrayAccess { object, index }
                    }
                    None => Expr::Other(self.text(node).to_string()),
                }
            }
            _ => Expr::Other(self.text(node).to_string()),
        }
    }
}

fn parse_visibility(text: &str) -> Visibility {
    match text.trim().to_ascii_lowercase().as_str() {
        "protected" => Visibility::Protected,
        "private" => Visibility::Private,
        _ => Visibility::Public,
    }
}

/// Parse the text of a `use` declaration into flattened imports.
///
/// Handles `use A\B;`, `use A\B as C;`, `use A\{B, C as D};`,
/// `use function A\b;` and comma-separated lists.
pub fn parse_use_declaration(text: &str) -> Vec<UseStatement> {
    let body = text.trim().trim_end_matches(';').trim();
    let Some(body) = strip_keyword(body, "use") else {
        return Vec::new();
    };
    let (kind, body) = leading_use_kind(body);

    let mut imports = Vec::new();
    if let (Some(open), Some(close)) = (body.find('{'), body.rfind('}')) {
        let prefix = body[..open].trim().trim_end_matches('\\').trim_start_matches('\\');
        for item in body[open + 1..close].split(',') {
            let (item_kind, item) = leading_use_kind(item.trim());
            let item_kind = if item_kind == UseKind::Class { kind } else { item_kind };
            if let Some((name, alias)) = split_alias(item) {
                imports.push(UseStatement {
                    name: format!("{}\\{}", prefix, name),
                    alias,
                    kind: item_kind,
                });
            }
        }
    } else {
        for item in body.split(',') {
            if let Some((name, alias)) = split_alias(item.trim()) {
                imports.push(UseStatement {
                    name: name.to_string(),
                    alias,
                    kind,
                });
            }
        }
    }
    imports
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    if rest.starts_with(|c: char| c.is_whitespace()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn leading_use_kind(text: &str) -> (UseKind, &str) {
    if let Some(rest) = strip_keyword(text, "function") {
        (UseKind::Function, rest)
    } else if let Some(rest) = strip_keyword(text, "const") {
        (UseKind::Const, rest)
    } else {
        (UseKind::Class, text)
    }
}

fn split_alias(item: &str) -> Option<(&str, Option<String>)> {
    let mut words = item.split_whitespace();
    let name = words.next()?.trim_start_matches('\\');
    if name.is_empty() {
        return None;
    }
    let alias = match (words.next(), words.next()) {
        (Some(kw), Some(alias)) if kw.eq_ignore_ascii_case("as") => Some(alias.to_string()),
        _ => None,
    };
    Some((name, alias))
}

fn strip_quotes(text: &str, quote: char) -> &str {
    let start = text.find(quote).map(|i| i + 1).unwrap_or(0);
    let end = text.rfind(quote).filter(|&e| e >= start).unwrap_or(text.len());
    &text[start..end]
}

fn unescape_single_quoted(text: &str) -> String {
    let inner = strip_quotes(text, '\'');
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\'') | Some('\\') => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape_double_quoted(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('v') => out.push('\u{0B}'),
            Some('f') => out.push('\u{0C}'),
            Some('e') => out.push('\u{1B}'),
            Some('0') => out.push('\0'),
            Some(e @ ('\\' | '"' | '$')) => out.push(e),
            _ => {
                out.push(c);
                continue;
            }
        }
        chars.next();
    }
    out
}

fn parse_int(text: &str) -> Option<i64> {
    let cleaned = text.replace('_', "");
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(code: &str) -> PhpFile {
        parse_source(Path::new("test.php"), code).expect("test source should parse")
    }

    #[test]
    fn test_parse_class_with_members() {
        let file = parse(
            r#"<?php
namespace App\Http\Requests;

use Illuminate\Foundation\Http\FormRequest;

/**
 * Validates user creation.
 */
class StoreUserRequest extends FormRequest implements Contracts\Auditable
{
    use Concerns\HasRules;

    public const MAX = 255;

    protected $stopOnFirstFailure = true;

    public function rules(): array
    {
        return [
            'name' => 'required|string|max:255',
            'email' => ['required', 'email'],
        ];
    }
}
"#,
        );

        assert_eq!(file.namespace.as_deref(), Some("App\\Http\\Requests"));
        assert_eq!(file.uses.len(), 1);
        assert_eq!(file.classes.len(), 1);

        let class = &file.classes[0];
        assert_eq!(class.fqn().as_deref(), Some("App\\Http\\Requests\\StoreUserRequest"));
        assert_eq!(class.extends.as_deref(), Some("FormRequest"));
        assert_eq!(class.implements, vec!["Contracts\\Auditable".to_string()]);
        assert_eq!(class.traits, vec!["Concerns\\HasRules".to_string()]);
        assert!(class.doc_comment.as_deref().unwrap().contains("Validates"));
        assert_eq!(class.constant("MAX").and_then(|c| c.value.as_int()), Some(255));
        assert_eq!(
            class.property("stopOnFirstFailure").and_then(|p| p.default.clone()),
            Some(Expr::Literal(Literal::Bool(true)))
        );

        let rules = class.method("rules").unwrap();
        assert_eq!(rules.return_type, Some(TypeHint::Named("array".into())));
        match &rules.statements()[0] {
            Stmt::Return {
                value: Some(Expr::Array(items)),
                ..
            } => {
                assert_eq!(items.len(), 2);
                assert_eq!(string_key(&items[0]), Some("name"));
                assert_eq!(items[0].value.as_str(), Some("required|string|max:255"));
                assert!(matches!(items[1].value, Expr::Array(_)));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_parse_grouped_and_aliased_uses() {
        let file = parse(
            r#"<?php
use App\Enums\Status as St;
use App\Models\{User, Post as Article};
use function App\Support\helper;
"#,
        );
        let names: Vec<(&str, &str)> = file
            .uses
            .iter()
            .map(|u| (u.local_name(), u.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("St", "App\\Enums\\Status"),
                ("User", "App\\Models\\User"),
                ("Article", "App\\Models\\Post"),
                ("helper", "App\\Support\\helper"),
            ]
        );
        assert_eq!(file.uses[3].kind, UseKind::Function);
    }

    #[test]
    fn test_parse_expressions() {
        let file = parse(
            r#"<?php
class T {
    public function f($request) {
        $a = (int) $this->id;
        $b = $this->name ?? 'x';
        $c = $flag ? 1 : 2;
        $d = Rule::enum(Status::class);
        $e = new UserResource($user);
        $f = fn ($x) => $x * 2;
        return response()->json(['ok' => true], 201);
    }
}
"#,
        );
        let method = file.classes[0].method("f").unwrap();
        let stmts = method.statements();
        let value_of = |i: usize| match &stmts[i] {
            Stmt::Expr(Expr::Assign { value, .. }) => value.as_ref().clone(),
            other => panic!("unexpected {:?}", other),
        };

        assert!(matches!(value_of(0), Expr::Cast { kind: CastKind::Int, .. }));
        assert!(matches!(value_of(1), Expr::Coalesce { .. }));
        assert!(matches!(value_of(2), Expr::Ternary { then: Some(_), .. }));
        match value_of(3) {
            Expr::StaticCall { class, method, args } => {
                assert_eq!(*class, Expr::Name("Rule".into()));
                assert_eq!(method, "enum");
                assert_eq!(args[0].value.class_reference(), Some("Status"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(value_of(4).class_reference(), Some("UserResource"));
        assert!(matches!(value_of(5), Expr::Closure { arrow: true, .. }));
        match &stmts[6] {
            Stmt::Return {
                value: Some(Expr::MethodCall { object, method, args, .. }),
                ..
            } => {
                assert_eq!(method, "json");
                assert!(matches!(object.as_ref(), Expr::FuncCall { name, .. } if name == "response"));
                assert_eq!(args.len(), 2);
                assert_eq!(args[1].value.as_int(), Some(201));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_backed_enum() {
        let file = parse(
            r#"<?php
namespace App\Enums;

enum Status: string
{
    case Active = 'active';
    case Inactive = 'inactive';
}
"#,
        );
        let class = &file.classes[0];
        assert_eq!(class.kind, ClassKind::Enum);
        assert_eq!(class.backing_type.as_deref(), Some("string"));
        assert_eq!(class.cases.len(), 2);
        assert_eq!(class.cases[0].name, "Active");
        assert_eq!(
            class.cases[1].value.as_ref().and_then(Expr::as_str),
            Some("inactive")
        );
    }

    #[test]
    fn test_parse_if_else_and_attributes() {
        let file = parse(
            r#"<?php
class C {
    #[Deprecated, Callback(name: 'done', expression: '{$request.body#/url}')]
    public function rules(): array
    {
        if ($this->isMethod('POST')) {
            return ['password' => 'required'];
        } elseif ($this->isMethod('PUT')) {
            return [];
        } else {
            return ['password' => 'sometimes'];
        }
    }
}
"#,
        );
        let method = file.classes[0].method("rules").unwrap();
        assert_eq!(method.attributes.len(), 2);
        let callback = method.attribute("Callback").unwrap();
        assert_eq!(callback.arg("name", 0).and_then(Expr::as_str), Some("done"));
        match &method.statements()[0] {
            Stmt::If {
                else_ifs, otherwise, ..
            } => {
                assert_eq!(else_ifs.len(), 1);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_anonymous_class() {
        let file = parse(
            r#"<?php
$request = new class extends FormRequest {
    public function rules(): array { return ['q' => 'string']; }
};
"#,
        );
        match &file.statements[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match value.as_ref() {
                Expr::New {
                    target: NewTarget::Anonymous(class),
                    ..
                } => {
                    assert!(class.name.is_none());
                    assert_eq!(class.extends.as_deref(), Some("FormRequest"));
                    assert_eq!(class.start_line, 2);
                    assert!(class.method("rules").is_some());
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = parse_source(Path::new("broken.php"), "<?php class { function ( }");
        match result {
            Err(AnalyzerError::Parse { message, .. }) => assert!(message.contains("syntax error")),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_parse_file_missing_returns_none() {
        let parser = AstParser::new();
        assert!(parser.parse_file(Path::new("/nonexistent/file.php")).is_none());
        assert!(matches!(
            parser.try_parse_file(Path::new("/nonexistent/file.php")),
            Err(AnalyzerError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_parse_file_is_memoized() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.php");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"<?php class A {}").unwrap();

        let parser = AstParser::new();
        let first = parser.parse_file(&path).unwrap();
        let second = parser.parse_file(&path).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_overlay_shadows_file_system() {
        let parser = AstParser::new();
        parser.add_source("virtual/B.php", "<?php class B {}");
        let parsed = parser.parse_file(Path::new("virtual/B.php")).unwrap();
        assert_eq!(parsed.classes[0].name.as_deref(), Some("B"));
    }

    #[test]
    fn test_parse_files_batch() {
        let parser = AstParser::new();
        parser.add_source("ok.php", "<?php class Ok {}");
        parser.add_source("bad.php", "<?php class {");
        let results = parser.parse_files(&[PathBuf::from("ok.php"), PathBuf::from("bad.php")]);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
    }

    #[test]
    fn test_string_unescaping_and_ints() {
        assert_eq!(unescape_single_quoted(r"'it\'s'"), "it's");
        assert_eq!(unescape_double_quoted(r#"a\n\"b\""#), "a\n\"b\"");
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0"), Some(0));
    }
}
