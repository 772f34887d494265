//! Locating declarations in a parsed file and resolving class names.

use crate::ast::*;
use crate::visit::{traverse, AnonymousClassFinder};
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;

/// Named class-like declaration by short name (case-insensitive)
pub fn find_class_node<'a>(file: &'a PhpFile, short: &str) -> Option<&'a ClassDecl> {
    let short = short_name(short);
    file.classes
        .iter()
        .find(|c| c.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(short)))
}

pub fn find_method_node<'a>(class: &'a ClassDecl, name: &str) -> Option<&'a MethodDecl> {
    class.method(name)
}

pub fn find_property_node<'a>(class: &'a ClassDecl, name: &str) -> Option<&'a PropertyDecl> {
    class.property(name.trim_start_matches('$'))
}

/// Anonymous class declared on the given 1-based line.
///
/// Searches top-level statements and every method body of the file's named
/// classes.
pub fn find_anonymous_class_node(file: &PhpFile, line: usize) -> Option<&ClassDecl> {
    let mut finder = AnonymousClassFinder::default();
    traverse(&file.statements, &mut finder);
    for class in &file.classes {
        for method in &class.methods {
            traverse(method.statements(), &mut finder);
        }
    }
    finder.classes.into_iter().find(|c| c.start_line == line)
}

/// Every anonymous class in the file, in source order
pub fn anonymous_classes(file: &PhpFile) -> Vec<&ClassDecl> {
    let mut finder = AnonymousClassFinder::default();
    traverse(&file.statements, &mut finder);
    for class in &file.classes {
        for method in &class.methods {
            traverse(method.statements(), &mut finder);
        }
    }
    finder.classes
}

/// Class imports of a file as `local name -> fully-qualified name`
pub fn extract_use_statements(file: &PhpFile) -> BTreeMap<String, String> {
    file.uses
        .iter()
        .filter(|u| u.kind == UseKind::Class)
        .map(|u| (u.local_name().to_string(), u.name.clone()))
        .collect()
}

/// Identifier given to an anonymous class so it can be referenced like a
/// named one
pub fn anonymous_class_id(file: &std::path::Path, line: usize) -> String {
    format!("class@anonymous{}:{}", file.display(), line)
}

/// Parse an identifier produced by [`anonymous_class_id`]
pub fn parse_anonymous_class_id(id: &str) -> Option<(std::path::PathBuf, usize)> {
    let rest = id.strip_prefix("class@anonymous")?;
    let (path, line) = rest.rsplit_once(':')?;
    Some((std::path::PathBuf::from(path), line.parse().ok()?))
}

/// Resolves names as written in one file to fully-qualified class names.
pub struct NameResolver<'a> {
    namespace: Option<&'a str>,
    uses: BTreeMap<String, String>,
    source: &'a str,
    self_class: Option<String>,
    parent_class: Option<String>,
}

impl<'a> NameResolver<'a> {
    pub fn for_file(file: &'a PhpFile) -> Self {
        let uses = file
            .uses
            .iter()
            .filter(|u| u.kind == UseKind::Class)
            .map(|u| (u.local_name().to_ascii_lowercase(), u.name.clone()))
            .collect();
        Self {
            namespace: file.namespace.as_deref(),
            uses,
            source: &file.source,
            self_class: None,
            parent_class: None,
        }
    }

    /// Resolver for names used inside `class`; `self`, `static` and `parent`
    /// resolve against it.
    pub fn for_class(file: &'a PhpFile, class: &'a ClassDecl) -> Self {
        let mut resolver = Self::for_file(file);
        if let Some(ns) = class.namespace.as_deref() {
            resolver.namespace = Some(ns);
        }
        resolver.self_class = class.fqn();
        let parent_class = class.extends.as_ref().map(|parent| {
            resolver
                .resolve_with(parent, |_| false)
                .unwrap_or_else(|| resolver.qualify(parent))
        });
        resolver.parent_class = parent_class;
        resolver
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace
    }

    fn qualify(&self, name: &str) -> String {
        if let Some(stripped) = name.strip_prefix('\\') {
            return stripped.to_string();
        }
        let first = name.split('\\').next().unwrap_or(name).to_ascii_lowercase();
        if let Some(import) = self.uses.get(&first) {
            return match name.split_once('\\') {
                Some((_, rest)) => format!("{}\\{}", import, rest),
                None => import.clone(),
            };
        }
        match self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, name),
            _ => name.to_string(),
        }
    }

    /// Best-effort resolution: like [`NameResolver::resolve_with`], but falls
    /// back to the name as PHP itself would qualify it.
    pub fn resolve_lenient(&self, name: &str, exists: impl Fn(&str) -> bool) -> String {
        self.resolve_with(name, exists)
            .unwrap_or_else(|| self.qualify(name))
    }

    /// Resolve a class name.
    ///
    /// Strategies, in order: a qualified name accepted verbatim when it
    /// exists; the current namespace plus the short name; the file's `use`
    /// imports; a regex scan of the raw source for a matching `use` line;
    /// a global class of that name. Returns `None` when nothing applies.
    pub fn resolve_with(&self, name: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match name.to_ascii_lowercase().as_str() {
            "self" | "static" => return self.self_class.clone(),
            "parent" => return self.parent_class.clone(),
            _ => {}
        }

        if let Some(stripped) = name.strip_prefix('\\') {
            return exists(stripped).then(|| stripped.to_string());
        }

        if name.contains('\\') {
            if exists(name) {
                return Some(name.to_string());
            }
            let qualified = self.qualify(name);
            if exists(&qualified) {
                return Some(qualified);
            }
            let first = name.split('\\').next().unwrap_or(name).to_ascii_lowercase();
            if self.uses.contains_key(&first) {
                return Some(qualified);
            }
            return None;
        }

        if let Some(ns) = self.namespace.filter(|ns| !ns.is_empty()) {
            let candidate = format!("{}\\{}", ns, name);
            if exists(&candidate) {
                return Some(candidate);
            }
        }

        if let Some(import) = self.uses.get(&name.to_ascii_lowercase()) {
            return Some(import.clone());
        }

        if let Some(found) = self.scan_use_lines(name) {
            debug!("Resolved {} through raw use-line scan: {}", name, found);
            return Some(found);
        }

        if exists(name) {
            return Some(name.to_string());
        }
        None
    }

    fn scan_use_lines(&self, name: &str) -> Option<String> {
        let escaped = regex::escape(name);
        let aliased = Regex::new(&format!(
            r"(?mi)^\s*use\s+\\?([A-Za-z_][\w\\]*)\s+as\s+{}\s*;",
            escaped
        ))
        .ok()?;
        if let Some(caps) = aliased.captures(self.source) {
            return Some(caps[1].to_string());
        }
        let plain = Regex::new(&format!(
            r"(?mi)^\s*use\s+\\?((?:[A-Za-z_]\w*\\)*{})\s*;",
            escaped
        ))
        .ok()?;
        plain.captures(self.source).map(|caps| caps[1].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn parse(code: &str) -> PhpFile {
        parse_source(Path::new("app/Http/Requests/StoreRequest.php"), code).unwrap()
    }

    const REQUEST: &str = r#"<?php
namespace App\Http\Requests;

use App\Enums\Status as St;
use App\Models\{User, Team};
use Illuminate\Foundation\Http\FormRequest;

class StoreRequest extends FormRequest
{
    protected $redirect = '/home';

    public function rules(): array
    {
        return ['q' => 'string'];
    }
}
"#;

    #[test]
    fn test_find_nodes() {
        let file = parse(REQUEST);
        let class = find_class_node(&file, "storerequest").unwrap();
        assert!(find_method_node(class, "rules").is_some());
        assert!(find_method_node(class, "authorize").is_none());
        assert!(find_property_node(class, "$redirect").is_some());
    }

    #[test]
    fn test_extract_use_statements() {
        let file = parse(REQUEST);
        let uses = extract_use_statements(&file);
        assert_eq!(uses.get("St").map(String::as_str), Some("App\\Enums\\Status"));
        assert_eq!(uses.get("Team").map(String::as_str), Some("App\\Models\\Team"));
        assert_eq!(uses.len(), 4);
    }

    #[test]
    fn test_resolution_chain() {
        let file = parse(REQUEST);
        let class = &file.classes[0];
        let resolver = NameResolver::for_class(&file, class);
        let known = |n: &str| n == "App\\Http\\Requests\\LocalRule" || n == "Carbon";

        assert_eq!(
            resolver.resolve_with("St", known).as_deref(),
            Some("App\\Enums\\Status")
        );
        assert_eq!(
            resolver.resolve_with("LocalRule", known).as_deref(),
            Some("App\\Http\\Requests\\LocalRule")
        );
        assert_eq!(resolver.resolve_with("Carbon", known).as_deref(), Some("Carbon"));
        assert_eq!(
            resolver.resolve_with("self", known).as_deref(),
            Some("App\\Http\\Requests\\StoreRequest")
        );
        assert_eq!(
            resolver.resolve_with("parent", known).as_deref(),
            Some("Illuminate\\Foundation\\Http\\FormRequest")
        );
        assert!(resolver.resolve_with("Missing", known).is_none());
        assert_eq!(
            resolver.resolve_lenient("Missing", known),
            "App\\Http\\Requests\\Missing"
        );
    }

    #[test]
    fn test_raw_use_line_fallback() {
        let mut file = parse(REQUEST);
        file.uses.clear();
        let resolver = NameResolver::for_file(&file);
        assert_eq!(
            resolver.resolve_with("St", |_| false).as_deref(),
            Some("App\\Enums\\Status")
        );
        assert_eq!(
            resolver.resolve_with("FormRequest", |_| false).as_deref(),
            Some("Illuminate\\Foundation\\Http\\FormRequest")
        );
    }

    #[test]
    fn test_anonymous_class_lookup() {
        let file = parse(
            r#"<?php
namespace App;

$a = new class {
    public function rules() { return []; }
};
"#,
        );
        assert!(find_anonymous_class_node(&file, 4).is_some());
        assert!(find_anonymous_class_node(&file, 2).is_none());

        let id = anonymous_class_id(Path::new("/app/x.php"), 4);
        assert_eq!(
            parse_anonymous_class_id(&id),
            Some((std::path::PathBuf::from("/app/x.php"), 4))
        );
    }
}
