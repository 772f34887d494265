//! Source-backed class lookup.
//!
//! `ClassRepository` answers the reflection-style questions the analyzers
//! ask (where is this class, what does it extend, which traits does it use)
//! purely from project source.

use crate::ast::*;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use crate::symbols::{find_anonymous_class_node, parse_anonymous_class_id, NameResolver};
use log::{debug, info, warn};
use regex::Regex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

const MAX_HIERARCHY_DEPTH: usize = 32;

/// A class declaration together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedClass {
    pub fqn: String,
    pub file: Rc<PhpFile>,
    pub decl: Rc<ClassDecl>,
}

impl LoadedClass {
    pub fn class(&self) -> &ClassDecl {
        &self.decl
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Resolver for names written inside this class
    pub fn resolver(&self) -> NameResolver<'_> {
        NameResolver::for_class(&self.file, &self.decl)
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.fqn)
    }
}

/// A method found on a class, its traits or its ancestors
#[derive(Debug, Clone)]
pub struct MethodRef {
    /// Class that declares the method
    pub owner: LoadedClass,
    index: usize,
}

impl MethodRef {
    pub fn method(&self) -> &MethodDecl {
        &self.owner.decl.methods[self.index]
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    fqn: String,
    path: PathBuf,
    /// Declaration seen in the parsed file
    confirmed: bool,
}

pub struct ClassRepository {
    root: Option<PathBuf>,
    parser: AstParser,
    index: RefCell<HashMap<String, IndexEntry>>,
    psr4: Vec<(String, PathBuf)>,
    loaded: RefCell<HashMap<String, LoadedClass>>,
}

impl Default for ClassRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*namespace\s+([A-Za-z_][\w\\]*)\s*[;{]").expect("valid regex")
    })
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?mi)^\s*(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait|enum)\s+([A-Za-z_]\w*)",
        )
        .expect("valid regex")
    })
}

impl ClassRepository {
    pub fn new() -> Self {
        Self {
            root: None,
            parser: AstParser::new(),
            index: RefCell::new(HashMap::new()),
            psr4: Vec::new(),
            loaded: RefCell::new(HashMap::new()),
        }
    }

    /// Index every PHP file of a project and read its composer autoload map.
    pub fn for_project(root: &Path, config: &AnalyzerConfig) -> anyhow::Result<Self> {
        let scan = FileScanner::new(root.to_path_buf())
            .with_excluded_dirs(config.excluded_dirs.clone())
            .scan()?;

        let mut repository = Self::new();
        repository.root = Some(root.to_path_buf());
        repository.psr4 = read_psr4(root);

        for path in &scan.php_files {
            match fs::read_to_string(path) {
                Ok(text) => repository.index_source(path, &text),
                Err(e) => warn!("Failed to read {}: {}", path.display(), e),
            }
        }
        info!(
            "Indexed {} classes from {} files",
            repository.index.borrow().len(),
            scan.php_files.len()
        );
        Ok(repository)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn parser(&self) -> &AstParser {
        &self.parser
    }

    /// Register in-memory source and index its declarations
    pub fn add_source(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
        let path = path.into();
        let source = source.into();
        self.index_source(&path, &source);
        self.loaded.borrow_mut().retain(|_, c| c.file.path != path);
        self.parser.add_source(path, source);
    }

    fn index_source(&self, path: &Path, text: &str) {
        let namespaces: Vec<(usize, String)> = namespace_regex()
            .captures_iter(text)
            .filter_map(|c| Some((c.get(0)?.start(), c[1].to_string())))
            .collect();

        let mut index = self.index.borrow_mut();
        for caps in declaration_regex().captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            let namespace = namespaces
                .iter()
                .rev()
                .find(|(pos, _)| *pos < whole.start())
                .map(|(_, ns)| ns.as_str());
            let fqn = match namespace {
                Some(ns) => format!("{}\\{}", ns, name),
                None => name.to_string(),
            };
            index.insert(
                fqn.to_ascii_lowercase(),
                IndexEntry {
                    fqn,
                    path: path.to_path_buf(),
                    confirmed: false,
                },
            );
        }
    }

    /// Every indexed class name
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.borrow().values().map(|e| e.fqn.clone()).collect();
        names.sort();
        names
    }

    /// File declaring a class.
    ///
    /// Index entries are confirmed against the parsed file on first use; a
    /// match inside a string or comment is dropped.
    pub fn locate(&self, fqn: &str) -> Option<PathBuf> {
        let fqn = fqn.trim_start_matches('\\');
        let key = fqn.to_ascii_lowercase();
        let entry = self.index.borrow().get(&key).cloned();
        if let Some(entry) = entry {
            if entry.confirmed {
                return Some(entry.path);
            }
            if self.declares(&entry.path, fqn) {
                if let Some(stored) = self.index.borrow_mut().get_mut(&key) {
                    stored.confirmed = true;
                }
                return Some(entry.path);
            }
            debug!("{} is not declared in {}", fqn, entry.path.display());
            self.index.borrow_mut().remove(&key);
        }
        let root = self.root.as_ref()?;
        self.psr4
            .iter()
            .filter(|(prefix, _)| fqn.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, dir)| {
                let relative = fqn[prefix.len()..].replace('\\', "/");
                root.join(dir).join(format!("{}.php", relative))
            })
            .filter(|candidate| self.parser.has_source(candidate))
    }

    /// Unparseable files are given the benefit of the doubt so that loading
    /// reports the parse error.
    fn declares(&self, path: &Path, fqn: &str) -> bool {
        match self.parser.try_parse_file(path) {
            Ok(file) => file.classes.iter().any(|c| {
                c.fqn().is_some_and(|n| n.eq_ignore_ascii_case(fqn))
                    || c.name
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(short_name(fqn)))
            }),
            Err(_) => true,
        }
    }

    pub fn exists(&self, fqn: &str) -> bool {
        if let Some((path, _)) = parse_anonymous_class_id(fqn) {
            return self.parser.has_source(&path);
        }
        self.locate(fqn).is_some()
    }

    /// Load and parse the declaration of a class.
    pub fn load(&self, fqn: &str) -> Result<LoadedClass> {
        let fqn = fqn.trim_start_matches('\\');
        if let Some(loaded) = self.loaded.borrow().get(&fqn.to_ascii_lowercase()) {
            return Ok(loaded.clone());
        }

        let loaded = if let Some((path, line)) = parse_anonymous_class_id(fqn) {
            let file = self.parser.try_parse_file(&path)?;
            let decl = find_anonymous_class_node(&file, line)
                .cloned()
                .ok_or_else(|| AnalyzerError::ClassNodeNotFound {
                    class: fqn.to_string(),
                    file: path.clone(),
                })?;
            LoadedClass {
                fqn: fqn.to_string(),
                decl: Rc::new(decl),
                file,
            }
        } else {
            let path = self
                .locate(fqn)
                .ok_or_else(|| AnalyzerError::ClassNotFound(fqn.to_string()))?;
            let file = self.parser.try_parse_file(&path)?;
            let decl = file
                .classes
                .iter()
                .find(|c| c.fqn().is_some_and(|n| n.eq_ignore_ascii_case(fqn)))
                .or_else(|| {
                    file.classes.iter().find(|c| {
                        c.name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(short_name(fqn)))
                    })
                })
                .cloned()
                .ok_or_else(|| AnalyzerError::ClassNodeNotFound {
                    class: fqn.to_string(),
                    file: path.clone(),
                })?;
            LoadedClass {
                fqn: decl.fqn().unwrap_or_else(|| fqn.to_string()),
                decl: Rc::new(decl),
                file,
            }
        };

        debug!("Loaded class {} from {}", loaded.fqn, loaded.path().display());
        self.loaded
            .borrow_mut()
            .insert(fqn.to_ascii_lowercase(), loaded.clone());
        Ok(loaded)
    }

    /// Resolve a name written inside `class` (or at file level)
    pub fn resolve_name(&self, name: &str, file: &PhpFile, class: Option<&ClassDecl>) -> Option<String> {
        let resolver = match class {
            Some(class) => NameResolver::for_class(file, class),
            None => NameResolver::for_file(file),
        };
        resolver.resolve_with(name, |candidate| self.exists(candidate))
    }

    /// Like [`ClassRepository::resolve_name`], but never gives up
    pub fn resolve_name_lenient(&self, name: &str, loaded: &LoadedClass) -> String {
        loaded
            .resolver()
            .resolve_lenient(name, |candidate| self.exists(candidate))
    }

    /// Ancestor class names, nearest first. The last entry may be a class
    /// without accessible source (a framework base class).
    pub fn parent_chain(&self, fqn: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = fqn.to_string();
        while chain.len() < MAX_HIERARCHY_DEPTH && seen.insert(current.to_ascii_lowercase()) {
            let Ok(loaded) = self.load(&current) else { break };
            let Some(parent) = loaded.decl.extends.as_deref() else { break };
            let parent = self.resolve_name_lenient(parent, &loaded);
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Interfaces implemented by the class or any ancestor
    pub fn interfaces(&self, fqn: &str) -> Vec<String> {
        let mut interfaces = Vec::new();
        let mut classes = vec![fqn.to_string()];
        classes.extend(self.parent_chain(fqn));
        for class in classes {
            let Ok(loaded) = self.load(&class) else { continue };
            for name in &loaded.decl.implements {
                let resolved = self.resolve_name_lenient(name, &loaded);
                if !interfaces.contains(&resolved) {
                    interfaces.push(resolved);
                }
            }
        }
        interfaces
    }

    /// Whether `fqn` is, extends or implements `target`.
    ///
    /// `target` may be fully qualified or a short name; a short name
    /// matches any ancestor with that trailing segment.
    pub fn is_a(&self, fqn: &str, target: &str) -> bool {
        let target = target.trim_start_matches('\\');
        let matches = |name: &str| {
            if target.contains('\\') {
                name.eq_ignore_ascii_case(target)
            } else {
                short_name(name).eq_ignore_ascii_case(target)
            }
        };
        if matches(fqn) {
            return true;
        }
        self.parent_chain(fqn).iter().any(|n| matches(n))
            || self.interfaces(fqn).iter().any(|n| matches(n))
    }

    /// Traits used by a class, resolved
    pub fn traits(&self, loaded: &LoadedClass) -> Vec<String> {
        loaded
            .decl
            .traits
            .iter()
            .map(|t| self.resolve_name_lenient(t, loaded))
            .collect()
    }

    /// Find a method on the class, its traits, then its ancestors
    pub fn find_method(&self, fqn: &str, name: &str) -> Option<MethodRef> {
        self.find_method_inner(fqn, name, 0)
    }

    fn find_method_inner(&self, fqn: &str, name: &str, depth: usize) -> Option<MethodRef> {
        if depth > MAX_HIERARCHY_DEPTH {
            return None;
        }
        let loaded = self.load(fqn).ok()?;
        if let Some(index) = loaded
            .decl
            .methods
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
        {
            return Some(MethodRef {
                owner: loaded,
                index,
            });
        }
        for trait_name in self.traits(&loaded) {
            if let Some(found) = self.find_method_inner(&trait_name, name, depth + 1) {
                return Some(found);
            }
        }
        let parent = loaded.decl.extends.as_deref()?;
        let parent = self.resolve_name_lenient(parent, &loaded);
        self.find_method_inner(&parent, name, depth + 1)
    }

    /// Find a property declaration on the class, its traits or ancestors
    pub fn find_property(&self, fqn: &str, name: &str) -> Option<(LoadedClass, PropertyDecl)> {
        let mut classes = vec![fqn.to_string()];
        classes.extend(self.parent_chain(fqn));
        for class in classes {
            let Ok(loaded) = self.load(&class) else { continue };
            if let Some(property) = loaded.decl.property(name) {
                return Some((loaded.clone(), property.clone()));
            }
            for trait_name in self.traits(&loaded) {
                if let Ok(trait_class) = self.load(&trait_name) {
                    if let Some(property) = trait_class.decl.property(name) {
                        return Some((trait_class.clone(), property.clone()));
                    }
                }
            }
        }
        None
    }

    /// Constructor parameter names, including promoted properties
    pub fn constructor_params(&self, fqn: &str) -> Vec<Param> {
        self.find_method(fqn, "__construct")
            .map(|m| m.method().params.clone())
            .unwrap_or_default()
    }

    /// Every indexed class that `is_a` the target
    pub fn classes_extending(&self, target: &str) -> Vec<String> {
        self.class_names()
            .into_iter()
            .filter(|name| !name.eq_ignore_ascii_case(target) && self.is_a(name, target))
            .collect()
    }
}

fn read_psr4(root: &Path) -> Vec<(String, PathBuf)> {
    let path = root.join("composer.json");
    let Ok(text) = fs::read_to_string(&path) else {
        return Vec::new();
    };
    let manifest: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring invalid {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for section in ["autoload", "autoload-dev"] {
        let Some(map) = manifest
            .get(section)
            .and_then(|s| s.get("psr-4"))
            .and_then(|m| m.as_object())
        else {
            continue;
        };
        for (prefix, dirs) in map {
            let dirs: Vec<&str> = match dirs {
                serde_json::Value::String(dir) => vec![dir.as_str()],
                serde_json::Value::Array(list) => list.iter().filter_map(|d| d.as_str()).collect(),
                _ => Vec::new(),
            };
            for dir in dirs {
                entries.push((prefix.clone(), PathBuf::from(dir)));
            }
        }
    }
    debug!("Loaded {} PSR-4 prefixes", entries.len());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repository() -> ClassRepository {
        let repository = ClassRepository::new();
        repository.add_source(
            "app/Http/Requests/BaseRequest.php",
            r#"<?php
namespace App\Http\Requests;

use Illuminate\Foundation\Http\FormRequest;

abstract class BaseRequest extends FormRequest
{
    use Concerns\SharedRules;

    protected $stopOnFirstFailure = true;
}
"#,
        );
        repository.add_source(
            "app/Http/Requests/Concerns/SharedRules.php",
            r#"<?php
namespace App\Http\Requests\Concerns;

trait SharedRules
{
    public function messages(): array { return []; }
}
"#,
        );
        repository.add_source(
            "app/Http/Requests/StoreUserRequest.php",
            r#"<?php
namespace App\Http\Requests;

final class StoreUserRequest extends BaseRequest implements \JsonSerializable
{
    public function rules(): array { return ['name' => 'required']; }
}
"#,
        );
        repository
    }

    #[test]
    fn test_index_and_load() {
        let repository = repository();
        assert!(repository.exists("App\\Http\\Requests\\StoreUserRequest"));
        assert!(repository.exists("app\\http\\requests\\storeuserrequest"));
        let loaded = repository.load("App\\Http\\Requests\\StoreUserRequest").unwrap();
        assert_eq!(loaded.short_name(), "StoreUserRequest");
        assert!(loaded.class().method("rules").is_some());
    }

    #[test]
    fn test_missing_class_errors() {
        let repository = repository();
        let err = repository.load("App\\Missing").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ClassNotFound);
    }

    #[test]
    fn test_hierarchy_queries() {
        let repository = repository();
        let fqn = "App\\Http\\Requests\\StoreUserRequest";
        assert_eq!(
            repository.parent_chain(fqn),
            vec![
                "App\\Http\\Requests\\BaseRequest".to_string(),
                "Illuminate\\Foundation\\Http\\FormRequest".to_string(),
            ]
        );
        assert!(repository.is_a(fqn, "FormRequest"));
        assert!(repository.is_a(fqn, "Illuminate\\Foundation\\Http\\FormRequest"));
        assert!(repository.is_a(fqn, "JsonSerializable"));
        assert!(!repository.is_a(fqn, "JsonResource"));
    }

    #[test]
    fn test_method_and_property_lookup_through_traits_and_parents() {
        let repository = repository();
        let fqn = "App\\Http\\Requests\\StoreUserRequest";
        let messages = repository.find_method(fqn, "messages").unwrap();
        assert_eq!(messages.owner.short_name(), "SharedRules");
        assert!(repository.find_method(fqn, "authorize").is_none());
        let (owner, property) = repository.find_property(fqn, "stopOnFirstFailure").unwrap();
        assert_eq!(owner.short_name(), "BaseRequest");
        assert!(property.default.is_some());
    }

    #[test]
    fn test_project_index_with_psr4() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/Domain")).unwrap();
        fs::write(
            root.join("composer.json"),
            r#"{"autoload": {"psr-4": {"Acme\\": "src/"}}}"#,
        )
        .unwrap();
        fs::write(
            root.join("src/Domain/Thing.php"),
            "<?php\nnamespace Acme\\Domain;\n\nclass Thing {}\n",
        )
        .unwrap();

        let repository = ClassRepository::for_project(root, &AnalyzerConfig::default()).unwrap();
        assert_eq!(repository.class_names(), vec!["Acme\\Domain\\Thing".to_string()]);
        assert!(repository.psr4.iter().any(|(prefix, _)| prefix == "Acme\\"));
        assert!(repository.load("Acme\\Domain\\Thing").is_ok());
    }

    #[test]
    fn test_declarations_inside_strings_are_not_classes() {
        let repository = ClassRepository::new();
        repository.add_source(
            "app/Support/Stub.php",
            "<?php\nnamespace App\\Support;\n\nclass Stub\n{\n    const TEMPLATE = <<<PHP\nclass Generated {}\nPHP;\n}\n",
        );

        assert!(repository.exists("App\\Support\\Stub"));
        assert!(!repository.exists("App\\Support\\Generated"));
        assert!(matches!(
            repository.load("App\\Support\\Generated"),
            Err(AnalyzerError::ClassNotFound(_))
        ));
        // confirmed entries stay indexed
        assert!(repository.exists("App\\Support\\Stub"));
    }
}
