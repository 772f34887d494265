//! Fractal transformers and their use inside controller actions.

use super::literal::string_list;
use crate::ast::{short_name, string_key, Expr, NewTarget};
use crate::cache::cached;
use crate::context::AnalysisContext;
use crate::error::ErrorKind;
use crate::inference::{property_from_expr, to_studly_case};
use crate::model::{FractalInfo, IncludeInfo, IncludeKind, PropertyInfo, ResourceSchema, SchemaType};
use crate::visit::{returned_array, ReturnCollector};
use crate::workspace::LoadedClass;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const COMPONENT: &str = "FractalAnalyzer";

pub const TRANSFORMER_ABSTRACT: &str = "League\\Fractal\\TransformerAbstract";

const MAX_NESTING: usize = 4;

/// How a usage pattern tells item from collection
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// A `kind` capture names it
    Named,
    /// Guessed from the data argument
    FromData,
}

/// One call argument: anything up to a comma, allowing one level of parentheses
const ARG: &str = r"(?:[^,()]|\((?:[^()]|\([^()]*\))*\))+";

/// Usage idioms in priority order
fn usage_patterns() -> &'static [(Shape, Regex)] {
    static PATTERNS: OnceLock<Vec<(Shape, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let sources = [
            // new Item($user, new UserTransformer, 'users')
            (
                Shape::Named,
                format!(
                    r"new\s+\\?(?:League\\Fractal\\Resource\\)?(?P<kind>Item|Collection)\s*\(\s*{ARG},\s*new\s+\\?(?P<t>[\w\\]+)(?:\s*\(\s*\))?(?:\s*,\s*'(?P<key>[^']+)')?"
                ),
            ),
            // fractal()->collection($users, new UserTransformer()), Fractal::item(...)
            (
                Shape::Named,
                format!(
                    r"(?:->|::)(?P<kind>item|collection)\(\s*{ARG},\s*new\s+\\?(?P<t>[\w\\]+)(?:\s*\(\s*\))?(?:\s*,\s*'(?P<key>[^']+)')?"
                ),
            ),
            // $this->respondWithCollection($users, new UserTransformer)
            (
                Shape::Named,
                format!(r"respondWith(?P<kind>Item|Collection)\(\s*{ARG},\s*new\s+\\?(?P<t>[\w\\]+)"),
            ),
            // fractal($users, new UserTransformer)
            (
                Shape::FromData,
                format!(r"fractal\(\s*(?P<data>{ARG}),\s*new\s+\\?(?P<t>[\w\\]+)"),
            ),
            // fractal($users)->transformWith(new UserTransformer)
            (
                Shape::FromData,
                r"->transformWith\(\s*(?:new\s+)?\\?(?P<t>[\w\\]+?)(?:::class)?\s*[()]".to_string(),
            ),
        ];
        sources
            .into_iter()
            .map(|(shape, source)| (shape, Regex::new(&source).expect("valid regex")))
            .collect()
    })
}

fn data_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?:fractal\(|->(?P<kind>collection|item)\()\s*(?P<data>{ARG})\s*[,)]"))
            .expect("valid regex")
    })
}

fn resource_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"->withResourceName\(\s*'([^']+)'").expect("valid regex"))
}

/// A usage found in an action's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FractalUsage {
    /// As written
    pub transformer: String,
    pub is_collection: bool,
    pub resource_key: Option<String>,
}

/// Whether a data argument looks like several records
fn looks_like_collection(data: &str) -> bool {
    let data = data.trim();
    let markers = ["->get()", "::all()", "->all()", "paginate(", "collect(", "->map(", "->filter("];
    if markers.iter().any(|m| data.contains(m)) {
        return true;
    }
    // `$users` but not `$address`
    data.strip_prefix('$')
        .filter(|name| name.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .is_some_and(|name| name.ends_with('s') && !name.ends_with("ss"))
}

/// First Fractal usage in an action's source text
pub fn detect_usage(source: &str) -> Option<FractalUsage> {
    for (shape, regex) in usage_patterns() {
        let Some(caps) = regex.captures(source) else { continue };
        let transformer = caps.name("t")?.as_str().to_string();
        let is_collection = match shape {
            Shape::Named => caps
                .name("kind")
                .is_some_and(|k| k.as_str().eq_ignore_ascii_case("collection")),
            Shape::FromData => match caps.name("data") {
                Some(data) => looks_like_collection(data.as_str()),
                None => data_regex().captures(source).is_some_and(|data| match data.name("kind") {
                    Some(kind) => kind.as_str() == "collection",
                    None => data.name("data").is_some_and(|d| looks_like_collection(d.as_str())),
                }),
            },
        };
        let resource_key = resource_name_regex()
            .captures(source)
            .and_then(|c| c.get(1))
            .or_else(|| caps.name("key"))
            .map(|m| m.as_str().to_string());
        return Some(FractalUsage {
            transformer,
            is_collection,
            resource_key,
        });
    }
    None
}

pub struct FractalAnalyzer<'a> {
    ctx: &'a AnalysisContext,
    stack: RefCell<Vec<String>>,
}

impl<'a> FractalAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self {
            ctx,
            stack: RefCell::new(Vec::new()),
        }
    }

    pub fn is_transformer(&self, fqn: &str) -> bool {
        self.ctx.repository.exists(fqn) && self.ctx.repository.is_a(fqn, TRANSFORMER_ABSTRACT)
    }

    /// Fractal usage in `source`, written inside `controller`
    pub fn analyze_usage(&self, source: &str, controller: &LoadedClass) -> Option<FractalInfo> {
        let usage = detect_usage(source)?;
        let transformer = self.ctx.resolve_in(&usage.transformer, controller);
        debug!(
            "Fractal {} via {} in {}",
            if usage.is_collection { "collection" } else { "item" },
            transformer,
            controller.fqn
        );
        let schema = self.analyze(&transformer);
        Some(FractalInfo {
            transformer,
            is_collection: usage.is_collection,
            resource_key: usage.resource_key,
            schema,
        })
    }

    /// Output of `transform()` plus the declared includes
    pub fn analyze(&self, fqn: &str) -> ResourceSchema {
        let fqn = fqn.trim_start_matches('\\');
        cached(self.ctx.cache(), "fractal", fqn, || self.analyze_uncached(fqn))
    }

    fn analyze_uncached(&self, fqn: &str) -> ResourceSchema {
        let loaded = match self.ctx.load_class(fqn) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.ctx.errors.report(COMPONENT, &e, [("class", fqn.to_string())]);
                return ResourceSchema::empty(fqn);
            }
        };
        if !self.ctx.repository.is_a(&loaded.fqn, TRANSFORMER_ABSTRACT) {
            self.ctx.errors.record(
                COMPONENT,
                ErrorKind::InvalidParentClass,
                format!("{} is not a Fractal transformer", loaded.fqn),
                [("class", loaded.fqn.clone()), ("file", loaded.path().display().to_string())],
            );
            return ResourceSchema::empty(&loaded.fqn);
        }
        self.stack.borrow_mut().push(loaded.fqn.clone());
        let schema = self.build(&loaded);
        self.stack.borrow_mut().pop();
        schema
    }

    fn build(&self, loaded: &LoadedClass) -> ResourceSchema {
        let mut schema = ResourceSchema::empty(&loaded.fqn);
        match self.ctx.repository.find_method(&loaded.fqn, "transform") {
            Some(method) => {
                let stmts = method.method().statements();
                let returns = ReturnCollector::collect(stmts);
                match returns.returns.iter().find_map(|v| returned_array(v, stmts)) {
                    Some(items) => {
                        for item in items {
                            let Some(key) = string_key(item) else { continue };
                            schema
                                .properties
                                .insert(key.to_string(), self.value_property(key, &item.value));
                        }
                    }
                    None => debug!("{}::transform does not return a literal array", loaded.fqn),
                }
            }
            None => self.ctx.errors.record(
                COMPONENT,
                ErrorKind::MethodNodeError,
                format!("{} has no transform() method", loaded.fqn),
                [
                    ("class", loaded.fqn.clone()),
                    ("method", "transform".to_string()),
                    ("file", loaded.path().display().to_string()),
                ],
            ),
        }

        let list = |name: &str| {
            self.ctx
                .repository
                .find_property(&loaded.fqn, name)
                .and_then(|(_, p)| p.default)
                .map(|d| string_list(&d))
                .unwrap_or_default()
        };
        let available = list("availableIncludes");
        let defaults = list("defaultIncludes");
        let mut names: Vec<&String> = available.iter().collect();
        names.extend(defaults.iter().filter(|d| !available.contains(d)));

        for name in names {
            let include = self.include(loaded, name, defaults.contains(name));
            let property = self.include_property(&include);
            schema.properties.entry(include.name.clone()).or_insert(property);
            schema.available_includes.push(include);
        }
        schema.default_includes = defaults;
        schema
    }

    fn value_property(&self, field: &str, value: &Expr) -> PropertyInfo {
        if let Expr::Array(items) = value {
            if items.iter().any(|item| string_key(item).is_some()) {
                let properties: BTreeMap<String, PropertyInfo> = items
                    .iter()
                    .filter_map(|item| {
                        let key = string_key(item)?;
                        Some((key.to_string(), self.value_property(key, &item.value)))
                    })
                    .collect();
                return object_property(properties, None);
            }
        }
        property_from_expr(field, value)
    }

    /// Classify `include<Name>()` by the builder it returns through
    fn include(&self, loaded: &LoadedClass, name: &str, default: bool) -> IncludeInfo {
        let head = name.split('.').next().unwrap_or(name);
        let method_name = format!("include{}", to_studly_case(head));
        let Some(found) = self.ctx.repository.find_method(&loaded.fqn, &method_name) else {
            debug!("{} lists include {} without {}()", loaded.fqn, name, method_name);
            return IncludeInfo {
                name: head.to_string(),
                kind: IncludeKind::Unknown,
                transformer: None,
                default,
                has_method: false,
            };
        };
        let stmts = found.method().statements();
        let returns = ReturnCollector::collect(stmts);
        let (kind, transformer) = returns
            .returns
            .iter()
            .find_map(|value| match value {
                Expr::MethodCall { object, method, args, .. } if object.is_this() => {
                    let kind = match method.to_ascii_lowercase().as_str() {
                        "item" | "primitive" => IncludeKind::Item,
                        "collection" => IncludeKind::Collection,
                        "null" => IncludeKind::Null,
                        _ => return None,
                    };
                    let transformer = args
                        .iter()
                        .filter(|a| a.name.is_none())
                        .nth(1)
                        .and_then(|a| transformer_name(&a.value))
                        .map(|t| self.ctx.resolve_in(t, &found.owner));
                    Some((kind, transformer))
                }
                _ => None,
            })
            .unwrap_or((IncludeKind::Unknown, None));
        IncludeInfo {
            name: head.to_string(),
            kind,
            transformer,
            default,
            has_method: true,
        }
    }

    fn include_property(&self, include: &IncludeInfo) -> PropertyInfo {
        let nested = include
            .transformer
            .as_deref()
            .filter(|t| self.is_transformer(t))
            .and_then(|t| self.nested(t))
            .map(|schema| schema.properties)
            .unwrap_or_default();
        let element = object_property(nested, include.transformer.clone());
        let mut property = match include.kind {
            IncludeKind::Collection => {
                let mut array = PropertyInfo::new(SchemaType::Array)
                    .with_example(Value::Array(element.example.iter().cloned().collect()));
                array.resource = element.resource.clone();
                array.items = Some(Box::new(element));
                array
            }
            IncludeKind::Null => {
                let mut property = element;
                property.nullable = true;
                property
            }
            IncludeKind::Item | IncludeKind::Unknown => element,
        };
        if !include.default {
            property = property.conditional_on(format!("when `?include={}` is requested", include.name));
        }
        property
    }

    fn nested(&self, fqn: &str) -> Option<ResourceSchema> {
        let stack = self.stack.borrow();
        if stack.len() >= MAX_NESTING || stack.iter().any(|open| open.eq_ignore_ascii_case(fqn)) {
            return None;
        }
        drop(stack);
        Some(self.analyze(fqn))
    }
}

/// `new T`, `new T()`, `T::class` or `app(T::class)`
fn transformer_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::New {
            target: NewTarget::Named(name),
            ..
        } => Some(name.as_str()),
        Expr::FuncCall { name, args } if short_name(name).eq_ignore_ascii_case("app") || name == "resolve" => {
            args.first().and_then(|a| a.value.class_reference())
        }
        other => other.class_reference(),
    }
}

fn object_property(properties: BTreeMap<String, PropertyInfo>, resource: Option<String>) -> PropertyInfo {
    let example = Value::Object(
        properties
            .iter()
            .map(|(name, p)| (name.clone(), p.example.clone().unwrap_or(Value::Null)))
            .collect(),
    );
    let mut property = PropertyInfo::new(SchemaType::Object).with_example(example);
    property.properties = Some(properties);
    property.resource = resource;
    property
}
