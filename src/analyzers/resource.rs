//! Response shape of API resources.
//!
//! The literal array returned by `toArray()` is converted key by key. The
//! `when*` helpers mark a field conditional and keep the printed condition,
//! and nested resources are expanded, guarded against cycles.

use crate::ast::{short_name, string_key, ArrayItem, Expr, Literal, NewTarget};
use crate::cache::cached;
use crate::context::AnalysisContext;
use crate::error::ErrorKind;
use crate::inference::property_from_expr;
use crate::model::{PropertyInfo, ResourceSchema, SchemaType};
use crate::visit::{returned_array, ReturnCollector};
use crate::workspace::LoadedClass;
use super::literal::literal_value;
use log::debug;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;

const COMPONENT: &str = "ResourceAnalyzer";

pub const JSON_RESOURCE: &str = "Illuminate\\Http\\Resources\\Json\\JsonResource";
pub const RESOURCE_COLLECTION: &str = "Illuminate\\Http\\Resources\\Json\\ResourceCollection";

/// Nested resources deeper than this are referenced but not expanded
const MAX_NESTING: usize = 4;

/// Methods a resource may declare to supply its own example
const EXAMPLE_METHODS: &[&str] = &["openApiExample", "example"];

/// A `$this->when*()` call wrapping a field value
struct Conditional<'e> {
    condition: String,
    value: Option<&'e Expr>,
    fallback: SchemaType,
}

fn this_call<'e>(expr: &'e Expr) -> Option<(&'e str, &'e [crate::ast::Arg])> {
    match expr {
        Expr::MethodCall { object, method, args, .. } if object.is_this() => {
            Some((method.as_str(), args.as_slice()))
        }
        _ => None,
    }
}

/// Value a closure argument produces, or the argument itself
fn unwrap_closure(expr: &Expr) -> &Expr {
    match expr {
        Expr::Closure { body, .. } => ReturnCollector::collect(body)
            .returns
            .first()
            .copied()
            .unwrap_or(expr),
        other => other,
    }
}

fn positional(args: &[crate::ast::Arg], position: usize) -> Option<&Expr> {
    args.iter().filter(|a| a.name.is_none()).nth(position).map(|a| &a.value)
}

fn quoted(expr: Option<&Expr>) -> String {
    match expr {
        Some(value) => value.as_str().map_or_else(|| value.to_string(), str::to_string),
        None => "?".to_string(),
    }
}

fn conditional(expr: &Expr) -> Option<Conditional<'_>> {
    let (method, args) = this_call(expr)?;
    let arg = |position: usize| positional(args, position);
    let value = |position: usize| arg(position).map(unwrap_closure);
    let found = match method {
        "when" => Conditional {
            condition: format!("when {}", quoted(arg(0))),
            value: value(1),
            fallback: SchemaType::String,
        },
        "unless" => Conditional {
            condition: format!("unless {}", quoted(arg(0))),
            value: value(1),
            fallback: SchemaType::String,
        },
        "whenLoaded" => Conditional {
            condition: format!("when relation `{}` is loaded", quoted(arg(0))),
            value: value(1),
            fallback: SchemaType::Object,
        },
        "whenCounted" => Conditional {
            condition: format!("when the `{}` count is loaded", quoted(arg(0))),
            value: value(1),
            fallback: SchemaType::Integer,
        },
        "whenAggregated" => Conditional {
            condition: format!("when the `{}` aggregate is loaded", quoted(arg(0))),
            value: value(3),
            fallback: SchemaType::Number,
        },
        "whenNotNull" => Conditional {
            condition: format!("when {} is not null", quoted(arg(0))),
            value: value(0),
            fallback: SchemaType::String,
        },
        "whenHas" | "whenAppended" => Conditional {
            condition: format!("when attribute `{}` is present", quoted(arg(0))),
            value: value(1),
            fallback: SchemaType::String,
        },
        "whenPivotLoaded" | "whenPivotLoadedAs" => Conditional {
            condition: format!("when pivot `{}` is loaded", quoted(arg(0))),
            value: value(if method == "whenPivotLoadedAs" { 2 } else { 1 }),
            fallback: SchemaType::Object,
        },
        _ => return None,
    };
    Some(found)
}

pub struct ResourceAnalyzer<'a> {
    ctx: &'a AnalysisContext,
    /// Resources currently being expanded, outermost first
    stack: RefCell<Vec<String>>,
}

impl<'a> ResourceAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self {
            ctx,
            stack: RefCell::new(Vec::new()),
        }
    }

    pub fn is_resource(&self, fqn: &str) -> bool {
        let repository = &self.ctx.repository;
        repository.exists(fqn) && (repository.is_a(fqn, JSON_RESOURCE) || repository.is_a(fqn, RESOURCE_COLLECTION))
    }

    /// Extends `ResourceCollection`, or follows the `*Collection` naming
    pub fn is_collection_class(&self, fqn: &str) -> bool {
        self.ctx.repository.is_a(fqn, RESOURCE_COLLECTION) || short_name(fqn).ends_with("Collection")
    }

    pub fn analyze(&self, fqn: &str) -> ResourceSchema {
        let fqn = fqn.trim_start_matches('\\');
        cached(self.ctx.cache(), "resource", fqn, || self.analyze_uncached(fqn))
    }

    fn analyze_uncached(&self, fqn: &str) -> ResourceSchema {
        let loaded = match self.ctx.load_class(fqn) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.ctx.errors.report(COMPONENT, &e, [("class", fqn.to_string())]);
                return ResourceSchema::empty(fqn);
            }
        };
        let repository = &self.ctx.repository;
        if !repository.is_a(&loaded.fqn, JSON_RESOURCE) && !repository.is_a(&loaded.fqn, RESOURCE_COLLECTION) {
            self.ctx.errors.record(
                COMPONENT,
                ErrorKind::InvalidParentClass,
                format!("{} is not a JSON resource", loaded.fqn),
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
        schema.is_collection = self.is_collection_class(&loaded.fqn);
        if schema.is_collection {
            schema.collects = self.collected_resource(loaded);
        }
        schema.wrap = self.wrap(loaded);
        schema.with = self
            .ctx
            .repository
            .find_method(&loaded.fqn, "with")
            .and_then(|method| self.returned_properties(method.method().statements(), &method.owner))
            .unwrap_or_default();
        schema.custom_example = self.custom_example(loaded);

        let to_array = match self.ctx.repository.find_method(&loaded.fqn, "toArray") {
            Some(method) => method,
            None if schema.collects.is_some() => {
                schema.properties = self.element_properties(&schema);
                return schema;
            }
            None => {
                self.ctx.errors.record(
                    COMPONENT,
                    ErrorKind::MethodNodeError,
                    format!("{} has no toArray() with accessible source", loaded.fqn),
                    [
                        ("class", loaded.fqn.clone()),
                        ("method", "toArray".to_string()),
                        ("file", loaded.path().display().to_string()),
                    ],
                );
                return schema;
            }
        };
        match self.returned_properties(to_array.method().statements(), &to_array.owner) {
            Some(properties) => schema.properties = properties,
            // `return parent::toArray($request);` on a collection
            None if schema.collects.is_some() => schema.properties = self.element_properties(&schema),
            None => debug!("{}::toArray does not return a literal array", to_array.owner.fqn),
        }
        debug!("Resource {}: {} properties", loaded.fqn, schema.properties.len());
        schema
    }

    /// Properties of the literal array a method body returns
    fn returned_properties(
        &self,
        stmts: &[crate::ast::Stmt],
        scope: &LoadedClass,
    ) -> Option<BTreeMap<String, PropertyInfo>> {
        let returns = ReturnCollector::collect(stmts);
        let items = returns.returns.iter().find_map(|value| returned_array(value, stmts))?;
        Some(self.properties(items, scope))
    }

    fn properties(&self, items: &[ArrayItem], scope: &LoadedClass) -> BTreeMap<String, PropertyInfo> {
        let mut properties = BTreeMap::new();
        for item in items {
            let Some(key) = string_key(item) else {
                for (name, property) in self.merged(&item.value, scope) {
                    properties.insert(name, property);
                }
                continue;
            };
            properties.insert(key.to_string(), self.property(key, &item.value, scope));
        }
        properties
    }

    /// Fields contributed by `$this->merge([...])`, `$this->mergeWhen(...)`
    /// and `$this->mergeUnless(...)`
    fn merged(&self, value: &Expr, scope: &LoadedClass) -> BTreeMap<String, PropertyInfo> {
        let Some((method, args)) = this_call(value) else {
            debug!("Skipping unkeyed array item {} in {}", value, scope.fqn);
            return BTreeMap::new();
        };
        let (condition, position) = match method {
            "merge" => (None, 0),
            "mergeWhen" => (Some(format!("when {}", quoted(positional(args, 0)))), 1),
            "mergeUnless" => (Some(format!("unless {}", quoted(positional(args, 0)))), 1),
            _ => return BTreeMap::new(),
        };
        let Some(Expr::Array(items)) = positional(args, position).map(unwrap_closure) else {
            return BTreeMap::new();
        };
        let mut properties = self.properties(items, scope);
        if let Some(condition) = condition {
            for property in properties.values_mut() {
                property.conditional = true;
                property.condition = Some(condition.clone());
            }
        }
        properties
    }

    fn property(&self, field: &str, value: &Expr, scope: &LoadedClass) -> PropertyInfo {
        if let Some(conditional) = conditional(value) {
            let property = match conditional.value {
                Some(inner) => self.property(field, inner, scope),
                None => PropertyInfo::new(conditional.fallback),
            };
            return property.conditional_on(conditional.condition);
        }
        if let Some(property) = self.nested_resource(value, scope) {
            return property;
        }
        if let Expr::PropertyFetch { object, name, .. } = value {
            if object.is_this() && name == "collection" && self.is_collection_class(&scope.fqn) {
                let schema = ResourceSchema {
                    collects: self.collected_resource(scope),
                    ..ResourceSchema::empty(&scope.fqn)
                };
                let element = object_property(self.element_properties(&schema), schema.collects.clone());
                return array_of(element);
            }
        }
        if let Expr::Array(items) = value {
            if items.iter().any(|item| string_key(item).is_some()) {
                return object_property(self.properties(items, scope), None);
            }
        }
        property_from_expr(field, value)
    }

    /// `new XResource(...)`, `XResource::make(...)` and
    /// `XResource::collection(...)`
    fn nested_resource(&self, value: &Expr, scope: &LoadedClass) -> Option<PropertyInfo> {
        let (class, args, collection) = match value {
            Expr::New {
                target: NewTarget::Named(name),
                args,
            } => (name.as_str(), args.as_slice(), None),
            Expr::StaticCall { class, method, args } => {
                let Expr::Name(name) = class.as_ref() else { return None };
                match method.as_str() {
                    "collection" => (name.as_str(), args.as_slice(), Some(true)),
                    "make" => (name.as_str(), args.as_slice(), None),
                    _ => return None,
                }
            }
            _ => return None,
        };
        let fqn = self.ctx.resolve_in(class, scope);
        if !self.is_resource(&fqn) {
            return None;
        }
        let is_collection = collection.unwrap_or_else(|| self.is_collection_class(&fqn));
        let schema = self.nested(&fqn);
        let mut property = match schema {
            Some(schema) if schema.is_collection && collection.is_none() => {
                let element = object_property(self.element_properties(&schema), schema.collects.clone());
                array_of(element)
            }
            Some(schema) => {
                let element = object_property(schema.properties, Some(fqn.clone()));
                if is_collection {
                    array_of(element)
                } else {
                    element
                }
            }
            None if is_collection => array_of(object_property(BTreeMap::new(), Some(fqn.clone()))),
            None => object_property(BTreeMap::new(), Some(fqn.clone())),
        };
        property.resource = Some(fqn);
        if let Some(conditional) = positional(args, 0).and_then(conditional) {
            property = property.conditional_on(conditional.condition);
        }
        Some(property)
    }

    /// Schema of a nested resource, unless it is already being expanded
    fn nested(&self, fqn: &str) -> Option<ResourceSchema> {
        let stack = self.stack.borrow();
        if stack.len() >= MAX_NESTING || stack.iter().any(|open| open.eq_ignore_ascii_case(fqn)) {
            debug!("Not expanding {} inside {}", fqn, stack.join(" > "));
            return None;
        }
        drop(stack);
        Some(self.analyze(fqn))
    }

    /// Properties of each element of a collection resource
    fn element_properties(&self, schema: &ResourceSchema) -> BTreeMap<String, PropertyInfo> {
        schema
            .collects
            .as_deref()
            .and_then(|collects| self.nested(collects))
            .map(|element| element.properties)
            .unwrap_or_default()
    }

    /// `$collects`, else `UserCollection` collecting `UserResource` or `User`
    /// in the same namespace
    fn collected_resource(&self, loaded: &LoadedClass) -> Option<String> {
        let declared = self
            .ctx
            .repository
            .find_property(&loaded.fqn, "collects")
            .and_then(|(owner, property)| {
                let default = property.default?;
                let class = default.class_reference().or_else(|| default.as_str())?;
                Some(self.ctx.resolve_in(class, &owner))
            });
        if declared.is_some() {
            return declared;
        }
        let (namespace, short) = loaded.fqn.rsplit_once('\\').unwrap_or(("", loaded.fqn.as_str()));
        let stem = short.strip_suffix("Collection").filter(|s| !s.is_empty())?;
        [format!("{}Resource", stem), stem.to_string()]
            .into_iter()
            .map(|candidate| match namespace {
                "" => candidate,
                ns => format!("{}\\{}", ns, candidate),
            })
            .find(|candidate| self.is_resource(candidate) && !self.is_collection_class(candidate))
    }

    /// `public static $wrap`; `null` disables wrapping
    fn wrap(&self, loaded: &LoadedClass) -> Option<String> {
        match self.ctx.repository.find_property(&loaded.fqn, "wrap") {
            Some((_, property)) => match property.default {
                Some(Expr::Literal(Literal::String(key))) => Some(key),
                Some(Expr::Literal(Literal::Null)) => None,
                _ => Some("data".to_string()),
            },
            None => Some("data".to_string()),
        }
    }

    fn custom_example(&self, loaded: &LoadedClass) -> Option<Value> {
        EXAMPLE_METHODS.iter().find_map(|name| {
            let method = self.ctx.repository.find_method(&loaded.fqn, name)?;
            let stmts = method.method().statements();
            let returns = ReturnCollector::collect(stmts);
            returns
                .returns
                .iter()
                .find_map(|value| returned_array(value, stmts))
                .and_then(|items| literal_value(&Expr::Array(items.to_vec())))
        })
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

fn array_of(element: PropertyInfo) -> PropertyInfo {
    let example = Value::Array(element.example.iter().cloned().collect());
    let mut property = PropertyInfo::new(SchemaType::Array).with_example(example);
    property.resource = element.resource.clone();
    property.items = Some(Box::new(element));
    property
}
