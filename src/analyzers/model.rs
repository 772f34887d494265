//! Serialized shape of Eloquent models.

use super::enums::EnumAnalyzer;
use super::literal::{literal_value, string_list, string_map};
use crate::ast::{short_name, TypeHint};
use crate::cache::cached;
use crate::context::AnalysisContext;
use crate::error::ErrorKind;
use crate::inference::{property_from_type, to_studly_case, type_from_name};
use crate::model::{InferredType, PropertyInfo, ResourceSchema, SchemaType};
use crate::visit::{returned_array, ReturnCollector};
use crate::workspace::LoadedClass;
use log::debug;
use serde_json::Value;

const COMPONENT: &str = "ModelAnalyzer";

pub const ELOQUENT_MODEL: &str = "Illuminate\\Database\\Eloquent\\Model";

/// Cast name to type; `decimal:2` and similar match on the part before `:`
const CAST_TYPES: &[(&str, SchemaType, Option<&str>)] = &[
    ("int", SchemaType::Integer, None),
    ("integer", SchemaType::Integer, None),
    ("timestamp", SchemaType::Integer, None),
    ("real", SchemaType::Number, None),
    ("float", SchemaType::Number, None),
    ("double", SchemaType::Number, None),
    ("decimal", SchemaType::Number, None),
    ("string", SchemaType::String, None),
    ("encrypted", SchemaType::String, None),
    ("hashed", SchemaType::String, None),
    ("bool", SchemaType::Boolean, None),
    ("boolean", SchemaType::Boolean, None),
    ("array", SchemaType::Array, None),
    ("collection", SchemaType::Array, None),
    ("encrypted:array", SchemaType::Array, None),
    ("encrypted:collection", SchemaType::Array, None),
    ("json", SchemaType::Object, None),
    ("object", SchemaType::Object, None),
    ("encrypted:object", SchemaType::Object, None),
    ("date", SchemaType::String, Some("date")),
    ("immutable_date", SchemaType::String, Some("date")),
    ("datetime", SchemaType::String, Some("date-time")),
    ("immutable_datetime", SchemaType::String, Some("date-time")),
    ("custom_datetime", SchemaType::String, Some("date-time")),
];

/// Cast classes shipped with the framework
const CAST_CLASSES: &[(&str, SchemaType)] = &[
    ("AsArrayObject", SchemaType::Object),
    ("AsCollection", SchemaType::Array),
    ("AsEncryptedArrayObject", SchemaType::Object),
    ("AsEncryptedCollection", SchemaType::Array),
    ("AsStringable", SchemaType::String),
];

fn cast_type(cast: &str) -> Option<InferredType> {
    let lower = cast.trim().to_ascii_lowercase();
    let full = CAST_TYPES.iter().find(|(name, _, _)| *name == lower);
    let prefix = || {
        let head = lower.split(':').next().unwrap_or(&lower);
        CAST_TYPES.iter().find(|(name, _, _)| *name == head)
    };
    let (_, schema_type, format) = full.or_else(prefix)?;
    Some(InferredType {
        schema_type: *schema_type,
        format: format.map(str::to_string),
        ..InferredType::default()
    })
}

fn hint_type(hint: &TypeHint) -> Option<InferredType> {
    let name = hint.single_name()?.trim_start_matches('\\');
    let schema_type = match name.to_ascii_lowercase().as_str() {
        "int" => SchemaType::Integer,
        "float" => SchemaType::Number,
        "bool" => SchemaType::Boolean,
        "array" | "iterable" => SchemaType::Array,
        "string" => SchemaType::String,
        "carbon" | "carboninterface" | "datetimeinterface" | "datetime" | "carbonimmutable" => {
            return Some(InferredType::with_format(SchemaType::String, "date-time"))
        }
        _ => return None,
    };
    let inferred = InferredType::new(schema_type);
    Some(if hint.is_nullable() { inferred.nullable() } else { inferred })
}

pub struct ModelAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> ModelAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    pub fn is_model(&self, fqn: &str) -> bool {
        self.ctx.repository.exists(fqn) && self.ctx.repository.is_a(fqn, ELOQUENT_MODEL)
    }

    /// Attributes a model serializes to, honouring `$visible` and `$hidden`
    pub fn analyze(&self, fqn: &str) -> ResourceSchema {
        let fqn = fqn.trim_start_matches('\\');
        cached(self.ctx.cache(), "model", fqn, || self.analyze_uncached(fqn))
    }

    fn analyze_uncached(&self, fqn: &str) -> ResourceSchema {
        let loaded = match self.ctx.load_class(fqn) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.ctx.errors.report(COMPONENT, &e, [("class", fqn.to_string())]);
                return ResourceSchema::empty(fqn);
            }
        };
        if !self.ctx.repository.is_a(&loaded.fqn, ELOQUENT_MODEL) {
            self.ctx.errors.record(
                COMPONENT,
                ErrorKind::InvalidParentClass,
                format!("{} is not an Eloquent model", loaded.fqn),
                [("class", loaded.fqn.clone()), ("file", loaded.path().display().to_string())],
            );
            return ResourceSchema::empty(&loaded.fqn);
        }

        let list = |name: &str| {
            self.ctx
                .repository
                .find_property(&loaded.fqn, name)
                .and_then(|(_, p)| p.default)
                .map(|d| string_list(&d))
                .unwrap_or_default()
        };
        let fillable = list("fillable");
        let hidden = list("hidden");
        let visible = list("visible");
        let appends = list("appends");
        let casts = self.casts(&loaded);

        let primary_key = self
            .ctx
            .repository
            .find_property(&loaded.fqn, "primaryKey")
            .and_then(|(_, p)| p.default)
            .and_then(|d| d.as_str().map(str::to_string))
            .unwrap_or_else(|| "id".to_string());
        let key_type = self
            .ctx
            .repository
            .find_property(&loaded.fqn, "keyType")
            .and_then(|(_, p)| p.default)
            .and_then(|d| d.as_str().map(str::to_string));
        let timestamps = self
            .ctx
            .repository
            .find_property(&loaded.fqn, "timestamps")
            .and_then(|(_, p)| p.default)
            .and_then(|d| literal_value(&d))
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let mut schema = ResourceSchema::empty(&loaded.fqn);
        let key = match key_type.as_deref() {
            Some("string") => InferredType::new(SchemaType::String),
            _ => InferredType::new(SchemaType::Integer),
        };
        schema
            .properties
            .insert(primary_key.clone(), property_from_type(&primary_key, key));

        let mut fields: Vec<String> = fillable;
        for (field, _) in &casts {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        for field in fields {
            let property = match casts.iter().find(|(name, _)| *name == field) {
                Some((_, cast)) => self.cast_property(&field, cast, &loaded),
                None => property_from_type(&field, type_from_name(&field)),
            };
            schema.properties.insert(field, property);
        }
        if timestamps {
            for field in ["created_at", "updated_at"] {
                schema.properties.insert(
                    field.to_string(),
                    property_from_type(field, InferredType::with_format(SchemaType::String, "date-time")),
                );
            }
        }
        for field in appends {
            let inferred = self
                .accessor_type(&loaded, &field)
                .unwrap_or_else(|| type_from_name(&field));
            schema.properties.insert(field.clone(), property_from_type(&field, inferred));
        }

        if !visible.is_empty() {
            schema.properties.retain(|name, _| visible.contains(name));
        }
        schema.properties.retain(|name, _| !hidden.contains(name));
        debug!("Model {}: {} attributes", loaded.fqn, schema.properties.len());
        schema
    }

    /// `$casts` merged with the literal array returned by `casts()`, in
    /// declaration order
    fn casts(&self, loaded: &LoadedClass) -> Vec<(String, String)> {
        let mut casts: Vec<(String, String)> = self
            .ctx
            .repository
            .find_property(&loaded.fqn, "casts")
            .and_then(|(owner, p)| p.default.map(|d| self.cast_pairs(&d, &owner)))
            .unwrap_or_default();
        if let Some(method) = self.ctx.repository.find_method(&loaded.fqn, "casts") {
            let stmts = method.method().statements();
            let returns = ReturnCollector::collect(stmts);
            if let Some(items) = returns.returns.iter().find_map(|v| returned_array(v, stmts)) {
                for (field, cast) in self.cast_pairs(&crate::ast::Expr::Array(items.to_vec()), &method.owner) {
                    match casts.iter_mut().find(|(name, _)| *name == field) {
                        Some(existing) => existing.1 = cast,
                        None => casts.push((field, cast)),
                    }
                }
            }
        }
        casts
    }

    /// Cast pairs with `Foo::class` values resolved against the declaring class
    fn cast_pairs(&self, expr: &crate::ast::Expr, owner: &LoadedClass) -> Vec<(String, String)> {
        let mut pairs = string_map(expr);
        if let Some(items) = expr.as_array() {
            for item in items {
                let (Some(key), Some(class)) = (crate::ast::string_key(item), item.value.class_reference()) else {
                    continue;
                };
                pairs.push((key.to_string(), self.ctx.resolve_in(class, owner)));
            }
        }
        pairs
    }

    fn cast_property(&self, field: &str, cast: &str, loaded: &LoadedClass) -> PropertyInfo {
        if let Some(inferred) = cast_type(cast) {
            return property_from_type(field, inferred);
        }
        if let Some(info) = EnumAnalyzer::new(self.ctx).analyze_cast(cast, loaded) {
            let mut property = property_from_type(field, InferredType::new(info.value_type));
            property.example = info.values.first().cloned();
            property.enum_values = Some(info.values);
            property.resource = Some(info.class);
            return property;
        }
        let cast_class = short_name(cast.split(':').next().unwrap_or(cast));
        if let Some((_, schema_type)) = CAST_CLASSES.iter().find(|(name, _)| *name == cast_class) {
            return property_from_type(field, InferredType::new(*schema_type));
        }
        debug!("Unknown cast {} on {}.{}", cast, loaded.fqn, field);
        property_from_type(field, type_from_name(field))
    }

    /// Return type of `getFooAttribute()` or a `foo(): Attribute` accessor
    fn accessor_type(&self, loaded: &LoadedClass, field: &str) -> Option<InferredType> {
        let studly = to_studly_case(field);
        if let Some(method) = self
            .ctx
            .repository
            .find_method(&loaded.fqn, &format!("get{}Attribute", studly))
        {
            return method.method().return_type.as_ref().and_then(hint_type);
        }
        let camel = {
            let mut chars = studly.chars();
            chars
                .next()
                .map(|c| c.to_ascii_lowercase().to_string() + chars.as_str())
                .unwrap_or_default()
        };
        let method = self.ctx.repository.find_method(&loaded.fqn, &camel)?;
        let returns_attribute = method
            .method()
            .return_type
            .as_ref()
            .and_then(TypeHint::single_name)
            .is_some_and(|name| short_name(name) == "Attribute");
        if !returns_attribute {
            return None;
        }
        // `get: fn (): string => ...` carries the type on the closure
        let source = &method.method().source;
        let hint = source
            .split("get:")
            .nth(1)
            .and_then(|rest| rest.split("=>").next())
            .and_then(|head| head.rsplit("):").next())
            .map(str::trim)
            .filter(|hint| !hint.is_empty() && !hint.contains('('))
            .and_then(TypeHint::parse);
        hint.as_ref().and_then(hint_type)
    }
}

/// Example object of a model schema
pub fn model_example(schema: &ResourceSchema) -> Value {
    Value::Object(
        schema
            .properties
            .iter()
            .map(|(name, p)| (name.clone(), p.example.clone().unwrap_or(Value::Null)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USER: &str = r#"<?php
namespace App\Models;

use App\Enums\Status;
use Illuminate\Database\Eloquent\Casts\Attribute;
use Illuminate\Database\Eloquent\Model;

class User extends Model
{
    protected $fillable = ['name', 'email', 'password', 'status', 'is_admin'];

    protected $hidden = ['password'];

    protected $appends = ['full_name', 'initials'];

    protected $casts = [
        'is_admin' => 'boolean',
        'settings' => 'array',
        'status' => Status::class,
    ];

    protected function casts(): array
    {
        return ['email_verified_at' => 'datetime', 'balance' => 'decimal:2'];
    }

    public function getFullNameAttribute(): string
    {
        return $this->name;
    }

    protected function initials(): Attribute
    {
        return Attribute::make(get: fn (): string => substr($this->name, 0, 2));
    }
}
"#;

    const STATUS: &str = "<?php\nnamespace App\\Enums;\nenum Status: string { case Active = 'active'; case Banned = 'banned'; }\n";

    fn context() -> AnalysisContext {
        AnalysisContext::in_memory(&[("app/Models/User.php", USER), ("app/Enums/Status.php", STATUS)])
    }

    #[test]
    fn test_model_attributes() {
        let ctx = context();
        let schema = ModelAnalyzer::new(&ctx).analyze("App\\Models\\User");
        let names: Vec<&str> = schema.properties.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "balance",
                "created_at",
                "email",
                "email_verified_at",
                "full_name",
                "id",
                "initials",
                "is_admin",
                "name",
                "settings",
                "status",
                "updated_at",
            ]
        );
        assert_eq!(schema.properties["id"].schema_type, SchemaType::Integer);
        assert_eq!(schema.properties["is_admin"].schema_type, SchemaType::Boolean);
        assert_eq!(schema.properties["settings"].schema_type, SchemaType::Array);
        assert_eq!(schema.properties["balance"].schema_type, SchemaType::Number);
        assert_eq!(schema.properties["email_verified_at"].format.as_deref(), Some("date-time"));
        assert_eq!(schema.properties["full_name"].schema_type, SchemaType::String);
    }

    #[test]
    fn test_enum_cast() {
        let ctx = context();
        let schema = ModelAnalyzer::new(&ctx).analyze("App\\Models\\User");
        let status = &schema.properties["status"];
        assert_eq!(status.enum_values, Some(vec![Value::from("active"), Value::from("banned")]));
        assert_eq!(status.resource.as_deref(), Some("App\\Enums\\Status"));
    }

    #[test]
    fn test_non_model_is_reported() {
        let ctx = AnalysisContext::in_memory(&[("app/Thing.php", "<?php\nnamespace App;\nclass Thing {}\n")]);
        let schema = ModelAnalyzer::new(&ctx).analyze("App\\Thing");
        assert!(schema.is_empty());
        assert_eq!(ctx.errors.count_of(ErrorKind::InvalidParentClass), 1);
    }
}
