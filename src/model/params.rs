use super::schema::SchemaType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Body,
}

/// Numeric and length bounds recovered from rules
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }

    /// Fill unset bounds from `other`
    pub fn merge_missing(&mut self, other: &Constraints) {
        self.min_length = self.min_length.or(other.min_length);
        self.max_length = self.max_length.or(other.max_length);
        self.minimum = self.minimum.or(other.minimum);
        self.maximum = self.maximum.or(other.maximum);
        self.min_items = self.min_items.or(other.min_items);
        self.max_items = self.max_items.or(other.max_items);
        if self.pattern.is_none() {
            self.pattern = other.pattern.clone();
        }
    }
}

/// Upload constraints of a file field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileUploadInfo {
    #[serde(default)]
    pub is_image: bool,
    /// Several files under a `.*` path
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mime_types: Vec<String>,
    /// Extensions listed by `mimes:`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: BTreeMap<String, String>,
}

/// Values allowed by a backed enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumInfo {
    /// Fully-qualified enum class
    pub class: String,
    /// `string` or `integer`
    #[serde(rename = "type")]
    pub value_type: SchemaType,
    pub values: Vec<Value>,
}

/// Password policy recovered from a `Password::...` chain
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PasswordRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub mixed_case: bool,
    #[serde(default)]
    pub numbers: bool,
    #[serde(default)]
    pub symbols: bool,
    #[serde(default)]
    pub letters: bool,
    #[serde(default)]
    pub uncompromised: bool,
}

impl PasswordRequirements {
    /// Human-readable summary used in parameter descriptions
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(min) = self.min_length {
            parts.push(format!("at least {} characters", min));
        }
        if let Some(max) = self.max_length {
            parts.push(format!("at most {} characters", max));
        }
        if self.mixed_case {
            parts.push("upper and lower case letters".to_string());
        }
        if self.letters {
            parts.push("at least one letter".to_string());
        }
        if self.numbers {
            parts.push("at least one number".to_string());
        }
        if self.symbols {
            parts.push("at least one symbol".to_string());
        }
        if self.uncompromised {
            parts.push("not found in known data leaks".to_string());
        }
        format!("Password must contain {}", parts.join(", "))
    }
}

/// One parameter of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Call or rule the parameter was found through
    pub source: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileUploadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordRequirements>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, location: ParameterLocation, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location,
            schema_type: SchemaType::String,
            format: None,
            required: false,
            default: None,
            source: source.into(),
            description: String::new(),
            example: None,
            enum_values: None,
            enum_class: None,
            validation_rules: None,
            constraints: Constraints::default(),
            items: None,
            file: None,
            password: None,
            nullable: false,
            context: BTreeMap::new(),
        }
    }
}

/// Constraints recovered from a user-defined rule class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRuleInfo {
    pub class: String,
    /// `self_describing`, `attribute` or `properties`
    pub strategy: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomRuleInfo {
    pub fn is_empty(&self) -> bool {
        self.schema_type.is_none()
            && self.format.is_none()
            && self.constraints.is_empty()
            && self.description.is_none()
    }
}
