use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type of a field or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SchemaType::Integer | SchemaType::Number)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of type inference for one expression or rule list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InferredType {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<InferredType>>,
}

impl InferredType {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            ..Self::default()
        }
    }

    pub fn with_format(schema_type: SchemaType, format: &str) -> Self {
        Self {
            schema_type,
            format: Some(format.to_string()),
            ..Self::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// One field of a response shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyInfo {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyInfo>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub conditional: bool,
    /// Human-readable condition for conditional fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Nested resource or transformer class backing this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertyInfo {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            ..Self::default()
        }
    }

    pub fn from_inferred(inferred: InferredType) -> Self {
        Self {
            schema_type: inferred.schema_type,
            format: inferred.format,
            nullable: inferred.nullable,
            properties: inferred.properties,
            items: inferred
                .items
                .map(|items| Box::new(PropertyInfo::from_inferred(*items))),
            ..Self::default()
        }
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn conditional_on(mut self, condition: impl Into<String>) -> Self {
        self.conditional = true;
        self.condition = Some(condition.into());
        self
    }
}

/// Whether an include relation yields one item or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    Item,
    Collection,
    Null,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeInfo {
    pub name: String,
    pub kind: IncludeKind,
    /// Transformer class producing the included data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<String>,
    /// Listed in the default includes
    #[serde(default)]
    pub default: bool,
    /// `include<Name>` method found
    #[serde(default)]
    pub has_method: bool,
}

/// Shape produced by a resource or transformer class
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Analyzed class
    pub class: String,
    pub properties: BTreeMap<String, PropertyInfo>,
    #[serde(default)]
    pub is_collection: bool,
    /// Resource used for each element of a collection resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collects: Option<String>,
    /// Top-level keys added next to the data wrapper
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, PropertyInfo>,
    /// Example supplied by the class itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_example: Option<Value>,
    /// Wrapper key (`data` unless overridden or disabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_includes: Vec<IncludeInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_includes: Vec<String>,
}

impl ResourceSchema {
    pub fn empty(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    /// No properties recovered
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.custom_example.is_none()
    }

    pub fn has_includes(&self) -> bool {
        !self.available_includes.is_empty() || !self.default_includes.is_empty()
    }
}
