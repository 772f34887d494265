use super::params::{EnumInfo, ParameterInfo};
use super::response::{PaginationInfo, ResponseInfo};
use super::rules::ValidationRuleSet;
use super::schema::ResourceSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `#[Callback(...)]` declared on an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackInfo {
    pub name: String,
    /// Runtime expression for the callback URL (`{$request.body#/callbackUrl}`)
    pub expression: String,
    /// HTTP method of the callback request
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Class describing the callback payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
}

/// `#[ResponseLink(...)]` declared on an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLinkInfo {
    pub status: u16,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_ref: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fractal transformer usage detected in an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalInfo {
    pub transformer: String,
    #[serde(default)]
    pub is_collection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_key: Option<String>,
    pub schema: ResourceSchema,
}

/// Enum-typed route-model parameter of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumParameter {
    pub name: String,
    #[serde(rename = "enum")]
    pub info: EnumInfo,
}

/// Everything known about one controller action
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerActionResult {
    pub controller: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_request_rules: Option<ValidationRuleSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_rules: Option<ValidationRuleSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceSchema>,
    /// Every resource of a union return type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_union: Vec<ResourceSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fractal: Option<FractalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<ParameterInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_parameters: Vec<ParameterInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_parameters: Vec<ParameterInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_parameters: Vec<EnumParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseInfo>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callbacks: Vec<CallbackInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<ResponseLinkInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ControllerActionResult {
    pub fn new(controller: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    /// Nothing beyond the identity was recovered
    pub fn is_empty(&self) -> bool {
        self.form_request_rules.is_none()
            && self.inline_rules.is_none()
            && self.resource.is_none()
            && self.resource_union.is_empty()
            && self.fractal.is_none()
            && self.pagination.is_none()
            && self.query_parameters.is_empty()
            && self.header_parameters.is_empty()
            && self.body_parameters.is_empty()
            && self.enum_parameters.is_empty()
            && self.response.as_ref().map_or(true, ResponseInfo::is_unknown)
            && self.callbacks.is_empty()
            && self.links.is_empty()
    }

    /// The validation set the body parameters were derived from
    pub fn validation(&self) -> Option<&ValidationRuleSet> {
        self.form_request_rules
            .as_ref()
            .filter(|r| !r.is_empty())
            .or(self.inline_rules.as_ref())
    }
}
