use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A security scheme definition, keyed by name in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// `http`, `apiKey`, `oauth2`
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    /// Header, query or cookie name for `apiKey`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// OAuth2 token URL for client-credential flows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl SecurityScheme {
    pub fn bearer(format: Option<&str>, description: &str) -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: format.map(str::to_string),
            name: None,
            location: None,
            description: Some(description.to_string()),
            token_url: None,
        }
    }

    pub fn api_key(name: &str, location: &str, description: &str) -> Self {
        Self {
            scheme_type: "apiKey".to_string(),
            scheme: None,
            bearer_format: None,
            name: Some(name.to_string()),
            location: Some(location.to_string()),
            description: Some(description.to_string()),
            token_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRequirement {
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// Authentication requirements of one route
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthenticationInfo {
    pub required: bool,
    /// Alternatives; any one satisfies the route
    pub requirements: Vec<SecurityRequirement>,
    /// Middleware tokens the requirements came from
    pub middleware: Vec<String>,
}

impl AuthenticationInfo {
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Schemes used anywhere in one run, deduplicated by name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemeRegistry {
    pub schemes: BTreeMap<String, SecurityScheme>,
}

impl SchemeRegistry {
    /// Register a scheme; the first definition under a name is kept
    pub fn register(&mut self, name: &str, scheme: SecurityScheme) {
        self.schemes.entry(name.to_string()).or_insert(scheme);
    }

    pub fn get(&self, name: &str) -> Option<&SecurityScheme> {
        self.schemes.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}
