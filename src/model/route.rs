use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods a route can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn parse(name: &str) -> Option<HttpMethod> {
        match name.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "HEAD" => Some(HttpMethod::Head),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods matched by `Route::any`
    pub fn all() -> Vec<HttpMethod> {
        vec![
            HttpMethod::Get,
            HttpMethod::Head,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
            HttpMethod::Options,
        ]
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParameter {
    pub name: String,
    /// `false` for `{name?}`
    pub required: bool,
    /// Constraint from `where()` / `whereNumber()` and friends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// One route as collected from the route files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// URI pattern without leading slash (`api/users/{user}`)
    pub uri: String,
    /// Sorted, deduplicated
    pub methods: Vec<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered, may repeat
    pub middleware: Vec<String>,
    pub parameters: Vec<PathParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl RouteDescriptor {
    pub fn new(uri: impl Into<String>, methods: Vec<HttpMethod>) -> Self {
        let uri = uri.into();
        let mut methods = methods;
        methods.sort();
        methods.dedup();
        let parameters = path_parameters(&uri);
        Self {
            uri,
            methods,
            controller: None,
            action: None,
            name: None,
            middleware: Vec::new(),
            parameters,
            source_file: None,
        }
    }

    /// Whether the route is handled by a controller method
    pub fn has_controller(&self) -> bool {
        self.controller.is_some() && self.action.is_some()
    }
}

/// Extract `{name}` / `{name?}` segments from a URI pattern
pub fn path_parameters(uri: &str) -> Vec<PathParameter> {
    let mut parameters = Vec::new();
    let mut rest = uri;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let inner = &rest[start + 1..start + len];
        let (name, required) = match inner.strip_suffix('?') {
            Some(name) => (name, false),
            None => (inner, true),
        };
        // `{post:slug}` binds by a column; the parameter is still `post`
        let name = name.split(':').next().unwrap_or(name).trim();
        if !name.is_empty() {
            parameters.push(PathParameter {
                name: name.to_string(),
                required,
                pattern: None,
            });
        }
        rest = &rest[start + len + 1..];
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parameters() {
        let params = path_parameters("api/users/{user}/posts/{post:slug}/{page?}");
        assert_eq!(
            params
                .iter()
                .map(|p| (p.name.as_str(), p.required))
                .collect::<Vec<_>>(),
            vec![("user", true), ("post", true), ("page", false)]
        );
    }

    #[test]
    fn test_methods_sorted_and_deduplicated() {
        let route = RouteDescriptor::new(
            "x",
            vec![HttpMethod::Post, HttpMethod::Get, HttpMethod::Post],
        );
        assert_eq!(route.methods, vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(HttpMethod::parse("patch"), Some(HttpMethod::Patch));
    }
}
