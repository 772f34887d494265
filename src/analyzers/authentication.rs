//! Security requirements implied by route middleware.
//!
//! Each middleware token is looked up first in the configured schemes, then
//! in the built-in table. `auth:a,b` lists alternative guards; every guard
//! becomes one alternative requirement.

use crate::config::{AuthConfig, CustomSchemeConfig};
use crate::model::{AuthenticationInfo, SchemeRegistry, SecurityRequirement, SecurityScheme};
use log::debug;
use std::collections::BTreeMap;

const OAUTH_TOKEN_URL: &str = "/oauth/token";

/// One resolved middleware token
struct Resolved {
    name: String,
    scheme: SecurityScheme,
    scopes: Vec<String>,
}

pub struct AuthenticationAnalyzer {
    custom: BTreeMap<String, CustomSchemeConfig>,
}

impl AuthenticationAnalyzer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            custom: config.schemes.clone(),
        }
    }

    /// Requirements of one route. Schemes that are used get registered in
    /// `registry`.
    pub fn analyze(&self, middleware: &[String], registry: &mut SchemeRegistry) -> AuthenticationInfo {
        let mut info = AuthenticationInfo::default();
        for token in middleware {
            let resolved = self.resolve(token);
            if resolved.is_empty() {
                continue;
            }
            info.middleware.push(token.clone());
            for Resolved { name, scheme, scopes } in resolved {
                registry.register(&name, scheme);
                let requirement = SecurityRequirement { scheme: name, scopes };
                if !info.requirements.contains(&requirement) {
                    info.requirements.push(requirement);
                }
            }
        }
        info.required = !info.requirements.is_empty();
        debug!("{:?} -> {} security requirements", middleware, info.requirements.len());
        info
    }

    fn resolve(&self, token: &str) -> Vec<Resolved> {
        let token = token.trim();
        let (alias, arguments): (&str, Vec<&str>) = match token.split_once(':') {
            Some((alias, args)) => (alias, args.split(',').map(str::trim).filter(|a| !a.is_empty()).collect()),
            None => (token, Vec::new()),
        };

        if let Some(custom) = self.custom.get(token).or_else(|| self.custom.get(alias)) {
            return vec![Resolved {
                name: custom.name.clone(),
                scheme: custom_scheme(custom),
                scopes: Vec::new(),
            }];
        }

        match alias.to_ascii_lowercase().as_str() {
            "auth" if arguments.is_empty() => vec![session()],
            "auth" => arguments.iter().filter_map(|guard| guard_scheme(guard)).collect(),
            "auth.basic" | "auth.basic.once" => vec![Resolved {
                name: "basicAuth".to_string(),
                scheme: SecurityScheme {
                    scheme_type: "http".to_string(),
                    scheme: Some("basic".to_string()),
                    bearer_format: None,
                    name: None,
                    location: None,
                    description: Some("HTTP basic authentication".to_string()),
                    token_url: None,
                },
                scopes: Vec::new(),
            }],
            "jwt" | "jwt.auth" | "jwt.verify" => vec![jwt()],
            "client" | "scope" | "scopes" => vec![Resolved {
                name: "oauth2".to_string(),
                scheme: SecurityScheme {
                    scheme_type: "oauth2".to_string(),
                    scheme: None,
                    bearer_format: None,
                    name: None,
                    location: None,
                    description: Some("OAuth2 client credentials".to_string()),
                    token_url: Some(OAUTH_TOKEN_URL.to_string()),
                },
                scopes: arguments.iter().map(|s| s.to_string()).collect(),
            }],
            "api.key" | "apikey" | "api_key" => vec![Resolved {
                name: "apiKey".to_string(),
                scheme: SecurityScheme::api_key("X-API-Key", "header", "API key"),
                scopes: Vec::new(),
            }],
            _ => Vec::new(),
        }
    }
}

fn guard_scheme(guard: &str) -> Option<Resolved> {
    match guard {
        "sanctum" => Some(Resolved {
            name: "sanctum".to_string(),
            scheme: SecurityScheme::bearer(None, "Laravel Sanctum token"),
            scopes: Vec::new(),
        }),
        "api" | "passport" => Some(Resolved {
            name: "bearerAuth".to_string(),
            scheme: SecurityScheme::bearer(None, "API token"),
            scopes: Vec::new(),
        }),
        "jwt" => Some(jwt()),
        "web" => Some(session()),
        _ => None,
    }
}

fn jwt() -> Resolved {
    Resolved {
        name: "jwt".to_string(),
        scheme: SecurityScheme::bearer(Some("JWT"), "JSON Web Token"),
        scopes: Vec::new(),
    }
}

fn session() -> Resolved {
    Resolved {
        name: "sessionAuth".to_string(),
        scheme: SecurityScheme::api_key("laravel_session", "cookie", "Session cookie"),
        scopes: Vec::new(),
    }
}

fn custom_scheme(config: &CustomSchemeConfig) -> SecurityScheme {
    SecurityScheme {
        scheme_type: config.scheme_type.clone(),
        scheme: config.scheme.clone(),
        bearer_format: config.bearer_format.clone(),
        name: config.parameter.clone(),
        location: config.location.clone(),
        description: config.description.clone(),
        token_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_middleware() {
        let analyzer = AuthenticationAnalyzer::new(&AuthConfig::default());
        let mut registry = SchemeRegistry::default();

        let info = analyzer.analyze(&tokens(&["api", "auth:sanctum", "throttle:60,1"]), &mut registry);
        assert!(info.required);
        assert_eq!(info.middleware, tokens(&["auth:sanctum"]));
        assert_eq!(info.requirements[0].scheme, "sanctum");

        let info = analyzer.analyze(&tokens(&["auth:sanctum,jwt"]), &mut registry);
        let schemes: Vec<&str> = info.requirements.iter().map(|r| r.scheme.as_str()).collect();
        assert_eq!(schemes, vec!["sanctum", "jwt"]);

        let info = analyzer.analyze(&tokens(&["client:orders.read,orders.write"]), &mut registry);
        assert_eq!(info.requirements[0].scopes, tokens(&["orders.read", "orders.write"]));

        assert!(!analyzer.analyze(&tokens(&["guest"]), &mut registry).required);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("jwt").and_then(|s| s.bearer_format.as_deref()), Some("JWT"));
    }

    #[test]
    fn test_configured_scheme_wins() {
        let config = AuthConfig {
            schemes: BTreeMap::from([(
                "partner".to_string(),
                CustomSchemeConfig {
                    name: "partnerKey".to_string(),
                    scheme_type: "apiKey".to_string(),
                    scheme: None,
                    bearer_format: None,
                    parameter: Some("X-Partner".to_string()),
                    location: Some("header".to_string()),
                    description: None,
                },
            )]),
        };
        let analyzer = AuthenticationAnalyzer::new(&config);
        let mut registry = SchemeRegistry::default();
        let info = analyzer.analyze(&tokens(&["partner:gold", "auth.basic"]), &mut registry);
        let schemes: Vec<&str> = info.requirements.iter().map(|r| r.scheme.as_str()).collect();
        assert_eq!(schemes, vec!["partnerKey", "basicAuth"]);
        assert_eq!(registry.get("partnerKey").and_then(|s| s.name.as_deref()), Some("X-Partner"));
    }
}
