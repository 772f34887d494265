//! `#[ResponseLink]` attributes on controller actions.

use super::literal::{const_string, string_map};
use crate::ast::{short_name, MethodDecl};
use crate::context::AnalysisContext;
use crate::error::ErrorKind;
use crate::model::ResponseLinkInfo;
use crate::workspace::LoadedClass;

const COMPONENT: &str = "ResponseLinkAnalyzer";
const ATTRIBUTES: &[&str] = &["ResponseLink", "OpenApiResponseLink"];
const DEFAULT_STATUS: u16 = 200;

pub struct ResponseLinkAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> ResponseLinkAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// A link needs a name and one of `operationId` / `operationRef`
    pub fn analyze(&self, controller: &LoadedClass, method: &MethodDecl) -> Vec<ResponseLinkInfo> {
        let mut links = Vec::new();
        for attr in method
            .attributes
            .iter()
            .filter(|a| ATTRIBUTES.contains(&short_name(&a.name)))
        {
            let string = |name: &str, position: usize| {
                attr.arg(name, position)
                    .and_then(|e| const_string(e, controller, self.ctx))
            };
            let name = string("name", 0);
            let operation_id = string("operationId", 1);
            let operation_ref = string("operationRef", 5);
            let (Some(name), true) = (name, operation_id.is_some() || operation_ref.is_some()) else {
                self.ctx.errors.record(
                    COMPONENT,
                    ErrorKind::AnalysisError,
                    "response link needs a name and an operation",
                    [
                        ("class", controller.fqn.clone()),
                        ("method", method.name.clone()),
                    ],
                );
                continue;
            };
            let status = attr
                .arg("status", 3)
                .and_then(|e| e.as_int())
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(DEFAULT_STATUS);
            links.push(ResponseLinkInfo {
                status,
                name,
                operation_id,
                operation_ref,
                parameters: attr
                    .arg("parameters", 2)
                    .map(string_map)
                    .unwrap_or_default()
                    .into_iter()
                    .collect(),
                description: string("description", 4),
            });
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const CONTROLLER: &str = r#"<?php
namespace App\Http\Controllers;

use App\Attributes\ResponseLink;

class UserController extends Controller
{
    const SHOW = 'users.show';

    #[ResponseLink('GetUser', self::SHOW, ['user' => '$response.body#/id'], status: 201)]
    #[ResponseLink(name: 'Docs', operationRef: '#/paths/~1docs/get', description: 'Docs')]
    #[ResponseLink(name: 'Orphan')]
    public function store()
    {
    }
}
"#;

    #[test]
    fn test_link_attributes() {
        let ctx = AnalysisContext::in_memory(&[("app/Http/Controllers/UserController.php", CONTROLLER)]);
        let controller = ctx.load_class("App\\Http\\Controllers\\UserController").unwrap();
        let method = controller.class().method("store").unwrap().clone();
        let links = ResponseLinkAnalyzer::new(&ctx).analyze(&controller, &method);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].status, 201);
        assert_eq!(links[0].operation_id.as_deref(), Some("users.show"));
        assert_eq!(
            links[0].parameters,
            BTreeMap::from([("user".to_string(), "$response.body#/id".to_string())])
        );
        assert_eq!(links[1].status, 200);
        assert_eq!(links[1].operation_ref.as_deref(), Some("#/paths/~1docs/get"));
        assert_eq!(ctx.errors.count_of(ErrorKind::AnalysisError), 1);
    }
}
