//! `#[Callback]` attributes on controller actions.

use super::literal::const_string;
use crate::ast::{short_name, Attribute, MethodDecl};
use crate::context::AnalysisContext;
use crate::error::ErrorKind;
use crate::model::CallbackInfo;
use crate::workspace::LoadedClass;
use log::debug;

const COMPONENT: &str = "CallbackAnalyzer";
const ATTRIBUTES: &[&str] = &["Callback", "OpenApiCallback"];

pub struct CallbackAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> CallbackAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    pub fn analyze(&self, controller: &LoadedClass, method: &MethodDecl) -> Vec<CallbackInfo> {
        method
            .attributes
            .iter()
            .filter(|a| ATTRIBUTES.iter().any(|n| short_name(&a.name) == *n))
            .filter_map(|a| self.callback(a, controller, method))
            .collect()
    }

    fn callback(&self, attr: &Attribute, controller: &LoadedClass, method: &MethodDecl) -> Option<CallbackInfo> {
        let string = |name: &str, position: usize| {
            attr.arg(name, position)
                .and_then(|e| const_string(e, controller, self.ctx))
        };
        let (Some(name), Some(expression)) = (string("name", 0), string("expression", 1)) else {
            self.ctx.errors.record(
                COMPONENT,
                ErrorKind::AnalysisError,
                "callback attribute needs a name and an expression",
                [
                    ("class", controller.fqn.clone()),
                    ("method", method.name.clone()),
                ],
            );
            return None;
        };
        let http_method = string("method", 2)
            .map(|m| m.to_ascii_uppercase())
            .unwrap_or_else(|| "POST".to_string());
        let request_body = attr
            .arg("requestBody", 4)
            .and_then(|e| e.class_reference().or_else(|| e.as_str()))
            .map(|class| self.ctx.resolve_in(class, controller));
        debug!("Callback {} on {}::{}", name, controller.fqn, method.name);
        Some(CallbackInfo {
            name,
            expression,
            method: http_method,
            description: string("description", 3),
            request_body,
        })
    }
}
