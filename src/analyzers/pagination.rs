//! Paginated responses, from paginator calls in the body and from the
//! declared return type.

use super::model::ModelAnalyzer;
use super::resource::ResourceAnalyzer;
use crate::ast::{find_arg, short_name, Expr, MethodDecl, TypeHint};
use crate::context::AnalysisContext;
use crate::model::{PaginationInfo, PaginationKind};
use crate::visit::{CallCollector, ReturnCollector};
use crate::workspace::LoadedClass;
use log::debug;

const PAGINATOR_METHODS: &[(&str, PaginationKind)] = &[
    ("paginate", PaginationKind::LengthAware),
    ("simplepaginate", PaginationKind::Simple),
    ("cursorpaginate", PaginationKind::Cursor),
    ("fastpaginate", PaginationKind::LengthAware),
];

const PAGINATOR_TYPES: &[(&str, PaginationKind)] = &[
    ("LengthAwarePaginator", PaginationKind::LengthAware),
    ("Paginator", PaginationKind::Simple),
    ("CursorPaginator", PaginationKind::Cursor),
];

fn paginator_kind(method: &str) -> Option<PaginationKind> {
    let lower = method.to_ascii_lowercase();
    PAGINATOR_METHODS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, kind)| *kind)
}

/// Kind named by a return type such as `LengthAwarePaginator`
pub fn kind_from_type(hint: &TypeHint) -> Option<PaginationKind> {
    hint.names().into_iter().find_map(|name| {
        let short = short_name(name);
        PAGINATOR_TYPES
            .iter()
            .find(|(type_name, _)| *type_name == short)
            .map(|(_, kind)| *kind)
    })
}

pub struct PaginationAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> PaginationAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Body calls first; a paginator return type confirms or supplies the kind
    pub fn analyze(&self, controller: &LoadedClass, method: &MethodDecl) -> Option<PaginationInfo> {
        let declared = method.return_type.as_ref().and_then(kind_from_type);
        match (self.from_body(controller, method), declared) {
            (Some(mut info), Some(kind)) => {
                info.kind = kind;
                Some(info)
            }
            (Some(info), None) => Some(info),
            (None, Some(kind)) => Some(PaginationInfo {
                kind,
                per_page: None,
                model: None,
                resource: None,
                source: "return_type".to_string(),
            }),
            (None, None) => None,
        }
    }

    pub fn from_body(&self, controller: &LoadedClass, method: &MethodDecl) -> Option<PaginationInfo> {
        let stmts = method.statements();
        let calls = CallCollector::collect(stmts);
        let (call, kind) = calls.calls.iter().find_map(|call| match call {
            Expr::MethodCall { method, .. } | Expr::StaticCall { method, .. } => {
                paginator_kind(method).map(|kind| (*call, kind))
            }
            _ => None,
        })?;
        let args = match call {
            Expr::MethodCall { args, .. } | Expr::StaticCall { args, .. } => args.as_slice(),
            _ => &[],
        };
        let per_page = find_arg(args, "perPage", 0).and_then(Expr::as_int);
        let model = self.model_of(call, controller);
        let resource = self.wrapping_resource(stmts, controller);
        debug!(
            "Pagination {:?} in {}::{} (model {:?})",
            kind, controller.fqn, method.name, model
        );
        Some(PaginationInfo {
            kind,
            per_page,
            model,
            resource,
            source: "call".to_string(),
        })
    }

    /// Model at the root of `User::where(...)->paginate()`
    pub fn model_of(&self, call: &Expr, controller: &LoadedClass) -> Option<String> {
        let root = match call {
            Expr::StaticCall { class, .. } => Some(class.as_ref()),
            Expr::MethodCall { object, .. } => match object.chain_root() {
                Expr::StaticCall { class, .. } => Some(class.as_ref()),
                _ => None,
            },
            _ => None,
        }?;
        let Expr::Name(name) = root else { return None };
        let fqn = self.ctx.resolve_in(name, controller);
        ModelAnalyzer::new(self.ctx).is_model(&fqn).then_some(fqn)
    }

    /// `XResource::collection($paginator)` or `new XCollection($paginator)`
    /// among the returned values
    fn wrapping_resource(&self, stmts: &[crate::ast::Stmt], controller: &LoadedClass) -> Option<String> {
        let resources = ResourceAnalyzer::new(self.ctx);
        ReturnCollector::collect(stmts).returns.iter().find_map(|value| {
            let class = match value {
                Expr::StaticCall { class, method, .. } if method == "collection" => match class.as_ref() {
                    Expr::Name(name) => name.as_str(),
                    _ => return None,
                },
                other => other.class_reference()?,
            };
            let fqn = self.ctx.resolve_in(class, controller);
            resources.is_resource(&fqn).then_some(fqn)
        })
    }
}
