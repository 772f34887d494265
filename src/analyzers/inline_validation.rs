//! Rules passed to validation calls inside a controller action.

use super::rule_extraction::{Locals, RuleExtractor, RuleMap};
use crate::ast::{find_arg, short_name, Expr, MethodDecl};
use crate::context::AnalysisContext;
use crate::model::ValidationRuleSet;
use crate::visit::{AssignmentTracker, CallCollector};
use crate::workspace::LoadedClass;
use log::debug;

/// Which argument of a validation call carries the rules
#[derive(Debug, Clone, Copy)]
enum RulesArg {
    First,
    Second,
}

/// `$request->validate([...])`, `request()->validate([...])`,
/// `$request->validateWithBag('bag', [...])`, `$this->validate($request, [...])`
/// and `Validator::make($data, [...])`
fn validation_call(expr: &Expr) -> Option<(RulesArg, &[crate::ast::Arg])> {
    match expr {
        Expr::MethodCall { object, method, args, .. } => match method.to_ascii_lowercase().as_str() {
            "validate" if object.is_this() => Some((RulesArg::Second, args.as_slice())),
            "validate" => Some((RulesArg::First, args.as_slice())),
            "validatewithbag" => Some((RulesArg::Second, args.as_slice())),
            _ => None,
        },
        Expr::StaticCall { class, method, args } => {
            let is_validator = matches!(class.as_ref(), Expr::Name(n) if short_name(n) == "Validator");
            (is_validator && method.eq_ignore_ascii_case("make")).then_some((RulesArg::Second, args.as_slice()))
        }
        Expr::FuncCall { name, args } if name.eq_ignore_ascii_case("validator") => {
            Some((RulesArg::Second, args.as_slice()))
        }
        _ => None,
    }
}

pub struct InlineValidationAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> InlineValidationAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Rules of every validation call in the action body, merged in source
    /// order
    pub fn analyze(&self, controller: &LoadedClass, method: &MethodDecl) -> ValidationRuleSet {
        let stmts = method.statements();
        let extractor = RuleExtractor::new(self.ctx, controller);
        let assignments = AssignmentTracker::collect(stmts);
        let calls = CallCollector::collect(stmts);

        let mut rules = RuleMap::new();
        let mut found = false;
        for call in &calls.calls {
            let Some((position, args)) = validation_call(call) else { continue };
            let arg = match position {
                RulesArg::First => find_arg(args, "rules", 0),
                RulesArg::Second => find_arg(args, "rules", 1),
            };
            let Some(arg) = arg else { continue };

            let mut locals = Locals::new();
            if let Expr::Variable(name) = arg {
                if let Some(assigned) = assignments.last(name) {
                    if let Some(map) = extractor.rules_map(assigned, &Locals::new()) {
                        locals.insert(name.clone(), map);
                    }
                }
            }
            match extractor.rules_map(arg, &locals) {
                Some(map) => {
                    found = true;
                    rules.extend(map);
                }
                None => debug!(
                    "Validation call in {}::{} has non-literal rules {}",
                    controller.fqn, method.name, arg
                ),
            }
        }

        ValidationRuleSet {
            rules,
            source: found.then(|| format!("{}::{}", controller.fqn, method.name)),
            ..ValidationRuleSet::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RuleToken;

    const CONTROLLER: &str = r#"<?php
namespace App\Http\Controllers;

use Illuminate\Http\Request;
use Illuminate\Support\Facades\Validator;

class PostController extends Controller
{
    public function index(Request $request)
    {
        $request->validate(['status' => 'required|in:active,inactive']);
        return Post::query()->where('status', $request->query('status'))->paginate();
    }

    public function store(Request $request)
    {
        $rules = ['title' => 'required|string', 'body' => ['nullable', 'string']];
        $validated = $this->validate($request, $rules);
        Validator::make($request->all(), ['tags' => 'array'])->validate();
        return $validated;
    }

    public function show($id)
    {
        return Post::findOrFail($id);
    }
}
"#;

    fn analyze(method: &str) -> ValidationRuleSet {
        let ctx = AnalysisContext::in_memory(&[("app/Http/Controllers/PostController.php", CONTROLLER)]);
        let controller = ctx.load_class("App\\Http\\Controllers\\PostController").unwrap();
        let decl = controller.class().method(method).unwrap().clone();
        InlineValidationAnalyzer::new(&ctx).analyze(&controller, &decl)
    }

    #[test]
    fn test_request_validate() {
        let rules = analyze("index");
        assert_eq!(rules.len(), 1);
        assert!(rules.get("status").unwrap().contains(&RuleToken::text("in:active,inactive")));
        assert_eq!(rules.source.as_deref(), Some("App\\Http\\Controllers\\PostController::index"));
    }

    #[test]
    fn test_variable_rules_and_validator_make() {
        let rules = analyze("store");
        assert_eq!(rules.fields().collect::<Vec<_>>(), vec!["body", "tags", "title"]);
        assert_eq!(rules.get("body").unwrap().len(), 2);
    }

    #[test]
    fn test_no_validation() {
        let rules = analyze("show");
        assert!(rules.is_empty());
        assert!(rules.source.is_none());
    }
}
