//! Validation rules of FormRequest classes.
//!
//! Source analysis comes first. The runtime fallback is used only when the
//! class has no readable source or its file does not parse, and it may call
//! nothing but `rules()`, `attributes()` and `messages()`.

use super::rule_extraction::{rules_from_value, RuleExtractor};
use crate::cache::cached;
use crate::context::AnalysisContext;
use crate::error::{AnalyzerError, ErrorKind};
use crate::model::{ConditionalRuleSet, ValidationRuleSet};
use crate::runtime::{RuntimeError, WhitelistedMethod};
use crate::workspace::LoadedClass;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

const COMPONENT: &str = "FormRequestAnalyzer";

pub const FORM_REQUEST: &str = "Illuminate\\Foundation\\Http\\FormRequest";
pub const HTTP_REQUEST: &str = "Illuminate\\Http\\Request";

pub struct FormRequestAnalyzer<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> FormRequestAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    /// Rules of `class`, with conditional branches folded into one merged view
    pub fn analyze(&self, class: &str) -> ValidationRuleSet {
        let mut rules = self.extract(class);
        rules.conditional = None;
        rules
    }

    /// Like [`FormRequestAnalyzer::analyze`], keeping per-branch rule sets
    /// when the rules differ by branch
    pub fn analyze_with_conditional_rules(&self, class: &str) -> ValidationRuleSet {
        self.extract(class)
    }

    /// Whether a parameter type names a FormRequest.
    ///
    /// A class without source counts when its name ends in `Request`, unless
    /// it is the plain HTTP request.
    pub fn is_form_request(&self, fqn: &str) -> bool {
        let fqn = fqn.trim_start_matches('\\');
        if fqn.eq_ignore_ascii_case(HTTP_REQUEST) {
            return false;
        }
        if self.ctx.repository.exists(fqn) {
            return self.ctx.repository.is_a(fqn, FORM_REQUEST);
        }
        fqn.ends_with("Request") && !fqn.eq_ignore_ascii_case(FORM_REQUEST)
    }

    fn extract(&self, class: &str) -> ValidationRuleSet {
        let class = class.trim_start_matches('\\');
        cached(self.ctx.cache(), "form_request", class, || {
            self.extract_uncached(class)
        })
    }

    fn extract_uncached(&self, class: &str) -> ValidationRuleSet {
        match self.ctx.load_class(class) {
            Ok(loaded) => self.from_source(&loaded),
            Err(e @ (AnalyzerError::ClassNotFound(_) | AnalyzerError::FileNotFound(_))) => {
                debug!("No source for {} ({}), trying runtime", class, e);
                self.from_runtime(class, true)
            }
            Err(e) => {
                self.ctx.errors.report(COMPONENT, &e, [("class", class.to_string())]);
                self.from_runtime(class, false)
            }
        }
    }

    fn from_source(&self, loaded: &LoadedClass) -> ValidationRuleSet {
        let extractor = RuleExtractor::new(self.ctx, loaded);
        let Some(branches) = extractor.method_branches("rules") else {
            debug!("{} declares no rules()", loaded.fqn);
            return ValidationRuleSet {
                source: Some(loaded.fqn.clone()),
                ..ValidationRuleSet::default()
            };
        };

        let conditional = ConditionalRuleSet::from_branches(branches);
        let rules = match conditional.branches.as_slice() {
            [only] => only.rules.clone(),
            _ => conditional.merged.clone(),
        };
        debug!(
            "{}: {} fields over {} branches",
            loaded.fqn,
            rules.len(),
            conditional.branches.len()
        );
        ValidationRuleSet {
            rules,
            attributes: extractor.string_method("attributes"),
            messages: extractor.string_method("messages"),
            conditional: conditional.has_variants().then_some(conditional),
            source: Some(loaded.fqn.clone()),
        }
    }

    /// `report_unavailable` is false when the source failure was already
    /// reported, so a missing runtime adds no second entry
    fn from_runtime(&self, class: &str, report_unavailable: bool) -> ValidationRuleSet {
        let empty = ValidationRuleSet {
            source: Some(class.to_string()),
            ..ValidationRuleSet::default()
        };
        let runtime = self.ctx.runtime();
        let value = match runtime.invoke(class, WhitelistedMethod::Rules) {
            Ok(value) => value,
            Err(RuntimeError::Unavailable) => {
                if report_unavailable {
                    self.ctx.errors.record(
                        COMPONENT,
                        ErrorKind::ReflectionError,
                        format!("no source for {} and no runtime to reflect it", class),
                        [("class", class.to_string())],
                    );
                } else {
                    debug!("Runtime unavailable for {}", class);
                }
                return empty;
            }
            Err(e @ RuntimeError::Thrown { .. }) => {
                self.ctx.errors.record(
                    COMPONENT,
                    ErrorKind::AnalysisError,
                    e.to_string(),
                    [("class", class.to_string()), ("method", "rules".to_string())],
                );
                return empty;
            }
            Err(e) => {
                self.ctx.errors.record(
                    COMPONENT,
                    ErrorKind::ReflectionError,
                    e.to_string(),
                    [("class", class.to_string())],
                );
                return empty;
            }
        };

        ValidationRuleSet {
            rules: rules_from_value(&value),
            attributes: self.runtime_strings(class, WhitelistedMethod::Attributes),
            messages: self.runtime_strings(class, WhitelistedMethod::Messages),
            conditional: None,
            source: Some(class.to_string()),
        }
    }

    fn runtime_strings(&self, class: &str, method: WhitelistedMethod) -> BTreeMap<String, String> {
        match self.ctx.runtime().invoke(class, method) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(k, v)| Some((k, v.as_str()?.to_string())))
                .collect(),
            Ok(_) => BTreeMap::new(),
            Err(e) => {
                debug!("{}::{}() unavailable: {}", class, method.as_str(), e);
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RuleToken;
    use crate::runtime::RuntimeProvider;
    use serde_json::json;

    struct ThrowingRuntime;

    impl RuntimeProvider for ThrowingRuntime {
        fn is_available(&self) -> bool {
            true
        }

        fn invoke(&self, class: &str, method: WhitelistedMethod) -> Result<Value, RuntimeError> {
            Err(RuntimeError::Thrown {
                class: class.to_string(),
                method: method.as_str(),
                message: "RuntimeException: database unavailable".into(),
            })
        }
    }

    struct FixedRuntime;

    impl RuntimeProvider for FixedRuntime {
        fn is_available(&self) -> bool {
            true
        }

        fn invoke(&self, _class: &str, method: WhitelistedMethod) -> Result<Value, RuntimeError> {
            Ok(match method {
                WhitelistedMethod::Rules => json!({"title": "required|string|max:100"}),
                WhitelistedMethod::Attributes => json!({"title": "post title"}),
                WhitelistedMethod::Messages => json!([]),
            })
        }
    }

    const STORE: &str = r#"<?php
namespace App\Http\Requests;

use Illuminate\Foundation\Http\FormRequest;

class StorePostRequest extends FormRequest
{
    public function authorize(): bool
    {
        return $this->user()->can('create');
    }

    public function rules(): array
    {
        if ($this->isMethod('POST')) {
            return ['password' => 'required|min:6', 'title' => 'required'];
        }
        return ['password' => 'sometimes|min:6', 'title' => 'required'];
    }

    public function messages(): array
    {
        return ['title.required' => 'A title is required'];
    }
}
"#;

    #[test]
    fn test_source_rules_with_conditional_branches() {
        let ctx = AnalysisContext::in_memory(&[("app/Http/Requests/StorePostRequest.php", STORE)]);
        let analyzer = FormRequestAnalyzer::new(&ctx);

        let plain = analyzer.analyze("App\\Http\\Requests\\StorePostRequest");
        assert!(plain.conditional.is_none());
        assert_eq!(plain.len(), 2);

        let rules = analyzer.analyze_with_conditional_rules("App\\Http\\Requests\\StorePostRequest");
        let conditional = rules.conditional.as_ref().unwrap();
        assert_eq!(conditional.branches.len(), 2);
        assert!(rules.is_required("password"));
        assert!(rules.is_required("title"));
        assert!(rules.effective_rules()["password"].contains(&RuleToken::text("min:6")));
        assert_eq!(rules.messages["title.required"], "A title is required");
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn test_throwing_rules_degrades_to_one_entry() {
        let ctx = AnalysisContext::in_memory(&[]).with_runtime(Box::new(ThrowingRuntime));
        let rules = FormRequestAnalyzer::new(&ctx).analyze("App\\Http\\Requests\\BrokenRequest");
        assert!(rules.is_empty());
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors.count_of(ErrorKind::AnalysisError), 1);
    }

    #[test]
    fn test_runtime_fallback_without_source() {
        let ctx = AnalysisContext::in_memory(&[]).with_runtime(Box::new(FixedRuntime));
        let rules = FormRequestAnalyzer::new(&ctx).analyze("Vendor\\Package\\CompiledRequest");
        assert_eq!(rules.get("title").map(<[RuleToken]>::len), Some(3));
        assert_eq!(rules.attributes["title"], "post title");
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn test_missing_source_without_runtime() {
        let ctx = AnalysisContext::in_memory(&[]);
        let rules = FormRequestAnalyzer::new(&ctx).analyze("App\\Http\\Requests\\GoneRequest");
        assert!(rules.is_empty());
        assert_eq!(ctx.errors.count_of(ErrorKind::ReflectionError), 1);
    }

    #[test]
    fn test_unparsable_source_reports_parse_error_once() {
        let ctx = AnalysisContext::in_memory(&[(
            "app/Http/Requests/BadRequest.php",
            "<?php\nnamespace App\\Http\\Requests;\nclass BadRequest extends FormRequest { public function rules( { }\n",
        )]);
        let rules = FormRequestAnalyzer::new(&ctx).analyze("App\\Http\\Requests\\BadRequest");
        assert!(rules.is_empty());
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors.count_of(ErrorKind::ParseError), 1);
    }

    #[test]
    fn test_form_request_detection() {
        let ctx = AnalysisContext::in_memory(&[("app/Http/Requests/StorePostRequest.php", STORE)]);
        let analyzer = FormRequestAnalyzer::new(&ctx);
        assert!(analyzer.is_form_request("App\\Http\\Requests\\StorePostRequest"));
        assert!(analyzer.is_form_request("Vendor\\SomeRequest"));
        assert!(!analyzer.is_form_request(HTTP_REQUEST));
    }
}
