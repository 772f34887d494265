//! Password policy from a printed `Password::...` builder chain.
//!
//! Each builder method is assumed to appear once. When `min()` or `max()`
//! is called twice the first call is reported; Laravel itself applies the
//! last one, so treat duplicates as unspecified.

use crate::model::{PasswordRequirements, RuleObject, RuleToken};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Minimum length of `Password::defaults()`
const DEFAULT_MIN_LENGTH: u64 = 8;

fn min_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmin\(\s*(\d+)\s*\)").expect("valid regex"))
}

fn max_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmax\(\s*(\d+)\s*\)").expect("valid regex"))
}

fn constructor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"new\s+\\?(?:[\w\\]*\\)?Password\(\s*(\d+)").expect("valid regex"))
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\w+)\s*\(").expect("valid regex"))
}

fn flag(chain: &str, method: &str) -> bool {
    call_regex()
        .captures_iter(chain)
        .any(|c| c.get(1).is_some_and(|m| m.as_str() == method))
}

pub struct PasswordRuleAnalyzer;

impl PasswordRuleAnalyzer {
    /// Whether the printed expression builds a password rule
    pub fn is_password_chain(chain: &str) -> bool {
        chain.contains("Password::") || constructor_regex().is_match(chain)
    }

    pub fn analyze(chain: &str) -> Option<PasswordRequirements> {
        if !Self::is_password_chain(chain) {
            return None;
        }
        let capture = |re: &Regex| {
            re.captures(chain)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        };

        let mut requirements = PasswordRequirements {
            min_length: capture(min_regex()).or_else(|| capture(constructor_regex())),
            max_length: capture(max_regex()),
            mixed_case: flag(chain, "mixedCase"),
            numbers: flag(chain, "numbers"),
            symbols: flag(chain, "symbols"),
            letters: flag(chain, "letters"),
            uncompromised: flag(chain, "uncompromised"),
        };
        if requirements.min_length.is_none() && flag(chain, "defaults") {
            requirements.min_length = Some(DEFAULT_MIN_LENGTH);
        }
        Some(requirements)
    }

    /// A live `Illuminate\Validation\Rules\Password` from the runtime fallback
    pub fn from_object(object: &RuleObject) -> Option<PasswordRequirements> {
        if object.short_class() != "Password" {
            return None;
        }
        let number = |name: &str| object.property(name).and_then(Value::as_u64);
        let truthy = |name: &str| object.property(name).and_then(Value::as_bool).unwrap_or(false);
        Some(PasswordRequirements {
            min_length: number("min"),
            max_length: number("max"),
            mixed_case: truthy("mixedCase"),
            numbers: truthy("numbers"),
            symbols: truthy("symbols"),
            letters: truthy("letters"),
            uncompromised: truthy("uncompromised"),
        })
    }

    /// First password rule among a field's tokens
    pub fn from_tokens(tokens: &[RuleToken]) -> Option<PasswordRequirements> {
        tokens.iter().find_map(|token| match token {
            RuleToken::Expression(chain) => Self::analyze(chain),
            RuleToken::Object(object) => Self::from_object(object),
            RuleToken::Text(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_chain_flags_and_bounds() {
        let requirements =
            PasswordRuleAnalyzer::analyze("Password::min(8)->max(64)->mixedCase()->numbers()->uncompromised()")
                .unwrap();
        assert_eq!(requirements.min_length, Some(8));
        assert_eq!(requirements.max_length, Some(64));
        assert!(requirements.mixed_case);
        assert!(requirements.numbers);
        assert!(!requirements.symbols);
        assert!(requirements.uncompromised);
    }

    #[test]
    fn test_flags_match_whole_method_names() {
        let requirements =
            PasswordRuleAnalyzer::analyze("Password::min(8)->withoutnumbers()->notsymbols( )").unwrap();
        assert!(!requirements.numbers);
        assert!(!requirements.symbols);

        let requirements = PasswordRuleAnalyzer::analyze("Password::min(8)->numbers ()").unwrap();
        assert!(requirements.numbers);
    }

    #[test]
    fn test_duplicate_min_reports_first_call() {
        let requirements = PasswordRuleAnalyzer::analyze("Password::min(8)->min(12)").unwrap();
        assert_eq!(requirements.min_length, Some(8));
    }

    #[test]
    fn test_defaults_and_non_password() {
        let requirements = PasswordRuleAnalyzer::analyze("Password::defaults()").unwrap();
        assert_eq!(requirements.min_length, Some(DEFAULT_MIN_LENGTH));
        assert!(PasswordRuleAnalyzer::analyze("Rule::in(['a'])").is_none());
    }

    #[test]
    fn test_from_runtime_object() {
        let object = RuleObject {
            class: "Illuminate\\Validation\\Rules\\Password".into(),
            properties: BTreeMap::from([
                ("min".to_string(), Value::from(10)),
                ("symbols".to_string(), Value::from(true)),
            ]),
        };
        let requirements = PasswordRuleAnalyzer::from_object(&object).unwrap();
        assert_eq!(requirements.min_length, Some(10));
        assert!(requirements.symbols);
        assert!(!requirements.letters);
    }
}
