//! Naming-convention guesses, consulted only when structure says nothing.

use crate::model::SchemaType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHint {
    pub schema_type: SchemaType,
    pub format: Option<&'static str>,
}

#[derive(Clone, Copy)]
enum NameMatch {
    Exact(&'static str),
    Prefix(&'static str),
    Suffix(&'static str),
    Contains(&'static str),
}

impl NameMatch {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(s) => name == *s,
            NameMatch::Prefix(s) => name.starts_with(s),
            NameMatch::Suffix(s) => name.ends_with(s),
            NameMatch::Contains(s) => name.contains(s),
        }
    }
}

use NameMatch::*;
use SchemaType::*;

/// Evaluated top to bottom, first match wins
const FIELD_NAME_TABLE: &[(NameMatch, SchemaType, Option<&str>)] = &[
    (Exact("id"), Integer, None),
    (Suffix("_id"), Integer, None),
    (Exact("uuid"), String, Some("uuid")),
    (Suffix("_uuid"), String, Some("uuid")),
    (Suffix("_ids"), Array, None),
    (Prefix("is_"), Boolean, None),
    (Prefix("has_"), Boolean, None),
    (Prefix("can_"), Boolean, None),
    (Prefix("should_"), Boolean, None),
    (Exact("active"), Boolean, None),
    (Exact("enabled"), Boolean, None),
    (Exact("verified"), Boolean, None),
    (Suffix("_at"), String, Some("date-time")),
    (Exact("timestamp"), String, Some("date-time")),
    (Suffix("_date"), String, Some("date")),
    (Exact("date"), String, Some("date")),
    (Exact("birthday"), String, Some("date")),
    (Exact("email"), String, Some("email")),
    (Suffix("_email"), String, Some("email")),
    (Contains("password"), String, Some("password")),
    (Contains("url"), String, Some("uri")),
    (Suffix("_link"), String, Some("uri")),
    (Exact("website"), String, Some("uri")),
    (Exact("ip"), String, Some("ipv4")),
    (Exact("ip_address"), String, Some("ipv4")),
    (Suffix("_count"), Integer, None),
    (Exact("count"), Integer, None),
    (Exact("total"), Integer, None),
    (Exact("quantity"), Integer, None),
    (Exact("age"), Integer, None),
    (Exact("year"), Integer, None),
    (Exact("position"), Integer, None),
    (Exact("sort_order"), Integer, None),
    (Exact("page"), Integer, None),
    (Exact("per_page"), Integer, None),
    (Exact("limit"), Integer, None),
    (Exact("offset"), Integer, None),
    (Exact("price"), Number, Some("float")),
    (Suffix("_price"), Number, Some("float")),
    (Exact("amount"), Number, Some("float")),
    (Exact("latitude"), Number, Some("float")),
    (Exact("longitude"), Number, Some("float")),
    (Exact("lat"), Number, Some("float")),
    (Exact("lng"), Number, Some("float")),
    (Exact("rating"), Number, Some("float")),
    (Exact("score"), Number, Some("float")),
    (Exact("tags"), Array, None),
    (Exact("roles"), Array, None),
    (Exact("permissions"), Array, None),
    (Exact("items"), Array, None),
    (Exact("metadata"), Object, None),
    (Exact("meta"), Object, None),
    (Exact("settings"), Object, None),
    (Exact("options"), Object, None),
];

/// `createdAt` becomes `created_at`
pub fn to_snake_case(name: &str) -> std::string::String {
    let mut out = std::string::String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if previous_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            previous_lower = false;
        } else {
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(if c == '-' { '_' } else { c });
        }
    }
    out
}

/// `full_name` and `full-name` become `FullName`
pub fn to_studly_case(name: &str) -> std::string::String {
    name.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<std::string::String>(),
                None => std::string::String::new(),
            }
        })
        .collect()
}

/// Guess a field's type from its name alone
pub fn infer_field_type(field_name: &str) -> Option<FieldHint> {
    let last_segment = field_name.rsplit('.').next().unwrap_or(field_name);
    let name = to_snake_case(last_segment.trim_start_matches('$'));
    FIELD_NAME_TABLE
        .iter()
        .find(|(matcher, _, _)| matcher.matches(&name))
        .map(|(_, schema_type, format)| FieldHint {
            schema_type: *schema_type,
            format: *format,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventions() {
        assert_eq!(infer_field_type("id").unwrap().schema_type, Integer);
        assert_eq!(infer_field_type("user_id").unwrap().schema_type, Integer);
        assert_eq!(infer_field_type("is_admin").unwrap().schema_type, Boolean);
        let created = infer_field_type("created_at").unwrap();
        assert_eq!(created.format, Some("date-time"));
        assert_eq!(infer_field_type("createdAt").unwrap().format, Some("date-time"));
        assert_eq!(infer_field_type("avatar_url").unwrap().format, Some("uri"));
        assert_eq!(infer_field_type("items.*.price").unwrap().schema_type, Number);
        assert!(infer_field_type("title").is_none());
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake_case("fullName"), "full_name");
        assert_eq!(to_studly_case("full_name"), "FullName");
        assert_eq!(to_studly_case("author"), "Author");
    }
}
