//! Example values for documentation output.

use super::field_name::to_snake_case;
use crate::model::{InferredType, SchemaType};
use serde_json::{json, Value};

const TIMESTAMP_EXAMPLE: &str = "2024-01-15T10:30:00.000000Z";

/// Name-keyed examples, checked before the type-keyed fallback
const NAMED_EXAMPLES: &[(&str, &str)] = &[
    ("email", "user@example.com"),
    ("name", "John Doe"),
    ("first_name", "John"),
    ("last_name", "Doe"),
    ("phone", "+1-555-0100"),
    ("title", "Example title"),
    ("slug", "example-slug"),
    ("uuid", "550e8400-e29b-41d4-a716-446655440000"),
    ("password", "secret123"),
    ("token", "1|abcdef123456"),
    ("currency", "USD"),
    ("locale", "en"),
    ("country", "US"),
];

/// Example value for a field, keyed first by name then by type
pub fn example_for(field_name: &str, inferred: &InferredType) -> Value {
    let last_segment = field_name.rsplit('.').next().unwrap_or(field_name);
    let name = to_snake_case(last_segment);

    if let Some((_, example)) = NAMED_EXAMPLES.iter().find(|(n, _)| *n == name) {
        if inferred.schema_type == SchemaType::String {
            return json!(example);
        }
    }
    if name.ends_with("_email") || inferred.format.as_deref() == Some("email") {
        return json!("user@example.com");
    }
    if name.ends_with("_at") || inferred.format.as_deref() == Some("date-time") {
        return json!(TIMESTAMP_EXAMPLE);
    }
    if inferred.format.as_deref() == Some("date") {
        return json!("2024-01-15");
    }
    if name.contains("url") || inferred.format.as_deref() == Some("uri") {
        return json!("https://example.com");
    }
    if inferred.format.as_deref() == Some("uuid") {
        return json!("550e8400-e29b-41d4-a716-446655440000");
    }

    example_for_type(&name, inferred)
}

fn example_for_type(name: &str, inferred: &InferredType) -> Value {
    match inferred.schema_type {
        SchemaType::Integer => {
            if name.contains("id") {
                json!(1)
            } else if name.contains("count") {
                json!(100)
            } else {
                json!(42)
            }
        }
        SchemaType::Number => json!(19.99),
        SchemaType::Boolean => json!(true),
        SchemaType::Array => Value::Array(Vec::new()),
        SchemaType::Object => match &inferred.properties {
            Some(properties) => Value::Object(
                properties
                    .iter()
                    .map(|(key, property)| {
                        let example = property.example.clone().unwrap_or_else(|| {
                            let nested = InferredType {
                                schema_type: property.schema_type,
                                format: property.format.clone(),
                                ..InferredType::default()
                            };
                            example_for(key, &nested)
                        });
                        (key.clone(), example)
                    })
                    .collect(),
            ),
            None => json!({}),
        },
        SchemaType::String => json!("string"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_by_name_then_type() {
        let string = InferredType::new(SchemaType::String);
        assert_eq!(example_for("email", &string), json!("user@example.com"));
        assert_eq!(example_for("published_at", &string), json!(TIMESTAMP_EXAMPLE));
        assert_eq!(example_for("avatar_url", &string), json!("https://example.com"));

        let integer = InferredType::new(SchemaType::Integer);
        assert_eq!(example_for("user_id", &integer), json!(1));
        assert_eq!(example_for("comments_count", &integer), json!(100));
        assert_eq!(example_for("age", &integer), json!(42));

        assert_eq!(example_for("active", &InferredType::new(SchemaType::Boolean)), json!(true));
        assert_eq!(example_for("tags", &InferredType::new(SchemaType::Array)), json!([]));
        assert_eq!(example_for("meta", &InferredType::new(SchemaType::Object)), json!({}));
    }
}
