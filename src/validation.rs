//! Checks run before any remote call: address syntax and dynamic template data shape.

use crate::errors::AppError;
use crate::templates::{FieldType, TemplateConfig};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

// Syntactic only: local@domain.tld without whitespace.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Validate email address syntax (`local@domain.tld`, no whitespace).
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Validates one address, naming its role (`sender`, `recipient`, `cc`, `bcc`) on failure.
pub fn validate_email(email: &str, role: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        tracing::warn!("❌ Invalid {} email address: {}", role, email);
        Err(AppError::Validation(format!(
            "Invalid {} email address: {}",
            role, email
        )))
    }
}

/// Validates every address of an outgoing message.
pub fn validate_addresses(
    from: &str,
    to: &[String],
    cc: &[String],
    bcc: &[String],
) -> Result<(), AppError> {
    validate_email(from, "sender")?;
    if to.is_empty() {
        return Err(AppError::Validation(
            "At least one recipient address is required".to_string(),
        ));
    }
    for address in to {
        validate_email(address, "recipient")?;
    }
    for address in cc {
        validate_email(address, "cc")?;
    }
    for address in bcc {
        validate_email(address, "bcc")?;
    }
    Ok(())
}

/// JSON kind name used in mismatch messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checks a single value against its declared type. Null always passes.
pub fn check_field_type(name: &str, field_type: FieldType, value: &Value) -> Result<(), AppError> {
    if value.is_null() {
        return Ok(());
    }

    let matches = match field_type {
        FieldType::String => value.is_string(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Number => value.is_number(),
        FieldType::Url => value
            .as_str()
            .is_some_and(|s| url::Url::parse(s).is_ok()),
        FieldType::Email => value.as_str().is_some_and(is_valid_email),
        FieldType::Unknown => true,
    };

    if matches {
        Ok(())
    } else {
        let expected = serde_json::to_value(field_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", field_type));
        Err(AppError::Validation(format!(
            "Field '{}' expected {} but got {}",
            name,
            expected,
            value_kind(value)
        )))
    }
}

/// Validates dynamic template data against a template's required fields and declared types.
///
/// Missing fields are reported together, comma-joined, in declaration order.
pub fn validate_dynamic_template_data(
    template: &TemplateConfig,
    data: &Map<String, Value>,
) -> Result<(), AppError> {
    let missing: Vec<&str> = template
        .required_fields
        .iter()
        .filter(|field| !data.contains_key(field.as_str()))
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    for spec in &template.custom_field_types {
        if let Some(value) = data.get(&spec.name) {
            check_field_type(&spec.name, spec.field_type, value)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::FieldSpec;
    use serde_json::json;

    fn order_template() -> TemplateConfig {
        TemplateConfig {
            template_id: "d-order".to_string(),
            required_fields: vec!["order_id".to_string(), "items".to_string()],
            custom_field_types: vec![
                FieldSpec {
                    name: "order_id".to_string(),
                    field_type: FieldType::String,
                },
                FieldSpec {
                    name: "items".to_string(),
                    field_type: FieldType::Array,
                },
                FieldSpec {
                    name: "gift".to_string(),
                    field_type: FieldType::Boolean,
                },
            ],
        }
    }

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_fields_listed_in_order() {
        let err = validate_dynamic_template_data(&order_template(), &Map::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required fields: order_id, items"
        );
    }

    #[test]
    fn test_array_field_rejects_string() {
        let data = as_map(json!({"order_id": "1", "items": "T-Shirt"}));
        let err = validate_dynamic_template_data(&order_template(), &data).unwrap_err();
        assert!(err.to_string().contains("'items' expected array but got string"));
    }

    #[test]
    fn test_null_skips_type_check() {
        let data = as_map(json!({"order_id": null, "items": [], "gift": null}));
        assert!(validate_dynamic_template_data(&order_template(), &data).is_ok());
    }

    #[test]
    fn test_url_and_email_types() {
        assert!(check_field_type("u", FieldType::Url, &json!("https://x.io/a")).is_ok());
        assert!(check_field_type("u", FieldType::Url, &json!("not a url")).is_err());
        assert!(check_field_type("e", FieldType::Email, &json!("a@b.io")).is_ok());
        assert!(check_field_type("e", FieldType::Email, &json!(3)).is_err());
    }

    #[test]
    fn test_cc_addresses_checked() {
        let to = vec!["to@example.com".to_string()];
        let cc = vec!["broken-at-example.com".to_string()];
        let err = validate_addresses("from@example.com", &to, &cc, &[]).unwrap_err();
        assert!(err.to_string().contains("Invalid cc email address"));
    }
}
