/// Unit tests for validation and template registry logic
/// Covers address syntax, dynamic data rules and field-type map merging
use rust_mail_api::templates::{FieldType, FieldTypeMap, TemplateRegistry, EMBEDDED_TEMPLATES};
use rust_mail_api::validation::{
    is_valid_email, validate_addresses, validate_dynamic_template_data,
};
use serde_json::{json, Map, Value};

fn data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[cfg(test)]
mod email_validation_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user+tag@subdomain.example.co.uk"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("userexample.com")); // no @
        assert!(!is_valid_email("user@examplecom")); // no dot in domain
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com")); // space
        assert!(!is_valid_email("user@exam ple.com")); // space in domain
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_sender_and_recipient_checked() {
        let to = vec!["to@example.com".to_string()];

        let err = validate_addresses("sender-at-example.com", &to, &[], &[]).unwrap_err();
        assert!(err.to_string().contains("Invalid sender email address"));

        let bad_to = vec!["to@example".to_string()];
        let err = validate_addresses("from@example.com", &bad_to, &[], &[]).unwrap_err();
        assert!(err.to_string().contains("Invalid recipient email address"));
    }

    #[test]
    fn test_empty_recipient_list_rejected() {
        assert!(validate_addresses("from@example.com", &[], &[], &[]).is_err());
    }
}

#[cfg(test)]
mod template_data_tests {
    use super::*;

    #[test]
    fn test_new_order_data_accepted() {
        let registry = TemplateRegistry::from_json_str(EMBEDDED_TEMPLATES).unwrap();
        let template = registry.get("new-order-email").unwrap();
        let payload = data(json!({
            "order_id": "123ABC",
            "user_name": "Test User",
            "items": [{"item_name": "T-Shirt", "price": "$19.99"}]
        }));
        assert!(validate_dynamic_template_data(template, &payload).is_ok());
    }

    #[test]
    fn test_items_as_string_rejected() {
        let registry = TemplateRegistry::from_json_str(EMBEDDED_TEMPLATES).unwrap();
        let template = registry.get("new-order-email").unwrap();
        let payload = data(json!({
            "order_id": "123ABC",
            "user_name": "Test User",
            "items": "T-Shirt"
        }));
        let err = validate_dynamic_template_data(template, &payload).unwrap_err();
        assert!(err.to_string().contains("items"));
        assert!(err.to_string().contains("expected array but got string"));
    }

    #[test]
    fn test_boolean_field_rejects_string() {
        let registry = TemplateRegistry::from_json_str(EMBEDDED_TEMPLATES).unwrap();
        let template = registry.get("welcome-email").unwrap();
        let payload = data(json!({"user_name": "Ana", "product_updates": "yes"}));
        assert!(validate_dynamic_template_data(template, &payload).is_err());
    }

    #[test]
    fn test_only_missing_fields_listed() {
        let registry = TemplateRegistry::from_json_str(EMBEDDED_TEMPLATES).unwrap();
        let template = registry.get("new-order-email").unwrap();
        let payload = data(json!({"user_name": "Test User"}));
        let err = validate_dynamic_template_data(template, &payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required fields: order_id, items"
        );
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_every_template_field_is_merged() {
        let registry = TemplateRegistry::from_json_str(EMBEDDED_TEMPLATES).unwrap();
        let map = FieldTypeMap::build(&registry);

        for (_, template) in registry.iter() {
            for spec in &template.custom_field_types {
                assert!(map.contains(&spec.name), "missing {}", spec.name);
            }
        }
        assert_eq!(map.get("newsletter"), Some(FieldType::Boolean));
        assert_eq!(map.get("support_email"), Some(FieldType::Email));
    }

    #[test]
    fn test_build_is_deterministic() {
        let registry = TemplateRegistry::from_json_str(EMBEDDED_TEMPLATES).unwrap();
        assert_eq!(FieldTypeMap::build(&registry), FieldTypeMap::build(&registry));
    }

    #[test]
    fn test_missing_custom_field_types_rejected() {
        let raw = r#"{
            "ok": {"templateId": "d-ok", "customFieldTypes": {}},
            "legacy": {"templateId": "d-legacy", "requiredFields": ["name"]}
        }"#;
        let err = TemplateRegistry::from_json_str(raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Template d-legacy is missing customFieldTypes"
        );
    }
}
