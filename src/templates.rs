//! Template registry and the merged field-type map.
//!
//! The registry maps a template key (e.g. `new-order-email`) to the remote
//! template id, the dynamic-data fields it requires and the declared type of
//! each custom field. It is loaded once per `MailService` and shared behind
//! an `Arc`.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Registry shipped with the binary, used when no file path is configured.
pub const EMBEDDED_TEMPLATES: &str = include_str!("../config/email_templates.json");

/// Declared type of a custom field / dynamic template value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Array,
    Url,
    Email,
    Number,
    /// Any type name we do not check.
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Field type used when the field is created on the remote API.
    pub fn remote_field_type(&self) -> &'static str {
        match self {
            FieldType::Number => "Number",
            _ => "Text",
        }
    }
}

/// A single declared custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
}

/// Configuration of one remote template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub template_id: String,
    pub required_fields: Vec<String>,
    /// Declared field types, in registration order.
    pub custom_field_types: Vec<FieldSpec>,
}

impl TemplateConfig {
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.custom_field_types
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.field_type)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTemplateConfig {
    #[serde(default)]
    template_id: String,
    #[serde(default)]
    required_fields: Vec<String>,
    custom_field_types: Option<Map<String, Value>>,
}

/// All known templates keyed by template key, in registration order.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateRegistry {
    templates: Vec<(String, TemplateConfig)>,
}

impl TemplateRegistry {
    /// Parses and validates a registry from its JSON form.
    ///
    /// Every template must carry a `templateId` and a `customFieldTypes`
    /// object; the error names the offending template.
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let entries: Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Invalid template registry JSON: {}", e)))?;

        let mut templates = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let parsed: RawTemplateConfig = serde_json::from_value(value).map_err(|e| {
                AppError::Config(format!("Invalid template config '{}': {}", key, e))
            })?;

            if parsed.template_id.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Template '{}' is missing templateId",
                    key
                )));
            }

            let Some(field_types) = parsed.custom_field_types else {
                return Err(AppError::Config(format!(
                    "Template {} is missing customFieldTypes",
                    parsed.template_id
                )));
            };

            let mut custom_field_types = Vec::with_capacity(field_types.len());
            for (name, type_value) in field_types {
                let field_type: FieldType = serde_json::from_value(type_value).map_err(|e| {
                    AppError::Config(format!(
                        "Template {} declares an invalid type for '{}': {}",
                        parsed.template_id, name, e
                    ))
                })?;
                custom_field_types.push(FieldSpec { name, field_type });
            }

            let mut required_fields: Vec<String> = Vec::with_capacity(parsed.required_fields.len());
            for field in parsed.required_fields {
                if !required_fields.contains(&field) {
                    required_fields.push(field);
                }
            }

            templates.push((
                key,
                TemplateConfig {
                    template_id: parsed.template_id,
                    required_fields,
                    custom_field_types,
                },
            ));
        }

        tracing::debug!("Loaded {} email templates", templates.len());
        Ok(Self { templates })
    }

    /// Loads the registry from `path`, or the embedded registry when `None`.
    pub async fn load(path: Option<&str>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::Config(format!("Failed to read template registry {}: {}", path, e))
                })?;
                Self::from_json_str(&raw)
            }
            None => Self::from_json_str(EMBEDDED_TEMPLATES),
        }
    }

    /// Looks up a template by key.
    pub fn get(&self, key: &str) -> Result<&TemplateConfig, AppError> {
        self.templates
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, config)| config)
            .ok_or_else(|| AppError::UnknownTemplate(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateConfig)> {
        self.templates.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Field name → declared type, merged over every template.
///
/// On a name collision the first registered template wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTypeMap {
    fields: HashMap<String, FieldType>,
}

impl FieldTypeMap {
    pub fn build(registry: &TemplateRegistry) -> Self {
        let mut fields = HashMap::new();
        for (key, template) in registry.iter() {
            for spec in &template.custom_field_types {
                match fields.get(&spec.name).copied() {
                    Some(existing) if existing != spec.field_type => {
                        tracing::debug!(
                            "Field '{}' in template '{}' conflicts with earlier type {:?}, keeping first",
                            spec.name,
                            key,
                            existing
                        );
                    }
                    Some(_) => {}
                    None => {
                        fields.insert(spec.name.clone(), spec.field_type);
                    }
                }
            }
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
