//! Sender-list membership and custom-field tagging of recipients.

use crate::errors::{AppError, ResultExt};
use crate::retry::with_rate_limit_retry;
use crate::sendgrid_models::{Contact, ContactUpsert, UpsertContactsRequest};
use crate::services::MailService;
use crate::templates::FieldType;
use crate::validation::{check_field_type, validate_email};
use serde_json::{Map, Value};

/// Value written to a custom field to clear it.
pub const CLEARED_FIELD_VALUE: &str = "";

/// True for `true` and for the string `"true"` in any case.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Keeps the contacts whose `tag` field is truthy.
pub fn filter_recipients_by_tag(contacts: Vec<Contact>, tag: &str) -> Vec<Contact> {
    contacts
        .into_iter()
        .filter(|contact| contact.custom_fields.get(tag).is_some_and(is_truthy))
        .collect()
}

// Text custom fields store booleans as "true"/"false".
fn to_remote_value(field_type: FieldType, value: &Value) -> Value {
    match (field_type, value) {
        (FieldType::Boolean, Value::Bool(flag)) => Value::String(flag.to_string()),
        _ => value.clone(),
    }
}

fn values_match(expected: &Value, actual: Option<&Value>) -> bool {
    let Some(actual) = actual else {
        return expected.is_null();
    };
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Value::Bool(flag), Value::String(text)) | (Value::String(text), Value::Bool(flag)) => {
            text.trim().eq_ignore_ascii_case(&flag.to_string())
        }
        (Value::Number(number), Value::String(text)) => number.to_string() == text.trim(),
        _ => false,
    }
}

fn is_cleared(actual: Option<&Value>) -> bool {
    match actual {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        _ => false,
    }
}

fn quote_query_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}

fn tag_search_query(list_id: &str, tag: &str) -> String {
    format!(
        "CONTAINS(list_ids, {}) AND {} = 'true'",
        quote_query_value(list_id),
        tag
    )
}

impl MailService {
    /// Looks up a single contact by address.
    pub async fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>, AppError> {
        let query = format!("email = {}", quote_query_value(&email.to_lowercase()));
        let response = self.client().search_contacts(&query).await?;
        Ok(response
            .result
            .into_iter()
            .find(|contact| contact.email.eq_ignore_ascii_case(email)))
    }

    /// Adds the recipient to the sender list and sets the given custom fields.
    ///
    /// The contact is read back once afterwards; a field that does not hold
    /// the written value is a verification error.
    pub async fn subscribe_recipient(
        &self,
        email: &str,
        fields: &Map<String, Value>,
    ) -> Result<Contact, AppError> {
        validate_email(email, "recipient")?;
        let field_types = self.build_field_type_map().await?;
        for (name, value) in fields {
            if let Some(field_type) = field_types.get(name) {
                check_field_type(name, field_type, value)?;
            }
        }

        let list = self
            .ensure_sender_list()
            .await
            .context("Resolving sender list")?;

        let mut custom_fields = Map::new();
        for (name, value) in fields {
            let field_type = field_types.get(name).unwrap_or(FieldType::String);
            let definition = self.ensure_field_exists(name, field_type).await?;
            custom_fields.insert(definition.id, to_remote_value(field_type, value));
        }

        let request = UpsertContactsRequest {
            list_ids: Some(vec![list.id.clone()]),
            contacts: vec![ContactUpsert {
                email: email.to_string(),
                custom_fields,
            }],
        };
        self.upsert(&request)
            .await
            .with_context(|| format!("Subscribing {}", email))?;

        let contact = self.read_back(email).await?;
        for (name, expected) in fields {
            let actual = contact.custom_fields.get(name);
            if !values_match(expected, actual) {
                tracing::error!("Field '{}' for {} did not take effect", name, email);
                return Err(AppError::Verification(format!(
                    "Field '{}' for {} expected {} but found {}",
                    name,
                    email,
                    expected,
                    actual.cloned().unwrap_or(Value::Null)
                )));
            }
        }

        tracing::info!("✓ Subscribed {} to list {}", email, list.name);
        Ok(contact)
    }

    /// Clears the given custom fields on the recipient without touching list membership.
    ///
    /// Fields with no remote definition hold no value and are skipped.
    pub async fn unsubscribe_recipient(
        &self,
        email: &str,
        fields: &[String],
    ) -> Result<Contact, AppError> {
        validate_email(email, "recipient")?;

        let mut custom_fields = Map::new();
        for name in fields {
            match self.find_field_definition(name).await? {
                Some(definition) => {
                    custom_fields.insert(
                        definition.id,
                        Value::String(CLEARED_FIELD_VALUE.to_string()),
                    );
                }
                None => tracing::warn!("Field '{}' is not defined, nothing to clear", name),
            }
        }

        let request = UpsertContactsRequest {
            list_ids: None,
            contacts: vec![ContactUpsert {
                email: email.to_string(),
                custom_fields,
            }],
        };
        self.upsert(&request)
            .await
            .with_context(|| format!("Unsubscribing {}", email))?;

        let contact = self.read_back(email).await?;
        if let Some(name) = fields
            .iter()
            .find(|name| !is_cleared(contact.custom_fields.get(name.as_str())))
        {
            tracing::error!("Field '{}' for {} was not cleared", name, email);
            return Err(AppError::Verification(format!(
                "Field '{}' for {} was not cleared",
                name, email
            )));
        }

        tracing::info!("✓ Cleared {} field(s) for {}", fields.len(), email);
        Ok(contact)
    }

    /// Returns the sender-list members whose `tag` field is true.
    ///
    /// Fails when the remote search reports more matches than it returned.
    pub async fn fetch_recipients_by_tag(&self, tag: &str) -> Result<Vec<Contact>, AppError> {
        let field_types = self.build_field_type_map().await?;
        if !field_types.contains(tag) {
            return Err(AppError::InvalidTag(tag.to_string()));
        }

        let list = self.ensure_sender_list().await?;
        let query = tag_search_query(&list.id, tag);
        let response = self.client().search_contacts(&query).await?;

        let received = response.result.len();
        if response.contact_count > received as u64 {
            tracing::error!(
                "Search for '{}' matched {} contacts but returned {}",
                tag,
                response.contact_count,
                received
            );
            return Err(AppError::IncompleteResult {
                expected: response.contact_count,
                received,
            });
        }

        let tagged = filter_recipients_by_tag(response.result, tag);
        tracing::info!("Found {} recipient(s) tagged '{}'", tagged.len(), tag);
        Ok(tagged)
    }

    async fn upsert(&self, request: &UpsertContactsRequest) -> Result<Option<String>, AppError> {
        let client = self.client();
        with_rate_limit_retry("Upsert contacts", self.retry_options(), move || {
            client.upsert_contacts(request)
        })
        .await
    }

    async fn read_back(&self, email: &str) -> Result<Contact, AppError> {
        self.find_contact_by_email(email).await?.ok_or_else(|| {
            tracing::error!("Contact {} not visible after upsert", email);
            AppError::Verification(format!("Contact {} not found after upsert", email))
        })
    }
}
