use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marketing list (`/v3/marketing/lists`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContactList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contact_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListsResponse {
    #[serde(default)]
    pub result: Vec<ContactList>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateListRequest<'a> {
    pub name: &'a str,
}

/// Custom field definition (`/v3/marketing/field_definitions`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldDefinition {
    pub id: String,
    pub name: String,
    pub field_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDefinitionsResponse {
    #[serde(default)]
    pub custom_fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFieldRequest<'a> {
    pub name: &'a str,
    pub field_type: &'a str,
}

/// Contact as returned by contact search. Custom fields are keyed by name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub list_ids: Vec<String>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactSearchResponse {
    #[serde(default)]
    pub result: Vec<Contact>,
    #[serde(default)]
    pub contact_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactSearchRequest {
    pub query: String,
}

/// Contact upsert (`PUT /v3/marketing/contacts`). Custom fields are keyed by field id.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertContactsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_ids: Option<Vec<String>>,
    pub contacts: Vec<ContactUpsert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactUpsert {
    pub email: String,
    pub custom_fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertContactsResponse {
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSegmentRequest {
    pub name: String,
    pub parent_list_ids: Vec<String>,
    pub query_dsl: String,
}

/// Single send (one-off campaign).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SingleSend {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSingleSendRequest {
    pub name: String,
    pub send_to: SendTo,
    pub email_config: SingleSendEmailConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendTo {
    pub segment_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleSendEmailConfig {
    pub design_id: String,
    pub sender_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequest {
    /// `"now"` or an RFC 3339 timestamp.
    pub send_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub send_at: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmailAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }
}

/// Body of `POST /v3/mail/send` for a dynamic template.
#[derive(Debug, Clone, Serialize)]
pub struct MailSendRequest {
    pub personalizations: Vec<Personalization>,
    pub from: EmailAddress,
    pub template_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Personalization {
    pub to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<EmailAddress>,
    pub dynamic_template_data: Map<String, Value>,
}

/// Error body returned by the remote API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Joins every error message, or `None` when the body carries none.
    pub fn merged_message(&self) -> Option<String> {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.message.as_deref())
            .filter(|m| !m.trim().is_empty())
            .collect();

        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merged_error_message() {
        let body: ApiErrorBody = serde_json::from_value(json!({
            "errors": [
                {"field": "name", "message": "name is required"},
                {"field": null, "message": "sender_id is invalid"}
            ]
        }))
        .unwrap();
        assert_eq!(
            body.merged_message().as_deref(),
            Some("name is required; sender_id is invalid")
        );
    }

    #[test]
    fn test_empty_error_list_has_no_message() {
        let body: ApiErrorBody = serde_json::from_value(json!({"errors": []})).unwrap();
        assert_eq!(body.merged_message(), None);
    }

    #[test]
    fn test_upsert_without_lists_omits_list_ids() {
        let request = UpsertContactsRequest {
            list_ids: None,
            contacts: vec![ContactUpsert {
                email: "a@b.io".to_string(),
                custom_fields: Map::new(),
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("list_ids").is_none());
    }
}
