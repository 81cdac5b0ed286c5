use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One address or a list of addresses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Recipients {
    Single(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Convert to a vec of addresses for uniform processing
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Recipients::Single(address) => vec![address],
            Recipients::Many(addresses) => addresses,
        }
    }
}

/// Transactional send of a registered template.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    /// Registry key, e.g. `new-order-email`.
    pub template_key: String,
    pub to: Recipients,
    /// Falls back to the configured default sender address.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub dynamic_template_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    /// 202 when the remote API accepted the message.
    pub status_code: u16,
    pub message_id: Option<String>,
}

/// Broadcast of a template to every sender-list member carrying `tag`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRequest {
    pub tag: String,
    pub template_key: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Send immediately when absent.
    #[serde(default)]
    pub send_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResult {
    pub segment_id: String,
    pub campaign_id: String,
    pub send_at: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscribeRequest {
    pub email: String,
    /// Custom field name → value.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnsubscribeRequest {
    pub email: String,
    /// Custom fields to clear.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientsQuery {
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_recipient_accepted() {
        let request: SendEmailRequest = serde_json::from_value(json!({
            "templateKey": "new-order-email",
            "to": "buyer@example.com"
        }))
        .unwrap();
        assert_eq!(request.to.into_vec(), vec!["buyer@example.com"]);
        assert!(request.cc.is_empty());
    }

    #[test]
    fn test_campaign_send_at_parsed() {
        let request: CampaignRequest = serde_json::from_value(json!({
            "tag": "newsletter",
            "templateKey": "newsletter-email",
            "sendAt": "2030-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(
            request.send_at.unwrap().to_rfc3339(),
            "2030-01-02T03:04:05+00:00"
        );
    }
}
