use crate::errors::AppError;
use crate::sendgrid_models::*;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Client for the SendGrid v3 REST API.
///
/// Every method maps one remote call; non-success statuses become
/// `AppError::RemoteApi` carrying the merged error messages of the body.
#[derive(Clone)]
pub struct SendGridClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Outcome of a transactional send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSendOutcome {
    pub status_code: u16,
    pub message_id: Option<String>,
}

impl SendGridClient {
    /// Creates a new `SendGridClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the API, without the `/v3` prefix.
    /// * `api_key` - The API key used as bearer token.
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create SendGrid client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn execute(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let response = builder.send().await.map_err(|e| {
            AppError::Internal(format!("{} request failed: {}", operation, e))
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.merged_message())
            .unwrap_or_else(|| format!("{} failed with status {}", operation, status));

        if status == 429 {
            tracing::warn!("SendGrid rate limited {}", operation);
        } else {
            tracing::error!("SendGrid returned {} for {}: {}", status, operation, message);
        }
        Err(AppError::RemoteApi { status, message })
    }

    async fn send_json<B, R>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, AppError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = self.execute(operation, builder).await?;
        response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse {} response: {}", operation, e))
        })
    }

    /// Fetches every marketing list.
    pub async fn list_lists(&self) -> Result<Vec<ContactList>, AppError> {
        tracing::debug!("Fetching marketing lists");
        let response: ListsResponse = self
            .send_json::<(), _>(
                "List lists",
                Method::GET,
                "/v3/marketing/lists?page_size=1000",
                None,
            )
            .await?;
        Ok(response.result)
    }

    pub async fn create_list(&self, name: &str) -> Result<ContactList, AppError> {
        tracing::info!("Creating marketing list: {}", name);
        self.send_json(
            "Create list",
            Method::POST,
            "/v3/marketing/lists",
            Some(&CreateListRequest { name }),
        )
        .await
    }

    pub async fn list_field_definitions(&self) -> Result<Vec<FieldDefinition>, AppError> {
        tracing::debug!("Fetching custom field definitions");
        let response: FieldDefinitionsResponse = self
            .send_json::<(), _>(
                "List field definitions",
                Method::GET,
                "/v3/marketing/field_definitions",
                None,
            )
            .await?;
        Ok(response.custom_fields)
    }

    pub async fn create_field_definition(
        &self,
        name: &str,
        field_type: &str,
    ) -> Result<FieldDefinition, AppError> {
        tracing::info!("Creating custom field '{}' ({})", name, field_type);
        self.send_json(
            "Create field definition",
            Method::POST,
            "/v3/marketing/field_definitions",
            Some(&CreateFieldRequest { name, field_type }),
        )
        .await
    }

    /// Adds or updates contacts. Returns the remote job id when provided.
    pub async fn upsert_contacts(
        &self,
        request: &UpsertContactsRequest,
    ) -> Result<Option<String>, AppError> {
        tracing::info!("Upserting {} contact(s)", request.contacts.len());
        let response: UpsertContactsResponse = self
            .send_json(
                "Upsert contacts",
                Method::PUT,
                "/v3/marketing/contacts",
                Some(request),
            )
            .await?;
        Ok(response.job_id)
    }

    /// Runs a contact search query.
    ///
    /// `contact_count` is the remote total, which may exceed the returned page.
    pub async fn search_contacts(&self, query: &str) -> Result<ContactSearchResponse, AppError> {
        tracing::debug!("Searching contacts: {}", query);
        let response: ContactSearchResponse = self
            .send_json(
                "Search contacts",
                Method::POST,
                "/v3/marketing/contacts/search",
                Some(&ContactSearchRequest {
                    query: query.to_string(),
                }),
            )
            .await?;
        tracing::debug!(
            "Contact search matched {} and returned {}",
            response.contact_count,
            response.result.len()
        );
        Ok(response)
    }

    pub async fn create_segment(&self, request: &CreateSegmentRequest) -> Result<Segment, AppError> {
        tracing::info!("Creating segment: {}", request.name);
        self.send_json(
            "Create segment",
            Method::POST,
            "/v3/marketing/segments/2.0",
            Some(request),
        )
        .await
    }

    pub async fn create_single_send(
        &self,
        request: &CreateSingleSendRequest,
    ) -> Result<SingleSend, AppError> {
        tracing::info!("Creating single send: {}", request.name);
        self.send_json(
            "Create single send",
            Method::POST,
            "/v3/marketing/singlesends",
            Some(request),
        )
        .await
    }

    pub async fn schedule_single_send(
        &self,
        single_send_id: &str,
        send_at: &str,
    ) -> Result<ScheduleResponse, AppError> {
        tracing::info!("Scheduling single send {} at {}", single_send_id, send_at);
        self.send_json(
            "Schedule single send",
            Method::PUT,
            &format!("/v3/marketing/singlesends/{}/schedule", single_send_id),
            Some(&ScheduleRequest {
                send_at: send_at.to_string(),
            }),
        )
        .await
    }

    /// Sends a dynamic-template email. The API answers 202 with an empty body.
    pub async fn send_mail(&self, request: &MailSendRequest) -> Result<MailSendOutcome, AppError> {
        tracing::info!("Sending template {} via SendGrid", request.template_id);
        let builder = self.request(Method::POST, "/v3/mail/send").json(request);
        let response = self.execute("Send mail", builder).await?;

        let outcome = MailSendOutcome {
            status_code: response.status().as_u16(),
            message_id: response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };
        tracing::info!("✓ Mail accepted with status {}", outcome.status_code);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SendGridClient::new("https://example.com/".to_string(), "key".to_string());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "https://example.com");
    }
}
