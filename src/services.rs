//! `MailService`: the public operation surface.
//!
//! The service owns the SendGrid client and every in-process cache
//! (template registry, field-type map, list roster, field definitions).
//! Recipient and campaign operations live in `recipients` and `campaigns`.

use crate::config::Config;
use crate::ensure::{ensure_resource, ConsistencyPolicy};
use crate::errors::AppError;
use crate::models::{SendEmailRequest, SendEmailResponse};
use crate::retry::{with_rate_limit_retry, PollPolicy, RetryOptions};
use crate::sendgrid_client::SendGridClient;
use crate::sendgrid_models::{
    ContactList, EmailAddress, FieldDefinition, MailSendRequest, Personalization,
};
use crate::templates::{FieldType, FieldTypeMap, TemplateRegistry};
use crate::validation::{validate_addresses, validate_dynamic_template_data, validate_email};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct MailService {
    config: Config,
    client: SendGridClient,
    templates: RwLock<Option<Arc<TemplateRegistry>>>,
    field_types: RwLock<Option<Arc<FieldTypeMap>>>,
    /// List roster, keyed by list name.
    lists: Cache<String, ContactList>,
    /// Custom field definitions, keyed by field name.
    fields: Cache<String, FieldDefinition>,
}

impl MailService {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let client = SendGridClient::new(
            config.sendgrid_base_url.clone(),
            config.sendgrid_api_key.clone(),
        )?;

        Ok(Self {
            config,
            client,
            templates: RwLock::new(None),
            field_types: RwLock::new(None),
            lists: Cache::builder().max_capacity(1_000).build(),
            fields: Cache::builder().max_capacity(1_000).build(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn client(&self) -> &SendGridClient {
        &self.client
    }

    pub(crate) fn retry_options(&self) -> RetryOptions {
        RetryOptions::new(
            self.config.rate_limit_retries.max(1),
            Duration::from_millis(self.config.rate_limit_initial_delay_ms),
            Duration::from_millis(self.config.rate_limit_max_delay_ms),
        )
    }

    fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.config.ensure_settle_delay_ms)
    }

    /// Settle delay followed by up to five exponentially spaced checks.
    fn sender_list_policy(&self) -> ConsistencyPolicy {
        ConsistencyPolicy {
            settle_delay: self.settle_delay(),
            poll: PollPolicy {
                max_delay: Duration::from_millis(self.config.list_verify_max_delay_ms),
                ..PollPolicy::default()
            },
        }
    }

    /// Returns the template registry, loading it on first use.
    pub async fn load_template_config(&self) -> Result<Arc<TemplateRegistry>, AppError> {
        if let Some(registry) = self.templates.read().await.as_ref() {
            return Ok(registry.clone());
        }

        let mut slot = self.templates.write().await;
        if let Some(registry) = slot.as_ref() {
            return Ok(registry.clone());
        }

        let registry =
            Arc::new(TemplateRegistry::load(self.config.templates_path.as_deref()).await?);
        tracing::info!("Template registry loaded ({} templates)", registry.len());
        *slot = Some(registry.clone());
        Ok(registry)
    }

    /// Returns the field-type map merged over every template, building it on first use.
    ///
    /// Later calls return the same `Arc` until `reset_caches` runs.
    pub async fn build_field_type_map(&self) -> Result<Arc<FieldTypeMap>, AppError> {
        if let Some(map) = self.field_types.read().await.as_ref() {
            return Ok(map.clone());
        }

        let registry = self.load_template_config().await?;
        let mut slot = self.field_types.write().await;
        if let Some(map) = slot.as_ref() {
            return Ok(map.clone());
        }

        let map = Arc::new(FieldTypeMap::build(&registry));
        tracing::debug!("Field type map built with {} fields", map.len());
        *slot = Some(map.clone());
        Ok(map)
    }

    async fn ensure_list(
        &self,
        name: &str,
        policy: ConsistencyPolicy,
    ) -> Result<ContactList, AppError> {
        if let Some(list) = self.lists.get(name).await {
            return Ok(list);
        }

        let client = &self.client;
        let list = ensure_resource(
            "list",
            name,
            self.retry_options(),
            policy,
            move || async move {
                let lists = client.list_lists().await?;
                Ok::<_, AppError>(lists.into_iter().find(|list| list.name == name))
            },
            move || async move { client.create_list(name).await.map(|_| ()) },
        )
        .await?;

        self.lists.insert(name.to_string(), list.clone()).await;
        Ok(list)
    }

    /// Returns the list called `name`, creating it when missing.
    pub async fn ensure_list_exists_by_name(&self, name: &str) -> Result<ContactList, AppError> {
        self.ensure_list(name, ConsistencyPolicy::settle_then_check(self.settle_delay()))
            .await
    }

    /// Returns the configured sender's list (`sender_<id>_list`), creating it when missing.
    pub async fn ensure_sender_list(&self) -> Result<ContactList, AppError> {
        let name = self.config.sender_list_name();
        self.ensure_list(&name, self.sender_list_policy()).await
    }

    /// Returns the custom field definition called `name` without creating it.
    pub async fn find_field_definition(
        &self,
        name: &str,
    ) -> Result<Option<FieldDefinition>, AppError> {
        if let Some(field) = self.fields.get(name).await {
            return Ok(Some(field));
        }

        let client = &self.client;
        let fields = with_rate_limit_retry("List field definitions", self.retry_options(), move || {
            client.list_field_definitions()
        })
        .await?;

        let found = fields.into_iter().find(|field| field.name == name);
        if let Some(ref field) = found {
            self.fields.insert(name.to_string(), field.clone()).await;
        }
        Ok(found)
    }

    /// Returns the custom field definition called `name`, creating it when missing.
    pub async fn ensure_field_exists(
        &self,
        name: &str,
        field_type: FieldType,
    ) -> Result<FieldDefinition, AppError> {
        if let Some(field) = self.fields.get(name).await {
            return Ok(field);
        }

        let client = &self.client;
        let remote_type = field_type.remote_field_type();
        let field = ensure_resource(
            "custom field",
            name,
            self.retry_options(),
            ConsistencyPolicy::settle_then_check(self.settle_delay()),
            move || async move {
                let fields = client.list_field_definitions().await?;
                Ok::<_, AppError>(fields.into_iter().find(|field| field.name == name))
            },
            move || async move {
                client
                    .create_field_definition(name, remote_type)
                    .await
                    .map(|_| ())
            },
        )
        .await?;

        self.fields.insert(name.to_string(), field.clone()).await;
        Ok(field)
    }

    /// Sends a registered template to the given recipients.
    ///
    /// Addresses and dynamic data are validated before anything is sent.
    pub async fn send_templated_email(
        &self,
        request: SendEmailRequest,
    ) -> Result<SendEmailResponse, AppError> {
        let registry = self.load_template_config().await?;
        let template = registry.get(&request.template_key)?;

        let from = request
            .from
            .clone()
            .or_else(|| self.config.default_from_address.clone())
            .ok_or_else(|| AppError::Validation("A sender address is required".to_string()))?;
        let to = request.to.into_vec();

        validate_addresses(&from, &to, &request.cc, &request.bcc)?;
        validate_dynamic_template_data(template, &request.dynamic_template_data)?;

        let mail = MailSendRequest {
            personalizations: vec![Personalization {
                to: to.iter().map(EmailAddress::new).collect(),
                cc: request.cc.iter().map(EmailAddress::new).collect(),
                bcc: request.bcc.iter().map(EmailAddress::new).collect(),
                dynamic_template_data: request.dynamic_template_data,
            }],
            from: EmailAddress::new(from),
            template_id: template.template_id.clone(),
        };

        tracing::info!(
            "Sending '{}' to {} recipient(s)",
            request.template_key,
            to.len()
        );

        let client = &self.client;
        let mail = &mail;
        let outcome =
            with_rate_limit_retry("Send mail", self.retry_options(), move || client.send_mail(mail))
                .await?;

        Ok(SendEmailResponse {
            status_code: outcome.status_code,
            message_id: outcome.message_id,
        })
    }

    /// Blocking recipients is not supported; the request is only logged.
    pub async fn block_recipient(&self, email: &str) -> Result<(), AppError> {
        validate_email(email, "recipient")?;
        tracing::warn!("Block recipient requested for {}, not implemented", email);
        Ok(())
    }

    /// Drops every cached template, field type, list and field definition.
    pub async fn reset_caches(&self) {
        *self.templates.write().await = None;
        *self.field_types.write().await = None;
        self.lists.invalidate_all();
        self.fields.invalidate_all();
        tracing::info!("Mail service caches reset");
    }
}
