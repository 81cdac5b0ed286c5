use crate::errors::AppError;
use crate::models::*;
use crate::sendgrid_models::Contact;
use crate::services::MailService;
use crate::templates::TemplateRegistry;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Mail service holding the SendGrid client and its caches.
    pub mail: Arc<MailService>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-mail-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/emails/send
///
/// Sends a registered template. Answers with the remote status (202 on acceptance).
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendEmailRequest>,
) -> Result<(StatusCode, Json<SendEmailResponse>), AppError> {
    tracing::info!("POST /emails/send - template: {}", payload.template_key);

    let response = state.mail.send_templated_email(payload).await?;
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::ACCEPTED);
    Ok((status, Json(response)))
}

/// POST /api/v1/campaigns
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResult>), AppError> {
    tracing::info!(
        "POST /campaigns - tag: {}, template: {}",
        payload.tag,
        payload.template_key
    );

    let result = state.mail.send_campaign_email(payload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /api/v1/recipients/subscribe
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<Json<Contact>, AppError> {
    tracing::info!("POST /recipients/subscribe - {}", payload.email);

    let contact = state
        .mail
        .subscribe_recipient(&payload.email, &payload.fields)
        .await?;
    Ok(Json(contact))
}

/// POST /api/v1/recipients/unsubscribe
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UnsubscribeRequest>,
) -> Result<Json<Contact>, AppError> {
    tracing::info!("POST /recipients/unsubscribe - {}", payload.email);

    let contact = state
        .mail
        .unsubscribe_recipient(&payload.email, &payload.fields)
        .await?;
    Ok(Json(contact))
}

/// POST /api/v1/recipients/block
///
/// Accepted and logged only.
pub async fn block(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BlockRequest>,
) -> Result<StatusCode, AppError> {
    state.mail.block_recipient(&payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/recipients?tag=<tag>
pub async fn recipients_by_tag(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecipientsQuery>,
) -> Result<Json<Vec<Contact>>, AppError> {
    tracing::info!("GET /recipients - tag: {}", params.tag);

    let contacts = state.mail.fetch_recipients_by_tag(&params.tag).await?;
    Ok(Json(contacts))
}

/// GET /api/v1/templates
pub async fn templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TemplateRegistry>, AppError> {
    let registry = state.mail.load_template_config().await?;
    Ok(Json(registry.as_ref().clone()))
}

/// POST /api/v1/cache/reset
pub async fn reset_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.mail.reset_caches().await;
    StatusCode::NO_CONTENT
}

/// API routes, without the transport middleware added by the binary.
pub fn router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/api/v1/emails/send", post(send_email))
        .route("/api/v1/campaigns", post(send_campaign))
        .route("/api/v1/recipients", get(recipients_by_tag))
        .route("/api/v1/recipients/subscribe", post(subscribe))
        .route("/api/v1/recipients/unsubscribe", post(unsubscribe))
        .route("/api/v1/recipients/block", post(block))
        .route("/api/v1/templates", get(templates))
        .route("/api/v1/cache/reset", post(reset_cache))
        .with_state(state)
}
