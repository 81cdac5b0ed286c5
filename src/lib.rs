//! Mail API Library
//!
//! This library sends transactional and campaign emails through the SendGrid
//! API, manages sender-list membership and custom-field tagging, and
//! orchestrates segment/single-send creation for broadcast sends.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `campaigns`: Segment, single send and schedule orchestration.
//! - `config`: Configuration management.
//! - `ensure`: Find-or-create with eventual-consistency polling.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Operation request/response models.
//! - `recipients`: Subscribe, unsubscribe and tag lookups.
//! - `retry`: Rate-limit retry and polling schedules.
//! - `sendgrid_client`: SendGrid API client.
//! - `sendgrid_models`: SendGrid wire models.
//! - `services`: The `MailService` and its caches.
//! - `templates`: Template registry and field-type map.
//! - `validation`: Address and dynamic data validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod campaigns;
pub mod config;
pub mod ensure;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod recipients;
pub mod retry;
pub mod sendgrid_client;
pub mod sendgrid_models;
pub mod services;
pub mod templates;
pub mod validation;
