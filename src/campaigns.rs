//! Segment → single send → schedule orchestration.
//!
//! A failing step aborts the sequence. Segments or single sends created by
//! earlier steps are left in place on the remote side.

use crate::errors::{AppError, ResultExt};
use crate::models::{CampaignRequest, CampaignResult};
use crate::retry::with_rate_limit_retry;
use crate::sendgrid_models::{
    CreateSegmentRequest, CreateSingleSendRequest, SendTo, SingleSendEmailConfig,
};
use crate::services::MailService;
use chrono::{SecondsFormat, Utc};

/// Segment query selecting contacts whose `tag` field holds `"true"`.
pub fn tag_segment_query(tag: &str) -> String {
    format!(
        "SELECT c.contact_id, c.updated_at FROM contact_data as c WHERE c.{} = 'true'",
        tag
    )
}

impl MailService {
    /// Sends `template_key` to every sender-list member tagged with `tag`.
    ///
    /// The tag and template are checked locally before the first remote call.
    pub async fn send_campaign_email(
        &self,
        request: CampaignRequest,
    ) -> Result<CampaignResult, AppError> {
        let field_types = self.build_field_type_map().await?;
        if !field_types.contains(&request.tag) {
            tracing::warn!("Rejected campaign for unknown tag '{}'", request.tag);
            return Err(AppError::InvalidTag(request.tag));
        }

        let registry = self.load_template_config().await?;
        let template_id = registry.get(&request.template_key)?.template_id.clone();

        let now = Utc::now();
        let send_at = match request.send_at {
            Some(at) if at <= now => {
                return Err(AppError::Validation(format!(
                    "sendAt {} is in the past",
                    at.to_rfc3339_opts(SecondsFormat::Secs, true)
                )));
            }
            Some(at) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
            None => "now".to_string(),
        };

        let list = self
            .ensure_sender_list()
            .await
            .context("Resolving sender list")?;

        let stamp = now.timestamp();
        let client = self.client();
        let retry = self.retry_options();

        let segment_request = CreateSegmentRequest {
            name: format!("{}-segment-{}", request.tag, stamp),
            parent_list_ids: vec![list.id.clone()],
            query_dsl: tag_segment_query(&request.tag),
        };
        let segment_request = &segment_request;
        let segment = with_rate_limit_retry("Create segment", retry, move || {
            client.create_segment(segment_request)
        })
        .await
        .with_context(|| format!("Creating segment for tag '{}'", request.tag))?;

        let single_send_request = CreateSingleSendRequest {
            name: request
                .name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", request.tag, stamp)),
            send_to: SendTo {
                segment_ids: vec![segment.id.clone()],
            },
            email_config: SingleSendEmailConfig {
                design_id: template_id,
                sender_id: self.config().sendgrid_sender_id,
            },
        };
        let single_send_request = &single_send_request;
        let single_send = with_rate_limit_retry("Create single send", retry, move || {
            client.create_single_send(single_send_request)
        })
        .await
        .with_context(|| format!("Creating campaign for segment {}", segment.id))?;

        let single_send_id = single_send.id.as_str();
        let send_at_ref = send_at.as_str();
        let schedule = with_rate_limit_retry("Schedule single send", retry, move || {
            client.schedule_single_send(single_send_id, send_at_ref)
        })
        .await
        .with_context(|| format!("Scheduling campaign {}", single_send.id))?;

        tracing::info!(
            "✓ Campaign {} scheduled for '{}' ({})",
            single_send.id,
            request.tag,
            schedule.send_at
        );

        Ok(CampaignResult {
            segment_id: segment.id,
            campaign_id: single_send.id,
            send_at: schedule.send_at,
            status: schedule.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_query_filters_on_tag() {
        assert_eq!(
            tag_segment_query("newsletter"),
            "SELECT c.contact_id, c.updated_at FROM contact_data as c WHERE c.newsletter = 'true'"
        );
    }
}
