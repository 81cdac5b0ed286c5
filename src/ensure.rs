//! Find-or-create for remote resources that are only eventually consistent.
//!
//! Flow:
//! 1. Look the resource up (always against the remote API).
//! 2. Return it when found.
//! 3. Otherwise create it, retrying on rate limits.
//! 4. Wait the settle delay.
//! 5. Poll the lookup until the resource shows up or the poll policy is spent.

use crate::errors::AppError;
use crate::retry::{with_rate_limit_retry, PollPolicy, RetryOptions};
use std::future::Future;
use std::time::Duration;

/// How long to wait for a freshly created resource to become readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    pub settle_delay: Duration,
    pub poll: PollPolicy,
}

impl ConsistencyPolicy {
    /// Settle, then check exactly once.
    pub fn settle_then_check(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            poll: PollPolicy::once(),
        }
    }
}

/// Returns the resource named `name`, creating it when the lookup finds nothing.
///
/// `resource` is only used in logs and in the `CreationFailed` error.
pub async fn ensure_resource<T, L, LFut, C, CFut>(
    resource: &str,
    name: &str,
    retry: RetryOptions,
    policy: ConsistencyPolicy,
    mut lookup: L,
    create: C,
) -> Result<T, AppError>
where
    L: FnMut() -> LFut,
    LFut: Future<Output = Result<Option<T>, AppError>>,
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<(), AppError>>,
{
    if let Some(existing) = lookup().await? {
        tracing::debug!("{} '{}' already exists", resource, name);
        return Ok(existing);
    }

    tracing::info!("{} '{}' not found, creating", resource, name);
    with_rate_limit_retry(&format!("Create {} '{}'", resource, name), retry, create).await?;

    tokio::time::sleep(policy.settle_delay).await;

    for attempt in 1..=policy.poll.attempts.max(1) {
        if let Some(created) = lookup().await? {
            tracing::info!("✓ {} '{}' created and visible", resource, name);
            return Ok(created);
        }

        if attempt < policy.poll.attempts {
            let delay = policy.poll.delay_for_attempt(attempt);
            tracing::debug!(
                "{} '{}' not visible yet (check {}/{}), waiting {:?}",
                resource,
                name,
                attempt,
                policy.poll.attempts,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    tracing::error!("{} '{}' still missing after creation", resource, name);
    Err(AppError::CreationFailed {
        resource: resource.to_string(),
        name: name.to_string(),
    })
}
