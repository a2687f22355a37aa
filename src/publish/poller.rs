//! Container readiness polling: `GET /{container}?fields=status_code,status`

use serde_json::Value;
use tracing::debug;

use super::MediaPublisher;
use crate::error::{InstagramError, Result, Stage};
use crate::transport::{GraphEndpoint, GraphRequest, GraphResponse};
use crate::types::{ContainerId, PublishPolicy};

/// Status fields requested on every poll, in precedence order
pub const STATUS_FIELDS: [&str; 2] = ["status_code", "status"];

/// Status values meaning the container can be published
pub const READY_STATUSES: [&str; 3] = ["FINISHED", "PUBLISHED", "READY"];

/// Status values meaning the container will never be ready
pub const ERROR_STATUSES: [&str; 2] = ["ERROR", "FAILED"];

/// Classified container state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    /// Ready to publish
    Ready,
    /// Terminal error; carries the normalized statuses
    Error(Vec<String>),
    /// Still processing; carries the first status seen, if any
    Pending(Option<String>),
}

impl ContainerStatus {
    /// Classify normalized status values
    pub fn classify(statuses: &[String]) -> Self {
        if statuses
            .iter()
            .any(|s| READY_STATUSES.contains(&s.as_str()))
        {
            return Self::Ready;
        }

        if statuses
            .iter()
            .any(|s| ERROR_STATUSES.contains(&s.as_str()))
        {
            return Self::Error(statuses.to_vec());
        }

        Self::Pending(statuses.first().cloned())
    }

    /// Classify a status response body
    pub fn from_response(body: &Value) -> Self {
        Self::classify(&normalize_statuses(body))
    }
}

/// String status fields of a response, uppercased, in [`STATUS_FIELDS`] order
pub fn normalize_statuses(body: &Value) -> Vec<String> {
    STATUS_FIELDS
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_uppercase)
        .collect()
}

impl MediaPublisher {
    /// Poll a container until it is ready, errored, or the budget runs out
    pub(crate) async fn wait_for_container_ready(
        &self,
        endpoint: &GraphEndpoint,
        container_id: &ContainerId,
        policy: &PublishPolicy,
    ) -> Result<()> {
        let max_attempts = policy.max_poll_attempts();
        let mut last_status: Option<String> = None;

        for attempt in 1..=max_attempts {
            let request = GraphRequest::get(endpoint.object(container_id.as_str()))
                .with_query("fields", STATUS_FIELDS.join(","));

            let response = self
                .transport
                .request(request)
                .await
                .map_err(|envelope| InstagramError::Transport {
                    stage: Stage::StatusCheck,
                    envelope,
                })?;

            let status = match response {
                GraphResponse::Json(ref body) => ContainerStatus::from_response(body),
                GraphResponse::Text(_) => ContainerStatus::Pending(None),
            };

            debug!(
                "Container {} status check {}/{}: {:?}",
                container_id, attempt, max_attempts, status
            );

            match status {
                ContainerStatus::Ready => return Ok(()),
                ContainerStatus::Error(statuses) => {
                    return Err(InstagramError::ContainerFailed {
                        container_id: container_id.clone(),
                        statuses,
                    });
                }
                ContainerStatus::Pending(seen) => {
                    if seen.is_some() {
                        last_status = seen;
                    }
                }
            }

            if attempt < max_attempts {
                self.delay.sleep_ms(policy.poll_interval_ms()).await;
            }
        }

        Err(InstagramError::PollTimeout {
            container_id: container_id.clone(),
            attempts: max_attempts,
            last_status,
        })
    }
}
