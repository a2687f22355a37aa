//! Publishing a ready container: `POST /{node}/media_publish`

use serde_json::Value;
use tracing::{debug, warn};

use super::MediaPublisher;
use crate::error::{InstagramError, Result, Stage};
use crate::transport::{ErrorEnvelope, GraphEndpoint, GraphRequest, GraphResponse};
use crate::types::{ContainerId, PublishPolicy};

const NOT_READY_PHRASES: [&str; 3] = ["not ready", "not finished", "not yet"];
const NOT_READY_CODE: i64 = 900;
const NOT_READY_SUBCODE: i64 = 2207055;

/// Whether a publish failure means the media is still being processed
///
/// Only the remote `error` object is consulted. Failures without one, such
/// as network errors, are never treated as transient.
pub fn is_media_not_ready(envelope: &ErrorEnvelope) -> bool {
    let Some(error) = envelope.error.as_ref() else {
        return false;
    };

    let message = error.message.as_deref().unwrap_or_default().to_lowercase();
    NOT_READY_PHRASES.iter().any(|p| message.contains(p))
        || error.code == Some(NOT_READY_CODE)
        || error.error_subcode == Some(NOT_READY_SUBCODE)
}

impl MediaPublisher {
    /// Publish a ready container, retrying while the media is not ready
    pub(crate) async fn publish_container(
        &self,
        endpoint: &GraphEndpoint,
        node: &str,
        creation_id: &ContainerId,
        policy: &PublishPolicy,
    ) -> Result<Value> {
        let max_attempts = policy.publish_max_attempts();
        let mut attempt = 1;

        loop {
            let request = GraphRequest::post(endpoint.media_publish(node))
                .with_query("creation_id", creation_id.as_str());

            match self.transport.request(request).await {
                Ok(GraphResponse::Json(body)) => {
                    debug!("Published container {} on attempt {}", creation_id, attempt);
                    return Ok(body);
                }
                Ok(GraphResponse::Text(body)) => {
                    return Err(InstagramError::UnparseableResponse {
                        stage: Stage::Publish,
                        body,
                    });
                }
                Err(envelope) if attempt < max_attempts && is_media_not_ready(&envelope) => {
                    warn!(
                        "Container {} not ready to publish (attempt {}/{}): {}",
                        creation_id,
                        attempt,
                        max_attempts,
                        envelope.display_message()
                    );
                    self.delay.sleep_ms(policy.publish_retry_delay_ms()).await;
                    attempt += 1;
                }
                Err(envelope) => {
                    return Err(InstagramError::PublishFailed {
                        creation_id: creation_id.clone(),
                        attempts: attempt,
                        envelope,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PUBLISH_FAILED_NOTE;
    use crate::testing::{RecordingDelay, ScriptedTransport};
    use crate::transport::GraphApiError;
    use crate::types::ErrorRecord;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn endpoint() -> GraphEndpoint {
        GraphEndpoint::new("graph.facebook.com", "v22.0")
    }

    fn subcode(subcode: i64) -> GraphApiError {
        GraphApiError {
            error_subcode: Some(subcode),
            ..Default::default()
        }
    }

    #[test]
    fn test_not_ready_predicate() {
        let cases = [
            (GraphApiError::with_code(900), true),
            (subcode(2207055), true),
            (GraphApiError::with_message("Media is Not Ready for publishing"), true),
            (GraphApiError::with_message("The video is not finished processing"), true),
            (GraphApiError::with_message("Not yet available"), true),
            (GraphApiError::with_code(4), false),
            (subcode(2207026), false),
            (GraphApiError::with_message("Invalid parameter"), false),
        ];

        for (error, expected) in cases {
            let envelope = ErrorEnvelope::http(400, Some(error.clone()));
            assert_eq!(is_media_not_ready(&envelope), expected, "{error:?}");
        }

        assert!(!is_media_not_ready(&ErrorEnvelope::http(500, None)));
    }

    #[test]
    fn test_failure_without_remote_error_is_not_transient() {
        let network = ErrorEnvelope::network("connection closed: peer not yet ready");
        assert!(!is_media_not_ready(&network));

        let mut bodyless = ErrorEnvelope::http(500, None);
        bodyless.message = "upstream not ready, not finished".to_string();
        assert!(!is_media_not_ready(&bodyless));

        let empty_remote = ErrorEnvelope::http(400, Some(GraphApiError::default()));
        assert!(!is_media_not_ready(&empty_remote));
    }

    #[tokio::test]
    async fn test_network_failure_is_not_retried() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_error(ErrorEnvelope::network("socket hang up: not yet connected"))
                .with_json(json!({ "id": "p1" })),
        );
        let delay = Arc::new(RecordingDelay::new());
        let publisher = MediaPublisher::new(transport.clone(), delay.clone());

        let err = publisher
            .publish_container(&endpoint(), "me", &ContainerId::new("c1"), &PublishPolicy::VIDEO)
            .await
            .unwrap_err();

        assert!(matches!(err, InstagramError::PublishFailed { attempts: 1, .. }));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.remaining(), 1);
        assert!(delay.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_retries_transient_failure() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_graph_error(GraphApiError::with_code(900))
                .with_json(json!({ "id": "p1" })),
        );
        let delay = Arc::new(RecordingDelay::new());
        let publisher = MediaPublisher::new(transport.clone(), delay.clone());

        let published = publisher
            .publish_container(&endpoint(), "me", &ContainerId::new("c1"), &PublishPolicy::IMAGE)
            .await
            .unwrap();

        assert_eq!(published, json!({ "id": "p1" }));
        assert_eq!(delay.sleeps(), vec![1500]);
        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].url, "https://graph.facebook.com/v22.0/me/media_publish");
        assert_eq!(sent[1].query_value("creation_id"), Some("c1"));
    }

    #[tokio::test]
    async fn test_unrelated_failure_is_not_retried() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_graph_error(GraphApiError::with_code(4))
                .with_json(json!({ "id": "p1" })),
        );
        let delay = Arc::new(RecordingDelay::new());
        let publisher = MediaPublisher::new(transport.clone(), delay.clone());

        let err = publisher
            .publish_container(&endpoint(), "me", &ContainerId::new("c1"), &PublishPolicy::IMAGE)
            .await
            .unwrap_err();

        match &err {
            InstagramError::PublishFailed {
                attempts,
                creation_id,
                ..
            } => {
                assert_eq!(*attempts, 1);
                assert_eq!(creation_id.as_str(), "c1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.requests().len(), 1);
        assert!(delay.sleeps().is_empty());

        let record = ErrorRecord::from(&err);
        assert_eq!(record.note.as_deref(), Some(PUBLISH_FAILED_NOTE));
        assert_eq!(record.remote["code"], 4);
    }

    #[tokio::test]
    async fn test_transient_failure_on_last_attempt_is_terminal() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_graph_error(GraphApiError::with_code(900))
                .with_graph_error(subcode(2207055))
                .with_graph_error(GraphApiError::with_message("not ready"))
                .with_json(json!({ "id": "p1" })),
        );
        let delay = Arc::new(RecordingDelay::new());
        let publisher = MediaPublisher::new(transport.clone(), delay.clone());

        let err = publisher
            .publish_container(&endpoint(), "me", &ContainerId::new("c1"), &PublishPolicy::IMAGE)
            .await
            .unwrap_err();

        assert!(matches!(err, InstagramError::PublishFailed { attempts: 3, .. }));
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.remaining(), 1);
        assert_eq!(delay.sleeps(), vec![1500, 1500]);
    }

    #[tokio::test]
    async fn test_text_publish_body_is_protocol_error() {
        let transport = Arc::new(ScriptedTransport::new().with_text("ok"));
        let publisher = MediaPublisher::new(transport, Arc::new(RecordingDelay::new()));

        let err = publisher
            .publish_container(&endpoint(), "me", &ContainerId::new("c1"), &PublishPolicy::IMAGE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InstagramError::UnparseableResponse {
                stage: Stage::Publish,
                ..
            }
        ));
    }
}
