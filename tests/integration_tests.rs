//! Integration tests for elizaOS Plugin Instagram Publish
//!
//! These tests drive whole batches through the publish protocol against a
//! scripted Graph API.

use std::sync::Arc;

use elizaos_plugin_instagram_publish::testing::{RecordingDelay, ScriptedTransport};
use elizaos_plugin_instagram_publish::{
    BatchExecutor, ChildSpec, ErrorKind, GraphApiError, InstagramConfig, InstagramError,
    InstagramPublishService, MediaPublisher, WorkItem,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn executor(transport: &Arc<ScriptedTransport>, delay: &Arc<RecordingDelay>) -> BatchExecutor {
    BatchExecutor::new(MediaPublisher::new(transport.clone(), delay.clone()))
}

/// Test configuration loading from environment
#[test]
fn test_config_from_env() {
    std::env::set_var("INSTAGRAM_ACCESS_TOKEN", "EAAG-test");
    std::env::set_var("INSTAGRAM_CONTINUE_ON_FAIL", "TRUE");

    let config = InstagramConfig::from_env();

    std::env::remove_var("INSTAGRAM_ACCESS_TOKEN");
    std::env::remove_var("INSTAGRAM_CONTINUE_ON_FAIL");

    let config = assert_ok!(config);
    assert_eq!(config.access_token, "EAAG-test");
    assert!(config.continue_on_fail);
    assert_ok!(config.validate());
}

/// Image: create, two status checks, publish
#[tokio::test]
async fn test_image_publish_flow() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_json(json!({ "id": "c1" }))
            .with_json(json!({ "status": "IN_PROGRESS" }))
            .with_json(json!({ "status": "FINISHED" }))
            .with_json(json!({ "id": "p1" })),
    );
    let delay = Arc::new(RecordingDelay::new());

    let outcomes = assert_ok!(
        executor(&transport, &delay)
            .run(vec![Ok(WorkItem::image("me", "hello", "https://x/a.jpg"))], &false)
            .await
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(assert_ok!(outcomes[0].to_json())["json"], json!({ "id": "p1" }));
    assert_eq!(delay.sleeps(), vec![1500]);

    let sent = transport.requests();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].url, "https://graph.facebook.com/v22.0/me/media");
    assert_eq!(sent[0].query_value("caption"), Some("hello"));
    assert_eq!(sent[1].url, "https://graph.facebook.com/v22.0/c1");
    assert_eq!(sent[3].query_value("creation_id"), Some("c1"));
}

/// Reel: five not-ready publish failures, success on the sixth attempt
#[tokio::test]
async fn test_reel_publish_retries_until_ready() {
    let mut script = ScriptedTransport::new()
        .with_json(json!({ "id": "r1" }))
        .with_json(json!({ "status_code": "FINISHED" }));
    for _ in 0..5 {
        script = script.with_graph_error(GraphApiError::with_code(900));
    }
    let transport = Arc::new(script.with_json(json!({ "id": "p1" })));
    let delay = Arc::new(RecordingDelay::new());

    let outcomes = assert_ok!(
        executor(&transport, &delay)
            .run(vec![Ok(WorkItem::reel("me", "", "https://x/a.mp4"))], &false)
            .await
    );

    assert!(outcomes[0].is_published());
    assert_eq!(delay.sleeps(), vec![3000; 5]);
    assert_eq!(transport.count_requests_to("/me/media_publish"), 6);
    assert_eq!(transport.requests()[0].query_value("media_type"), Some("REELS"));
}

/// Carousel: two children and a parent, each polled once
#[tokio::test]
async fn test_carousel_publish_flow() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_json(json!({ "id": "child-1" }))
            .with_json(json!({ "status_code": "FINISHED" }))
            .with_json(json!({ "id": "child-2" }))
            .with_json(json!({ "status_code": "FINISHED" }))
            .with_json(json!({ "id": "parent" }))
            .with_json(json!({ "status_code": "FINISHED" }))
            .with_json(json!({ "id": "p1" })),
    );
    let delay = Arc::new(RecordingDelay::new());
    let item = WorkItem::carousel(
        "me",
        "two",
        &[ChildSpec::image("https://x/a.jpg"), ChildSpec::image("https://x/b.jpg")],
    );

    let outcomes = assert_ok!(executor(&transport, &delay).run(vec![Ok(item)], &false).await);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(assert_ok!(outcomes[0].to_json())["json"]["id"], "p1");
    assert_eq!(transport.count_requests_to("/me/media"), 3);
    let polls = transport
        .requests()
        .iter()
        .filter(|r| r.query_value("fields") == Some("status_code,status"))
        .count();
    assert_eq!(polls, 3);
    assert_eq!(transport.remaining(), 0);
}

/// Outcomes stay in input order when a middle item fails
#[tokio::test]
async fn test_failed_item_keeps_its_slot() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_json(json!({ "id": "c1" }))
            .with_json(json!({ "status": "FINISHED" }))
            .with_json(json!({ "id": "p1" }))
            .with_json(json!({ "id": "c2" }))
            .with_json(json!({ "status": "ERROR" }))
            .with_json(json!({ "id": "c3" }))
            .with_json(json!({ "status": "FINISHED" }))
            .with_json(json!({ "id": "p3" })),
    );
    let delay = Arc::new(RecordingDelay::new());
    let items = vec![
        Ok(WorkItem::image("me", "", "https://x/1.jpg")),
        Ok(WorkItem::image("me", "", "https://x/2.jpg")),
        Ok(WorkItem::image("me", "", "https://x/3.jpg")),
    ];

    let outcomes = assert_ok!(executor(&transport, &delay).run(items, &true).await);

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_published());
    assert!(outcomes[2].is_published());

    let record = outcomes[1].error().expect("second item should fail");
    assert_eq!(record.error_kind, ErrorKind::ContainerStatus);
    assert_eq!(record.creation_id.as_ref().map(|id| id.as_str()), Some("c2"));

    let output: Vec<_> = outcomes.iter().map(|o| o.to_json().unwrap()).collect();
    assert_eq!(output[1]["pairedItem"]["item"], 1);
    assert_eq!(output[2]["json"]["id"], "p3");
}

/// A failing carousel child stops the item before later children or the parent
#[tokio::test]
async fn test_carousel_child_failure_is_fail_fast() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_json(json!({ "id": "child-1" }))
            .with_json(json!({ "status_code": "FINISHED" }))
            .with_graph_error(GraphApiError::with_message("Only photo or video can be accepted")),
    );
    let delay = Arc::new(RecordingDelay::new());
    let item = WorkItem::carousel(
        "me",
        "",
        &[
            ChildSpec::image("https://x/a.jpg"),
            ChildSpec::image("https://x/b.pdf"),
            ChildSpec::video("https://x/c.mp4"),
        ],
    );

    let outcomes = assert_ok!(executor(&transport, &delay).run(vec![Ok(item)], &true).await);

    assert_eq!(transport.count_requests_to("/me/media"), 2);
    assert_eq!(transport.count_requests_to("/me/media_publish"), 0);

    let record = outcomes[0].error().expect("carousel should fail");
    assert_eq!(record.child_index, Some(2));
    assert_eq!(record.status_code, Some(400));
    assert_eq!(record.message, "Failed to create carousel item 2: Graph API carousel item 2 creation failed: Only photo or video can be accepted (status: 400)");
    assert_eq!(
        record.payload.as_ref().map(|p| p["image_url"].clone()),
        Some(json!("https://x/b.pdf"))
    );
}

/// Without continue-on-fail the first failure aborts the batch
#[tokio::test]
async fn test_abort_on_first_failure() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_graph_error(GraphApiError::with_code(190))
            .with_json(json!({ "id": "c2" })),
    );
    let delay = Arc::new(RecordingDelay::new());
    let items = vec![
        Ok(WorkItem::image("me", "", "https://x/1.jpg")),
        Ok(WorkItem::image("me", "", "https://x/2.jpg")),
    ];

    let err = assert_err!(executor(&transport, &delay).run(items, &false).await);

    assert!(matches!(err, InstagramError::Transport { .. }));
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(transport.remaining(), 1);
}

/// Unsupported resources and operations are recorded per item
#[tokio::test]
async fn test_service_records_parameter_errors() {
    let service = InstagramPublishService::new(
        InstagramConfig::new("token".to_string()).with_continue_on_fail(true),
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_json(json!({ "id": "s1" }))
            .with_json(json!({ "status_code": "FINISHED" }))
            .with_json(json!({ "id": "p1" })),
    );
    assert_ok!(
        service
            .start_with(transport.clone(), Arc::new(RecordingDelay::new()))
            .await
    );

    let outcomes = assert_ok!(
        service
            .publish_parameters(&[
                json!({ "resource": "igtv", "node": "me" }),
                json!({ "resource": "image", "operation": "update", "node": "me" }),
                json!({ "resource": "stories", "node": "me", "videoUrl": "https://x/s.mp4" }),
            ])
            .await
    );

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[0].error().map(|e| e.message.as_str()),
        Some("Unsupported resource: igtv")
    );
    assert_eq!(
        outcomes[1].error().map(|e| e.message.as_str()),
        Some("Unsupported operation: update")
    );
    assert!(outcomes[2].is_published());
    assert_eq!(transport.requests()[0].query_value("media_type"), Some("STORIES"));
}
