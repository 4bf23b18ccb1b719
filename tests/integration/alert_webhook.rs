//! Alert notices forwarded to an optional webhook

use std::time::Duration;

use host_monitor::{alerts::AlertManager, config::Webhook};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn manager_for(url: String, timeout: Duration) -> AlertManager {
    AlertManager::new(Some(Webhook { url }), timeout).unwrap()
}

#[tokio::test]
async fn test_webhook_receives_alert_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/alerts"))
        .and(body_partial_json(serde_json::json!({
            "message": "High resource usage: CPU usage 97.0% (limit: 90%)"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = manager_for(
        format!("{}/hooks/alerts", mock_server.uri()),
        Duration::from_secs(5),
    );

    manager
        .send_webhook_alert("High resource usage: CPU usage 97.0% (limit: 90%)")
        .await;

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["host"], manager.host());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_notify_posts_in_background() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = manager_for(
        format!("{}/hooks/alerts", mock_server.uri()),
        Duration::from_secs(5),
    );

    manager.notify(&create_test_snapshot(97.0, 40.0), &create_test_thresholds());

    let mut delivered = false;
    for _ in 0..50 {
        if !mock_server.received_requests().await.unwrap().is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered, "webhook should have been called");
}

#[tokio::test]
async fn test_webhook_failure_is_swallowed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let manager = manager_for(mock_server.uri(), Duration::from_secs(5));

    // must not panic
    manager.send_webhook_alert("High resource usage").await;
}

#[tokio::test]
async fn test_slow_webhook_is_abandoned_after_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let manager = manager_for(mock_server.uri(), Duration::from_millis(200));

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        manager.send_webhook_alert("High resource usage"),
    )
    .await;

    assert!(finished.is_ok(), "webhook request should give up on its own");
}

