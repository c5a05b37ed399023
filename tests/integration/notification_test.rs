//! Report delivery through the transport seam.

use super::common::{CHANNEL, TOKEN};
use threshold_monitor::notify::{send_monitoring_results, MockTransport, PostResponse};

#[tokio::test]
async fn test_send_returns_true_on_acceptance() {
    let transport = MockTransport::new();

    let sent = send_monitoring_results(&transport, "report", CHANNEL, TOKEN).await.unwrap();

    assert!(sent);
    let posted = transport.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel, CHANNEL);
    assert_eq!(posted[0].token, TOKEN);
    assert_eq!(posted[0].text, "report");
}

#[tokio::test]
async fn test_send_rejection_carries_code() {
    let transport = MockTransport::new().respond(PostResponse::rejected("invalid_auth"));

    let err = send_monitoring_results(&transport, "report", CHANNEL, TOKEN).await.unwrap_err();

    assert_eq!(err.to_string(), "Error sending message to Slack: invalid_auth");
}

#[tokio::test]
async fn test_send_rejection_without_code() {
    let transport = MockTransport::new().respond(PostResponse {
        ok: false,
        error: None,
    });

    let err = send_monitoring_results(&transport, "report", CHANNEL, TOKEN).await.unwrap_err();

    assert!(err.to_string().contains("unknown_error"));
}
