// End-to-end tests for `Controller` over HTTP using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use binasa_core::{
    AutoConfirm, CommandOutcome, Controller, CoreError, DashboardConfig, PumpAction, PushState,
    SnapshotSource,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> DashboardConfig {
    let mut config = DashboardConfig::new(Url::parse(&server.uri()).unwrap());
    config.push_enabled = false;
    config.poll_interval = Duration::from_millis(100);
    config.resync_delay = Duration::from_millis(100);
    config
}

async fn mount_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_once_normalizes_status() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        json!({ "level": 57, "pump": true, "foam": 12, "sensors": [true, false, true] }),
    )
    .await;

    let snap = Controller::fetch_once(config_for(&server)).await.unwrap();
    assert_eq!(snap.water_level_percent, 57);
    assert!(snap.pump_on);
    assert_eq!(snap.foam_percent, 12);
    assert_eq!(snap.connected_sensors, [true, false, true]);
    assert_eq!(snap.source, SnapshotSource::Poll);
}

#[tokio::test]
async fn test_fetch_once_unreachable_device() {
    let config = DashboardConfig::new(Url::parse("http://127.0.0.1:9/").unwrap());
    let err = Controller::fetch_once(config).await.unwrap_err();
    assert!(
        matches!(err, CoreError::ConnectionFailed { .. } | CoreError::Timeout { .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_busy_reply_is_rejected_with_message() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "level": 50, "pump": false })).await;
    Mock::given(method("POST"))
        .and(path("/control"))
        .and(body_json(json!({ "action": "on" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "busy" })))
        .expect(1)
        .mount(&server)
        .await;

    let ctrl = Controller::new(config_for(&server)).unwrap();
    ctrl.refresh().await.unwrap();

    let err = ctrl.issue_command(&AutoConfirm).await.unwrap_err();
    assert!(
        matches!(err, CoreError::CommandRejected { action: PumpAction::On, ref message } if message == "busy"),
        "got {err:?}"
    );
    assert!(ctrl.pending_command().is_none());
}

#[tokio::test]
async fn test_command_on_custom_control_path() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "pump": true })).await;
    Mock::given(method("POST"))
        .and(path("/pump"))
        .and(body_json(json!({ "action": "off" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok", "message": "Bomba apagada" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.control_path = "/pump".into();
    let ctrl = Controller::new(config).unwrap();
    ctrl.refresh().await.unwrap();

    let outcome = ctrl.issue_command(&AutoConfirm).await.unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Sent {
            action: PumpAction::Off,
            message: Some("Bomba apagada".into()),
        }
    );
}

#[tokio::test]
async fn test_polls_while_push_is_unreachable() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "level": 100, "foam": 80, "shutdown": true })).await;

    let mut config = config_for(&server);
    config.push_enabled = true;
    // Nothing listens on the discard port.
    config.push_url = Some(Url::parse("ws://127.0.0.1:9/").unwrap());
    config.backoff = binasa_core::Backoff::Fixed(Duration::from_millis(200));

    let ctrl = Controller::new(config).unwrap();
    let mut snapshots = ctrl.snapshots();
    ctrl.start().await.unwrap();

    let snap = tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.water_level_percent, 100);
    assert!(snap.system_shutdown);
    assert!(!ctrl.current_connectivity().push.is_open());

    ctrl.stop().await;
    assert_eq!(ctrl.current_connectivity().push, PushState::Disconnected);
}
