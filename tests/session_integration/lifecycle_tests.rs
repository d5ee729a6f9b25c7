//! Connection lifecycle: lazy connect, reuse, auth failures, teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use skiff::{EventHooks, HostKeyInfo, SessionConfig, SessionError, SessionManager};
use tokio::net::TcpListener;

use super::fixtures::{TEST_PASSWORD, TEST_USER, TestServer};

#[tokio::test]
async fn test_ensure_connected_is_idempotent() {
    let server = TestServer::spawn().await;
    let mut session = server.manager();

    session.ensure_connected().await.expect("first connect");
    assert!(session.is_connected());
    session.ensure_connected().await.expect("second connect");

    assert_eq!(
        server.connection_count(),
        1,
        "second call must reuse the live transport"
    );
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_disconnect_without_a_connection_reports_success() {
    let server = TestServer::spawn().await;
    let mut session = server.manager();

    assert!(session.disconnect().await);
    assert!(session.disconnect().await);
    assert_eq!(server.connection_count(), 0);
}

#[tokio::test]
async fn test_disconnect_then_reconnect_dials_again() {
    let server = TestServer::spawn().await;
    let mut session = server.manager();

    session.ensure_connected().await.expect("connect");
    assert!(session.disconnect().await);
    assert!(!session.is_connected());

    session.ensure_connected().await.expect("reconnect");
    assert!(session.is_connected());
    assert_eq!(server.connection_count(), 2);
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_wrong_password_raises_authentication_error() {
    let server = TestServer::spawn().await;
    let mut session = server.manager_with_password("not-the-password");

    match session.ensure_connected().await {
        Err(SessionError::AuthenticationFailed { username, .. }) => {
            assert_eq!(username, TEST_USER);
        }
        other => panic!("expected an authentication failure, got {:?}", other),
    }
    assert!(!session.is_connected());
    assert!(server.auth_attempt_count() >= 1);
    // No half-open transport may survive the failure.
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_send_with_wrong_password_fails_before_any_transfer() {
    let server = TestServer::spawn().await;
    server.create_remote_dir("/drop").await;

    let local = tempfile::NamedTempFile::new().expect("local file");
    std::fs::write(local.path(), b"should never arrive").expect("write local");

    let mut session = server.manager_with_password("wrong");
    let err = session
        .send(local.path(), "/drop/out.txt")
        .await
        .expect_err("authentication must fail first");
    assert!(matches!(err, SessionError::AuthenticationFailed { .. }));
    assert!(!server.host_path("/drop/out.txt").exists());
}

#[tokio::test]
async fn test_connection_refused_raises_connection_error() {
    // Bind and immediately drop a listener to get a port nothing serves.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("scratch bind");
    let dead_port = listener.local_addr().expect("scratch addr").port();
    drop(listener);

    let config = SessionConfig::new("127.0.0.1", TEST_USER, TEST_PASSWORD)
        .port(dead_port)
        .connect_timeout(Duration::from_secs(2));
    let mut session = SessionManager::new(config);

    match session.ensure_connected().await {
        Err(SessionError::ConnectionFailed { host, port, .. }) => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(port, dead_port);
        }
        other => panic!("expected a connection failure, got {:?}", other),
    }
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_host_key_hook_can_reject_the_server() {
    let server = TestServer::spawn().await;
    let config = server
        .session_config()
        .event_hooks(EventHooks::new().on_host_key(|_| false));
    let mut session = SessionManager::new(config);

    match session.ensure_connected().await {
        Err(SessionError::ConnectionFailed { reason, .. }) => {
            assert!(reason.contains("host key"), "unexpected reason: {}", reason);
        }
        other => panic!("expected a connection failure, got {:?}", other),
    }
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_host_key_hook_observes_algorithm_and_fingerprint() {
    let server = TestServer::spawn().await;
    let seen: Arc<Mutex<Option<HostKeyInfo>>> = Arc::new(Mutex::new(None));
    let capture = Arc::clone(&seen);

    let config = server
        .session_config()
        .event_hooks(EventHooks::new().on_host_key(move |info| {
            *capture.lock().unwrap() = Some(info.clone());
            true
        }));
    let mut session = SessionManager::new(config);
    session.ensure_connected().await.expect("connect");

    let info = seen.lock().unwrap().clone().expect("hook was invoked");
    assert_eq!(info.algorithm, "ssh-ed25519");
    assert!(
        info.fingerprint.starts_with("SHA256:"),
        "fingerprint: {}",
        info.fingerprint
    );
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_file_channel_is_idempotent() {
    let server = TestServer::spawn().await;
    let mut session = server.manager();

    session.ensure_connected().await.expect("connect");
    session.ensure_file_channel().await.expect("first channel");
    session.ensure_file_channel().await.expect("second channel");

    let listing = session.list_directory("/").await.expect("list root");
    assert!(listing.is_empty());
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_reconnect_after_disconnect_rebuilds_file_channel() {
    let server = TestServer::spawn().await;
    server.create_remote_dir("/work").await;
    let mut session = server.manager();

    session.list_directory("/work").await.expect("first listing");
    assert!(session.disconnect().await);

    // A stale sub-channel handle would break this second listing.
    let listing = session
        .list_directory("/work")
        .await
        .expect("listing after reconnect");
    assert!(listing.is_empty());
    assert_eq!(server.connection_count(), 2);
    assert!(session.disconnect().await);
}
