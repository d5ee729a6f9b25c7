//! Directory listing semantics: trimming, joining and failure promotion.

use skiff::SessionError;

use super::fixtures::TestServer;

#[tokio::test]
async fn test_list_directory_joins_trimmed_dir_and_names() {
    let server = TestServer::spawn().await;
    server.write_remote_file("/home/u/a.txt", b"a").await;
    server.write_remote_file("/home/u/b.txt", b"b").await;
    server.create_remote_dir("/home/u/nested").await;

    let mut session = server.manager();
    // The fixture serves entries sorted by name; the client reports them
    // in whatever order the server chose.
    let listing = session.list_directory("/home/u/").await.expect("list");
    assert_eq!(
        listing,
        vec![
            "/home/u/a.txt".to_string(),
            "/home/u/b.txt".to_string(),
            "/home/u/nested".to_string(),
        ]
    );
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_list_directory_excludes_self_and_parent_entries() {
    let server = TestServer::spawn().await;
    server.write_remote_file("/only/file.txt", b"x").await;

    let mut session = server.manager();
    let listing = session.list_directory("/only").await.expect("list");
    assert_eq!(listing, vec!["/only/file.txt".to_string()]);
    assert!(
        listing
            .iter()
            .all(|p| !p.ends_with("/.") && !p.ends_with("/..")),
        "listing leaked a self or parent entry: {:?}",
        listing
    );
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_list_directory_trims_backslashes_like_slashes() {
    let server = TestServer::spawn().await;
    server.write_remote_file("/home/u/a.txt", b"a").await;

    let mut session = server.manager();
    let with_backslash = session.list_directory("/home/u\\").await.expect("list");
    let plain = session.list_directory("/home/u").await.expect("list");
    assert_eq!(with_backslash, plain);
    assert_eq!(plain, vec!["/home/u/a.txt".to_string()]);
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_list_missing_directory_raises() {
    let server = TestServer::spawn().await;

    let mut session = server.manager();
    match session.list_directory("/missing/").await {
        Err(SessionError::DirectoryNotFound { path, reason }) => {
            // The error reports the caller's argument, not the trimmed form.
            assert_eq!(path, "/missing/");
            assert!(!reason.is_empty());
        }
        other => panic!("expected a directory-not-found error, got {:?}", other),
    }
    // The session itself is still usable afterwards.
    assert!(session.is_connected());
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_list_empty_directory_returns_empty_vec() {
    let server = TestServer::spawn().await;
    server.create_remote_dir("/empty").await;

    let mut session = server.manager();
    let listing = session.list_directory("/empty").await.expect("list");
    assert!(listing.is_empty());
    assert!(session.disconnect().await);
}

#[tokio::test]
async fn test_list_root_uses_a_single_separator() {
    let server = TestServer::spawn().await;
    server.write_remote_file("/top.txt", b"t").await;

    let mut session = server.manager();
    let listing = session.list_directory("/").await.expect("list");
    assert_eq!(listing, vec!["/top.txt".to_string()]);
    assert!(session.disconnect().await);
}
