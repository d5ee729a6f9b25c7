use thiserror::Error;

/// Errors surfaced by a session manager.
///
/// Connection and authentication failures always propagate to the caller.
/// `send`/`get`/`file_exists`/`delete_file` report operation-level failure as
/// `Ok(false)` instead of an error; `list_directory` is the one operation that
/// raises (`DirectoryNotFound`) on failure. That asymmetry is part of the
/// compatibility contract and is deliberate.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection failed to {host}:{port}: {reason}")]
    ConnectionFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Authentication failed for '{username}': {reason}")]
    AuthenticationFailed { username: String, reason: String },

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("File channel error: {0}")]
    Channel(String),

    #[error("Remote directory not found '{path}': {reason}")]
    DirectoryNotFound { path: String, reason: String },
}
