//! Audit trail for session security events.
//!
//! Password authentication outcomes, host key verdicts, file channel setup
//! and teardown all land on the `skiff::security` target with a stable
//! `event` field, so embedders can split the audit stream from ordinary
//! diagnostics:
//!
//! ```bash
//! RUST_LOG=skiff::security=info
//! ```
//!
//! Credentials never reach this module; callers pass endpoint and account
//! identifiers only.

use tracing::{info, warn};

/// Password authentication is about to run for `username@host:port`.
pub fn log_auth_attempt(host: &str, port: u16, username: &str) {
    info!(
        target: "skiff::security",
        event = "password_auth_attempt",
        host = %host,
        port = port,
        username = %username,
        "Authenticating by password"
    );
}

/// The server accepted the password.
pub fn log_auth_success(host: &str, port: u16, username: &str) {
    info!(
        target: "skiff::security",
        event = "password_auth_success",
        host = %host,
        port = port,
        username = %username,
        "Password authentication succeeded"
    );
}

/// The server turned the password down, or the exchange itself broke.
pub fn log_auth_failure(host: &str, port: u16, username: &str, reason: &str) {
    warn!(
        target: "skiff::security",
        event = "password_auth_failure",
        host = %host,
        port = port,
        username = %username,
        reason = %reason,
        "Password authentication failed"
    );
}

/// Log the host key presented during the handshake and the verdict on it.
pub fn log_host_key(host: &str, port: u16, algorithm: &str, fingerprint: &str, accepted: bool) {
    if accepted {
        info!(
            target: "skiff::security",
            event = "host_key_accepted",
            host = %host,
            port = port,
            algorithm = %algorithm,
            fingerprint = %fingerprint,
            "Host key accepted"
        );
    } else {
        warn!(
            target: "skiff::security",
            event = "host_key_rejected",
            host = %host,
            port = port,
            algorithm = %algorithm,
            fingerprint = %fingerprint,
            "Host key rejected by verification hook"
        );
    }
}

/// Log the opening of the SFTP sub-channel on an established session.
pub fn log_file_channel_open(host: &str, port: u16, username: &str) {
    info!(
        target: "skiff::security",
        event = "file_channel_open",
        host = %host,
        port = port,
        username = %username,
        "SFTP file channel established"
    );
}

/// Log an application-initiated disconnect.
pub fn log_disconnect(host: &str, port: u16, username: &str) {
    info!(
        target: "skiff::security",
        event = "disconnect",
        host = %host,
        port = port,
        username = %username,
        "SSH session disconnected"
    );
}
