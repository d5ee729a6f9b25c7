//! Validation of connection parameters before any network I/O.
//!
//! A bad hostname or username would surface eventually as a confusing dial or
//! auth failure; checking up front turns it into a precise error naming the
//! offending field.

use std::net::IpAddr;

use regex::Regex;
use std::sync::LazyLock;

/// Validation error with field context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

// RFC 1123 label: alphanumeric, hyphens allowed inside, 63 chars max.
static DNS_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").unwrap());

// POSIX-style login name.
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]{0,31}$").unwrap());

/// Validate a remote host: an IPv4/IPv6 literal or an RFC 1123 DNS name.
pub fn validate_host(host: &str) -> Result<(), ValidationError> {
    let host = host.trim();

    if host.is_empty() {
        return Err(ValidationError::new("host", "host is required"));
    }
    if host.len() > 253 {
        return Err(ValidationError::new(
            "host",
            "host exceeds the DNS maximum of 253 characters",
        ));
    }

    // IP literals short-circuit the DNS rules
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    for label in host.split('.') {
        if !DNS_LABEL_REGEX.is_match(label) {
            return Err(ValidationError::new(
                "host",
                format!(
                    "invalid DNS label '{}': labels are 1-63 alphanumeric characters with interior hyphens",
                    label
                ),
            ));
        }
    }

    Ok(())
}

/// Validate a port number. Zero is the only invalid `u16`.
pub fn validate_port(port: u16) -> Result<(), ValidationError> {
    if port == 0 {
        return Err(ValidationError::new("port", "port must be 1-65535"));
    }
    Ok(())
}

/// Validate the login name used for password authentication.
///
/// Unlike interactive clients there is no "current user" fallback here, so an
/// empty username is an error.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::new("username", "username is required"));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::new(
            "username",
            "username must start with a letter or underscore and contain only alphanumerics, underscore, or hyphen (max 32 characters)",
        ));
    }

    Ok(())
}
