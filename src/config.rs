//! Connection parameters for a session.
//!
//! A `SessionConfig` is fixed at construction; the manager never mutates it.
//! The password is a [`SecretString`] so accidental `Debug` output stays
//! redacted and the plaintext is touched only at the authentication call.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use russh::Preferred;
use secrecy::SecretString;

use crate::validation::{self, ValidationError};

pub const DEFAULT_PORT: u16 = 22;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// Algorithm names the preference tables accept, in server-offer order.
const KEX_ALGORITHMS: &[russh::kex::Name] = &[
    russh::kex::CURVE25519,
    russh::kex::CURVE25519_PRE_RFC_8731,
    russh::kex::ECDH_SHA2_NISTP256,
    russh::kex::ECDH_SHA2_NISTP384,
    russh::kex::ECDH_SHA2_NISTP521,
    russh::kex::DH_G16_SHA512,
    russh::kex::DH_G14_SHA256,
    russh::kex::DH_G14_SHA1,
    russh::kex::DH_G1_SHA1,
];

const CIPHERS: &[russh::cipher::Name] = &[
    russh::cipher::CHACHA20_POLY1305,
    russh::cipher::AES_256_GCM,
    russh::cipher::AES_128_GCM,
    russh::cipher::AES_256_CTR,
    russh::cipher::AES_192_CTR,
    russh::cipher::AES_128_CTR,
];

const MACS: &[russh::mac::Name] = &[
    russh::mac::HMAC_SHA256_ETM,
    russh::mac::HMAC_SHA512_ETM,
    russh::mac::HMAC_SHA1_ETM,
    russh::mac::HMAC_SHA256,
    russh::mac::HMAC_SHA512,
    russh::mac::HMAC_SHA1,
];

/// Host key presented by the server during the handshake.
#[derive(Debug, Clone)]
pub struct HostKeyInfo {
    /// Key algorithm name, e.g. `ssh-ed25519`.
    pub algorithm: String,
    /// `SHA256:`-prefixed fingerprint of the key.
    pub fingerprint: String,
}

/// Optional callbacks for low-level transport events.
///
/// Without a host key hook the presented key is accepted (with a warning);
/// install one to pin or verify keys. Hooks must not block.
#[derive(Clone, Default)]
pub struct EventHooks {
    pub(crate) banner: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub(crate) host_key: Option<Arc<dyn Fn(&HostKeyInfo) -> bool + Send + Sync>>,
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked with the server's pre-auth banner text.
    pub fn on_banner(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.banner = Some(Arc::new(hook));
        self
    }

    /// Invoked with the presented host key; return `false` to abort the
    /// handshake (surfaced to the caller as a connection failure).
    pub fn on_host_key(
        mut self,
        hook: impl Fn(&HostKeyInfo) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.host_key = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("banner", &self.banner.is_some())
            .field("host_key", &self.host_key.is_some())
            .finish()
    }
}

/// Ordered algorithm preferences per negotiation category.
///
/// Categories left empty fall back to the russh defaults. Names use the
/// standard SSH identifiers (`curve25519-sha256`,
/// `chacha20-poly1305@openssh.com`, `hmac-sha2-256`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlgorithmPrefs {
    pub kex: Vec<String>,
    pub cipher: Vec<String>,
    pub mac: Vec<String>,
}

impl AlgorithmPrefs {
    pub fn is_empty(&self) -> bool {
        self.kex.is_empty() && self.cipher.is_empty() && self.mac.is_empty()
    }

    /// Lower onto russh's negotiation table. Unknown names are an error;
    /// the handshake cannot be configured as requested.
    pub(crate) fn to_preferred(&self) -> Result<Preferred, String> {
        let mut preferred = Preferred::default();
        if !self.kex.is_empty() {
            preferred.kex = Cow::Owned(resolve_names(&self.kex, KEX_ALGORITHMS, "kex")?);
        }
        if !self.cipher.is_empty() {
            preferred.cipher = Cow::Owned(resolve_names(&self.cipher, CIPHERS, "cipher")?);
        }
        if !self.mac.is_empty() {
            preferred.mac = Cow::Owned(resolve_names(&self.mac, MACS, "mac")?);
        }
        Ok(preferred)
    }
}

fn resolve_names<T: Copy + AsRef<str>>(
    requested: &[String],
    known: &[T],
    category: &str,
) -> Result<Vec<T>, String> {
    requested
        .iter()
        .map(|name| {
            known
                .iter()
                .copied()
                .find(|candidate| candidate.as_ref() == name)
                .ok_or_else(|| format!("unsupported {} algorithm '{}'", category, name))
        })
        .collect()
}

/// Immutable parameters for one SSH session.
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub(crate) password: SecretString,
    pub prefs: AlgorithmPrefs,
    pub hooks: EventHooks,
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            prefs: AlgorithmPrefs::default(),
            hooks: EventHooks::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn algorithm_prefs(mut self, prefs: AlgorithmPrefs) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn event_hooks(mut self, hooks: EventHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check the fields a dial would trip over.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_host(&self.host)?;
        validation::validate_port(self.port)?;
        validation::validate_username(&self.username)
    }

    pub(crate) fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("prefs", &self.prefs)
            .field("hooks", &self.hooks)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
