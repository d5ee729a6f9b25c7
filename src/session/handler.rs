use std::future::Future;

use russh::ChannelId;
use russh::client::{Handler, Session};
use russh::keys::{HashAlg, PublicKey};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{EventHooks, HostKeyInfo};
use crate::security_log;

/// Errors raised from inside the russh protocol loop.
///
/// Kept separate from [`crate::SessionError`]: the manager folds these into
/// its own variants with call-site context.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Host key for {host}:{port} rejected by verification hook")]
    HostKeyRejected { host: String, port: u16 },

    #[error(transparent)]
    Ssh(#[from] russh::Error),
}

/// Client-side protocol handler: host key decisions and server banners.
pub(crate) struct ClientHandler {
    host: String,
    port: u16,
    hooks: EventHooks,
}

impl ClientHandler {
    pub(crate) fn new(host: String, port: u16, hooks: EventHooks) -> Self {
        Self { host, port, hooks }
    }

    fn dispatch_banner(&self, banner: &str) {
        debug!(
            "Server banner from {}:{} ({} bytes)",
            self.host,
            self.port,
            banner.len()
        );
        if let Some(hook) = &self.hooks.banner {
            hook(banner);
        }
    }
}

impl Handler for ClientHandler {
    type Error = HandlerError;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let info = HostKeyInfo {
            algorithm: server_public_key.algorithm().as_str().to_string(),
            fingerprint: server_public_key.fingerprint(HashAlg::Sha256).to_string(),
        };
        let host = self.host.clone();
        let port = self.port;
        let hook = self.hooks.host_key.clone();

        async move {
            let accepted = match &hook {
                Some(verify) => verify(&info),
                None => {
                    // Trust-on-first-use without persistence; callers that
                    // need pinning install a host key hook.
                    warn!(
                        "No host key verification hook for {}:{}; accepting {} key {}",
                        host, port, info.algorithm, info.fingerprint
                    );
                    true
                }
            };
            security_log::log_host_key(&host, port, &info.algorithm, &info.fingerprint, accepted);

            if accepted {
                Ok(true)
            } else {
                Err(HandlerError::HostKeyRejected { host, port })
            }
        }
    }

    async fn auth_banner(
        &mut self,
        banner: &str,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.dispatch_banner(banner);
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}
