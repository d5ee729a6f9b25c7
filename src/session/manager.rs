//! Session manager: lazy connection, SCP transfer, SFTP file operations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::Disconnect;
use russh::client;
use russh_sftp::client::SftpSession;
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::remote_path;
use crate::scp::{self, ScpError};
use crate::security_log;

use super::handler::{ClientHandler, HandlerError};

/// Permission bits for remote files created by [`SessionManager::send`].
const DEFAULT_CREATE_MODE: u32 = 0o644;

/// One SSH session and the operations that run over it.
///
/// Construction performs no I/O. The transport is dialed and authenticated on
/// the first operation that needs it, and the SFTP sub-channel on the first
/// directory or file-metadata operation; both are reused afterwards.
///
/// Failure signaling is split by operation class: connection, authentication,
/// and channel setup problems are returned as [`SessionError`], while `send`,
/// `get`, `file_exists` and `delete_file` report operation-level failure as
/// `Ok(false)`. `list_directory` instead raises
/// [`SessionError::DirectoryNotFound`] when the listing fails.
///
/// One instance serves one logical caller; operations take `&mut self` and
/// are not meant to be interleaved from multiple tasks.
pub struct SessionManager {
    config: SessionConfig,
    transport: Option<client::Handle<ClientHandler>>,
    file_channel: Option<SftpSession>,
}

impl SessionManager {
    /// Create a manager with no live connection.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            transport: None,
            file_channel: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether an authenticated transport is currently held.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Dial and authenticate if not already connected.
    ///
    /// No-op when a transport is already held. On any failure the manager
    /// stays disconnected; no partial handle is retained.
    pub async fn ensure_connected(&mut self) -> Result<(), SessionError> {
        if self.transport.is_some() {
            return Ok(());
        }

        self.config
            .validate()
            .map_err(|e| self.connection_error(e.to_string()))?;
        let preferred = self
            .config
            .prefs
            .to_preferred()
            .map_err(|reason| self.connection_error(reason))?;

        let ssh_config = Arc::new(client::Config {
            preferred,
            inactivity_timeout: Some(Duration::from_secs(3600)),
            keepalive_interval: Some(Duration::from_secs(60)),
            keepalive_max: 3,
            ..Default::default()
        });

        let addr = self.config.addr();
        debug!("Connecting to {}", addr);
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                self.connection_error(format!(
                    "connection timed out after {:?}",
                    self.config.connect_timeout
                ))
            })?
            .map_err(|e| self.connection_error(e.to_string()))?;

        let handler = ClientHandler::new(
            self.config.host.clone(),
            self.config.port,
            self.config.hooks.clone(),
        );

        let mut handle = match timeout(
            self.config.connect_timeout,
            client::connect_stream(ssh_config, stream, handler),
        )
        .await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(HandlerError::HostKeyRejected { .. })) => {
                return Err(
                    self.connection_error("host key rejected by verification hook".to_string())
                );
            }
            Ok(Err(HandlerError::Ssh(e))) => {
                return Err(self.connection_error(format!("SSH handshake failed: {}", e)));
            }
            Err(_) => {
                return Err(self.connection_error(format!(
                    "SSH handshake timed out after {:?}",
                    self.config.connect_timeout
                )));
            }
        };

        // The handle is dropped on the error path, closing the half-open
        // session, so a failed authentication leaves no partial state.
        self.authenticate(&mut handle).await?;

        self.transport = Some(handle);
        info!("Session established for {}@{}", self.config.username, addr);
        Ok(())
    }

    /// Open the SFTP sub-channel if not already open.
    ///
    /// Requires an established transport; fails with
    /// [`SessionError::NotConnected`] otherwise. Directory and file-metadata
    /// operations call this after [`Self::ensure_connected`], so the
    /// precondition only trips on direct invocation.
    pub async fn ensure_file_channel(&mut self) -> Result<(), SessionError> {
        if self.file_channel.is_some() {
            return Ok(());
        }

        let handle = self.transport.as_ref().ok_or_else(|| {
            SessionError::NotConnected(
                "cannot prepare file channel before connection exists".to_string(),
            )
        })?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SessionError::Channel(format!("failed to open session channel: {}", e)))?;
        channel
            .request_subsystem(false, "sftp")
            .await
            .map_err(|e| SessionError::Channel(format!("SFTP subsystem request failed: {}", e)))?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SessionError::Channel(format!("SFTP initialization failed: {}", e)))?;

        security_log::log_file_channel_open(
            &self.config.host,
            self.config.port,
            &self.config.username,
        );
        self.file_channel = Some(sftp);
        Ok(())
    }

    /// Upload a local file to `remote_path`, creating it with mode `0644`.
    ///
    /// Connects first if needed (those failures raise). Returns `Ok(false)`
    /// when the transfer itself fails: unreadable local file, bad remote
    /// path, remote rejection.
    pub async fn send(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<bool, SessionError> {
        self.send_with_mode(local_path, remote_path, DEFAULT_CREATE_MODE)
            .await
    }

    /// [`Self::send`] with explicit permission bits for the remote file.
    pub async fn send_with_mode(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        mode: u32,
    ) -> Result<bool, SessionError> {
        self.ensure_connected().await?;
        let local_path = local_path.as_ref();

        let (remote_dir, remote_name) = scp::split_remote(remote_path);
        let result = async {
            let mut stream = self.open_exec_stream(&scp::sink_command(&remote_dir)).await?;
            scp::upload(&mut stream, local_path, remote_name, mode).await
        }
        .await;

        match result {
            Ok(bytes) => {
                info!(
                    "Sent {} ({} bytes) to {}:{}",
                    local_path.display(),
                    bytes,
                    self.config.host,
                    remote_path
                );
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Send of {} to {} failed: {}",
                    local_path.display(),
                    remote_path,
                    e
                );
                Ok(false)
            }
        }
    }

    /// Download `remote_path` into a local file, creating or overwriting it.
    ///
    /// Connects first if needed (those failures raise). Returns `Ok(false)`
    /// when the transfer itself fails.
    pub async fn get(
        &mut self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<bool, SessionError> {
        self.ensure_connected().await?;
        let local_path = local_path.as_ref();

        let result = async {
            let mut stream = self
                .open_exec_stream(&scp::source_command(remote_path))
                .await?;
            scp::download(&mut stream, local_path).await
        }
        .await;

        match result {
            Ok(bytes) => {
                info!(
                    "Fetched {}:{} ({} bytes) to {}",
                    self.config.host,
                    remote_path,
                    bytes,
                    local_path.display()
                );
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Fetch of {} to {} failed: {}",
                    remote_path,
                    local_path.display(),
                    e
                );
                Ok(false)
            }
        }
    }

    /// List `remote_dir`, returning full paths.
    ///
    /// Trailing `/` and `\` are stripped from `remote_dir` before listing.
    /// The `.` and `..` entries are dropped; every other entry name is joined
    /// to the trimmed directory with a single `/`. Order is whatever the
    /// server returned.
    ///
    /// Unlike the other file operations this raises on failure:
    /// [`SessionError::DirectoryNotFound`] covers a missing directory as well
    /// as permission or channel problems during the listing.
    pub async fn list_directory(&mut self, remote_dir: &str) -> Result<Vec<String>, SessionError> {
        self.ensure_connected().await?;
        self.ensure_file_channel().await?;
        let Some(sftp) = self.file_channel.as_ref() else {
            return Err(SessionError::Channel("file channel unavailable".to_string()));
        };

        let trimmed = remote_path::trim_trailing_separators(remote_dir);
        let read_dir = sftp.read_dir(trimmed.to_string()).await.map_err(|e| {
            SessionError::DirectoryNotFound {
                path: remote_dir.to_string(),
                reason: e.to_string(),
            }
        })?;

        let entries: Vec<String> = read_dir
            .into_iter()
            .map(|entry| entry.file_name())
            .filter(|name| !remote_path::is_self_or_parent(name))
            .map(|name| remote_path::join_entry(trimmed, &name))
            .collect();

        debug!("Listed {} entries under {}", entries.len(), trimmed);
        Ok(entries)
    }

    /// Whether `remote_path` exists.
    ///
    /// Returns `Ok(false)` both when the path is absent and when the check
    /// itself fails; the two are not distinguished. Connection and channel
    /// setup failures still raise.
    pub async fn file_exists(&mut self, remote_path: &str) -> Result<bool, SessionError> {
        self.ensure_connected().await?;
        self.ensure_file_channel().await?;
        let Some(sftp) = self.file_channel.as_ref() else {
            return Err(SessionError::Channel("file channel unavailable".to_string()));
        };

        match sftp.try_exists(remote_path.to_string()).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                debug!("Existence check for {} failed: {}", remote_path, e);
                Ok(false)
            }
        }
    }

    /// Delete `remote_path`. Returns `Ok(false)` when the server refuses,
    /// typically a missing file or insufficient permissions.
    pub async fn delete_file(&mut self, remote_path: &str) -> Result<bool, SessionError> {
        self.ensure_connected().await?;
        self.ensure_file_channel().await?;
        let Some(sftp) = self.file_channel.as_ref() else {
            return Err(SessionError::Channel("file channel unavailable".to_string()));
        };

        match sftp.remove_file(remote_path.to_string()).await {
            Ok(()) => {
                info!("Deleted {}:{}", self.config.host, remote_path);
                Ok(true)
            }
            Err(e) => {
                warn!("Delete of {} failed: {}", remote_path, e);
                Ok(false)
            }
        }
    }

    /// Close the session.
    ///
    /// Idempotent: returns `true` when there is nothing to close, including
    /// on an instance that never connected. Returns `false` only when a live
    /// transport fails to close cleanly. Both handles are cleared either way,
    /// so a later operation reconnects from scratch instead of reusing a
    /// sub-channel bound to a dead transport.
    pub async fn disconnect(&mut self) -> bool {
        self.file_channel = None;
        match self.transport.take() {
            None => true,
            Some(handle) => {
                let result = handle
                    .disconnect(Disconnect::ByApplication, "session closed", "en")
                    .await;
                security_log::log_disconnect(
                    &self.config.host,
                    self.config.port,
                    &self.config.username,
                );
                match result {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Disconnect from {} reported: {}", self.config.addr(), e);
                        false
                    }
                }
            }
        }
    }

    /// Open an exec channel running `command` and hand back its byte stream.
    async fn open_exec_stream(
        &self,
        command: &str,
    ) -> Result<impl AsyncRead + AsyncWrite + Unpin + use<>, ScpError> {
        let handle = self
            .transport
            .as_ref()
            .ok_or_else(|| ScpError::Protocol("transport not established".to_string()))?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ScpError::ChannelIo(std::io::Error::other(e)))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| ScpError::ChannelIo(std::io::Error::other(e)))?;
        Ok(channel.into_stream())
    }

    async fn authenticate(
        &self,
        handle: &mut client::Handle<ClientHandler>,
    ) -> Result<(), SessionError> {
        let host = &self.config.host;
        let port = self.config.port;
        let username = &self.config.username;

        security_log::log_auth_attempt(host, port, username);

        // The plaintext credential is exposed only for this call.
        let outcome = handle
            .authenticate_password(username, self.config.password.expose_secret())
            .await;

        match outcome {
            Ok(result) if result.success() => {
                security_log::log_auth_success(host, port, username);
                Ok(())
            }
            Ok(_) => {
                let reason = "rejected by server";
                security_log::log_auth_failure(host, port, username, reason);
                Err(SessionError::AuthenticationFailed {
                    username: username.clone(),
                    reason: reason.to_string(),
                })
            }
            Err(e) => {
                let reason = e.to_string();
                security_log::log_auth_failure(host, port, username, &reason);
                Err(SessionError::AuthenticationFailed {
                    username: username.clone(),
                    reason,
                })
            }
        }
    }

    fn connection_error(&self, reason: impl Into<String>) -> SessionError {
        SessionError::ConnectionFailed {
            host: self.config.host.clone(),
            port: self.config.port,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.transport.is_some())
            .field("file_channel", &self.file_channel.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.file_channel = None;
        if let Some(handle) = self.transport.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(rt) => {
                    rt.spawn(async move {
                        let _ = handle
                            .disconnect(Disconnect::ByApplication, "session dropped", "en")
                            .await;
                    });
                }
                Err(_) => {
                    tracing::debug!("Session dropped without a Tokio runtime; disconnect skipped");
                }
            }
        }
    }
}
