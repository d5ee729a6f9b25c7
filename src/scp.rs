//! Client side of the SCP wire protocol.
//!
//! SCP is not a standalone protocol: the remote end runs `scp -t <dir>`
//! (sink, upload) or `scp -f <path>` (source, download) over an exec channel
//! and the two sides exchange one-line headers, raw file bytes, and
//! single-byte acknowledgements. Each transfer uses its own channel; nothing
//! here touches the SFTP sub-channel.
//!
//! Status bytes: `0x00` ok, `0x01` warning, `0x02` fatal — the latter two are
//! followed by a one-line message and both fail the transfer.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const SCP_OK: u8 = 0;
const SCP_WARNING: u8 = 1;
const SCP_ERROR: u8 = 2;

/// Transfer chunk size (64 KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound on a protocol header line; anything longer is garbage.
const MAX_HEADER_LENGTH: usize = 8 * 1024;

/// Failures inside one SCP exchange. The session layer logs these and folds
/// them into its boolean transfer results.
#[derive(Error, Debug)]
pub enum ScpError {
    #[error("local file {path}: {source}")]
    LocalIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("channel I/O: {0}")]
    ChannelIo(#[from] std::io::Error),

    #[error("remote rejected transfer: {0}")]
    RemoteStatus(String),

    #[error("malformed SCP data: {0}")]
    Protocol(String),
}

/// Exec command that puts the remote side in sink (receive) mode.
///
/// The server hands exec requests to the login shell, so the path is
/// shell-escaped: a directory with spaces must reach scp as one operand, and
/// metacharacters in a caller-supplied path must never be evaluated remotely.
pub(crate) fn sink_command(remote_dir: &str) -> String {
    format!("scp -t {}", shell_escape::unix::escape(Cow::Borrowed(remote_dir)))
}

/// Exec command that puts the remote side in source (send) mode.
pub(crate) fn source_command(remote_path: &str) -> String {
    format!(
        "scp -f {}",
        shell_escape::unix::escape(Cow::Borrowed(remote_path))
    )
}

/// Split a remote file path into the directory handed to `scp -t` and the
/// basename carried in the file header.
///
/// `"/tmp/remote.txt"` becomes `("/tmp", "remote.txt")`; a bare filename
/// uploads relative to the remote working directory (`"."`).
pub(crate) fn split_remote(remote_path: &str) -> (String, &str) {
    match remote_path.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name),
        Some((dir, name)) => (dir.to_string(), name),
        None => (".".to_string(), remote_path),
    }
}

/// Stream a local file into a remote sink (`scp -t`).
///
/// Drives the ack/header/data/ack exchange to completion and returns the
/// number of payload bytes sent. `mode` is masked to the standard permission
/// bits.
pub(crate) async fn upload<S>(
    stream: &mut S,
    local_path: &Path,
    remote_name: &str,
    mode: u32,
) -> Result<u64, ScpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // A slash or newline in the name would escape the header framing.
    if remote_name.is_empty() || remote_name.contains('/') || remote_name.contains('\n') {
        return Err(ScpError::Protocol(format!(
            "invalid remote file name {:?}",
            remote_name
        )));
    }

    let mut file = File::open(local_path).await.map_err(|e| ScpError::LocalIo {
        path: local_path.to_path_buf(),
        source: e,
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ScpError::LocalIo {
            path: local_path.to_path_buf(),
            source: e,
        })?
        .len();

    // Remote signals readiness before anything else.
    read_ack(stream).await?;

    let header = format!("C{:04o} {} {}\n", mode & 0o777, size, remote_name);
    stream.write_all(header.as_bytes()).await?;
    stream.flush().await?;
    read_ack(stream).await?;

    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut sent: u64 = 0;
    loop {
        let n = file.read(&mut buf).await.map_err(|e| ScpError::LocalIo {
            path: local_path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n]).await?;
        sent += n as u64;
    }

    // Terminator after the payload, then the remote's verdict.
    stream.write_all(&[SCP_OK]).await?;
    stream.flush().await?;
    read_ack(stream).await?;

    let _ = stream.shutdown().await;
    Ok(sent)
}

/// Stream a remote file from a source (`scp -f`) into a local file.
///
/// Creates or truncates `local_path`, applying the remote mode bits on Unix.
/// Returns the number of payload bytes received.
pub(crate) async fn download<S>(stream: &mut S, local_path: &Path) -> Result<u64, ScpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // The client drives source mode: each ack releases the next step.
    stream.write_all(&[SCP_OK]).await?;
    stream.flush().await?;

    let header = loop {
        let line = read_line(stream).await?;
        match line.as_bytes().first() {
            Some(b'C') => break line,
            // Time preservation header; irrelevant here but must be acked.
            Some(b'T') => {
                stream.write_all(&[SCP_OK]).await?;
                stream.flush().await?;
            }
            Some(&status) if status == SCP_WARNING || status == SCP_ERROR => {
                return Err(ScpError::RemoteStatus(line[1..].trim().to_string()));
            }
            Some(b'D') => {
                return Err(ScpError::Protocol(
                    "remote path is a directory, not a file".to_string(),
                ));
            }
            _ => {
                return Err(ScpError::Protocol(format!(
                    "unexpected transfer header {:?}",
                    line
                )));
            }
        }
    };
    let (mode, size, _name) = parse_file_header(&header)?;

    stream.write_all(&[SCP_OK]).await?;
    stream.flush().await?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(local_path)
        .await
        .map_err(|e| ScpError::LocalIo {
            path: local_path.to_path_buf(),
            source: e,
        })?;

    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let n = stream.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(ScpError::Protocol(format!(
                "remote closed with {} of {} bytes outstanding",
                remaining, size
            )));
        }
        file.write_all(&buf[..n]).await.map_err(|e| ScpError::LocalIo {
            path: local_path.to_path_buf(),
            source: e,
        })?;
        remaining -= n as u64;
    }
    file.flush().await.map_err(|e| ScpError::LocalIo {
        path: local_path.to_path_buf(),
        source: e,
    })?;

    #[cfg(unix)]
    tokio::fs::set_permissions(local_path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| ScpError::LocalIo {
            path: local_path.to_path_buf(),
            source: e,
        })?;
    #[cfg(not(unix))]
    let _ = mode;

    // Remote terminator for the payload, then our final ack.
    read_ack(stream).await?;
    stream.write_all(&[SCP_OK]).await?;
    stream.flush().await?;

    let _ = stream.shutdown().await;
    Ok(size)
}

/// Read one status byte; warnings and errors carry a trailing message line.
async fn read_ack<S>(stream: &mut S) -> Result<(), ScpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let status = stream.read_u8().await?;
    match status {
        SCP_OK => Ok(()),
        SCP_WARNING | SCP_ERROR => {
            let message = read_line(stream).await?;
            Err(ScpError::RemoteStatus(message.trim().to_string()))
        }
        other => Err(ScpError::Protocol(format!(
            "invalid status byte {:#04x}",
            other
        ))),
    }
}

async fn read_line<S>(stream: &mut S) -> Result<String, ScpError>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let byte = stream.read_u8().await?;
        if byte == b'\n' {
            break;
        }
        line.push(byte);
        if line.len() > MAX_HEADER_LENGTH {
            return Err(ScpError::Protocol("header line too long".to_string()));
        }
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Parse `C<mode> <size> <name>`.
fn parse_file_header(header: &str) -> Result<(u32, u64, String), ScpError> {
    let body = header
        .strip_prefix('C')
        .ok_or_else(|| ScpError::Protocol(format!("not a file header: {:?}", header)))?;
    let mut parts = body.splitn(3, ' ');

    let mode = parts
        .next()
        .and_then(|m| u32::from_str_radix(m, 8).ok())
        .ok_or_else(|| ScpError::Protocol(format!("bad mode in header {:?}", header)))?;
    let size = parts
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| ScpError::Protocol(format!("bad size in header {:?}", header)))?;
    let name = parts
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ScpError::Protocol(format!("missing name in header {:?}", header)))?;

    Ok((mode & 0o777, size, name.to_string()))
}
