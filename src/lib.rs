//! Minimal SSH session wrapper.
//!
//! One [`SessionManager`] owns at most one connection to a remote host.
//! Connection and password authentication happen lazily on first use, an
//! SFTP sub-channel lazily on the first directory or file-metadata
//! operation. On top of that sit five operations: [`SessionManager::send`]
//! and [`SessionManager::get`] (SCP streaming copy),
//! [`SessionManager::list_directory`], [`SessionManager::file_exists`] and
//! [`SessionManager::delete_file`] (SFTP), plus explicit and drop-time
//! disconnect.
//!
//! ```no_run
//! use skiff::{SessionConfig, SessionManager};
//!
//! # async fn demo() -> Result<(), skiff::SessionError> {
//! let config = SessionConfig::new("example.com", "deploy", "secret").port(22);
//! let mut session = SessionManager::new(config);
//!
//! if session.send("build/app.tar.gz", "/srv/incoming/app.tar.gz").await? {
//!     for path in session.list_directory("/srv/incoming/").await? {
//!         println!("{path}");
//!     }
//! }
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod validation;

pub(crate) mod remote_path;
pub(crate) mod scp;
pub(crate) mod security_log;

pub use config::{AlgorithmPrefs, EventHooks, HostKeyInfo, SessionConfig};
pub use error::SessionError;
pub use session::SessionManager;
