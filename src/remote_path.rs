//! Remote path string helpers.
//!
//! Remote paths are plain strings, never `std::path::Path`: the remote side
//! is assumed POSIX and local platform path semantics must not leak into it.

/// Strip every trailing `/` and `\` from a directory path.
///
/// `"/var/log/"` becomes `"/var/log"`, `"C:\\drop\\"` becomes `"C:\\drop"`.
/// The filesystem root `"/"` trims to the empty string; joining an entry onto
/// it still yields a correct absolute path.
pub fn trim_trailing_separators(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
}

/// Join a trimmed directory and an entry name with a single `/`.
pub fn join_entry(dir: &str, name: &str) -> String {
    format!("{}/{}", dir, name)
}

/// True for the self (`.`) and parent (`..`) directory entries.
pub fn is_self_or_parent(name: &str) -> bool {
    name == "." || name == ".."
}
