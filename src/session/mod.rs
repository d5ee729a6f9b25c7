//! Lazy SSH session lifecycle and the operations bound to it.

mod handler;
mod manager;

pub use manager::SessionManager;
