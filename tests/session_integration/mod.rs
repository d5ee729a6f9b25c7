//! End-to-end session tests against an in-process SSH server.
//!
//! Every test spawns its own server on an ephemeral loopback port with a
//! temporary directory as the remote root, so the suite needs no external
//! daemon and parallel tests never share state.


mod directory_tests;
mod lifecycle_tests;
