//! Workspace root package.
//!
//! Exists to carry workspace-wide dev tooling (git hooks via `cargo-husky`).
//! All functionality lives in the `crates/` members.
