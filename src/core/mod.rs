//! Core engine for payload operations
//!
//! - **config**: payload.toml parsing and validation
//! - **context**: repository root, config and git handle, built once per run
//! - **error**: error types with exit codes and contextual help
//! - **logging**: tracing subscriber setup
//! - **pipeline**: sequences locate/archive/encrypt/manifest and the publish step
//! - **vcs**: git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod vcs;
