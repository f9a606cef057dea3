//! Integration test suite for pget
//!
//! End-to-end flows against an in-memory catalog and a temporary install
//! root. Nothing here touches the network or the real `~/.pget`.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **install**: binary, script and failure scenarios
//! - **update**: update decisions and self-update rollback
//! - **cli**: the `pget` binary's argument handling and read-only commands

mod common;

mod cli;
mod install;
mod update;
