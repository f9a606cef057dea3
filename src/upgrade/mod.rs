//! Updating the `pget` executable itself.
//!
//! The running executable cannot be deleted on every platform, and
//! overwriting it in place risks corrupting pages the OS still has mapped. The
//! update therefore runs in this order:
//!
//! ```text
//! 1. resolve target    latest release, or the default branch with --edge
//! 2. short-circuit     already at the target (never in edge mode)
//! 3. obtain binary     download + verify, or build from source for edge
//! 4. swap              make writable, back up, unlink, copy, chmod
//! 5. commit            record the new version, delete the backup
//!    rollback          on a failed swap, copy the backup back
//! ```
//!
//! Nothing in steps 1-3 touches the installed executable.

pub mod backup;
pub mod self_updater;

pub use backup::BackupManager;
pub use self_updater::{SELF_NAME, SelfUpdateOutcome, SelfUpdater, replace_executable};
