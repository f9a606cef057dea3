//! Putting executables on PATH.
//!
//! The system bin directory is tried first when one is configured and exists.
//! A permission failure there falls back to the user bin directory without
//! surfacing an error; only a failure in the user bin directory is fatal.
//! Targets are unlinked before writing so a file the OS still has mapped is
//! never overwritten in place.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::core::PgetError;
use crate::layout::Layout;
use crate::ui::Reporter;
use crate::utils::fs::{ensure_dir, is_permission_denied, make_executable, remove_file_if_exists};

fn write_target<F>(target: &Path, write: &F) -> Result<()>
where
    F: Fn(&Path) -> Result<()>,
{
    remove_file_if_exists(target)?;
    write(target)?;
    make_executable(target)
}

fn place_with<F>(layout: &Layout, name: &str, reporter: &dyn Reporter, write: F) -> Result<PathBuf>
where
    F: Fn(&Path) -> Result<()>,
{
    if let Some(system) = layout.system_executable(name)
        && system.parent().is_some_and(Path::is_dir)
    {
        match write_target(&system, &write) {
            Ok(()) => {
                // Lookup prefers the system copy, so a user copy would only be stale.
                if let Err(e) = remove_file_if_exists(&layout.user_executable(name)) {
                    tracing::debug!("Could not remove user copy of {name}: {e:#}");
                }
                return Ok(system);
            }
            Err(e) if is_permission_denied(&e) => {
                reporter.debug(&format!(
                    "No write access to {}, installing to {}",
                    system.display(),
                    layout.bin_dir().display()
                ));
            }
            Err(e) => return Err(e),
        }
    }

    let user = layout.user_executable(name);
    ensure_dir(&layout.bin_dir())?;
    write_target(&user, &write).map_err(|e| {
        if is_permission_denied(&e) {
            PgetError::PermissionDenied {
                operation: format!("install {name}"),
                path: user.display().to_string(),
            }
            .into()
        } else {
            e
        }
    })?;
    Ok(user)
}

/// Copy a built or downloaded binary into place.
pub fn place_binary(layout: &Layout, name: &str, source: &Path, reporter: &dyn Reporter) -> Result<PathBuf> {
    place_with(layout, name, reporter, |target| {
        std::fs::copy(source, target)
            .with_context(|| format!("Failed to copy {} to {}", source.display(), target.display()))?;
        Ok(())
    })
}

/// Write a launcher script into place.
pub fn place_wrapper(layout: &Layout, name: &str, content: &str, reporter: &dyn Reporter) -> Result<PathBuf> {
    place_with(layout, name, reporter, |target| {
        std::fs::write(target, content)
            .with_context(|| format!("Failed to write launcher {}", target.display()))
    })
}

/// Remove every installed copy of `name`. Returns how many were removed.
///
/// The system copy goes first. If it cannot be removed nothing else is
/// touched, since lookup would keep resolving to it.
pub fn remove_executables(layout: &Layout, name: &str, reporter: &dyn Reporter) -> Result<usize> {
    let mut removed = 0;
    if let Some(system) = layout.system_executable(name) {
        match remove_file_if_exists(&system) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) if is_permission_denied(&e) => {
                reporter.debug(&format!("No write access to {}", system.display()));
                return Err(PgetError::PermissionDenied {
                    operation: format!("remove {name}"),
                    path: system.display().to_string(),
                }
                .into());
            }
            Err(e) => return Err(e),
        }
    }
    if remove_file_if_exists(&layout.user_executable(name))? {
        removed += 1;
    }
    Ok(removed)
}
