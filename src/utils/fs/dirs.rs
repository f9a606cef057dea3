//! Directory and file-mode helpers used when placing packages on disk.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, skipping entries whose file name matches `skip`.
///
/// Skipped directories are not descended into. Symlinks are not copied.
pub fn copy_dir_filtered<F>(src: &Path, dst: &Path, skip: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    ensure_dir(dst)?;

    let walker = WalkDir::new(src).min_depth(1).into_iter().filter_entry(|entry| {
        entry.file_name().to_str().is_none_or(|name| !skip(name))
    });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", src.display()))?;
        let relative = entry.path().strip_prefix(src).with_context(|| {
            format!("Entry {} escaped {}", entry.path().display(), src.display())
        })?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
}

pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    copy_dir_filtered(src, dst, |_| false)
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove a file; a missing file is not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to remove file: {}", path.display()))
        }
    }
}

/// Add execute bits for everyone who can read the file.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("Failed to read permissions for {}", path.display()))?
        .permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Clear the read-only flag so the file can be replaced.
pub fn make_writable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("Failed to read permissions for {}", path.display()))?
        .permissions();
    if perms.readonly() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            perms.set_mode(perms.mode() | 0o200);
        }
        #[cfg(not(unix))]
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to make {} writable", path.display()))?;
    }
    Ok(())
}

/// True when an I/O permission failure appears anywhere in the error chain.
pub fn is_permission_denied(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|e| e.downcast_ref::<std::io::Error>())
        .any(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
}

/// True when the path is executable by its owner (always true off unix for existing files).
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).map(|m| m.is_file() && m.permissions().mode() & 0o100 != 0).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let test_dir = temp.path().join("a").join("b");

        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_on_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("file.txt");
        fs::write(&file_path, "content").unwrap();

        assert!(ensure_dir(&file_path).is_err());
    }

    #[test]
    fn test_copy_dir_filtered_skips_matching_entries() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("app")).unwrap();
        fs::create_dir_all(src.join(".git").join("objects")).unwrap();
        fs::create_dir_all(src.join("app").join("__pycache__")).unwrap();
        fs::write(src.join("app").join("main.py"), "print()").unwrap();
        fs::write(src.join("app").join("__pycache__").join("main.pyc"), "x").unwrap();
        fs::write(src.join(".git").join("HEAD"), "ref").unwrap();
        fs::write(src.join("README.md"), "readme").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_filtered(&src, &dst, |name| name == ".git" || name == "__pycache__").unwrap();

        assert!(dst.join("app").join("main.py").exists());
        assert!(dst.join("README.md").exists());
        assert!(!dst.join(".git").exists());
        assert!(!dst.join("app").join("__pycache__").exists());
    }

    #[test]
    fn test_remove_helpers_tolerate_missing() {
        let temp = tempdir().unwrap();
        remove_dir_all(&temp.path().join("missing")).unwrap();
        assert!(!remove_file_if_exists(&temp.path().join("missing.txt")).unwrap());

        let file = temp.path().join("present.txt");
        fs::write(&file, "x").unwrap();
        assert!(remove_file_if_exists(&file).unwrap());
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("tool");
        fs::write(&file, "#!/bin/sh\n").unwrap();
        assert!(!is_executable(&file));

        make_executable(&file).unwrap();
        assert!(is_executable(&file));
    }

    #[test]
    fn test_is_permission_denied() {
        let err = anyhow::Error::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            .context("copy failed");
        assert!(is_permission_denied(&err));
        assert!(!is_permission_denied(&anyhow::anyhow!("other")));
    }
}
