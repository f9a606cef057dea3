//! Source snapshot extraction.
//!
//! GitHub tarballs put everything under one `<org>-<repo>-<sha>/` directory.
//! Extraction drops that first path component so the destination directory
//! is the package root. Entries that would land outside the destination are
//! rejected.

use anyhow::Result;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::core::PgetError;

fn extraction_error(reason: impl Into<String>) -> anyhow::Error {
    PgetError::ExtractionFailed {
        reason: reason.into(),
    }
    .into()
}

/// Extract a `.tar.gz` snapshot into `dest`, stripping the wrapper directory.
///
/// Returns the number of entries written. An archive that is unreadable or
/// contains nothing below its wrapper fails with
/// [`PgetError::ExtractionFailed`].
pub fn extract_source_tarball(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).map_err(|e| {
        extraction_error(format!("cannot open {}: {e}", archive.display()))
    })?;
    let count = extract_tar_with_strip(GzDecoder::new(BufReader::new(file)), dest, 1)?;
    if count == 0 {
        return Err(extraction_error(format!("{} is empty", archive.display())));
    }
    Ok(count)
}

fn strip_path(path: &Path, strip_components: usize) -> Result<Option<PathBuf>> {
    let components: Vec<_> = path.components().collect();
    if components.len() <= strip_components {
        return Ok(None);
    }
    let mut stripped = PathBuf::new();
    for component in &components[strip_components..] {
        match component {
            Component::Normal(part) => stripped.push(part),
            Component::CurDir => {}
            _ => {
                return Err(extraction_error(format!(
                    "path traversal detected in archive: {}",
                    path.display()
                )));
            }
        }
    }
    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}

pub fn extract_tar_with_strip<R: Read>(reader: R, dest: &Path, strip_components: usize) -> Result<usize> {
    std::fs::create_dir_all(dest)
        .map_err(|e| extraction_error(format!("cannot create {}: {e}", dest.display())))?;
    let dest_canonical = dest
        .canonicalize()
        .map_err(|e| extraction_error(format!("cannot resolve {}: {e}", dest.display())))?;

    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|e| extraction_error(format!("failed to read tar: {e}")))?;

    let mut count = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| extraction_error(format!("failed to read tar entry: {e}")))?;
        let entry_type = entry.header().entry_type();
        if !(entry_type.is_file() || entry_type.is_dir() || entry_type.is_symlink()) {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| extraction_error(format!("invalid path in tar: {e}")))?
            .into_owned();
        let Some(stripped) = strip_path(&path, strip_components)? else {
            continue;
        };
        let outpath = dest.join(&stripped);

        if entry_type.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            count += 1;
            continue;
        }

        let parent = outpath.parent().unwrap_or(dest);
        std::fs::create_dir_all(parent)?;
        let parent_canonical = parent.canonicalize()?;
        if !parent_canonical.starts_with(&dest_canonical) {
            return Err(extraction_error(format!(
                "{} escapes the destination directory",
                stripped.display()
            )));
        }

        entry
            .unpack(&outpath)
            .map_err(|e| extraction_error(format!("failed to extract {}: {e}", stripped.display())))?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::source_tarball;
    use tempfile::TempDir;

    fn write_archive(temp: &TempDir, bytes: &[u8]) -> PathBuf {
        let path = temp.path().join("snapshot.tar.gz");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_strips_wrapper_directory() {
        let temp = TempDir::new().unwrap();
        let bytes = source_tarball(
            "pynosaur-foo-abc123",
            &[("MODULE.bazel", b"module()"), ("app/main.py", b"def main(): pass")],
        )
        .unwrap();
        let archive = write_archive(&temp, &bytes);
        let dest = temp.path().join("src");

        let count = extract_source_tarball(&archive, &dest).unwrap();
        assert!(count >= 2);
        assert!(dest.join("MODULE.bazel").is_file());
        assert!(dest.join("app/main.py").is_file());
        assert!(!dest.join("pynosaur-foo-abc123").exists());
    }

    #[test]
    fn test_empty_after_unwrapping_fails() {
        let temp = TempDir::new().unwrap();
        let bytes = source_tarball("pynosaur-foo-abc123", &[]).unwrap();
        let archive = write_archive(&temp, &bytes);

        let err = extract_source_tarball(&archive, &temp.path().join("src")).unwrap_err();
        assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_corrupt_archive_fails() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(&temp, b"definitely not gzip");

        let err = extract_source_tarball(&archive, &temp.path().join("src")).unwrap_err();
        assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_strip_path_rejects_traversal() {
        assert!(strip_path(Path::new("wrap/../../etc/passwd"), 1).is_err());
        assert_eq!(strip_path(Path::new("wrap"), 1).unwrap(), None);
        assert_eq!(strip_path(Path::new("wrap/a/b"), 1).unwrap(), Some(PathBuf::from("a/b")));
    }
}
