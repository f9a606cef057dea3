//! Host platform detection and tool lookup.
//!
//! Release assets are named `<package>-<os>-<arch>` using the vocabulary
//! below, which differs from Rust's target naming (`macos` is `darwin`,
//! `aarch64` is `arm64`).

use std::fmt;
use std::path::PathBuf;

/// Operating system and architecture as they appear in release asset names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::new(normalize_os(std::env::consts::OS), normalize_arch(std::env::consts::ARCH))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

fn normalize_os(os: &str) -> String {
    match os {
        "macos" => "darwin".to_string(),
        other => other.to_lowercase(),
    }
}

fn normalize_arch(arch: &str) -> String {
    match arch {
        "x86_64" | "amd64" => "x86_64".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        "x86" | "i386" | "i686" => "i386".to_string(),
        other => other.to_string(),
    }
}

const fn is_windows() -> bool {
    cfg!(windows)
}

/// Resolve the first candidate found on PATH (or an explicit path that exists).
pub fn find_tool<S: AsRef<str>>(candidates: &[S]) -> Option<PathBuf> {
    candidates.iter().find_map(|candidate| which::which(candidate.as_ref()).ok())
}

/// Executable file name for a package on this host.
pub fn executable_name(name: &str) -> String {
    if is_windows() {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}
