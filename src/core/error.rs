//! Error handling for pget
//!
//! Errors come in two layers:
//! - [`PgetError`] - the typed failure cases raised by the installer core
//! - [`ErrorContext`] - a wrapper that carries a suggested next action for CLI users
//!
//! Orchestration code returns [`anyhow::Result`] and raises [`PgetError`] values
//! with `.into()`, so callers can still `downcast_ref::<PgetError>()` to branch on
//! the failure class. [`PgetError::kind`] groups the variants into the coarse
//! classes the engine reasons about (not found, network, verification, tool
//! missing, permission, cancelled).
//!
//! # Examples
//!
//! ```rust,no_run
//! use pget_cli::core::{PgetError, user_friendly_error};
//!
//! let err = anyhow::Error::from(PgetError::ToolMissing {
//!     tool: "bazelisk".to_string(),
//!     purpose: "building from source".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Typed failures raised by the installer core.
///
/// Every variant owns plain strings so the enum is cheap to clone into an
/// [`ErrorContext`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PgetError {
    #[error("Package '{name}' not found in the '{org}' catalog")]
    PackageNotFound {
        name: String,
        org: String,
    },

    #[error("Repository '{name}' is not an installable program (no .program marker)")]
    NotInstallable {
        name: String,
    },

    #[error("Repository '{name}' is not installable with pget")]
    PackageIgnored {
        name: String,
    },

    #[error("Version '{version}' not found for package '{name}'")]
    VersionNotFound {
        name: String,
        version: String,
    },

    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        operation: String,
        reason: String,
    },

    #[error("Manifest signature is invalid: {reason}")]
    SignatureInvalid {
        reason: String,
    },

    #[error("Manifest is malformed: {reason}")]
    ManifestMalformed {
        reason: String,
    },

    #[error("Checksum mismatch for '{asset}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error("Asset '{asset}' is not listed in the release manifest")]
    AssetNotManifested {
        asset: String,
    },

    #[error("Required tool '{tool}' not found for {purpose}")]
    ToolMissing {
        tool: String,
        purpose: String,
    },

    #[error("Build failed for '{name}': {reason}")]
    BuildFailed {
        name: String,
        reason: String,
    },

    #[error("Source tree for '{name}' has no build descriptor (MODULE.bazel or BUILD)")]
    BuildDescriptorMissing {
        name: String,
    },

    #[error("Failed to extract source archive: {reason}")]
    ExtractionFailed {
        reason: String,
    },

    #[error("Permission denied for {operation}: {path}")]
    PermissionDenied {
        operation: String,
        path: String,
    },

    #[error("Installation of '{name}' cancelled")]
    InstallationCancelled {
        name: String,
    },

    #[error("'{name}' {version} is already installed")]
    AlreadyInstalled {
        name: String,
        version: String,
    },

    #[error("'{name}' is not installed")]
    NotInstalled {
        name: String,
    },

    #[error("Self-update failed: {reason}")]
    SelfUpdateFailed {
        reason: String,
        restored: bool,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("{message}")]
    Other {
        message: String,
    },
}

/// Coarse failure classes used for fallback and abort decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Network,
    VerificationFailed,
    ToolMissing,
    PermissionDenied,
    Cancelled,
    State,
    Other,
}

impl PgetError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PackageNotFound {
                ..
            }
            | Self::NotInstallable {
                ..
            }
            | Self::VersionNotFound {
                ..
            } => ErrorKind::NotFound,
            Self::NetworkError {
                ..
            } => ErrorKind::Network,
            Self::SignatureInvalid {
                ..
            }
            | Self::ManifestMalformed {
                ..
            }
            | Self::ChecksumMismatch {
                ..
            }
            | Self::AssetNotManifested {
                ..
            } => ErrorKind::VerificationFailed,
            Self::ToolMissing {
                ..
            } => ErrorKind::ToolMissing,
            Self::PermissionDenied {
                ..
            } => ErrorKind::PermissionDenied,
            Self::InstallationCancelled {
                ..
            } => ErrorKind::Cancelled,
            Self::AlreadyInstalled {
                ..
            }
            | Self::NotInstalled {
                ..
            }
            | Self::PackageIgnored {
                ..
            } => ErrorKind::State,
            _ => ErrorKind::Other,
        }
    }

    /// Verification failures must abort the package and are never downgraded.
    pub const fn is_verification_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::VerificationFailed)
    }
}

/// Error wrapper with an optional suggestion and details line for terminal output.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: PgetError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: PgetError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggested next action.
///
/// [`PgetError`] values anywhere in the chain are recognised; I/O permission
/// failures get a generic hint; everything else is wrapped as
/// [`PgetError::Other`] with the full context chain as its message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(pget_error) = error.chain().find_map(|e| e.downcast_ref::<PgetError>()) {
        let mut context = create_error_context(pget_error.clone());
        let top = error.to_string();
        if top != pget_error.to_string() && context.details.is_none() {
            context.details = Some(top);
        }
        return context;
    }

    let permission_denied = error
        .chain()
        .filter_map(|e| e.downcast_ref::<std::io::Error>())
        .any(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
    if permission_denied {
        return ErrorContext::new(PgetError::PermissionDenied {
            operation: "file access".to_string(),
            path: "unknown".to_string(),
        })
        .with_suggestion("Check ownership of ~/.pget or rerun with elevated permissions")
        .with_details(format!("{error:#}"));
    }

    if let Some(toml_error) = error.chain().find_map(|e| e.downcast_ref::<toml::de::Error>()) {
        return ErrorContext::new(PgetError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in ~/.pget/config.toml");
    }

    ErrorContext::new(PgetError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: PgetError) -> ErrorContext {
    let suggestion = match &error {
        PgetError::PackageNotFound {
            ..
        } => Some("Run 'pget search' to list available packages".to_string()),
        PgetError::NotInstallable {
            ..
        }
        | PgetError::PackageIgnored {
            ..
        } => Some("Only repositories marked as programs can be installed".to_string()),
        PgetError::VersionNotFound {
            name,
            ..
        } => Some(format!("Run 'pget versions {name}' to list published versions")),
        PgetError::NetworkError {
            ..
        } => Some("Check your internet connection and retry".to_string()),
        PgetError::SignatureInvalid {
            ..
        }
        | PgetError::ManifestMalformed {
            ..
        }
        | PgetError::ChecksumMismatch {
            ..
        }
        | PgetError::AssetNotManifested {
            ..
        } => Some(
            "The release could not be verified; do not install it and report the release to its maintainers"
                .to_string(),
        ),
        PgetError::ToolMissing {
            tool,
            ..
        } if tool == "gpg" => Some("Install GnuPG and make sure 'gpg' is on PATH".to_string()),
        PgetError::ToolMissing {
            ..
        } => Some("Install bazelisk or bazel, or retry with --script".to_string()),
        PgetError::BuildDescriptorMissing {
            ..
        }
        | PgetError::BuildFailed {
            ..
        } => Some("Retry with --script to install without building".to_string()),
        PgetError::ExtractionFailed {
            ..
        } => Some("Retry the installation; the download may have been truncated".to_string()),
        PgetError::PermissionDenied {
            ..
        } => Some("Check permissions on the install directory".to_string()),
        PgetError::AlreadyInstalled {
            name,
            ..
        } => Some(format!("Run 'pget update {name}' to upgrade")),
        PgetError::NotInstalled {
            name,
        } => Some(format!("Run 'pget install {name}' first")),
        PgetError::SelfUpdateFailed {
            restored: true,
            ..
        } => Some("The previous version was restored; retry the update later".to_string()),
        PgetError::SelfUpdateFailed {
            restored: false,
            ..
        } => Some("Reinstall pget manually from its release page".to_string()),
        PgetError::ConfigError {
            ..
        } => Some("Check the settings in ~/.pget/config.toml".to_string()),
        PgetError::InstallationCancelled {
            ..
        }
        | PgetError::Other {
            ..
        } => None,
    };

    let mut context = ErrorContext::new(error);
    context.suggestion = suggestion;
    context
}
