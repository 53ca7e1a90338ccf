//! Error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::{DomainError, NameserverError};

/// Result alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Errors returned by resolver operations.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A file-system operation failed for a reason other than the path
    /// being absent where absence is expected.
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        /// Operation that failed (`"read"`, `"rename"`, ...).
        op: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A `nameserver` or `search` keyword is not followed by whitespace.
    #[error("missing space after {keyword:?} in {line:?}")]
    MissingSpace {
        /// The keyword that was matched.
        keyword: &'static str,
        /// The offending line, comment-stripped.
        line: String,
    },

    /// A `nameserver` line does not hold a valid IP literal, optionally
    /// followed by an IPv6 zone.
    #[error("invalid nameserver in {line:?}: {source}")]
    InvalidNameserver {
        /// The offending line, comment-stripped.
        line: String,
        /// Parser error.
        #[source]
        source: NameserverError,
    },

    /// A `search` line does not hold a valid domain name.
    #[error("parsing search domains {line:?}: {source}")]
    InvalidSearchDomain {
        /// The offending line, comment-stripped.
        line: String,
        /// Validation error.
        #[source]
        source: DomainError,
    },

    /// The OS random source could not produce a temporary file name.
    #[error("random source unavailable: {0}")]
    Random(#[from] rand::Error),
}

impl ResolverError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied
        )
    }

    /// Returns `true` if the underlying I/O error is `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Returns `true` for malformed resolver file content.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(
            self,
            Self::MissingSpace { .. }
                | Self::InvalidNameserver { .. }
                | Self::InvalidSearchDomain { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_error_names_path() {
        let e = ResolverError::io(
            "read",
            "/etc/resolv.conf",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(e.is_permission_denied());
        assert!(!e.is_not_found());
        assert_eq!(e.to_string(), "failed to read /etc/resolv.conf: denied");
    }

    #[test]
    fn format_errors() {
        let e = ResolverError::MissingSpace {
            keyword: "nameserver",
            line: "nameserverX".into(),
        };
        assert!(e.is_format());
        assert!(!e.is_permission_denied());
    }
}
