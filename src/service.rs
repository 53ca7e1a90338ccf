//! Coordination with a resolver-management service that may be running
//! alongside us.
//!
//! If `/etc/resolv.conf` was taken over from `systemd-resolved`, the daemon
//! notices the new file on restart and starts using it. Both the probe and
//! the restart are best effort: a host without the service, without
//! `systemctl`, or on another platform reports "inactive".

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// A resolver daemon that should be kicked after `resolv.conf` changes.
pub trait ResolverService {
    /// Returns `true` if the service is known to be running. Any doubt
    /// means `false`.
    fn is_active(&self) -> bool;

    /// Asks the service to restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the restart could not be requested.
    fn restart(&self) -> io::Result<()>;
}

/// `systemd-resolved`, driven through `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdResolved {
    unit: String,
}

impl SystemdResolved {
    /// Default unit name.
    pub const UNIT: &'static str = "systemd-resolved.service";

    /// Targets `systemd-resolved.service`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unit: Self::UNIT.to_string(),
        }
    }

    /// Targets a custom unit name.
    #[must_use]
    pub fn with_unit(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }

    /// Returns the unit name.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl Default for SystemdResolved {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverService for SystemdResolved {
    fn is_active(&self) -> bool {
        if !cfg!(target_os = "linux") || !systemctl_available() {
            return false;
        }
        // `is-active` exits with 3 if the unit is not active.
        Command::new("systemctl")
            .args(["is-active", "--quiet", self.unit.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn restart(&self) -> io::Result<()> {
        let status = Command::new("systemctl")
            .args(["restart", self.unit.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "systemctl restart {} exited with {status}",
                self.unit
            )))
        }
    }
}

/// No service to coordinate with.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoService;

impl ResolverService for NoService {
    fn is_active(&self) -> bool {
        false
    }

    fn restart(&self) -> io::Result<()> {
        Ok(())
    }
}

/// `systemd-resolved` is never installed without `systemctl`.
fn systemctl_available() -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| is_executable(&dir.join("systemctl")))
    })
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
