//! Direct `/etc/resolv.conf` management.
//!
//! The generated file carries a marker comment, so ownership is always
//! re-derived from the file's content rather than from any saved state.
//! A foreign file found at takeover is moved aside to a backup path and
//! moved back on revert or shutdown.

use crate::config::OsConfig;
use crate::error::{ResolverError, Result};
use crate::fs::{DirectFs, WholeFileFs};
use crate::resolv_conf::{self, resolv_owner};
use crate::service::{ResolverService, SystemdResolved};
use crate::util::{random_hex, running_as_gui_desktop_user};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Live resolver configuration path.
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Where the pre-takeover `resolv.conf` is kept.
pub const BACKUP_CONF: &str = "/etc/resolv.pre-tailscale-backup.conf";

/// Left behind by older releases that symlinked `resolv.conf`.
pub const LEGACY_CONF: &str = "/etc/resolv.tailscale.conf";

/// Mode used for every file this crate writes.
const FILE_MODE: u32 = 0o644;

/// Random bytes in a temporary file name.
const TMP_RANDOM_BYTES: usize = 12;

/// Paths managed by [`DirectManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvPaths {
    /// The live resolver file.
    pub resolv: PathBuf,
    /// Backup of the foreign file found at takeover.
    pub backup: PathBuf,
    /// Legacy artifact removed on [`close`](DirectManager::close).
    pub legacy: PathBuf,
}

impl Default for ResolvPaths {
    fn default() -> Self {
        Self {
            resolv: PathBuf::from(RESOLV_CONF),
            backup: PathBuf::from(BACKUP_CONF),
            legacy: PathBuf::from(LEGACY_CONF),
        }
    }
}

/// What currently sits at the primary path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrimaryState {
    Missing,
    Foreign,
    Owned,
}

/// Replaces `/etc/resolv.conf` with a generated file, backing up the file
/// it replaces.
///
/// This way of configuring DNS does not react to the VPN interface
/// disappearing. The caller must call [`close`](Self::close) before
/// shutdown, or on the next start after a crash.
///
/// Calls must be serialised by the caller; no file locks are taken.
///
/// # Example
///
/// ```rust,ignore
/// use resolv_direct::{DirectManager, OsConfig};
///
/// let mut manager = DirectManager::new();
/// manager.set_dns(&OsConfig::new(["100.100.100.100".parse()?]))?;
/// // ...
/// manager.close()?;
/// ```
pub struct DirectManager {
    fs: Box<dyn WholeFileFs>,
    service: Box<dyn ResolverService>,
    desktop_session: fn() -> bool,
    paths: ResolvPaths,
    /// Set once a real rename fails. Some container runtimes bind-mount
    /// `/etc/resolv.conf` from another file system, so rename(2) between it
    /// and `/etc` fails while reads, writes and truncation still work.
    rename_broken: bool,
}

impl DirectManager {
    /// Creates a manager for the real OS, coordinating with
    /// `systemd-resolved`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fs(DirectFs::new())
    }

    /// Creates a manager operating through `fs`.
    ///
    /// Coordinates with `systemd-resolved` unless another service is set
    /// with [`service`](Self::service).
    #[must_use]
    pub fn with_fs(fs: impl WholeFileFs + 'static) -> Self {
        Self {
            fs: Box::new(fs),
            service: Box::new(SystemdResolved::new()),
            desktop_session: running_as_gui_desktop_user,
            paths: ResolvPaths::default(),
            rename_broken: false,
        }
    }

    /// Overrides the service restarted after changes.
    #[must_use]
    pub fn service(mut self, service: impl ResolverService + 'static) -> Self {
        self.service = Box::new(service);
        self
    }

    /// Overrides the "non-root user in a desktop session" check.
    #[must_use]
    pub fn desktop_session(mut self, check: fn() -> bool) -> Self {
        self.desktop_session = check;
        self
    }

    /// Overrides the managed paths.
    #[must_use]
    pub fn paths(mut self, paths: ResolvPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Returns the managed paths.
    #[must_use]
    pub const fn resolv_paths(&self) -> &ResolvPaths {
        &self.paths
    }

    /// Returns `true` once renames are being emulated.
    #[must_use]
    pub const fn rename_broken(&self) -> bool {
        self.rename_broken
    }

    /// Split DNS is not possible with a single whole-machine file.
    #[must_use]
    pub const fn supports_split_dns(&self) -> bool {
        false
    }

    /// Applies `config`, or reverts to the host's configuration if it is
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Io`] if the backup, write or restore fails,
    /// or [`ResolverError::Random`] if no temporary name can be generated.
    pub fn set_dns(&mut self, config: &OsConfig) -> Result<()> {
        let changed = if config.is_zero() {
            self.restore()?
        } else {
            self.take_ownership()?;
            let content = resolv_conf::encode(&config.nameservers, &config.search_domains);
            let resolv = self.paths.resolv.clone();
            self.atomic_write(&resolv, content.as_bytes())?;
            tracing::info!(
                nameservers = config.nameservers.len(),
                search_domains = config.search_domains.len(),
                path = %resolv.display(),
                "Wrote resolv.conf"
            );
            true
        };

        // Only kick the service when something changed; restarting it for
        // a no-op revert causes a needless DNS outage.
        if changed {
            self.restart_service();
        }
        Ok(())
    }

    /// Returns the DNS configuration the host had before takeover.
    ///
    /// Reads the backup while the primary is owned, the primary otherwise.
    /// A missing file yields a zero configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Io`] if the file cannot be read, or a
    /// format error if it cannot be parsed.
    pub fn base_config(&self) -> Result<OsConfig> {
        let path = if self.is_owned()? {
            &self.paths.backup
        } else {
            &self.paths.resolv
        };
        match self.fs.read_file(path) {
            Ok(bytes) => resolv_conf::decode(&String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No base resolv.conf");
                Ok(OsConfig::default())
            }
            Err(e) => Err(ResolverError::io("read", path, e)),
        }
    }

    /// Hands `resolv.conf` back to the host.
    ///
    /// Safe to call repeatedly and on startup after a crash.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Io`] if the state cannot be inspected or the
    /// backup cannot be moved back.
    pub fn close(&mut self) -> Result<()> {
        // Older releases symlinked resolv.conf to this file.
        let legacy = self.paths.legacy.clone();
        self.remove_quietly(&legacy);

        if self.restore()? {
            self.restart_service();
        }
        Ok(())
    }

    /// Returns `true` if the primary path is a regular file carrying the
    /// ownership marker.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Io`] for failures other than the file being
    /// absent.
    pub fn is_owned(&self) -> Result<bool> {
        Ok(self.primary_state()? == PrimaryState::Owned)
    }

    fn primary_state(&self) -> Result<PrimaryState> {
        let path = &self.paths.resolv;
        let Some(regular) = self.exists(path)? else {
            return Ok(PrimaryState::Missing);
        };
        if !regular {
            return Ok(PrimaryState::Foreign);
        }
        let content = self
            .fs
            .read_file(path)
            .map_err(|e| ResolverError::io("read", path, e))?;
        if resolv_conf::is_generated(&content) {
            Ok(PrimaryState::Owned)
        } else {
            Ok(PrimaryState::Foreign)
        }
    }

    /// Moves a foreign primary aside before it gets overwritten.
    fn take_ownership(&mut self) -> Result<()> {
        match self.primary_state()? {
            PrimaryState::Missing => {
                // Nothing to back up. An old backup would be wrong to
                // restore later.
                let backup = self.paths.backup.clone();
                self.remove_quietly(&backup);
                Ok(())
            }
            PrimaryState::Owned => {
                tracing::debug!("resolv.conf already owned, keeping existing backup");
                Ok(())
            }
            PrimaryState::Foreign => {
                let ResolvPaths { resolv, backup, .. } = self.paths.clone();
                if let Ok(content) = self.fs.read_file(&resolv) {
                    tracing::debug!(
                        owner = resolv_owner(&content).map_or("unknown", |o| o.as_str()),
                        "Taking over resolv.conf"
                    );
                }
                self.rename(&resolv, &backup)?;
                tracing::info!(backup = %backup.display(), "Backed up resolv.conf");
                Ok(())
            }
        }
    }

    /// Moves the backup back into place. Returns whether it did.
    fn restore(&mut self) -> Result<bool> {
        let ResolvPaths { resolv, backup, .. } = self.paths.clone();
        if self.exists(&backup)?.is_none() {
            tracing::debug!("No resolv.conf backup, nothing to restore");
            return Ok(false);
        }

        if self.primary_state()? == PrimaryState::Foreign {
            // Someone else has taken over since; our backup is stale.
            tracing::info!(
                backup = %backup.display(),
                "resolv.conf replaced by another manager, discarding backup"
            );
            self.remove_quietly(&backup);
            return Ok(false);
        }

        self.rename(&backup, &resolv)?;
        tracing::info!(path = %resolv.display(), "Restored resolv.conf from backup");
        Ok(true)
    }

    /// Writes `data` to `path` via a temporary file and a rename, so
    /// readers never see a partial file.
    fn atomic_write(&mut self, path: &Path, data: &[u8]) -> Result<()> {
        let mut tmp = OsString::from(path.as_os_str());
        tmp.push(format!(".{}.tmp", random_hex(TMP_RANDOM_BYTES)?));
        let tmp = PathBuf::from(tmp);

        let result = self
            .fs
            .write_file(&tmp, data, FILE_MODE)
            .map_err(|e| ResolverError::io("write", &tmp, e))
            .and_then(|()| self.rename(&tmp, path));

        // Normally already gone; this catches failed writes and renames.
        if let Err(e) = self.fs.remove(&tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %tmp.display(),
                    error = %e,
                    "Failed to remove temporary file"
                );
            }
        }
        result
    }

    /// Renames `from` to `to`, falling back to copy and delete once a real
    /// rename has failed.
    ///
    /// If `from` cannot be removed after the copy it is truncated instead,
    /// so no stale duplicate is left behind.
    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        if !self.rename_broken {
            match self.fs.rename(from, to) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        from = %from.display(),
                        to = %to.display(),
                        error = %e,
                        "Rename failed, falling back to copy+delete"
                    );
                    self.rename_broken = true;
                }
            }
        }

        let bytes = self
            .fs
            .read_file(from)
            .map_err(|e| ResolverError::io("read for rename", from, e))?;
        self.fs
            .write_file(to, &bytes, FILE_MODE)
            .map_err(|e| ResolverError::io("write for rename", to, e))?;

        if let Err(e) = self.fs.remove(from) {
            tracing::warn!(path = %from.display(), error = %e, "Remove failed, truncating instead");
            self.fs
                .truncate(from)
                .map_err(|e| ResolverError::io("truncate", from, e))?;
        }
        Ok(())
    }

    /// `Some(is_regular)` if `path` exists, `None` if it does not.
    fn exists(&self, path: &Path) -> Result<Option<bool>> {
        match self.fs.stat(path) {
            Ok(regular) => Ok(Some(regular)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ResolverError::io("stat", path, e)),
        }
    }

    fn remove_quietly(&self, path: &Path) {
        match self.fs.remove(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
        }
    }

    /// Best-effort restart of the resolver service. Skipped for desktop
    /// users, where it would trigger an authentication prompt.
    fn restart_service(&self) {
        if !self.service.is_active() || (self.desktop_session)() {
            return;
        }
        match self.service.restart() {
            Ok(()) => tracing::info!("Restarted resolver service"),
            Err(e) => tracing::debug!(error = %e, "Failed to restart resolver service"),
        }
    }
}

impl Default for DirectManager {
    fn default() -> Self {
        Self::new()
    }
}
