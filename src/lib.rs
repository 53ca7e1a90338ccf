//! # resolv-direct
//!
//! Point the host resolver at a VPN's nameservers by rewriting
//! `/etc/resolv.conf` directly, and hand the host's own file back later.
//!
//! This is the fallback DNS backend for hosts with no resolver daemon to
//! talk to. It has to be crash-safe over a file the whole machine depends
//! on, using nothing but whole-file operations:
//!
//! - Generated files carry a marker, so ownership is re-derived from the
//!   file's content on every call.
//! - A foreign `resolv.conf` is moved to a backup path on takeover and
//!   moved back on revert, unless something else has replaced it since.
//! - Writes go through a temporary file and a rename. Where rename fails
//!   (a bind-mounted `resolv.conf` in a container), it is emulated with
//!   copy and delete, truncating instead of deleting if need be.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use resolv_direct::{DirectManager, OsConfig};
//!
//! let mut manager = DirectManager::new();
//!
//! // Take over (requires root).
//! let config = OsConfig::new(["100.100.100.100".parse()?])
//!     .with_search_domain("corp.example".parse()?);
//! manager.set_dns(&config)?;
//!
//! // What did the host use before us?
//! let base = manager.base_config()?;
//!
//! // Revert, either explicitly or on shutdown.
//! manager.set_dns(&OsConfig::default())?;
//! manager.close()?;
//! ```
//!
//! ## Testing against a private root
//!
//! [`DirectFs::with_prefix`] resolves every absolute path under a
//! directory, and any [`WholeFileFs`] implementation can be plugged in with
//! [`DirectManager::with_fs`].

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod direct;
pub mod error;
pub mod fs;
pub mod resolv_conf;
pub mod service;
pub mod util;

pub use config::{DomainError, Fqdn, Nameserver, NameserverError, OsConfig};
pub use direct::{DirectManager, ResolvPaths};
pub use error::{ResolverError, Result};
pub use fs::{DirectFs, WholeFileFs};
pub use resolv_conf::{ResolvOwner, decode, encode, resolv_owner};
pub use service::{NoService, ResolverService, SystemdResolved};
