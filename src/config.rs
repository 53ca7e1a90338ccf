//! Desired DNS configuration.

use std::fmt;
use std::net::{AddrParseError, IpAddr};
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of a domain name, excluding the trailing dot.
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

/// DNS settings the host should use.
///
/// A configuration with no nameservers and no search domains is *zero*,
/// meaning "stop managing DNS and revert to the host default".
///
/// # Example
///
/// ```
/// use resolv_direct::{Fqdn, OsConfig};
///
/// let config = OsConfig::new(["100.100.100.100".parse().unwrap()])
///     .with_search_domain("corp.example".parse::<Fqdn>().unwrap());
///
/// assert!(!config.is_zero());
/// assert!(OsConfig::default().is_zero());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsConfig {
    /// Resolver addresses, in preference order.
    pub nameservers: Vec<Nameserver>,

    /// Search domains, in order.
    pub search_domains: Vec<Fqdn>,
}

impl OsConfig {
    /// Creates a config with the given nameservers and no search domains.
    #[must_use]
    pub fn new(nameservers: impl IntoIterator<Item = Nameserver>) -> Self {
        Self {
            nameservers: nameservers.into_iter().collect(),
            search_domains: Vec::new(),
        }
    }

    /// Appends a search domain.
    #[must_use]
    pub fn with_search_domain(mut self, domain: Fqdn) -> Self {
        self.search_domains.push(domain);
        self
    }

    /// Returns `true` if both sequences are empty.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.nameservers.is_empty() && self.search_domains.is_empty()
    }
}

/// Reasons a string is not a valid nameserver address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameserverError {
    /// The address part is not an IP literal.
    #[error(transparent)]
    Addr(#[from] AddrParseError),

    /// A `%` is not followed by a zone name.
    #[error("empty zone")]
    EmptyZone,

    /// The zone holds whitespace.
    #[error("invalid zone {0:?}")]
    InvalidZone(String),

    /// Zones only exist for IPv6 addresses.
    #[error("zone on IPv4 address")]
    ZoneOnIpv4,
}

/// A nameserver address, with the scope zone of a link-local IPv6
/// address (`fe80::1%wlan0`) when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nameserver {
    /// The IP address.
    pub addr: IpAddr,

    /// Interface zone, without the `%`.
    pub zone: Option<String>,
}

impl Nameserver {
    /// Creates a nameserver with a scope zone.
    #[must_use]
    pub fn with_zone(addr: IpAddr, zone: impl Into<String>) -> Self {
        Self {
            addr,
            zone: Some(zone.into()),
        }
    }
}

impl From<IpAddr> for Nameserver {
    fn from(addr: IpAddr) -> Self {
        Self { addr, zone: None }
    }
}

impl FromStr for Nameserver {
    type Err = NameserverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((addr, zone)) = s.split_once('%') else {
            return Ok(Self::from(s.parse::<IpAddr>()?));
        };
        let addr: IpAddr = addr.parse()?;
        if addr.is_ipv4() {
            return Err(NameserverError::ZoneOnIpv4);
        }
        if zone.is_empty() {
            return Err(NameserverError::EmptyZone);
        }
        if zone.contains(char::is_whitespace) {
            return Err(NameserverError::InvalidZone(zone.to_string()));
        }
        Ok(Self::with_zone(addr, zone))
    }
}

impl fmt::Display for Nameserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.zone {
            Some(zone) => write!(f, "{}%{zone}", self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

/// Reasons a string is not a valid domain name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The name is empty or contains an empty label (`a..b`).
    #[error("empty label")]
    EmptyLabel,

    /// A label is longer than 63 bytes.
    #[error("label {0:?} is longer than 63 bytes")]
    LabelTooLong(String),

    /// The whole name is longer than 253 bytes.
    #[error("name is longer than 253 bytes")]
    NameTooLong,

    /// A label holds a character outside `[A-Za-z0-9_-]` or starts or ends
    /// with a hyphen.
    #[error("invalid label {0:?}")]
    InvalidLabel(String),
}

/// A fully-qualified domain name, always stored with its trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqdn(String);

impl Fqdn {
    /// Returns the root name `.`.
    #[must_use]
    pub fn root() -> Self {
        Self(".".to_string())
    }

    /// The name with its trailing dot, e.g. `corp.example.`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as written in `search` lines, e.g. `corp.example`.
    ///
    /// The root name has no other spelling and stays `.`.
    #[must_use]
    pub fn without_trailing_dot(&self) -> &str {
        if self.0 == "." {
            return &self.0;
        }
        self.0.strip_suffix('.').unwrap_or(&self.0)
    }
}

impl FromStr for Fqdn {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            return Ok(Self::root());
        }
        let s = s.strip_prefix('.').unwrap_or(s);
        let name = s.strip_suffix('.').unwrap_or(s);
        if name.is_empty() {
            return Err(DomainError::EmptyLabel);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(DomainError::NameTooLong);
        }
        for label in name.split('.') {
            validate_label(label)?;
        }
        Ok(Self(format!("{name}.")))
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_label(label: &str) -> Result<(), DomainError> {
    if label.is_empty() {
        return Err(DomainError::EmptyLabel);
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(DomainError::LabelTooLong(label.to_string()));
    }
    let valid_chars = label
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !valid_chars || label.starts_with('-') || label.ends_with('-') {
        return Err(DomainError::InvalidLabel(label.to_string()));
    }
    Ok(())
}
