//! `resolv.conf(5)` text codec and ownership detection.

use crate::config::{Fqdn, Nameserver, OsConfig};
use crate::error::{ResolverError, Result};
use std::fmt::Write as _;

/// Marker substring identifying files written by this crate.
pub const MARKER: &str = "generated by tailscale";

/// Header written at the top of every generated file.
const HEADER: &str = "# resolv.conf(5) file generated by tailscale\n\
                      # DO NOT EDIT THIS FILE BY HAND -- CHANGES WILL BE OVERWRITTEN\n\n";

/// Renders nameservers and search domains in `resolv.conf` format.
///
/// ```text
/// # resolv.conf(5) file generated by tailscale
/// # DO NOT EDIT THIS FILE BY HAND -- CHANGES WILL BE OVERWRITTEN
///
/// nameserver 100.100.100.100
/// search corp.example
/// ```
#[must_use]
pub fn encode(nameservers: &[Nameserver], domains: &[Fqdn]) -> String {
    let mut out = String::from(HEADER);
    for ns in nameservers {
        let _ = writeln!(out, "nameserver {ns}");
    }
    if !domains.is_empty() {
        out.push_str("search");
        for domain in domains {
            out.push(' ');
            out.push_str(domain.without_trailing_dot());
        }
        out.push('\n');
    }
    out
}

/// Parses the `nameserver` and `search` lines of a `resolv.conf` file.
///
/// Other directives are ignored. A `search` line is read as a single
/// domain; several space-separated domains on one line are rejected.
///
/// # Errors
///
/// Returns [`ResolverError::MissingSpace`], [`ResolverError::InvalidNameserver`]
/// or [`ResolverError::InvalidSearchDomain`] for malformed lines.
pub fn decode(text: &str) -> Result<OsConfig> {
    let mut config = OsConfig::default();
    for raw in text.lines() {
        let line = raw.find('#').map_or(raw, |i| &raw[..i]).trim();

        if let Some(value) = keyword_value(line, "nameserver")? {
            let ns = value
                .parse()
                .map_err(|source| ResolverError::InvalidNameserver {
                    line: line.to_string(),
                    source,
                })?;
            config.nameservers.push(ns);
        } else if let Some(value) = keyword_value(line, "search")? {
            let domain = value
                .parse()
                .map_err(|source| ResolverError::InvalidSearchDomain {
                    line: line.to_string(),
                    source,
                })?;
            config.search_domains.push(domain);
        }
    }
    Ok(config)
}

/// Returns the value following `keyword`, or `None` if `line` does not
/// start with it.
fn keyword_value<'a>(line: &'a str, keyword: &'static str) -> Result<Option<&'a str>> {
    let Some(rest) = line.strip_prefix(keyword) else {
        return Ok(None);
    };
    if !rest.starts_with(char::is_whitespace) {
        return Err(ResolverError::MissingSpace {
            keyword,
            line: line.to_string(),
        });
    }
    Ok(Some(rest.trim()))
}

/// Returns `true` if `content` carries the ownership marker anywhere.
#[must_use]
pub fn is_generated(content: &[u8]) -> bool {
    content
        .windows(MARKER.len())
        .any(|w| w == MARKER.as_bytes())
}

/// Resolver managers recognisable from a `resolv.conf` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvOwner {
    /// `systemd-resolved`.
    SystemdResolved,
    /// `NetworkManager`.
    NetworkManager,
    /// `resolvconf` / `openresolv`.
    Resolvconf,
}

impl ResolvOwner {
    /// The name used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemdResolved => "systemd-resolved",
            Self::NetworkManager => "NetworkManager",
            Self::Resolvconf => "resolvconf",
        }
    }
}

/// Guesses which resolver manager wrote `content`.
///
/// Only the leading run of comment and blank lines is inspected; the first
/// recognised name wins. Diagnostic only.
#[must_use]
pub fn resolv_owner(content: &[u8]) -> Option<ResolvOwner> {
    let text = String::from_utf8_lossy(content);
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('#') {
            // Assume the owner isn't hiding below the first directive.
            return None;
        }
        if line.contains("systemd-resolved") {
            return Some(ResolvOwner::SystemdResolved);
        } else if line.contains("NetworkManager") {
            return Some(ResolvOwner::NetworkManager);
        } else if line.contains("resolvconf") {
            return Some(ResolvOwner::Resolvconf);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEMD_STUB: &str = "\
# This is /run/systemd/resolve/stub-resolv.conf managed by man:systemd-resolved(8).
# Do not edit.
nameserver 127.0.0.53
options edns0 trust-ad
search .
";

    fn fqdn(s: &str) -> Fqdn {
        s.parse().unwrap()
    }

    #[test]
    fn encode_exact_format() {
        let text = encode(
            &["100.100.100.100".parse().unwrap(), "fd7a:115c:a1e0::53".parse().unwrap()],
            &[fqdn("corp.example."), fqdn("ts.net")],
        );
        assert_eq!(
            text,
            "# resolv.conf(5) file generated by tailscale\n\
             # DO NOT EDIT THIS FILE BY HAND -- CHANGES WILL BE OVERWRITTEN\n\
             \n\
             nameserver 100.100.100.100\n\
             nameserver fd7a:115c:a1e0::53\n\
             search corp.example ts.net\n"
        );
    }

    #[test]
    fn encode_omits_empty_search() {
        let text = encode(&["1.1.1.1".parse().unwrap()], &[]);
        assert!(text.ends_with("\nnameserver 1.1.1.1\n"));
        assert!(!text.contains("search"));
    }

    #[test]
    fn decode_round_trips_single_domain() {
        let config = OsConfig::new(["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()])
            .with_search_domain(fqdn("corp.example"));
        let text = encode(&config.nameservers, &config.search_domains);
        assert_eq!(decode(&text).unwrap(), config);
    }

    #[test]
    fn decode_ignores_comments_and_unknown_lines() {
        let config = decode(SYSTEMD_STUB).unwrap();
        assert_eq!(config.nameservers, vec!["127.0.0.53".parse::<Nameserver>().unwrap()]);
        assert_eq!(config.search_domains, vec![Fqdn::root()]);

        let config = decode("nameserver 8.8.8.8 # google\n").unwrap();
        assert_eq!(config.nameservers, vec!["8.8.8.8".parse::<Nameserver>().unwrap()]);
    }

    #[test]
    fn zoned_nameserver_round_trips() {
        let config = decode("# Generated by NetworkManager\nnameserver fe80::1%eth0\n").unwrap();
        assert_eq!(
            config.nameservers,
            vec![Nameserver::with_zone("fe80::1".parse().unwrap(), "eth0")]
        );

        let text = encode(&config.nameservers, &[]);
        assert!(text.ends_with("\nnameserver fe80::1%eth0\n"));
        assert_eq!(decode(&text).unwrap(), config);
    }

    #[test]
    fn decode_empty_is_zero() {
        assert!(decode("").unwrap().is_zero());
        assert!(decode("# just a comment\noptions ndots:5\n").unwrap().is_zero());
    }

    #[test]
    fn decode_rejects_missing_space() {
        assert!(matches!(
            decode("nameserverX\n"),
            Err(ResolverError::MissingSpace { keyword: "nameserver", .. })
        ));
        assert!(matches!(
            decode("search\n"),
            Err(ResolverError::MissingSpace { keyword: "search", .. })
        ));
        assert!(matches!(
            decode("search   # nothing\n"),
            Err(ResolverError::MissingSpace { .. })
        ));
    }

    #[test]
    fn decode_rejects_bad_values() {
        assert!(matches!(
            decode("nameserver not-an-ip\n"),
            Err(ResolverError::InvalidNameserver { .. })
        ));
        assert!(matches!(
            decode("search a.example b.example\n"),
            Err(ResolverError::InvalidSearchDomain { .. })
        ));
    }

    #[test]
    fn marker_anywhere() {
        assert!(is_generated(b"# resolv.conf(5) file generated by tailscale\n"));
        assert!(is_generated(b"nameserver 1.1.1.1\n# xx generated by tailscale yy"));
        assert!(!is_generated(b"# Generated by NetworkManager\nnameserver 1.1.1.1\n"));
        assert!(!is_generated(b""));
    }

    #[test]
    fn owner_from_header() {
        assert_eq!(resolv_owner(SYSTEMD_STUB.as_bytes()), Some(ResolvOwner::SystemdResolved));
        assert_eq!(
            resolv_owner(b"\n# Generated by NetworkManager\nnameserver 192.168.1.1\n"),
            Some(ResolvOwner::NetworkManager)
        );
        assert_eq!(
            resolv_owner(b"# Dynamic resolv.conf(5) file generated by resolvconf(8)\n"),
            Some(ResolvOwner::Resolvconf)
        );
    }

    #[test]
    fn owner_stops_at_first_directive() {
        assert_eq!(
            resolv_owner(b"nameserver 1.1.1.1\n# managed by systemd-resolved\n"),
            None
        );
        assert_eq!(resolv_owner(b""), None);
        assert_eq!(ResolvOwner::NetworkManager.as_str(), "NetworkManager");
    }
}
