//! Target URL checks applied before anything is sent to the browser.
//!
//! The private-network check is a textual prefix match on the hostname. It
//! does not resolve DNS, so a public name that resolves to a private address
//! is not caught here.

use url::{Host, Url};

/// Hostnames that always point back at the machine running the converter.
const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// Private and link-local IPv4 ranges, matched as hostname prefixes.
const BLOCKED_PREFIXES: &[&str] = &[
    "192.168.", "10.", "172.16.", "172.17.", "172.18.", "172.19.", "172.20.", "172.21.",
    "172.22.", "172.23.", "172.24.", "172.25.", "172.26.", "172.27.", "172.28.", "172.29.",
    "172.30.", "172.31.", "169.254.",
];

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Returns true when `url` parses, uses http(s), and does not target a
/// loopback or private-network host.
pub fn is_allowed_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return false;
    }

    let Some(hostname) = hostname_text(&parsed) else {
        return false;
    };

    if BLOCKED_HOSTS.contains(&hostname.as_str()) {
        return false;
    }

    !BLOCKED_PREFIXES
        .iter()
        .any(|prefix| hostname.starts_with(prefix))
}

/// Hostname as plain text, with IPv6 brackets removed and lowercased.
fn hostname_text(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_ascii_lowercase()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Trims user input and adds `https://` when no scheme is present.
///
/// Input that already names another scheme (`ftp://...`) is kept as-is so
/// the validator rejects it. Returns `None` for blank input.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if has_leading_scheme(trimmed) {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

/// True when `input` starts with `scheme://`, where the scheme is a letter
/// followed by letters, digits, `+`, `-` or `.`.
fn has_leading_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
