//! Outbound URL validation.
//!
//! Registration-supplied endpoints are fetched by this service, so they must
//! never point into loopback, private or cloud-metadata address space. The
//! check runs on the parsed URL only; it performs no DNS resolution.

use anyhow::{anyhow, bail};
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "::1",
    "169.254.169.254",
    "metadata.google.internal",
];

/// Rejects URLs that are not plain http(s) to a public-looking host.
pub fn validate_url(raw: &str) -> Result<(), anyhow::Error> {
    let url = Url::parse(raw).map_err(|e| anyhow!("invalid URL: {}", e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => bail!("scheme '{}' is not allowed", other),
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            if BLOCKED_HOSTS.contains(&domain.as_str()) {
                bail!("host '{}' is blocked", domain);
            }
        }
        Some(Host::Ipv4(addr)) => validate_ipv4(addr)?,
        Some(Host::Ipv6(addr)) => validate_ipv6(addr)?,
        None => bail!("URL has no host"),
    }

    Ok(())
}

fn validate_ipv4(addr: Ipv4Addr) -> Result<(), anyhow::Error> {
    if addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
    {
        bail!("address {} is not routable from this service", addr);
    }
    Ok(())
}

fn validate_ipv6(addr: Ipv6Addr) -> Result<(), anyhow::Error> {
    if addr.is_loopback() || addr.is_unspecified() {
        bail!("address {} is not routable from this service", addr);
    }
    let segments = addr.segments();
    // Unique-local fc00::/7 and link-local fe80::/10.
    if (segments[0] & 0xfe00) == 0xfc00 || (segments[0] & 0xffc0) == 0xfe80 {
        bail!("address {} is not routable from this service", addr);
    }
    if let Some(mapped) = addr.to_ipv4_mapped() {
        validate_ipv4(mapped)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_hosts_pass() {
        assert!(validate_url("https://platform.example.com/jwks.json").is_ok());
        assert!(validate_url("https://8.8.8.8/jwks.json").is_ok());
        assert!(validate_url("http://canvas.instructure.com/api/lti/security/jwks").is_ok());
    }

    #[test]
    fn loopback_and_metadata_hosts_are_blocked() {
        assert!(validate_url("https://localhost/jwks.json").is_err());
        assert!(validate_url("https://127.0.0.1/jwks.json").is_err());
        assert!(validate_url("https://0.0.0.0/jwks.json").is_err());
        assert!(validate_url("https://169.254.169.254/latest/meta-data/").is_err());
        assert!(validate_url("https://metadata.google.internal/computeMetadata/").is_err());
        assert!(validate_url("https://[::1]/jwks.json").is_err());
    }

    #[test]
    fn private_ranges_are_blocked() {
        assert!(validate_url("https://10.0.0.5/jwks.json").is_err());
        assert!(validate_url("https://172.16.0.1/jwks.json").is_err());
        assert!(validate_url("https://192.168.1.1/jwks.json").is_err());
        assert!(validate_url("https://[fd00::1]/jwks.json").is_err());
        assert!(validate_url("https://[fe80::1]/jwks.json").is_err());
        assert!(validate_url("https://[::ffff:10.0.0.5]/jwks.json").is_err());
    }

    #[test]
    fn non_http_schemes_are_blocked() {
        assert!(validate_url("ftp://platform.example.com/jwks.json").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn blocklist_is_case_insensitive() {
        assert!(validate_url("https://LOCALHOST/jwks.json").is_err());
        assert!(validate_url("https://Metadata.Google.Internal/x").is_err());
    }

    #[test]
    fn garbage_urls_are_rejected() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
    }
}
