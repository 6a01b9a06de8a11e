//! Outbound host allow-list.
//!
//! Every request the agent makes, whether on the model's behalf or its own,
//! passes through [`HostPolicy::check_url`] first. The bare platform domain
//! is rewritten to its `www.` form so that the allow-list and the bearer
//! rule agree on a single canonical host.

use moltpilot_core::error::Error;
use reqwest::Url;

/// Hosts the agent may contact. Matched case-insensitively, exactly.
pub const ALLOWED_HOSTS: &[&str] = &["www.moltbook.com", "moltbook.com"];

const BARE_HOST: &str = "moltbook.com";
const CANONICAL_HOST: &str = "www.moltbook.com";

/// Unified host policy enforcement.
pub struct HostPolicy;

impl HostPolicy {
    /// Parse, normalize and allow-list a URL.
    ///
    /// Rules:
    /// - Malformed URL or a scheme other than http(s) → `NetworkPolicy`
    /// - Host not in [`ALLOWED_HOSTS`] → `NetworkPolicy`
    /// - `moltbook.com` → `www.moltbook.com`
    pub fn check_url(url: &str) -> Result<Url, Error> {
        let mut parsed = Url::parse(url.trim())
            .map_err(|e| Error::NetworkPolicy(format!("malformed URL '{url}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::NetworkPolicy(format!(
                "scheme '{}' is not allowed",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .ok_or_else(|| Error::NetworkPolicy(format!("URL '{url}' has no host")))?;

        if !Self::is_allowed_host(&host) {
            tracing::warn!(host = %host, "Blocked request to non-allow-listed host");
            return Err(Error::NetworkPolicy(format!("Host not allowed: {host}")));
        }

        if host == BARE_HOST {
            parsed
                .set_host(Some(CANONICAL_HOST))
                .map_err(|e| Error::NetworkPolicy(e.to_string()))?;
        }

        Ok(parsed)
    }

    pub fn is_allowed_host(host: &str) -> bool {
        ALLOWED_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Whether a (normalized) URL may carry the agent's bearer token.
    pub fn may_carry_bearer(url: &Url) -> bool {
        url.host_str().is_some_and(Self::is_allowed_host)
    }
}
