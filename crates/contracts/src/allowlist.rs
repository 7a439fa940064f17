//! Destination host allowlist
//!
//! Entries are exact host names or `*.suffix` wildcards, compared case-insensitively.
//! A wildcard matches subdomains only, never the bare suffix.

use serde::{Deserialize, Serialize};
use url::Url;

/// Permitted destination hosts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct HostAllowlist {
    entries: Vec<String>,
}

impl HostAllowlist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| e.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Whether `host` is permitted
    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.entries.iter().any(|entry| match entry.strip_prefix("*.") {
            Some(suffix) => host
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1),
            None => *entry == host,
        })
    }

    /// Whether the host of `url` is permitted; URLs without a host never are
    pub fn allows_url(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.allows_host(host))
    }
}

impl From<Vec<String>> for HostAllowlist {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

impl From<HostAllowlist> for Vec<String> {
    fn from(list: HostAllowlist) -> Self {
        list.entries
    }
}
