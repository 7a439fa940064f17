//! Hop-by-hop header filtering

use std::collections::{BTreeMap, HashSet};

/// Connection-scoped headers that must not be forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Drop hop-by-hop headers, including any named in `Connection`.
///
/// Names are lowercased in the output.
pub fn strip_hop_by_hop(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let named: HashSet<String> = headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("connection"))
        .flat_map(|(_, value)| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    headers
        .iter()
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value))
        .filter(|(name, _)| !HOP_BY_HOP.contains(&name.as_str()) && !named.contains(name))
        .map(|(name, value)| (name, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_strips_fixed_list() {
        let out = strip_hop_by_hop(&headers(&[
            ("Host", "evil.example"),
            ("Content-Length", "12"),
            ("Transfer-Encoding", "chunked"),
            ("Authorization", "Bearer x"),
            ("X-Trace", "1"),
        ]));
        assert_eq!(out, headers(&[("authorization", "Bearer x"), ("x-trace", "1")]));
    }

    #[test]
    fn test_strips_connection_named_headers() {
        let out = strip_hop_by_hop(&headers(&[
            ("Connection", "close, X-Secret"),
            ("x-secret", "s"),
            ("accept", "*/*"),
        ]));
        assert_eq!(out, headers(&[("accept", "*/*")]));
    }
}
