//! Classification of asset references.
//!
//! A reference either names an object inside the bucket (and therefore needs a
//! signed URL) or is a URL that must be used as-is. Classification looks at the
//! parsed URL path rather than the raw string so hosts, ports and query strings
//! cannot cause a misread.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::{AssetReference, StorageKey};

/// Result of normalizing an [`AssetReference`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedPath {
    /// Needs resolution through the caches and the signer
    StorageKey(StorageKey),
    /// Usable verbatim, no caching and no signing
    DirectUrl(String),
}

impl NormalizedPath {
    pub fn storage_key(&self) -> Option<&StorageKey> {
        match self {
            Self::StorageKey(key) => Some(key),
            Self::DirectUrl(_) => None,
        }
    }
}

const PUBLIC_MARKER: [&str; 2] = ["object", "public"];
const SIGNED_MARKER: [&str; 2] = ["object", "sign"];

/// Classify a reference. Never fails; unknown shapes pass through as URLs.
pub fn normalize(reference: &AssetReference) -> NormalizedPath {
    let raw = reference.as_str().trim();

    if !has_http_scheme(raw) {
        return NormalizedPath::StorageKey(StorageKey::new(raw.trim_start_matches('/')));
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return NormalizedPath::DirectUrl(raw.to_string()),
    };

    let segments: Vec<&str> = match url.path_segments() {
        Some(segments) => segments.collect(),
        None => return NormalizedPath::DirectUrl(raw.to_string()),
    };

    if find_marker(&segments, &SIGNED_MARKER).is_some() {
        return NormalizedPath::DirectUrl(raw.to_string());
    }

    if let Some(start) = find_marker(&segments, &PUBLIC_MARKER) {
        let rest: Vec<&str> = segments[start..].iter().copied().filter(|s| !s.is_empty()).collect();
        let key_segments = match rest.len() {
            0 => return NormalizedPath::DirectUrl(raw.to_string()),
            // No bucket segment to strip, the single segment is the key.
            1 => &rest[..],
            _ => &rest[1..],
        };
        // A key that is not valid UTF-8 cannot be named safely; keep the URL.
        let decoded: Result<Vec<_>, _> = key_segments
            .iter()
            .map(|s| percent_decode_str(s).decode_utf8())
            .collect();
        let key = match decoded {
            Ok(parts) => parts.join("/"),
            Err(_) => return NormalizedPath::DirectUrl(raw.to_string()),
        };
        return NormalizedPath::StorageKey(StorageKey::new(key));
    }

    NormalizedPath::DirectUrl(raw.to_string())
}

/// True for `http://` / `https://` prefixes, case-insensitively
pub fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// True when the reference is an http(s) URL that parses
pub fn looks_like_url(raw: &str) -> bool {
    let raw = raw.trim();
    has_http_scheme(raw) && Url::parse(raw).map(|u| u.host().is_some()).unwrap_or(false)
}

/// Index just past the first occurrence of `marker` in `segments`
fn find_marker(segments: &[&str], marker: &[&str]) -> Option<usize> {
    segments
        .windows(marker.len())
        .position(|window| window == marker)
        .map(|pos| pos + marker.len())
}
