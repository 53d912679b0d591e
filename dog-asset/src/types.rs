use serde::{Deserialize, Serialize};

/// Opaque reference to a stored asset as handed in by a consumer.
///
/// Accepted shapes: a raw storage key, a public object URL, an already signed
/// URL, any other URL, or nothing at all (empty / whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference(pub String);

impl AssetReference {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the reference carries nothing resolvable
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for AssetReference {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

impl From<String> for AssetReference {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl std::fmt::Display for AssetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical path of an object inside the configured bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey(pub String);

impl StorageKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the key, skipping empty ones
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Lower-cased file extension, if the last segment has one
    pub fn extension(&self) -> Option<String> {
        let name = self.0.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a delivered URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlSource {
    /// Reference was already usable and passed through untouched
    Direct,
    /// Local object URL built from the persistent blob cache
    Provisional,
    /// Unexpired entry from the in-memory URL cache
    Cache,
    /// Freshly minted by the signer
    Signed,
    /// Best-effort URL produced after a signing failure
    Fallback,
}

impl UrlSource {
    /// Only freshly signed URLs are written to the in-memory cache; fallback
    /// URLs never are.
    pub fn is_cacheable(self) -> bool {
        matches!(self, Self::Signed)
    }

    /// Whether a delivery from this source ends the request
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Provisional)
    }
}

/// Snapshot delivered to a consumer on every provisional and terminal transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetState {
    pub resolved_url: Option<String>,
    pub is_resolving: bool,
    /// Advisory flag; set when the signer failed, even if a fallback URL was found
    pub error: Option<String>,
    pub source: Option<UrlSource>,
}

impl AssetState {
    /// Nothing to show and nothing in flight
    pub fn empty() -> Self {
        Self::default()
    }

    /// Work in flight, nothing to show yet
    pub fn resolving() -> Self {
        Self {
            is_resolving: true,
            ..Self::default()
        }
    }

    /// Provisional URL while the authoritative path continues
    pub fn provisional(url: String) -> Self {
        Self {
            resolved_url: Some(url),
            is_resolving: true,
            error: None,
            source: Some(UrlSource::Provisional),
        }
    }

    /// Terminal state built from a resolution
    pub fn resolved(resolution: Resolution) -> Self {
        Self {
            resolved_url: resolution.url,
            is_resolving: false,
            error: resolution.error,
            source: resolution.source,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_resolving
    }
}

/// Authoritative outcome for one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub url: Option<String>,
    pub error: Option<String>,
    pub source: Option<UrlSource>,
}

impl Resolution {
    /// No usable URL and nothing went wrong (empty reference)
    pub fn none() -> Self {
        Self {
            url: None,
            error: None,
            source: None,
        }
    }

    pub fn url(url: String, source: UrlSource) -> Self {
        Self {
            url: Some(url),
            error: None,
            source: Some(source),
        }
    }
}
