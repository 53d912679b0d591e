use tracing::warn;

use crate::path::looks_like_url;
use crate::{AssetConfig, AssetError, AssetReference, Resolution, StorageKey, UrlSource};

/// Best-effort result after the signer failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub url: Option<String>,
    /// Always non-empty
    pub error: String,
}

impl From<Fallback> for Resolution {
    fn from(fallback: Fallback) -> Self {
        Resolution {
            source: fallback.url.as_ref().map(|_| UrlSource::Fallback),
            url: fallback.url,
            error: Some(fallback.error),
        }
    }
}

/// Produces a usable URL without another network call when signing fails.
///
/// Order: public URL for the key, then the original reference if it was
/// already a URL, then nothing. Results are never cached.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    config: AssetConfig,
}

impl FallbackResolver {
    pub fn new(config: AssetConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, reference: &AssetReference, key: &StorageKey, failure: &AssetError) -> Fallback {
        let error = format!("{}: {}", failure.kind(), failure);

        let url = self
            .config
            .public_url(key)
            .or_else(|| looks_like_url(reference.as_str()).then(|| reference.as_str().trim().to_string()));

        warn!(
            key = %key,
            error = %failure,
            fallback = url.is_some(),
            "asset signing failed, using fallback"
        );

        Fallback { url, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> AssetError {
        AssetError::authorization(403, "denied")
    }

    #[test]
    fn builds_public_url_first() {
        let resolver = FallbackResolver::new(
            AssetConfig::new().with_storage_url("https://store.example").with_bucket("bucket"),
        );
        let fallback = resolver.resolve(
            &AssetReference::from("raw/key.png"),
            &StorageKey::new("raw/key.png"),
            &failure(),
        );
        assert_eq!(
            fallback.url.as_deref(),
            Some("https://store.example/object/public/bucket/raw/key.png")
        );
        assert!(!fallback.error.is_empty());
    }

    #[test]
    fn falls_back_to_original_url() {
        let resolver = FallbackResolver::new(AssetConfig::new());
        let reference = AssetReference::from("https://other.example/object/public/bucket/a.jpg");
        let fallback = resolver.resolve(&reference, &StorageKey::new("a.jpg"), &failure());
        assert_eq!(fallback.url.as_deref(), Some(reference.as_str()));
    }

    #[test]
    fn nothing_usable_yields_none_with_error() {
        let resolver = FallbackResolver::new(AssetConfig::new());
        let fallback = resolver.resolve(&AssetReference::from("raw/key.png"), &StorageKey::new("raw/key.png"), &failure());
        assert!(fallback.url.is_none());
        assert!(fallback.error.starts_with("permission_denied"));

        let resolution = Resolution::from(fallback);
        assert!(resolution.source.is_none());
        assert!(resolution.error.is_some());
    }
}
