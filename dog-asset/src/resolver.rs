use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::path::{normalize, NormalizedPath};
use crate::{
    AssetConfig, AssetReference, AssetResult, AssetWatch, BlobCache, FallbackResolver, Resolution,
    SignedUrlCache, StorageKey, UrlSigner, UrlSource,
};

/// Shared resolution service.
///
/// Construct one per process (or per test) and hand an `Arc` of it to every
/// consumer. It owns the in-memory URL cache, the optional persistent blob
/// cache and the signer; consumers never touch those directly.
pub struct AssetResolver {
    signer: Arc<dyn UrlSigner>,
    blobs: Option<Arc<dyn BlobCache>>,
    urls: Arc<SignedUrlCache>,
    fallback: FallbackResolver,
    config: AssetConfig,
}

impl AssetResolver {
    /// Create a resolver with a fresh URL cache and no blob cache
    pub fn new<S: UrlSigner + 'static>(signer: S, config: AssetConfig) -> AssetResult<Self> {
        Self::from_arc(Arc::new(signer), config)
    }

    /// Create a resolver around an already shared signer
    pub fn from_arc(signer: Arc<dyn UrlSigner>, config: AssetConfig) -> AssetResult<Self> {
        config.validate()?;
        Ok(Self {
            signer,
            blobs: None,
            urls: Arc::new(SignedUrlCache::new()),
            fallback: FallbackResolver::new(config.clone()),
            config,
        })
    }

    /// Add a persistent blob cache for optimistic display
    pub fn with_blob_cache<B: BlobCache + 'static>(mut self, blobs: B) -> Self {
        self.blobs = Some(Arc::new(blobs));
        self
    }

    /// Add an already shared persistent blob cache
    pub fn with_shared_blob_cache(mut self, blobs: Arc<dyn BlobCache>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Use an existing URL cache instead of a private one
    pub fn with_url_cache(mut self, urls: Arc<SignedUrlCache>) -> Self {
        self.urls = urls;
        self
    }

    /// Create a per-consumer coordinator bound to this resolver
    pub fn watch(self: &Arc<Self>) -> AssetWatch {
        AssetWatch::new(Arc::clone(self))
    }

    /// Classify a reference
    pub fn normalize(&self, reference: &AssetReference) -> NormalizedPath {
        normalize(reference)
    }

    /// One-shot authoritative resolution, without a provisional phase
    pub async fn resolve(&self, reference: &AssetReference) -> Resolution {
        if reference.is_empty() {
            return Resolution::none();
        }
        match self.normalize(reference) {
            NormalizedPath::DirectUrl(url) => Resolution::url(url, UrlSource::Direct),
            NormalizedPath::StorageKey(key) => self.resolve_key(reference, &key).await,
        }
    }

    /// Local object URL from the persistent blob cache.
    ///
    /// Any cache failure is logged and treated as a miss.
    pub async fn provisional_url(&self, key: &StorageKey) -> Option<String> {
        let blobs = self.blobs.as_ref()?;
        match blobs.get(key).await {
            Ok(Some(blob)) => {
                debug!(key = %key, bytes = blob.bytes.len(), "blob cache hit");
                Some(blob.object_url())
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "blob cache lookup failed, ignoring");
                None
            }
        }
    }

    /// URL cache, then signer, then fallback
    #[instrument(skip(self, reference, key), fields(key = %key))]
    pub async fn resolve_key(&self, reference: &AssetReference, key: &StorageKey) -> Resolution {
        if let Some(entry) = self.urls.get(key) {
            debug!("url cache hit");
            return Resolution::url(entry.url, UrlSource::Cache);
        }

        let resolution = match self.signer.sign_get(key, self.config.signed_url_ttl_secs()).await {
            Ok(url) => Resolution::url(url, UrlSource::Signed),
            Err(e) => self.fallback.resolve(reference, key, &e).into(),
        };

        self.remember(key, &resolution);
        resolution
    }

    /// Write a resolution to the URL cache if its source allows it
    fn remember(&self, key: &StorageKey, resolution: &Resolution) {
        let (Some(url), Some(source)) = (&resolution.url, resolution.source) else {
            return;
        };
        if source.is_cacheable() {
            let entry = self.urls.insert(key.clone(), url.clone(), self.config.cache_ttl());
            debug!(expires_at = %entry.expires_at, "cached signed url");
        }
    }

    /// Shared in-memory URL cache
    pub fn url_cache(&self) -> &Arc<SignedUrlCache> {
        &self.urls
    }

    /// Get configuration
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Check if a persistent blob cache is attached
    pub fn has_blob_cache(&self) -> bool {
        self.blobs.is_some()
    }
}
