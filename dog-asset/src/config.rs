use std::time::Duration;

use url::Url;

use crate::{AssetError, AssetResult, StorageKey};

/// Lifetime requested for every signed URL (60 minutes)
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// How much earlier than the real expiry a cached URL is dropped (10 minutes)
pub const DEFAULT_CACHE_SAFETY_MARGIN: Duration = Duration::from_secs(10 * 60);

/// Longest lifetime a signed URL may be requested for (7 days)
pub const MAX_SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for asset URL resolution
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Root of the storage API, e.g. `https://project.example/storage/v1`.
    /// Public and signing URLs are built beneath it.
    pub storage_url: Option<String>,

    /// Bucket (namespace) every storage key lives in
    pub bucket: String,

    /// Lifetime requested from the signer
    pub signed_url_ttl: Duration,

    /// Subtracted from `signed_url_ttl` to get the cache TTL
    pub cache_safety_margin: Duration,

    /// Project API key sent as the `apikey` header
    pub api_key: Option<String>,

    /// Bearer token for the signing endpoint
    pub access_token: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            storage_url: None,
            bucket: "documents".to_string(),
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
            cache_safety_margin: DEFAULT_CACHE_SAFETY_MARGIN,
            api_key: None,
            access_token: None,
        }
    }
}

impl AssetConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `DOG_ASSET_*` environment variables
    pub fn from_env() -> AssetResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, using the same variable names as `from_env`
    pub fn from_lookup<F>(lookup: F) -> AssetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn secs(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> AssetResult<Option<Duration>> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(|s| Some(Duration::from_secs(s)))
                    .map_err(|_| AssetError::config(format!("{} must be a number of seconds, got {:?}", key, raw))),
                None => Ok(None),
            }
        }

        let mut config = Self::default();
        if let Some(url) = lookup("DOG_ASSET_STORAGE_URL") {
            config = config.with_storage_url(url);
        }
        if let Some(bucket) = lookup("DOG_ASSET_BUCKET") {
            config = config.with_bucket(bucket);
        }
        if let Some(ttl) = secs(&lookup, "DOG_ASSET_SIGNED_URL_TTL_SECS")? {
            config.signed_url_ttl = ttl;
        }
        if let Some(margin) = secs(&lookup, "DOG_ASSET_CACHE_MARGIN_SECS")? {
            config.cache_safety_margin = margin;
        }
        config.api_key = lookup("DOG_ASSET_API_KEY");
        config.access_token = lookup("DOG_ASSET_ACCESS_TOKEN");

        config.validate()?;
        Ok(config)
    }

    /// Set the storage API root
    pub fn with_storage_url<S: Into<String>>(mut self, url: S) -> Self {
        let url = url.into();
        self.storage_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Set the bucket
    pub fn with_bucket<S: Into<String>>(mut self, bucket: S) -> Self {
        self.bucket = bucket.into().trim_matches('/').to_string();
        self
    }

    /// Set the signed URL lifetime
    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// Set the cache safety margin
    pub fn with_cache_safety_margin(mut self, margin: Duration) -> Self {
        self.cache_safety_margin = margin;
        self
    }

    /// Set the project API key
    pub fn with_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the bearer token
    pub fn with_access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Check the TTL policy and URL shape
    pub fn validate(&self) -> AssetResult<()> {
        if self.cache_safety_margin.is_zero() {
            return Err(AssetError::config("cache safety margin must be greater than zero"));
        }
        if self.signed_url_ttl > MAX_SIGNED_URL_TTL {
            return Err(AssetError::config(format!(
                "signed URL lifetime {:?} exceeds the maximum of {:?}",
                self.signed_url_ttl, MAX_SIGNED_URL_TTL
            )));
        }
        // Compared against the whole seconds the signer is actually asked for.
        let granted = Duration::from_secs(self.signed_url_ttl_secs());
        if self.cache_safety_margin >= granted {
            return Err(AssetError::config(format!(
                "cache safety margin {:?} must be shorter than the signed URL lifetime {:?}",
                self.cache_safety_margin, granted
            )));
        }
        if self.bucket.is_empty() {
            return Err(AssetError::config("bucket must not be empty"));
        }
        if let Some(url) = &self.storage_url {
            self.storage_base(url)?;
        }
        Ok(())
    }

    /// Signed URL lifetime in whole seconds, as sent to the signer
    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.signed_url_ttl.as_secs()
    }

    /// How long a freshly signed URL stays in the in-memory cache.
    ///
    /// Measured from the granted whole-second lifetime, never the configured one.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs()).saturating_sub(self.cache_safety_margin)
    }

    /// Public URL for a key, if a storage root is configured
    pub fn public_url(&self, key: &StorageKey) -> Option<String> {
        self.object_url("public", key).ok()
    }

    /// Signing endpoint for a key
    pub fn sign_endpoint(&self, key: &StorageKey) -> AssetResult<String> {
        self.object_url("sign", key)
    }

    fn object_url(&self, access: &str, key: &StorageKey) -> AssetResult<String> {
        if key.as_str().is_empty() {
            return Err(AssetError::invalid("storage key is empty"));
        }
        let base = self
            .storage_url
            .as_deref()
            .ok_or_else(|| AssetError::config("storage_url is not configured"))?;
        let mut url = self.storage_base(base)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AssetError::config(format!("storage_url {} cannot be a base", base)))?;
            segments.pop_if_empty();
            segments.extend(["object", access, self.bucket.as_str()]);
            segments.extend(key.segments());
        }
        Ok(url.to_string())
    }

    fn storage_base(&self, raw: &str) -> AssetResult<Url> {
        let url = Url::parse(raw).map_err(|e| AssetError::config(format!("storage_url {}: {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AssetError::config(format!("storage_url scheme {} is not http(s)", other))),
        }
    }
}
