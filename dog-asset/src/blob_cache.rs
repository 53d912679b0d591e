use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::{AssetResult, StorageKey};

/// Durable local copy of asset bytes, consulted for optimistic display.
///
/// Lookups are best-effort: callers treat any error as a miss. Populating the
/// cache (e.g. after a first successful load) is up to the consumer side.
#[async_trait]
pub trait BlobCache: Send + Sync {
    /// Fetch the cached bytes for a key
    async fn get(&self, key: &StorageKey) -> AssetResult<Option<CachedBlob>>;

    /// Store bytes for a key, replacing any previous copy
    async fn put(&self, key: &StorageKey, bytes: Bytes, content_type: Option<&str>) -> AssetResult<()>;

    /// Remove a key; missing keys are not an error
    async fn remove(&self, key: &StorageKey) -> AssetResult<()>;
}

/// Bytes held by a [`BlobCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlob {
    pub key: StorageKey,
    pub bytes: Bytes,
    pub content_type: String,
}

impl CachedBlob {
    pub fn new(key: StorageKey, bytes: Bytes, content_type: Option<&str>) -> Self {
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(&key).to_string());
        Self {
            key,
            bytes,
            content_type,
        }
    }

    /// Self-contained local URL for the bytes, valid for as long as the caller holds it
    pub fn object_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Content type guessed from the key's extension
pub fn content_type_for(key: &StorageKey) -> &'static str {
    match key.extension().as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Filesystem-backed cache surviving restarts.
///
/// Layout: one `<name>.bin` data file and one `<name>.type` sidecar per key,
/// where `<name>` is the hex SHA-256 of the storage key, so names stay
/// 64 characters long whatever the key length.
#[derive(Debug, Clone)]
pub struct FsBlobCache {
    root: PathBuf,
}

impl FsBlobCache {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_stem(key: &StorageKey) -> String {
        hex::encode(Sha256::digest(key.as_str().as_bytes()))
    }

    fn data_path(&self, key: &StorageKey) -> PathBuf {
        self.root.join(format!("{}.bin", Self::file_stem(key)))
    }

    fn type_path(&self, key: &StorageKey) -> PathBuf {
        self.root.join(format!("{}.type", Self::file_stem(key)))
    }

    async fn remove_file(path: &Path) -> AssetResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobCache for FsBlobCache {
    async fn get(&self, key: &StorageKey) -> AssetResult<Option<CachedBlob>> {
        let bytes = match tokio::fs::read(self.data_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let content_type = match tokio::fs::read_to_string(self.type_path(key)).await {
            Ok(ct) if !ct.trim().is_empty() => Some(ct.trim().to_string()),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CachedBlob::new(key.clone(), Bytes::from(bytes), content_type.as_deref())))
    }

    async fn put(&self, key: &StorageKey, bytes: Bytes, content_type: Option<&str>) -> AssetResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        // Write then rename so a crash never leaves a truncated blob behind.
        let data_path = self.data_path(key);
        let tmp_path = data_path.with_extension("bin.tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &data_path).await?;

        match content_type {
            Some(ct) => tokio::fs::write(self.type_path(key), ct).await?,
            None => Self::remove_file(&self.type_path(key)).await?,
        }
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> AssetResult<()> {
        Self::remove_file(&self.data_path(key)).await?;
        Self::remove_file(&self.type_path(key)).await
    }
}

/// Process-local cache, for tests and hosts without durable storage
#[derive(Debug, Default)]
pub struct MemoryBlobCache {
    blobs: RwLock<HashMap<StorageKey, CachedBlob>>,
}

impl MemoryBlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl BlobCache for MemoryBlobCache {
    async fn get(&self, key: &StorageKey) -> AssetResult<Option<CachedBlob>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    async fn put(&self, key: &StorageKey, bytes: Bytes, content_type: Option<&str>) -> AssetResult<()> {
        let blob = CachedBlob::new(key.clone(), bytes, content_type);
        self.blobs.write().insert(key.clone(), blob);
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> AssetResult<()> {
        self.blobs.write().remove(key);
        Ok(())
    }
}
