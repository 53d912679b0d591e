//! # dog-asset: secure asset URL resolution
//!
//! `dog-asset` turns opaque references to private stored files (document
//! scans, photos) into short-lived URLs a client can actually load, while
//! keeping calls to the signing endpoint to a minimum.
//!
//! ## Key Features
//!
//! - **Reference normalization**: raw keys, public object URLs, signed URLs and
//!   foreign URLs are told apart by an explicit parser
//! - **Signed URL cache**: URLs are reused until shortly before they expire
//! - **Optimistic display**: bytes from a persistent local cache are shown
//!   while the authoritative URL is fetched
//! - **Cancel on change**: a consumer that switches references never sees a
//!   late result from an older one
//! - **Graceful degradation**: signing failures fall back to a public URL or
//!   the original reference and are reported as an advisory flag only
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dog_asset::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> AssetResult<()> {
//! let config = AssetConfig::from_env()?;
//! let signer = HttpUrlSigner::new(config.clone())?;
//! let resolver = Arc::new(
//!     AssetResolver::new(signer, config)?
//!         .with_blob_cache(FsBlobCache::new("/var/cache/doc-images")),
//! );
//!
//! // One watch per displayed item
//! let card = resolver.watch();
//! let mut updates = card.subscribe();
//! card.set_reference("user-1/passport.jpg");
//!
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow().clone();
//!     if !state.is_resolving {
//!         println!("show {:?} (error: {:?})", state.resolved_url, state.error);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AssetWatch    │  ← one per consumer, cancel-on-change
//! ├─────────────────┤
//! │  AssetResolver  │  ← shared: caches, signer, fallback
//! ├─────────────────┤
//! │ UrlSigner /     │  ← remote signing, persistent blobs
//! │ BlobCache       │
//! └─────────────────┘
//! ```

mod blob_cache;
mod config;
mod coordinator;
mod error;
mod fallback;
pub mod path;
mod resolver;
#[cfg(feature = "s3")]
mod s3_signer;
mod signer;
mod types;
mod url_cache;

// Re-export main types for clean API
pub use blob_cache::{content_type_for, BlobCache, CachedBlob, FsBlobCache, MemoryBlobCache};
pub use config::{AssetConfig, DEFAULT_CACHE_SAFETY_MARGIN, DEFAULT_SIGNED_URL_TTL, MAX_SIGNED_URL_TTL};
pub use coordinator::{AssetWatch, RequestToken};
pub use error::{AssetError, AssetResult};
pub use fallback::{Fallback, FallbackResolver};
pub use path::{normalize, NormalizedPath};
pub use resolver::AssetResolver;
#[cfg(feature = "s3")]
pub use s3_signer::{S3SignerConfig, S3UrlSigner};
pub use signer::{HttpUrlSigner, UrlSigner};
pub use types::{AssetReference, AssetState, Resolution, StorageKey, UrlSource};
pub use url_cache::{CacheEntry, SignedUrlCache};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AssetConfig, AssetError, AssetReference, AssetResolver, AssetResult, AssetState, AssetWatch,
        BlobCache, FsBlobCache, HttpUrlSigner, MemoryBlobCache, StorageKey, UrlSigner,
    };
}
