use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::path::NormalizedPath;
use crate::{AssetReference, AssetResolver, AssetState, Resolution, StorageKey, UrlSource};

/// Marker for one logical request of one consumer.
///
/// A token is current until the consumer issues another request (or is
/// dropped). Work holding a stale token must not publish anything.
#[derive(Debug, Clone)]
pub struct RequestToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// Per-consumer coordinator: turns a changing reference into a stream of
/// [`AssetState`] snapshots.
///
/// Every new reference cancels the previous request. Empty references and
/// direct URLs settle synchronously; storage keys resolve on a spawned task
/// that may publish one provisional state before its single terminal one.
pub struct AssetWatch {
    resolver: Arc<AssetResolver>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<AssetState>>,
    reference: Mutex<Option<AssetReference>>,
}

impl AssetWatch {
    pub fn new(resolver: Arc<AssetResolver>) -> Self {
        let (state, _) = watch::channel(AssetState::empty());
        Self {
            resolver,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            reference: Mutex::new(None),
        }
    }

    /// Receive every provisional and terminal transition
    pub fn subscribe(&self) -> watch::Receiver<AssetState> {
        self.state.subscribe()
    }

    /// Latest published state
    pub fn state(&self) -> AssetState {
        self.state.borrow().clone()
    }

    /// Reference of the latest request, if any was issued
    pub fn reference(&self) -> Option<AssetReference> {
        self.reference.lock().clone()
    }

    /// Token of the latest request
    pub fn current_token(&self) -> RequestToken {
        RequestToken {
            generation: self.generation.load(Ordering::SeqCst),
            current: Arc::clone(&self.generation),
        }
    }

    /// Point the consumer at a new reference.
    ///
    /// Returns `false` (and does nothing) when the reference equals the current
    /// one. An empty string is the absent reference.
    ///
    /// # Panics
    ///
    /// Storage keys are resolved with `tokio::spawn`, so this must be called
    /// from within a Tokio runtime.
    pub fn set_reference<R: Into<AssetReference>>(&self, reference: R) -> bool {
        let reference = reference.into();
        // Held across `issue` so the stored reference and the published state
        // always describe the same request.
        let mut current = self.reference.lock();
        if current.as_ref() == Some(&reference) {
            return false;
        }
        *current = Some(reference.clone());
        self.issue(reference);
        true
    }

    /// Drop the reference; settles to an empty state immediately
    pub fn clear(&self) -> bool {
        self.set_reference(AssetReference::from(""))
    }

    /// Re-run resolution for the current reference
    pub fn refresh(&self) -> Option<RequestToken> {
        let current = self.reference.lock();
        let reference = current.clone()?;
        Some(self.issue(reference))
    }

    /// Wait until the latest request reaches a terminal state
    pub async fn settled(&self) -> AssetState {
        let mut rx = self.subscribe();
        rx.wait_for(AssetState::is_terminal)
            .await
            .map(|state| state.clone())
            .unwrap_or_else(|_| self.state())
    }

    /// Cancel the previous request and start a new one; caller holds the reference lock
    fn issue(&self, reference: AssetReference) -> RequestToken {
        let path = (!reference.is_empty()).then(|| self.resolver.normalize(&reference));
        let initial = match &path {
            None => AssetState::empty(),
            Some(NormalizedPath::DirectUrl(url)) => {
                AssetState::resolved(Resolution::url(url.clone(), UrlSource::Direct))
            }
            Some(NormalizedPath::StorageKey(_)) => AssetState::resolving(),
        };

        // Bump and publish under the channel lock so no stale delivery can
        // slip in between the two.
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = initial;
        });
        let token = RequestToken {
            generation,
            current: Arc::clone(&self.generation),
        };

        debug!(reference = %reference, generation, "asset request issued");

        if let Some(NormalizedPath::StorageKey(key)) = path {
            tokio::spawn(run_request(
                Arc::clone(&self.resolver),
                Arc::clone(&self.state),
                reference,
                key,
                token.clone(),
            ));
        }
        token
    }
}

impl Drop for AssetWatch {
    fn drop(&mut self) {
        // Orphan whatever is still in flight.
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

async fn run_request(
    resolver: Arc<AssetResolver>,
    state: Arc<watch::Sender<AssetState>>,
    reference: AssetReference,
    key: StorageKey,
    token: RequestToken,
) {
    if let Some(url) = resolver.provisional_url(&key).await {
        deliver(&state, &token, AssetState::provisional(url));
    }

    // Superseded while reading the blob cache; skip the network call.
    if !token.is_current() {
        debug!(key = %key, generation = token.generation, "asset request cancelled");
        return;
    }

    let resolution = resolver.resolve_key(&reference, &key).await;
    if !deliver(&state, &token, AssetState::resolved(resolution)) {
        debug!(key = %key, generation = token.generation, "discarding stale asset result");
    }
}

/// Publish `next` only if `token` is still current; check and write are atomic
fn deliver(state: &watch::Sender<AssetState>, token: &RequestToken, next: AssetState) -> bool {
    state.send_if_modified(|current| {
        if token.is_current() {
            *current = next;
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetConfig, AssetError, AssetResult, UrlSigner};
    use async_trait::async_trait;

    struct UnusedSigner;

    #[async_trait]
    impl UrlSigner for UnusedSigner {
        async fn sign_get(&self, _key: &StorageKey, _expires_in_secs: u64) -> AssetResult<String> {
            Err(AssetError::invalid("direct URLs are never signed"))
        }
    }

    #[test]
    fn concurrent_set_reference_keeps_reference_and_state_in_step() {
        let resolver = Arc::new(AssetResolver::new(UnusedSigner, AssetConfig::new()).unwrap());
        let watch = resolver.watch();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let watch = &watch;
                scope.spawn(move || {
                    for i in 0..200 {
                        watch.set_reference(format!("https://cdn.example/{}/{}.jpg", t, i));
                    }
                });
            }
        });

        let reference = watch.reference().unwrap();
        let state = watch.state();
        assert_eq!(state.resolved_url.as_deref(), Some(reference.as_str()));
        assert_eq!(state.source, Some(UrlSource::Direct));
    }

    #[test]
    fn token_goes_stale_when_generation_moves() {
        let current = Arc::new(AtomicU64::new(3));
        let token = RequestToken {
            generation: 3,
            current: Arc::clone(&current),
        };
        assert!(token.is_current());
        current.fetch_add(1, Ordering::SeqCst);
        assert!(!token.is_current());
    }

    #[test]
    fn stale_delivery_is_suppressed() {
        let (tx, rx) = watch::channel(AssetState::resolving());
        let current = Arc::new(AtomicU64::new(1));
        let stale = RequestToken {
            generation: 0,
            current: Arc::clone(&current),
        };
        let fresh = RequestToken {
            generation: 1,
            current,
        };

        assert!(!deliver(&tx, &stale, AssetState::empty()));
        assert!(rx.borrow().is_resolving);

        let done = AssetState::resolved(Resolution::url("u".to_string(), UrlSource::Signed));
        assert!(deliver(&tx, &fresh, done.clone()));
        assert_eq!(*rx.borrow(), done);
    }
}
