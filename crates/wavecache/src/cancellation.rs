//! Registry of abortable in-flight fetches.
//!
//! Every fetch registers before it issues its request and holds a
//! [`Registration`] until it completes. Dropping the registration
//! deregisters it, whatever the outcome. [`CancellationRegistry::cancel_all`]
//! triggers every registered token and empties the registry.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    tokens: HashMap<u64, CancellationToken>,
}

#[derive(Clone, Default)]
pub struct CancellationRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> Registration {
        let token = CancellationToken::new();
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id = state.next_id.wrapping_add(1);
            state.tokens.insert(id, token.clone());
            id
        };
        Registration {
            id,
            token,
            registry: self.clone(),
        }
    }

    /// Cancels every registered fetch and clears the registry. Returns the
    /// number of fetches cancelled.
    pub fn cancel_all(&self) -> usize {
        let tokens: Vec<CancellationToken> = {
            let mut state = self.state.lock();
            state.tokens.drain().map(|(_, token)| token).collect()
        };
        for token in &tokens {
            token.cancel();
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelled {} in-flight requests", tokens.len());

        tokens.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tokens.is_empty()
    }

    fn deregister(&self, id: u64) {
        self.state.lock().tokens.remove(&id);
    }
}

/// Runs `fut` until it completes or `token` is cancelled, in which case the
/// outcome is [`Error::Cancelled`].
pub async fn until_cancelled<F, T>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::Cancelled),
        outcome = fut => outcome,
    }
}

/// A live entry in the [`CancellationRegistry`]. Deregisters on drop.
pub struct Registration {
    id: u64,
    token: CancellationToken,
    registry: CancellationRegistry,
}

impl Registration {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_all_rejects_every_outstanding_fetch() {
        let registry = CancellationRegistry::new();
        let fetches: Vec<_> = (0..4)
            .map(|_| {
                let registration = registry.register();
                tokio::spawn(async move {
                    until_cancelled(
                        registration.token(),
                        futures::future::pending::<Result<()>>(),
                    )
                    .await
                })
            })
            .collect();
        assert_eq!(registry.len(), 4);

        assert_eq!(registry.cancel_all(), 4);

        for fetch in fetches {
            let err = fetch.await.unwrap().unwrap_err();
            assert!(err.is_cancellation());
            assert_eq!(err.to_string(), wavecache_core::error::CANCELLATION_REASON);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn completed_fetches_deregister() {
        let registry = CancellationRegistry::new();
        {
            let registration = registry.register();
            let value = until_cancelled(registration.token(), async { Ok(7) })
                .await
                .unwrap();
            assert_eq!(value, 7);
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());

        {
            let registration = registry.register();
            let err = until_cancelled(registration.token(), async {
                Err::<(), _>(Error::Network {
                    context: "503".into(),
                })
            })
            .await
            .unwrap_err();
            assert!(!err.is_cancellation());
        }
        assert!(registry.is_empty());
        assert_eq!(registry.cancel_all(), 0);
    }
}
