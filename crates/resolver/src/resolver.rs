//! The process-wide UI resource cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use orderchat_config::UiConfig;
use orderchat_core::ui::UiResourceDefinition;

use crate::ResolveError;
use crate::fetcher::{HttpFetcher, ResourceFetcher};

type Resolved = Result<Arc<UiResourceDefinition>, ResolveError>;
type Pending = Shared<BoxFuture<'static, Resolved>>;

/// An outstanding fetch. Only the fetch whose ticket is still registered
/// may cache its result or remove the marker.
struct InFlight {
    ticket: u64,
    pending: Pending,
}

struct Inner {
    fetcher: Arc<dyn ResourceFetcher>,
    cache: RwLock<HashMap<String, Arc<UiResourceDefinition>>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_ticket: AtomicU64,
}

/// Caches UI resource definitions for the life of the process and makes
/// sure at most one fetch per id is outstanding.
///
/// Lock order is `in_flight` then `cache`.
#[derive(Clone)]
pub struct UiResourceResolver {
    inner: Arc<Inner>,
}

impl UiResourceResolver {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                cache: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Resolver over the gateway at `config.api_base`.
    pub fn from_config(config: &UiConfig) -> Self {
        Self::new(Arc::new(HttpFetcher::from_config(config)))
    }

    /// Return the definition for `resource_id`.
    ///
    /// Served from cache when present; joins an outstanding fetch for the
    /// same id; otherwise starts one. A failed fetch is not cached and a
    /// later call retries.
    pub async fn fetch(&self, resource_id: &str) -> Resolved {
        if let Some(definition) = self.cached(resource_id) {
            return Ok(definition);
        }

        let pending = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner());

            // A fetch may have finished between the cache check and the lock.
            if let Some(definition) = self.cached(resource_id) {
                return Ok(definition);
            }

            match in_flight.get(resource_id) {
                Some(entry) => {
                    debug!(resource_id, "Joining in-flight UI resource fetch");
                    entry.pending.clone()
                }
                None => {
                    let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
                    let pending = self.start(resource_id, ticket);
                    in_flight.insert(
                        resource_id.to_string(),
                        InFlight {
                            ticket,
                            pending: pending.clone(),
                        },
                    );
                    pending
                }
            }
        };

        pending.await
    }

    /// The cached definition, if any. Never blocks on a fetch.
    pub fn cached(&self, resource_id: &str) -> Option<Arc<UiResourceDefinition>> {
        self.inner
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(resource_id)
            .cloned()
    }

    pub fn is_in_flight(&self, resource_id: &str) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(resource_id)
    }

    /// Forget every cached definition and in-flight marker.
    ///
    /// Fetches already running still answer their waiters, but their
    /// results are neither cached nor allowed to clear a newer marker.
    pub fn clear_cache(&self) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        in_flight.clear();
        self.inner
            .cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn start(&self, resource_id: &str, ticket: u64) -> Pending {
        let inner = self.inner.clone();
        let id = resource_id.to_string();

        async move {
            let result = inner.fetcher.fetch(&id).await.map(Arc::new);

            if let Err(e) = &result {
                warn!(resource_id = %id, error = %e, "UI resource fetch failed");
            }

            let mut in_flight = inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if in_flight.get(&id).is_some_and(|entry| entry.ticket == ticket) {
                in_flight.remove(&id);
                if let Ok(definition) = &result {
                    inner
                        .cache
                        .write()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(id.clone(), definition.clone());
                }
            } else {
                debug!(resource_id = %id, "Discarding result of a cleared fetch");
            }

            result
        }
        .boxed()
        .shared()
    }
}
