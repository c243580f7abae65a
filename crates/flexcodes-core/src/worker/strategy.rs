//! The two cache policies the worker applies.

use tracing::{debug, warn};

use super::cache::{CacheStorage, CacheStore};
use crate::net::{Fetch, FetchError, Request, Response};

/// How an intercepted request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Dataset: live network, cache as fallback
    NetworkFirst,
    /// Shell asset: cache, network on miss
    CacheFirst,
    /// Not ours: straight to the network
    Passthrough,
}

/// Try the network (bypassing intermediate caches) and store a copy on
/// success. When the network fails, answer from any cached copy, else with
/// an empty 504.
pub async fn network_first<F: Fetch>(
    network: &F,
    storage: &CacheStorage,
    store: &CacheStore,
    request: &Request,
) -> Response {
    match network.fetch(&request.bypassing_cache()).await {
        Ok(fresh) => {
            if fresh.ok() {
                if let Err(e) = store.put(&request.url, &fresh) {
                    warn!(url = %request.url, error = %e, "Failed to cache fresh response");
                }
            }
            fresh
        }
        Err(e) => {
            debug!(url = %request.url, error = %e, "Network failed, falling back to cache");
            match storage.match_any(&request.url) {
                Ok(Some(cached)) => cached,
                Ok(None) => Response::unavailable(),
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Cache lookup failed");
                    Response::unavailable()
                }
            }
        }
    }
}

/// Answer from cache when possible; otherwise fetch, store a copy and
/// return it. Network errors on a miss propagate.
pub async fn cache_first<F: Fetch>(
    network: &F,
    storage: &CacheStorage,
    store: &CacheStore,
    request: &Request,
) -> Result<Response, FetchError> {
    match storage.match_any(&request.url) {
        Ok(Some(cached)) => return Ok(cached),
        Ok(None) => {}
        Err(e) => warn!(url = %request.url, error = %e, "Cache lookup failed"),
    }

    let fresh = network.fetch(request).await?;
    if fresh.ok() {
        if let Err(e) = store.put(&request.url, &fresh) {
            warn!(url = %request.url, error = %e, "Failed to cache fresh response");
        }
    }
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::fake::FakeNetwork;
    use reqwest::Url;

    fn url(path: &str) -> Url {
        Url::parse("https://example.com/").unwrap().join(path).unwrap()
    }

    fn setup() -> (tempfile::TempDir, CacheStorage, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let store = storage.open("v1").unwrap();
        (dir, storage, store)
    }

    #[tokio::test]
    async fn test_network_first_stores_fresh_copy() {
        let (_dir, storage, store) = setup();
        let network = FakeNetwork::new();
        network.serve(url("codes.csv"), Response::new(200, "fresh"));

        let request = Request::get(url("codes.csv"));
        let response = network_first(&network, &storage, &store, &request).await;
        assert_eq!(response.text(), "fresh");
        assert_eq!(store.get(&request.url).unwrap().unwrap().text(), "fresh");
    }

    #[tokio::test]
    async fn test_network_first_does_not_cache_error_status() {
        let (_dir, storage, store) = setup();
        store.put(&url("codes.csv"), &Response::new(200, "good")).unwrap();
        let network = FakeNetwork::new();

        let request = Request::get(url("codes.csv"));
        let response = network_first(&network, &storage, &store, &request).await;
        assert_eq!(response.status, 404);
        assert_eq!(store.get(&request.url).unwrap().unwrap().text(), "good");
    }

    #[tokio::test]
    async fn test_network_first_falls_back_then_504() {
        let (_dir, storage, store) = setup();
        let network = FakeNetwork::new();
        network.set_online(false);

        let request = Request::get(url("codes.csv"));
        let response = network_first(&network, &storage, &store, &request).await;
        assert_eq!(response, Response::unavailable());

        store.put(&request.url, &Response::new(200, "cached")).unwrap();
        let response = network_first(&network, &storage, &store, &request).await;
        assert_eq!(response.text(), "cached");
    }

    #[tokio::test]
    async fn test_cache_first_prefers_cache() {
        let (_dir, storage, store) = setup();
        store.put(&url("app.js"), &Response::new(200, "cached")).unwrap();
        let network = FakeNetwork::new();
        network.serve(url("app.js"), Response::new(200, "network"));

        let request = Request::get(url("app.js"));
        let response = cache_first(&network, &storage, &store, &request).await.unwrap();
        assert_eq!(response.text(), "cached");
        assert_eq!(network.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_fills_on_miss() {
        let (_dir, storage, store) = setup();
        let network = FakeNetwork::new();
        network.serve(url("app.js"), Response::new(200, "network"));

        let request = Request::get(url("app.js"));
        let response = cache_first(&network, &storage, &store, &request).await.unwrap();
        assert_eq!(response.text(), "network");
        assert!(store.get(&request.url).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cache_first_offline_miss_is_error() {
        let (_dir, storage, store) = setup();
        let network = FakeNetwork::new();
        network.set_online(false);

        let request = Request::get(url("app.js"));
        assert!(cache_first(&network, &storage, &store, &request).await.is_err());
    }
}
