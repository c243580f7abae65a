//! Offline cache worker.
//!
//! Sits in front of the network and keeps the app usable offline:
//!
//! - install: pre-cache the shell assets into the current cache generation
//! - activate: delete every other generation and take control at once
//! - fetch: dataset requests are network-first, shell assets cache-first,
//!   everything else (including cross-origin) passes through untouched
//!
//! Bumping the version tag invalidates every previously cached asset and
//! dataset snapshot on the next activation.

pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, StreamExt};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::loader::DATASET_NAME;
use crate::net::{Fetch, FetchError, Request, Response};

pub use cache::{CacheStorage, CacheStore};
pub use error::WorkerError;
pub use lifecycle::{is_valid_transition, WorkerState};
pub use strategy::{cache_first, network_first, Route};

/// Default cache generation tag
pub const CACHE_VERSION: &str = "flexcodes-v1";

/// App shell assets, relative to the worker scope
pub const SHELL_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./style.css",
    "./app.js",
    "./manifest.json",
    "./apple-touch-icon.png",
    "./favicon.png",
    "./icons/icon-192.png",
    "./icons/icon-512.png",
    "./icons/icon-512-maskable.png",
];

/// Maximum concurrent requests while pre-caching the shell.
const MAX_CONCURRENT_PRECACHE: usize = 4;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Base URL the worker controls; defines the origin and asset paths
    pub scope: Url,
    /// Cache generation tag
    pub version: String,
    /// Dataset file name, matched against the end of the request path
    pub dataset_name: String,
    /// Shell assets relative to `scope`
    pub assets: Vec<String>,
}

impl WorkerOptions {
    pub fn new(scope: Url) -> Self {
        Self {
            scope,
            version: CACHE_VERSION.to_string(),
            dataset_name: DATASET_NAME.to_string(),
            assets: SHELL_ASSETS.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }
}

/// Fetch interceptor with its own cache lifecycle.
///
/// All methods take `&self`, so one worker can be shared behind an `Arc`:
/// registration runs in the background while requests keep flowing. Until
/// the worker is active every request passes straight to the network.
pub struct ShellWorker<F> {
    network: Arc<F>,
    storage: CacheStorage,
    options: WorkerOptions,
    asset_urls: Vec<Url>,
    state: Mutex<WorkerState>,
}

impl<F: Fetch> ShellWorker<F> {
    pub fn new(network: F, storage: CacheStorage, options: WorkerOptions) -> Self {
        let asset_urls = options
            .assets
            .iter()
            .filter_map(|asset| match options.scope.join(asset) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(asset = %asset, error = %e, "Skipping unresolvable shell asset");
                    None
                }
            })
            .collect();

        Self {
            network: Arc::new(network),
            storage,
            options,
            asset_urls,
            state: Mutex::new(WorkerState::Parsed),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.lock_state()
    }

    pub fn version(&self) -> &str {
        &self.options.version
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    // The guard is never held across an await
    fn lock_state(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, to: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.lock_state();
        let from = *state;
        if !is_valid_transition(from, to) {
            return Err(WorkerError::InvalidTransition { from, to });
        }
        debug!(?from, ?to, version = %self.options.version, "Worker state change");
        *state = to;
        Ok(())
    }

    fn make_redundant(&self) {
        *self.lock_state() = WorkerState::Redundant;
    }

    /// Bring the worker into control: resume a generation installed by an
    /// earlier run, or install and activate a new one.
    pub async fn register(&self) -> Result<(), WorkerError> {
        if self.state() == WorkerState::Parsed && self.storage.has(&self.options.version) {
            info!(version = %self.options.version, "Resuming installed cache generation");
            self.delete_stale_generations()?;
            *self.lock_state() = WorkerState::Active;
            return Ok(());
        }

        self.install().await?;
        // Skip waiting: activate as soon as the shell is cached
        self.activate()
    }

    /// Pre-cache every shell asset. All-or-nothing: if any asset fails,
    /// nothing is written and the worker becomes redundant.
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Installing)?;
        info!(version = %self.options.version, assets = self.asset_urls.len(), "Installing");

        let fetched: Vec<(Url, Result<Response, FetchError>)> = stream::iter(self.asset_urls.clone())
            .map(|url| {
                let network = Arc::clone(&self.network);
                async move {
                    let result = network.fetch(&Request::get(url.clone())).await;
                    (url, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_PRECACHE)
            .collect()
            .await;

        let mut responses = Vec::with_capacity(fetched.len());
        for (url, result) in fetched {
            let failure = match result {
                Ok(response) if response.ok() => {
                    responses.push((url, response));
                    continue;
                }
                Ok(response) => format!("status {}", response.status),
                Err(e) => e.to_string(),
            };
            self.make_redundant();
            return Err(WorkerError::Install {
                asset: url.to_string(),
                reason: failure,
            });
        }

        let store = match self.storage.open(&self.options.version) {
            Ok(store) => store,
            Err(e) => {
                self.make_redundant();
                return Err(e);
            }
        };
        for (url, response) in &responses {
            if let Err(e) = store.put(url, response) {
                self.make_redundant();
                // Leave no half-written generation behind
                let _ = self.storage.delete(&self.options.version);
                return Err(e);
            }
        }

        self.transition(WorkerState::Installed)
    }

    /// Delete every other cache generation and take control.
    pub fn activate(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Activating)?;
        self.delete_stale_generations()?;
        self.transition(WorkerState::Active)?;
        info!(version = %self.options.version, "Worker active");
        Ok(())
    }

    fn delete_stale_generations(&self) -> Result<(), WorkerError> {
        for key in self.storage.keys()? {
            if key != self.options.version {
                self.storage.delete(&key)?;
                info!(version = %key, "Deleted stale cache generation");
            }
        }
        Ok(())
    }

    /// Decide how a request is answered.
    pub fn route(&self, url: &Url) -> Route {
        if url.origin() != self.options.scope.origin() {
            return Route::Passthrough;
        }

        let path = url.path();
        if path.ends_with(&self.options.dataset_name) {
            Route::NetworkFirst
        } else if self.asset_urls.iter().any(|asset| asset.path() == path) {
            Route::CacheFirst
        } else {
            Route::Passthrough
        }
    }

    /// Answer a request according to its route. Before activation every
    /// request passes through.
    pub async fn respond(&self, request: &Request) -> Result<Response, FetchError> {
        if !self.state().is_active() {
            return self.network.fetch(request).await;
        }

        let route = self.route(&request.url);
        debug!(url = %request.url, ?route, "Intercepted");

        match route {
            Route::Passthrough => self.network.fetch(request).await,
            Route::NetworkFirst | Route::CacheFirst => {
                let store = match self.storage.open(&self.options.version) {
                    Ok(store) => store,
                    Err(e) => {
                        warn!(error = %e, "Cache unavailable, passing request through");
                        return self.network.fetch(request).await;
                    }
                };
                if route == Route::NetworkFirst {
                    Ok(network_first(&*self.network, &self.storage, &store, request).await)
                } else {
                    cache_first(&*self.network, &self.storage, &store, request).await
                }
            }
        }
    }
}

impl<F: Fetch> Fetch for ShellWorker<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.respond(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeNetwork;
    use super::*;

    fn scope() -> Url {
        Url::parse("https://example.github.io/flexcodes/").unwrap()
    }

    fn url(path: &str) -> Url {
        scope().join(path).unwrap()
    }

    fn shell_network() -> FakeNetwork {
        let network = FakeNetwork::new();
        for asset in SHELL_ASSETS {
            network.serve(url(asset), Response::new(200, format!("asset {}", asset)));
        }
        network
    }

    fn worker(network: FakeNetwork, storage: CacheStorage) -> ShellWorker<FakeNetwork> {
        ShellWorker::new(network, storage, WorkerOptions::new(scope()))
    }

    #[test]
    fn test_route() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker(FakeNetwork::new(), CacheStorage::new(dir.path()).unwrap());

        assert_eq!(worker.route(&url("codes.csv")), Route::NetworkFirst);
        assert_eq!(worker.route(&url("data/codes.csv")), Route::NetworkFirst);
        assert_eq!(worker.route(&url("style.css")), Route::CacheFirst);
        assert_eq!(worker.route(&url("./")), Route::CacheFirst);
        assert_eq!(worker.route(&url("icons/icon-192.png")), Route::CacheFirst);
        assert_eq!(worker.route(&url("unknown.txt")), Route::Passthrough);

        let foreign = Url::parse("https://maps.apple.com/codes.csv").unwrap();
        assert_eq!(worker.route(&foreign), Route::Passthrough);
    }

    #[tokio::test]
    async fn test_register_installs_and_activates() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let worker = worker(shell_network(), storage.clone());

        worker.register().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Active);

        let store = storage.open(CACHE_VERSION).unwrap();
        for asset in SHELL_ASSETS {
            assert!(store.get(&url(asset)).unwrap().is_some(), "{} not cached", asset);
        }
    }

    #[tokio::test]
    async fn test_install_failure_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let network = shell_network();
        network.serve(url("./favicon.png"), Response::new(404, ""));
        let worker = worker(network, storage.clone());

        let err = worker.register().await.unwrap_err();
        assert!(matches!(err, WorkerError::Install { .. }));
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(!storage.has(CACHE_VERSION));
    }

    #[tokio::test]
    async fn test_failed_registration_still_serves_live_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let network = shell_network();
        network.serve(url("./favicon.png"), Response::new(404, ""));
        network.serve(url("codes.csv"), Response::new(200, "Community,Address\nOak,1 Main\n"));
        let worker = worker(network, CacheStorage::new(dir.path()).unwrap());

        assert!(worker.register().await.is_err());
        assert_eq!(worker.state(), WorkerState::Redundant);

        let response = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert!(response.ok());
        assert_eq!(response.text(), "Community,Address\nOak,1 Main\n");
        // Passthrough keeps the caller's cache mode and stores nothing
        assert_eq!(worker.network.last_request().unwrap().cache, crate::net::CacheMode::Default);
        assert!(worker.storage().keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_worker_registers_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let network = shell_network();
        network.serve(url("codes.csv"), Response::new(200, "live"));
        let worker = Arc::new(worker(network, CacheStorage::new(dir.path()).unwrap()));

        // Requests before registration completes go to the network
        let early = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert_eq!(early.text(), "live");

        let background = Arc::clone(&worker);
        tokio::spawn(async move { background.register().await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(worker.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_inactive_worker_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork::new();
        network.serve(url("codes.csv"), Response::new(200, "live"));
        let worker = worker(network, CacheStorage::new(dir.path()).unwrap());

        let response = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert_eq!(response.text(), "live");
        assert!(!worker.storage().has(CACHE_VERSION));
    }

    #[tokio::test]
    async fn test_activation_deletes_stale_generations() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        storage
            .open("flexcodes-v0")
            .unwrap()
            .put(&url("style.css"), &Response::new(200, "stale"))
            .unwrap();

        let worker = worker(shell_network(), storage.clone());
        worker.register().await.unwrap();

        assert_eq!(storage.keys().unwrap(), vec![CACHE_VERSION]);
        let css = worker.fetch(&Request::get(url("style.css"))).await.unwrap();
        assert_eq!(css.text(), "asset ./style.css");
    }

    #[tokio::test]
    async fn test_dataset_offline_after_online_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let network = shell_network();
        network.serve(url("codes.csv"), Response::new(200, "v1"));
        let worker = worker(network, CacheStorage::new(dir.path()).unwrap());
        worker.register().await.unwrap();

        let online = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert_eq!(online.text(), "v1");

        worker.network.serve(url("codes.csv"), Response::new(200, "v2"));
        let updated = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert_eq!(updated.text(), "v2");

        worker.network.set_online(false);
        let offline = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert_eq!(offline.text(), "v2");
    }

    #[tokio::test]
    async fn test_dataset_offline_without_cache_is_504() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker(shell_network(), CacheStorage::new(dir.path()).unwrap());
        worker.register().await.unwrap();

        worker.network.set_online(false);
        let response = worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        assert_eq!(response.status, 504);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_dataset_fetch_bypasses_http_cache() {
        let dir = tempfile::tempdir().unwrap();
        let network = shell_network();
        network.serve(url("codes.csv"), Response::new(200, "v1"));
        let worker = worker(network, CacheStorage::new(dir.path()).unwrap());
        worker.register().await.unwrap();

        worker.fetch(&Request::get(url("codes.csv"))).await.unwrap();
        let last = worker.network.last_request().unwrap();
        assert_eq!(last.cache, crate::net::CacheMode::NoStore);
    }

    #[tokio::test]
    async fn test_shell_served_from_cache_offline() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker(shell_network(), CacheStorage::new(dir.path()).unwrap());
        worker.register().await.unwrap();

        worker.network.set_online(false);
        let index = worker.fetch(&Request::get(url("index.html"))).await.unwrap();
        assert_eq!(index.text(), "asset ./index.html");
    }

    #[tokio::test]
    async fn test_resume_uses_existing_generation_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let first = worker(shell_network(), storage.clone());
        first.register().await.unwrap();

        let offline = FakeNetwork::new();
        offline.set_online(false);
        let second = worker(offline, storage);
        second.register().await.unwrap();
        assert_eq!(second.state(), WorkerState::Active);
        assert_eq!(second.network.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cross_origin_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let network = shell_network();
        let foreign = Url::parse("https://cdn.example.net/style.css").unwrap();
        network.serve(foreign.clone(), Response::new(200, "remote"));
        let worker = worker(network, CacheStorage::new(dir.path()).unwrap());
        worker.register().await.unwrap();

        let response = worker.fetch(&Request::get(foreign.clone())).await.unwrap();
        assert_eq!(response.text(), "remote");
        assert_eq!(worker.storage().match_any(&foreign).unwrap(), None);
    }
}
