//! Core library for Flex Codes.
//!
//! Loads a CSV dataset of community gate-access codes, filters and groups
//! it by community, renders it as HTML markup, and keeps an offline copy of
//! the app shell and dataset through a versioned cache worker.
//!
//! - `parser`: quote-aware CSV parsing into `AccessCodeRecord`s
//! - `filter`: type filter, free-text search and community grouping
//! - `render`: HTML markup, escaping and map links
//! - `storage`: persisted per-community collapse state
//! - `net`: the `Fetch` seam and its `reqwest` implementation
//! - `loader`: dataset fetch, parse and status reporting
//! - `worker`: offline cache worker (network-first data, cache-first shell)

pub mod config;
pub mod filter;
pub mod loader;
pub mod models;
pub mod net;
pub mod parser;
pub mod render;
pub mod storage;
pub mod utils;
pub mod worker;

pub use config::Config;
pub use filter::{CommunityGroup, FilterResult};
pub use loader::{Dataset, LoadError, LoadStatus, Loader};
pub use models::{AccessCodeRecord, TypeFilter};
pub use reqwest::Url;
pub use net::{CacheMode, Fetch, FetchError, HttpFetcher, Request, Response};
pub use storage::{CollapseLookup, CollapseState, JsonFileStore, KeyValueStore, MemoryStore};
pub use worker::{CacheStorage, ShellWorker, WorkerError, WorkerOptions, WorkerState};
