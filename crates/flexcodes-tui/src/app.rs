//! Application state management for Flex Codes.
//!
//! This module contains the `App` struct that owns the record set, the
//! active filter and search query, the collapse state, and the background
//! load channel. UI handlers mutate it; the renderer only reads it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use flexcodes_core::filter::{self, FilterResult};
use flexcodes_core::loader::load_error_message;
use flexcodes_core::{
    AccessCodeRecord, CacheStorage, CollapseLookup, CollapseState, Config, Dataset, Fetch,
    FetchError, HttpFetcher, JsonFileStore, LoadStatus, Loader, Request, Response, ShellWorker,
    TypeFilter, Url, WorkerOptions,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background load channel.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// How long a toast notification stays visible.
const TOAST_DURATION: Duration = Duration::from_millis(1400);

/// Number of rows to move on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Rows scrolled past before the title bar switches to its compact style.
const SCROLLED_ROWS: usize = 3;

/// Maximum length for the search query.
const MAX_QUERY_LENGTH: usize = 64;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    Quitting,
}

/// Transient notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    shown_at: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_DURATION
    }
}

/// One line of the flattened list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row<'a> {
    Header {
        community: &'a str,
        count: usize,
        collapsed: bool,
    },
    Item(&'a AccessCodeRecord),
}

// ============================================================================
// Transport
// ============================================================================

/// Network path used by the loader: straight HTTP, or through the offline
/// cache worker.
pub enum Transport {
    Direct(HttpFetcher),
    Offline(Arc<ShellWorker<HttpFetcher>>),
}

impl Fetch for Transport {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        match self {
            Transport::Direct(http) => http.fetch(request).await,
            Transport::Offline(worker) => worker.fetch(request).await,
        }
    }
}

impl Transport {
    /// Build the transport for `base_url`. The worker starts unregistered
    /// and passes every request through until it is active.
    pub fn connect(config: &Config, base_url: &Url) -> Result<Self> {
        let http = HttpFetcher::new()?;
        if !config.offline_cache_enabled() {
            info!("Offline cache disabled");
            return Ok(Transport::Direct(http));
        }

        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"))
            .join("worker");
        let storage = match CacheStorage::new(&cache_dir) {
            Ok(storage) => storage,
            Err(e) => {
                warn!(error = %e, ?cache_dir, "Offline cache unavailable");
                return Ok(Transport::Direct(http));
            }
        };

        let options = WorkerOptions::new(base_url.clone())
            .with_version(config.cache_version())
            .with_dataset_name(config.dataset_name());
        Ok(Transport::Offline(Arc::new(ShellWorker::new(http, storage, options))))
    }

    /// Register the offline worker and wait for it.
    pub async fn register(&self) {
        if let Transport::Offline(worker) = self {
            register_worker(worker).await;
        }
    }

    /// Register the offline worker on a background task. Requests made
    /// meanwhile go straight to the network.
    pub fn register_in_background(&self) {
        if let Transport::Offline(worker) = self {
            let worker = Arc::clone(worker);
            tokio::spawn(async move {
                register_worker(&worker).await;
            });
        }
    }
}

/// Failures are logged only; a redundant worker keeps passing requests through.
async fn register_worker(worker: &ShellWorker<HttpFetcher>) {
    match worker.register().await {
        Ok(()) => info!(version = %worker.version(), "Offline worker registered"),
        Err(e) => warn!(error = %e, "Offline worker registration failed"),
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Result of a background dataset load, sent back over the channel.
enum LoadOutcome {
    Loaded(Dataset),
    Failed(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    loader: Arc<Loader<Transport>>,
    pub collapse: CollapseState<JsonFileStore>,

    // Data
    pub records: Vec<AccessCodeRecord>,

    // Controls
    pub filters: Vec<TypeFilter>,
    pub filter: TypeFilter,
    pub search_query: String,

    // UI State
    pub state: AppState,
    pub selection: usize,
    pub status: LoadStatus,
    pub toast: Option<Toast>,
    /// Replaces the list while set (load failure)
    pub placeholder: Option<String>,
    pub loading: bool,

    // Background task channel
    load_rx: mpsc::Receiver<LoadOutcome>,
    load_tx: mpsc::Sender<LoadOutcome>,
}

impl App {
    /// Create a new application instance. Worker registration starts in the
    /// background and never holds up the first frame or load.
    pub fn new(config: Config) -> Result<Self> {
        let base_url = config.base_url()?;
        debug!(%base_url, "Base URL configured");

        let transport = Transport::connect(&config, &base_url)?;
        transport.register_in_background();
        let loader = Loader::new(transport, &base_url, config.dataset_name())?;

        let state_path = config
            .state_path()
            .unwrap_or_else(|_| PathBuf::from("./collapse.json"));
        let collapse = CollapseState::new(JsonFileStore::open(state_path));

        Ok(Self::with_parts(&config, loader, collapse))
    }

    /// Assemble an app from already-built parts
    pub fn with_parts(
        config: &Config,
        loader: Loader<Transport>,
        collapse: CollapseState<JsonFileStore>,
    ) -> Self {
        let (load_tx, load_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let filters = config.filters();
        let filter = config.default_filter();

        Self {
            loader: Arc::new(loader),
            collapse,
            records: Vec::new(),
            filters,
            filter,
            search_query: String::new(),
            state: AppState::Normal,
            selection: 0,
            status: LoadStatus::Loading,
            toast: None,
            placeholder: None,
            loading: false,
            load_rx,
            load_tx,
        }
    }

    pub fn dataset_name(&self) -> &str {
        self.loader.dataset_name()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Spawn a background load of the dataset
    pub fn start_load(&mut self) {
        if self.loading {
            debug!("Load already in progress");
            return;
        }
        info!(url = %self.loader.dataset_url(), "Loading dataset");
        self.loading = true;
        self.status = LoadStatus::Loading;

        let loader = Arc::clone(&self.loader);
        let tx = self.load_tx.clone();
        tokio::spawn(async move {
            let outcome = match loader.load().await {
                Ok(dataset) => LoadOutcome::Loaded(dataset),
                Err(e) => LoadOutcome::Failed(e.to_string()),
            };
            if let Err(e) = tx.send(outcome).await {
                error!(error = %e, "Failed to send load result - channel closed");
            }
        });
    }

    /// Drain finished background work and expire the toast
    pub fn check_background_tasks(&mut self) {
        while let Ok(outcome) = self.load_rx.try_recv() {
            self.process_load_outcome(outcome);
        }
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    fn process_load_outcome(&mut self, outcome: LoadOutcome) {
        self.loading = false;
        match outcome {
            LoadOutcome::Loaded(dataset) => self.apply_dataset(dataset),
            LoadOutcome::Failed(message) => self.apply_load_error(message),
        }
    }

    /// Replace the record set wholesale with a fresh load
    pub fn apply_dataset(&mut self, dataset: Dataset) {
        self.status = dataset.status();
        self.records = dataset.records;
        self.placeholder = None;
        self.clamp_selection();
    }

    /// Surface a failed load. Records already in memory are kept.
    pub fn apply_load_error(&mut self, message: String) {
        error!(error = %message, "Dataset load failed");
        self.status = LoadStatus::Error;
        self.show_toast(message);
        self.placeholder = Some(load_error_message(self.dataset_name()));
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::new(message));
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    pub fn filtered(&self) -> FilterResult<'_> {
        filter::apply(&self.records, &self.filter, &self.search_query)
    }

    /// Flatten the grouped view into rows, skipping items of collapsed groups
    pub fn visible_rows(&self) -> Vec<Row<'_>> {
        let result = self.filtered();
        let mut rows = Vec::with_capacity(result.total + result.groups.len());
        for group in result.groups {
            let collapsed = self.collapse.is_collapsed(group.community);
            rows.push(Row::Header {
                community: group.community,
                count: group.len(),
                collapsed,
            });
            if !collapsed {
                rows.extend(group.items.into_iter().map(Row::Item));
            }
        }
        rows
    }

    pub fn selected_row(&self) -> Option<Row<'_>> {
        self.visible_rows().get(self.selection).copied()
    }

    pub fn set_filter(&mut self, index: usize) {
        if let Some(filter) = self.filters.get(index) {
            debug!(filter = %filter, "Filter changed");
            self.filter = filter.clone();
            self.controls_changed();
        }
    }

    /// A filter or query edit re-renders from the records in memory, which
    /// also replaces a load-error placeholder.
    fn controls_changed(&mut self) {
        self.selection = 0;
        self.placeholder = None;
    }

    pub fn active_filter_index(&self) -> Option<usize> {
        self.filters.iter().position(|f| *f == self.filter)
    }

    pub fn cycle_filter(&mut self, forward: bool) {
        if self.filters.is_empty() {
            return;
        }
        let len = self.filters.len();
        let next = match self.active_filter_index() {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        self.set_filter(next);
    }

    pub fn push_query_char(&mut self, c: char) {
        if self.search_query.chars().count() < MAX_QUERY_LENGTH && !c.is_control() {
            self.search_query.push(c);
            self.controls_changed();
        }
    }

    pub fn pop_query_char(&mut self) {
        self.search_query.pop();
        self.controls_changed();
    }

    pub fn clear_query(&mut self) {
        self.search_query.clear();
        self.controls_changed();
    }

    // =========================================================================
    // Selection and groups
    // =========================================================================

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible_rows().len();
        if len == 0 {
            self.selection = 0;
            return;
        }
        let max = len - 1;
        self.selection = if delta.is_negative() {
            self.selection.saturating_sub(delta.unsigned_abs())
        } else {
            (self.selection + delta as usize).min(max)
        };
    }

    pub fn select_first(&mut self) {
        self.selection = 0;
    }

    pub fn select_last(&mut self) {
        self.selection = self.visible_rows().len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_rows().len();
        self.selection = self.selection.min(len.saturating_sub(1));
    }

    /// Toggle the group under the selection. On an item row the item's
    /// group is toggled and the selection moves to its header.
    pub fn toggle_selected_group(&mut self) {
        let target = {
            let rows = self.visible_rows();
            let Some(row) = rows.get(self.selection) else {
                return;
            };
            let community = match row {
                Row::Header { community, .. } => *community,
                Row::Item(record) => record.community.as_str(),
            };
            let header_index = rows[..=self.selection]
                .iter()
                .rposition(|r| matches!(r, Row::Header { .. }))
                .unwrap_or(0);
            (community.to_string(), header_index)
        };
        let (community, header_index) = target;

        match self.collapse.toggle(&community) {
            Ok(collapsed) => debug!(community = %community, collapsed, "Group toggled"),
            Err(e) => {
                warn!(community = %community, error = %e, "Failed to persist collapse state");
                self.show_toast("Couldn't save group state");
            }
        }
        self.selection = header_index;
        self.clamp_selection();
    }

    /// Cosmetic: true once the list has scrolled past the first rows
    pub fn is_scrolled(&self) -> bool {
        self.selection > SCROLLED_ROWS
    }
}
