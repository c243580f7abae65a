//! Dataset loader.
//!
//! Fetches the CSV dataset relative to a base URL (so the app can be served
//! from a sub-path), bypassing intermediate caches, and parses it into a
//! fresh record set.

pub mod error;

use std::fmt;

use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::models::AccessCodeRecord;
use crate::net::{Fetch, Request};
use crate::parser::parse_csv;
use crate::utils::format_last_modified;

pub use error::LoadError;

/// Default dataset file name
pub const DATASET_NAME: &str = "codes.csv";

/// Shown in place of the list when the dataset cannot be loaded
pub fn load_error_message(dataset_name: &str) -> String {
    format!("Couldn't load {}. Put it next to index.html.", dataset_name)
}

/// A freshly loaded dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<AccessCodeRecord>,
    pub last_modified: Option<DateTime<FixedOffset>>,
}

impl Dataset {
    /// Status to report after a successful load
    pub fn status(&self) -> LoadStatus {
        match self.last_modified {
            Some(dt) => LoadStatus::Updated(dt),
            None => LoadStatus::Ready,
        }
    }
}

/// Load progress shown next to the counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Updated(DateTime<FixedOffset>),
    Ready,
    Error,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loading => f.write_str("Loading…"),
            LoadStatus::Updated(dt) => write!(f, "Updated {}", format_last_modified(dt)),
            LoadStatus::Ready => f.write_str("Ready"),
            LoadStatus::Error => f.write_str("Load error"),
        }
    }
}

pub struct Loader<F> {
    fetcher: F,
    dataset_url: Url,
    dataset_name: String,
}

impl<F: Fetch> Loader<F> {
    /// Resolve `dataset_name` against `base_url`.
    pub fn new(fetcher: F, base_url: &Url, dataset_name: &str) -> Result<Self, LoadError> {
        let dataset_url = base_url
            .join(dataset_name)
            .map_err(|e| LoadError::InvalidUrl(format!("{}: {}", dataset_name, e)))?;
        debug!(url = %dataset_url, "Dataset URL resolved");

        Ok(Self {
            fetcher,
            dataset_url,
            dataset_name: dataset_name.to_string(),
        })
    }

    pub fn dataset_url(&self) -> &Url {
        &self.dataset_url
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and parse the dataset.
    pub async fn load(&self) -> Result<Dataset, LoadError> {
        let request = Request::no_store(self.dataset_url.clone());
        let response = self.fetcher.fetch(&request).await.map_err(|e| {
            warn!(url = %self.dataset_url, error = %e, "Dataset fetch failed");
            LoadError::Network(e)
        })?;

        if !response.ok() {
            warn!(url = %self.dataset_url, status = response.status, "Dataset fetch returned error status");
            return Err(LoadError::from_status(&self.dataset_name, response.status));
        }

        let last_modified = response
            .header("last-modified")
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok());
        let records = parse_csv(&response.text());
        info!(records = records.len(), "Dataset loaded");

        Ok(Dataset {
            records,
            last_modified,
        })
    }
}
