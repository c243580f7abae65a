use thiserror::Error;

use crate::net::FetchError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{name} not found ({status})")]
    NotFound { name: String, status: u16 },

    #[error("{name} could not be loaded ({status})")]
    Status { name: String, status: u16 },

    #[error(transparent)]
    Network(#[from] FetchError),

    #[error("Invalid dataset URL: {0}")]
    InvalidUrl(String),
}

impl LoadError {
    /// Classify a failing HTTP status. 404 and the worker's 504
    /// "unavailable" both mean the dataset is not reachable.
    pub fn from_status(name: &str, status: u16) -> Self {
        match status {
            404 | 410 | 504 => LoadError::NotFound {
                name: name.to_string(),
                status,
            },
            _ => LoadError::Status {
                name: name.to_string(),
                status,
            },
        }
    }
}
