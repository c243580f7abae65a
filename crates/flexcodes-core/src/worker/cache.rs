//! Versioned, directory-backed response cache.
//!
//! Each cache generation is a directory under the storage root named after
//! its version tag. An entry is stored as two files keyed by the SHA-256
//! of the request URL: `<key>.json` holds the URL, status and headers,
//! `<key>.body` holds the raw body bytes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::WorkerError;
use crate::net::Response;

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WorkerError + '_ {
    move |source| WorkerError::Cache {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    cached_at: DateTime<Utc>,
    response: Response,
}

/// All cache generations under one root directory.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WorkerError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self { root })
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(urlencoding::encode(name).as_ref())
    }

    /// Open (creating if needed) the store for a version tag
    pub fn open(&self, name: &str) -> Result<CacheStore, WorkerError> {
        let dir = self.store_dir(name);
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        Ok(CacheStore {
            name: name.to_string(),
            dir,
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.store_dir(name).is_dir()
    }

    /// Version tags of every stored generation, sorted
    pub fn keys(&self) -> Result<Vec<String>, WorkerError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let entry = entry.map_err(io_error(&self.root))?;
            if !entry.path().is_dir() {
                continue;
            }
            let raw = entry.file_name().to_string_lossy().into_owned();
            let name = urlencoding::decode(&raw)
                .map(|n| n.into_owned())
                .unwrap_or(raw);
            keys.push(name);
        }
        keys.sort();
        Ok(keys)
    }

    /// Remove a generation. Returns false if it did not exist.
    pub fn delete(&self, name: &str) -> Result<bool, WorkerError> {
        let dir = self.store_dir(name);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&dir)(e)),
        }
    }

    /// Look a URL up in every generation, first match wins
    pub fn match_any(&self, url: &Url) -> Result<Option<Response>, WorkerError> {
        for name in self.keys()? {
            let store = CacheStore {
                dir: self.store_dir(&name),
                name,
            };
            if let Some(response) = store.get(url)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// One cache generation.
#[derive(Debug, Clone)]
pub struct CacheStore {
    name: String,
    dir: PathBuf,
}

impl CacheStore {
    /// Fixed-length file name, whatever the URL length
    fn entry_path(&self, url: &Url, ext: &str) -> PathBuf {
        let key = Sha256::digest(url.as_str().as_bytes());
        self.dir.join(format!("{:x}.{}", key, ext))
    }

    pub fn get(&self, url: &Url) -> Result<Option<Response>, WorkerError> {
        let meta_path = self.entry_path(url, META_EXT);
        let contents = match std::fs::read_to_string(&meta_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&meta_path)(e)),
        };
        let meta: EntryMeta =
            serde_json::from_str(&contents).map_err(|source| WorkerError::Corrupt {
                path: meta_path.clone(),
                source,
            })?;
        if meta.url != url.as_str() {
            debug!(cache = %self.name, url = %url, stored = %meta.url, "Cache key collision");
            return Ok(None);
        }

        let body_path = self.entry_path(url, BODY_EXT);
        let body = match std::fs::read(&body_path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&body_path)(e)),
        };

        debug!(cache = %self.name, url = %url, cached_at = %meta.cached_at, "Cache hit");
        Ok(Some(Response { body, ..meta.response }))
    }

    /// Store a copy of a response, replacing any previous entry for the URL
    pub fn put(&self, url: &Url, response: &Response) -> Result<(), WorkerError> {
        let meta = EntryMeta {
            url: url.to_string(),
            cached_at: Utc::now(),
            response: response.clone(),
        };
        let contents = serde_json::to_string_pretty(&meta).map_err(|source| WorkerError::Corrupt {
            path: self.entry_path(url, META_EXT),
            source,
        })?;

        // Body first so a reader never sees metadata without its body
        let body_path = self.entry_path(url, BODY_EXT);
        std::fs::write(&body_path, &response.body).map_err(io_error(&body_path))?;
        let meta_path = self.entry_path(url, META_EXT);
        std::fs::write(&meta_path, contents).map_err(io_error(&meta_path))?;

        debug!(cache = %self.name, url = %url, bytes = response.body.len(), "Cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://example.com/app/").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_put_get_roundtrip_keeps_headers() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let store = storage.open("flexcodes-v1").unwrap();

        let response = Response::new(200, "a,b\n").with_header("Last-Modified", "x");
        store.put(&url("codes.csv"), &response).unwrap();

        let cached = store.get(&url("codes.csv")).unwrap().unwrap();
        assert_eq!(cached, response);
        assert_eq!(store.get(&url("other.csv")).unwrap(), None);
    }

    #[test]
    fn test_put_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let store = storage.open("v1").unwrap();

        store.put(&url("codes.csv"), &Response::new(200, "old")).unwrap();
        store.put(&url("codes.csv"), &Response::new(200, "new")).unwrap();

        assert_eq!(store.get(&url("codes.csv")).unwrap().unwrap().text(), "new");
    }

    #[test]
    fn test_keys_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        storage.open("flexcodes-v2").unwrap();
        storage.open("flexcodes-v1").unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["flexcodes-v1", "flexcodes-v2"]);
        assert!(storage.has("flexcodes-v1"));

        assert!(storage.delete("flexcodes-v1").unwrap());
        assert!(!storage.delete("flexcodes-v1").unwrap());
        assert_eq!(storage.keys().unwrap(), vec!["flexcodes-v2"]);
    }

    #[test]
    fn test_match_any_searches_all_generations() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        storage.open("a").unwrap();
        let b = storage.open("b").unwrap();
        b.put(&url("style.css"), &Response::new(200, "body{}")).unwrap();

        let found = storage.match_any(&url("style.css")).unwrap().unwrap();
        assert_eq!(found.text(), "body{}");
        assert_eq!(storage.match_any(&url("app.js")).unwrap(), None);
    }

    #[test]
    fn test_long_url_fits_file_name_limit() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let store = storage.open("v1").unwrap();

        let long = Url::parse(&format!("https://example.com/{}/codes.csv", "segment".repeat(60))).unwrap();
        assert!(urlencoding::encode(long.as_str()).len() > 255);

        store.put(&long, &Response::new(200, "a,b\n")).unwrap();
        assert_eq!(store.get(&long).unwrap().unwrap().text(), "a,b\n");

        for entry in std::fs::read_dir(dir.path().join("v1")).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(name.len() < 80, "{:?}", name);
        }
    }

    #[test]
    fn test_binary_body_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path()).unwrap();
        let store = storage.open("v1").unwrap();

        let png = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];
        store.put(&url("favicon.png"), &Response::new(200, png.clone())).unwrap();
        assert_eq!(store.get(&url("favicon.png")).unwrap().unwrap().body, png);
    }
}
