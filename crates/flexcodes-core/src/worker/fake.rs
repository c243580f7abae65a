//! In-memory network for worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use reqwest::Url;

use crate::net::{Fetch, FetchError, Request, Response};

pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<Url, Response>>,
    online: AtomicBool,
    requests: AtomicUsize,
    last: Mutex<Option<Request>>,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub(crate) fn serve(&self, url: Url, response: Response) {
        self.routes.lock().unwrap().insert(url, response);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<Request> {
        self.last.lock().unwrap().clone()
    }
}

impl Fetch for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(FetchError::Network("offline".to_string()));
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "")))
    }
}
