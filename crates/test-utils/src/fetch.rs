use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use serde_json::Value;
use veridian_resolver::provider::Fetcher;

/// A fetcher serving canned JSON documents. Fetching a URL that was not
/// added is an error, so tests notice unexpected network access.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    documents: Arc<Mutex<HashMap<String, Value>>>,
}

impl StaticFetcher {
    /// An empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the given document at the given URL.
    pub fn add(&self, url: impl Into<String>, document: Value) {
        self.documents.lock().expect("should lock").insert(url.into(), document);
    }
}

impl Fetcher for StaticFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.documents
            .lock()
            .expect("should lock")
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no document at {url}"))
    }
}
