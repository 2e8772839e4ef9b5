#![allow(dead_code)]

use async_trait::async_trait;
use playstore_tracker::config::ScrapeConfig;
use playstore_tracker::models::AppListing;
use playstore_tracker::play_store::{AppSearch, SearchError};
use playstore_tracker::scraper::Scraper;
use playstore_tracker::store::Store;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: String,
    pub country: String,
    pub limit: usize,
    pub at: Instant,
}

/// Scripted stand-in for the Play Store search.
///
/// Unscripted queries return a single listing whose id is derived from the query.
#[derive(Default)]
pub struct FakeSearch {
    results: HashMap<String, Vec<AppListing>>,
    failing: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<SearchCall>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, ids: &[&str]) -> Self {
        let listings = ids.iter().map(|id| listing(id, "Tools")).collect();
        self.results.insert(query.to_string(), listings);
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    /// Every search waits for a permit on `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.query).collect()
    }
}

#[async_trait]
impl AppSearch for FakeSearch {
    async fn search(&self, query: &str, limit: usize, country: &str) -> Result<Vec<AppListing>, SearchError> {
        self.calls.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            country: country.to_string(),
            limit,
            at: Instant::now(),
        });

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }

        if self.failing.contains(query) {
            return Err(SearchError::Status { status: 503 });
        }

        let mut listings = self
            .results
            .get(query)
            .cloned()
            .unwrap_or_else(|| vec![listing(&format!("com.fake.{}", query.replace(' ', "_")), "Tools")]);
        listings.truncate(limit);
        Ok(listings)
    }
}

pub fn listing(id: &str, genre: &str) -> AppListing {
    AppListing {
        app_id: id.to_string(),
        title: Some(format!("Title of {}", id)),
        developer: Some("Acme".to_string()),
        genre: Some(genre.to_string()),
        score: Some(4.2),
        installs: Some("1,000+".to_string()),
        icon: Some(format!("https://play-lh.example/{}", id)),
    }
}

/// Scrape config with no pacing delays
pub fn fast_config() -> ScrapeConfig {
    ScrapeConfig {
        search_interval_ms: 0,
        country_interval_ms: 0,
        ..ScrapeConfig::default()
    }
}

pub async fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("apps.db").display());
    let store = Store::connect(&url).await.unwrap();
    (dir, store)
}

pub async fn scraper_with(search: Arc<FakeSearch>, config: &ScrapeConfig) -> (TempDir, Scraper) {
    let (dir, store) = temp_store().await;
    (dir, Scraper::new(search, store, config))
}
