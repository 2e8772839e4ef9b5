//! Application state for the Actix-web server
//!
//! `AppState` is wrapped in `web::Data` and shared by every handler and by the
//! background sweeps they start.

use crate::config::Config;
use crate::crawler::SweepRegistry;
use crate::scraper::Scraper;
use crate::store::Store;
use std::sync::Arc;

pub struct AppState {
    /// Scrape engine; owns the store, the search client and the search pacer
    pub scraper: Arc<Scraper>,
    /// Progress and single-flight state of background sweeps
    pub sweeps: Arc<SweepRegistry>,
    pub config: Config,
}

impl AppState {
    pub fn new(scraper: Scraper, config: Config) -> Self {
        Self {
            scraper: Arc::new(scraper),
            sweeps: Arc::new(SweepRegistry::new()),
            config,
        }
    }

    pub fn store(&self) -> &Store {
        self.scraper.store()
    }
}
