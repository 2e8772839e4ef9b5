//! Scrape engine: paced search calls, upserts and the sweeps built on them.
//!
//! Every external call goes through one shared [`Pacer`], so concurrent
//! sweeps on the same engine still respect the configured search interval.
//! Failures are recorded per query in a [`QueryOutcome`]; they never abort the
//! enclosing sweep.

use crate::catalog::{self, COUNTRIES, NEW_APP_QUERIES, SEARCH_QUERIES};
use crate::config::ScrapeConfig;
use crate::metrics::MetricsTracker;
use crate::models::AppListing;
use crate::pacing::Pacer;
use crate::play_store::AppSearch;
use crate::store::Store;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Country used by category and query sweeps.
pub const DEFAULT_COUNTRY: &str = "us";

/// Countries covered by `scrape_all_new_apps` when none are given.
pub const DEFAULT_NEW_APP_COUNTRIES: usize = 3;

/// Countries covered by the new-apps stage of a full scrape.
pub const FULL_SCRAPE_COUNTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryStatus {
    Ok { hits: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    pub country: String,
    #[serde(flatten)]
    pub status: QueryStatus,
    /// Listings that were stored, in search order
    #[serde(skip)]
    pub apps: Vec<AppListing>,
}

impl QueryOutcome {
    fn ok(query: &str, country: &str, apps: Vec<AppListing>) -> Self {
        Self {
            query: query.to_string(),
            country: country.to_string(),
            status: QueryStatus::Ok { hits: apps.len() },
            apps,
        }
    }

    fn failed(query: &str, country: &str, apps: Vec<AppListing>, reason: String) -> Self {
        Self {
            query: query.to_string(),
            country: country.to_string(),
            status: QueryStatus::Failed { reason },
            apps,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, QueryStatus::Ok { .. })
    }
}

/// Ordered per-query outcomes of one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub outcomes: Vec<QueryOutcome>,
}

impl SweepReport {
    pub fn push(&mut self, outcome: QueryOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn extend(&mut self, other: SweepReport) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn queries_run(&self) -> usize {
        self.outcomes.len()
    }

    /// Total listings stored, counting an app once per query that found it
    pub fn scraped(&self) -> usize {
        self.outcomes.iter().map(|o| o.apps.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &QueryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn apps(&self) -> impl Iterator<Item = &AppListing> {
        self.outcomes.iter().flat_map(|o| o.apps.iter())
    }
}

impl From<QueryOutcome> for SweepReport {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            outcomes: vec![outcome],
        }
    }
}

pub struct Scraper {
    search: Arc<dyn AppSearch>,
    store: Store,
    metrics: Arc<MetricsTracker>,
    search_pacer: Mutex<Pacer>,
    country_interval: Duration,
    full_scrape_limit: usize,
}

impl Scraper {
    pub fn new(search: Arc<dyn AppSearch>, store: Store, config: &ScrapeConfig) -> Self {
        Self {
            search,
            store,
            metrics: Arc::new(MetricsTracker::new()),
            search_pacer: Mutex::new(Pacer::from_millis(config.search_interval_ms)),
            country_interval: Duration::from_millis(config.country_interval_ms),
            full_scrape_limit: config.full_scrape_limit,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    /// Searches once and upserts every hit.
    ///
    /// A search failure yields a failed outcome with no apps. A store failure
    /// yields a failed outcome carrying the apps stored before it.
    pub async fn scrape_by_search(&self, query: &str, limit: usize, country: &str) -> QueryOutcome {
        self.search_pacer.lock().await.ready().await;

        let started = Instant::now();
        let listings = match self.search.search(query, limit, country).await {
            Ok(listings) => {
                self.metrics.record_success(country, listings.len(), started.elapsed());
                listings
            }
            Err(e) => {
                warn!(target: "scraper", "search failed query={:?} country={} error={}", query, country, e);
                self.metrics.record_failure(country, e.to_string(), e.is_rate_limited());
                return QueryOutcome::failed(query, country, Vec::new(), e.to_string());
            }
        };

        let mut stored = Vec::with_capacity(listings.len());
        for listing in listings {
            if let Err(e) = self.store.insert_app(&listing).await {
                warn!(
                    target: "scraper",
                    "store failed query={:?} country={} app_id={} error={}",
                    query,
                    country,
                    listing.app_id,
                    e
                );
                return QueryOutcome::failed(query, country, stored, format!("store error: {}", e));
            }
            stored.push(listing);
        }

        info!(target: "scraper", "search completed query={:?} country={} hits={}", query, country, stored.len());
        QueryOutcome::ok(query, country, stored)
    }

    /// Runs the fixed "new app" queries against one country.
    pub async fn scrape_new_apps(&self, country: &str, limit: usize) -> SweepReport {
        let mut report = SweepReport::default();
        for query in NEW_APP_QUERIES {
            report.push(self.scrape_by_search(query, limit, country).await);
        }
        report
    }

    /// Runs [`Scraper::scrape_new_apps`] per country, pausing for the configured
    /// country interval after each country finishes. `None` means the first
    /// three catalog countries.
    pub async fn scrape_all_new_apps(&self, countries: Option<&[&str]>, limit_per: usize) -> SweepReport {
        let countries = countries.unwrap_or(&COUNTRIES[..DEFAULT_NEW_APP_COUNTRIES]);
        let mut report = SweepReport::default();

        for (i, country) in countries.iter().enumerate() {
            if i > 0 {
                sleep(self.country_interval).await;
            }
            info!(target: "scraper", "scraping new apps country={}", country);
            report.extend(self.scrape_new_apps(country, limit_per).await);
        }
        log_summary("new apps", &report);
        report
    }

    pub async fn scrape_by_category(&self, category: &str, country: &str, limit: usize) -> QueryOutcome {
        self.scrape_by_search(&catalog::category_query(category), limit, country)
            .await
    }

    async fn scrape_categories(&self, label: &str, categories: &[&str], limit: usize) -> SweepReport {
        let mut report = SweepReport::default();
        for category in categories {
            info!(target: "scraper", "scraping {} category={}", label, category);
            report.push(self.scrape_by_category(category, DEFAULT_COUNTRY, limit).await);
        }
        log_summary(label, &report);
        report
    }

    /// All 50 categories, apps first.
    pub async fn scrape_all_categories(&self, limit_per_category: usize) -> SweepReport {
        self.scrape_categories("category", &catalog::categories(), limit_per_category)
            .await
    }

    pub async fn scrape_app_categories(&self, limit_per_category: usize) -> SweepReport {
        self.scrape_categories("app category", catalog::APP_CATEGORIES, limit_per_category)
            .await
    }

    pub async fn scrape_game_categories(&self, limit_per_category: usize) -> SweepReport {
        self.scrape_categories("game category", catalog::GAME_CATEGORIES, limit_per_category)
            .await
    }

    /// Runs each query against the default country. `None` means the full catalog.
    pub async fn scrape_by_queries(&self, queries: Option<&[&str]>, limit: usize) -> SweepReport {
        let queries = queries.unwrap_or(SEARCH_QUERIES);
        let mut report = SweepReport::default();
        for query in queries {
            info!(target: "scraper", "searching query={:?}", query);
            report.push(self.scrape_by_search(query, limit, DEFAULT_COUNTRY).await);
        }
        log_summary("query", &report);
        report
    }

    /// New apps in five countries, then every category, then every query.
    pub async fn full_scrape(&self) -> SweepReport {
        let limit = self.full_scrape_limit;
        let mut report = SweepReport::default();

        info!(target: "scraper", "full scrape stage=new_apps");
        report.extend(
            self.scrape_all_new_apps(Some(&COUNTRIES[..FULL_SCRAPE_COUNTRIES]), limit)
                .await,
        );

        info!(target: "scraper", "full scrape stage=categories");
        report.extend(self.scrape_all_categories(limit).await);

        info!(target: "scraper", "full scrape stage=queries");
        report.extend(self.scrape_by_queries(None, limit).await);

        log_summary("full", &report);
        report
    }
}

fn log_summary(label: &str, report: &SweepReport) {
    info!(
        target: "scraper",
        "sweep finished kind={:?} queries={} failed={} scraped={}",
        label,
        report.queries_run(),
        report.failures().count(),
        report.scraped()
    );
}
