use crate::catalog::COUNTRIES;
use crate::scraper::{QueryOutcome, Scraper, SweepReport, FULL_SCRAPE_COUNTRIES};
use crate::AppState;
use actix_web::web;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Failed queries kept per scope in the progress snapshot.
const MAX_RECORDED_FAILURES: usize = 20;

/// Finished client-parameterized sweeps kept in the registry.
const MAX_FINISHED_SWEEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    All,
    Apps,
    Games,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::All => "all",
            CategoryKind::Apps => "apps",
            CategoryKind::Games => "games",
        }
    }
}

/// What a sweep covers. Two sweeps with the same scope never run at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SweepScope {
    Search { query: String, country: String },
    NewApps { country: String },
    AllNewApps,
    Categories(CategoryKind),
    Queries,
    Full,
}

impl SweepScope {
    pub fn key(&self) -> String {
        match self {
            SweepScope::Search { query, country } => format!("search:{}@{}", query, country),
            SweepScope::NewApps { country } => format!("new:{}", country),
            SweepScope::AllNewApps => "new:all".to_string(),
            SweepScope::Categories(kind) => format!("categories:{}", kind.as_str()),
            SweepScope::Queries => "queries".to_string(),
            SweepScope::Full => "full".to_string(),
        }
    }

    /// Scopes whose key comes from request parameters
    pub fn is_parameterized(&self) -> bool {
        matches!(self, SweepScope::Search { .. } | SweepScope::NewApps { .. })
    }
}

#[derive(Debug, Default, Serialize, Clone)]
pub struct SweepProgress {
    pub scope: String,
    pub in_progress: bool,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub queries_run: usize,
    pub queries_failed: usize,
    pub apps_scraped: usize,
    pub failures: Vec<QueryOutcome>,
    pub last_error: Option<String>,
    #[serde(skip)]
    evictable: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("sweep {0} is already running")]
pub struct AlreadyRunning(pub String);

/// In-memory progress per scope, doubling as the single-flight lock.
#[derive(Debug, Default)]
pub struct SweepRegistry {
    sweeps: Mutex<HashMap<String, SweepProgress>>,
}

impl SweepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SweepProgress>> {
        self.sweeps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `scope` as running, or refuses if it already is.
    pub fn try_begin(self: &Arc<Self>, scope: &SweepScope) -> Result<SweepTicket, AlreadyRunning> {
        let key = scope.key();
        let mut sweeps = self.lock();
        if sweeps.get(&key).map(|p| p.in_progress).unwrap_or(false) {
            return Err(AlreadyRunning(key));
        }
        sweeps.insert(
            key.clone(),
            SweepProgress {
                scope: key.clone(),
                in_progress: true,
                started_at: Some(Utc::now().timestamp()),
                evictable: scope.is_parameterized(),
                ..Default::default()
            },
        );
        Ok(SweepTicket {
            registry: Arc::clone(self),
            key,
            finished: false,
        })
    }

    pub fn get(&self, key: &str) -> Option<SweepProgress> {
        self.lock().get(key).cloned()
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.lock().get(key).map(|p| p.in_progress).unwrap_or(false)
    }

    /// All known scopes, sorted by key
    pub fn snapshot(&self) -> Vec<SweepProgress> {
        let mut all: Vec<SweepProgress> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.scope.cmp(&b.scope));
        all
    }
}

/// Drops the oldest finished parameterized sweeps beyond `MAX_FINISHED_SWEEPS`.
fn evict_finished(sweeps: &mut HashMap<String, SweepProgress>) {
    let mut finished: Vec<(i64, String)> = sweeps
        .values()
        .filter(|p| p.evictable && !p.in_progress)
        .map(|p| (p.finished_at.unwrap_or(0), p.scope.clone()))
        .collect();
    if finished.len() <= MAX_FINISHED_SWEEPS {
        return;
    }
    finished.sort();
    let excess = finished.len() - MAX_FINISHED_SWEEPS;
    for (_, key) in finished.into_iter().take(excess) {
        sweeps.remove(&key);
    }
}

/// Running claim on a scope. Dropping it without `finish` records an abort.
pub struct SweepTicket {
    registry: Arc<SweepRegistry>,
    key: String,
    finished: bool,
}

impl SweepTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn finish(mut self, report: &SweepReport) {
        let mut sweeps = self.registry.lock();
        if let Some(p) = sweeps.get_mut(&self.key) {
            p.in_progress = false;
            p.finished_at = Some(Utc::now().timestamp());
            p.queries_run = report.queries_run();
            p.queries_failed = report.failures().count();
            p.apps_scraped = report.scraped();
            p.failures = report.failures().take(MAX_RECORDED_FAILURES).cloned().collect();
        }
        evict_finished(&mut sweeps);
        self.finished = true;
    }
}

impl Drop for SweepTicket {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut sweeps = self.registry.lock();
        if let Some(p) = sweeps.get_mut(&self.key) {
            p.in_progress = false;
            p.finished_at = Some(Utc::now().timestamp());
            p.last_error = Some("sweep aborted before completion".to_string());
        }
        evict_finished(&mut sweeps);
    }
}

/// Runs the sweep named by `scope` to completion.
pub async fn run_sweep(scraper: &Scraper, scope: &SweepScope, limit: usize) -> SweepReport {
    match scope {
        SweepScope::Search { query, country } => scraper.scrape_by_search(query, limit, country).await.into(),
        SweepScope::NewApps { country } => scraper.scrape_new_apps(country, limit).await,
        SweepScope::AllNewApps => {
            scraper
                .scrape_all_new_apps(Some(&COUNTRIES[..FULL_SCRAPE_COUNTRIES]), limit)
                .await
        }
        SweepScope::Categories(CategoryKind::All) => scraper.scrape_all_categories(limit).await,
        SweepScope::Categories(CategoryKind::Apps) => scraper.scrape_app_categories(limit).await,
        SweepScope::Categories(CategoryKind::Games) => scraper.scrape_game_categories(limit).await,
        SweepScope::Queries => scraper.scrape_by_queries(None, limit).await,
        SweepScope::Full => scraper.full_scrape().await,
    }
}

/// Starts `scope` in the background unless it is already running.
/// Returns the scope key.
pub fn spawn_sweep(
    data: web::Data<AppState>,
    scope: SweepScope,
    limit: usize,
) -> Result<String, AlreadyRunning> {
    let ticket = data.sweeps.try_begin(&scope)?;
    let key = ticket.key().to_string();
    let scraper = Arc::clone(&data.scraper);

    actix_web::rt::spawn(async move {
        info!(target: "crawler", "sweep started scope={} limit={}", ticket.key(), limit);
        let report = run_sweep(&scraper, &scope, limit).await;
        let failed = report.failures().count();
        if failed > 0 {
            warn!(
                target: "crawler",
                "sweep finished with failures scope={} failed={} of {}",
                ticket.key(),
                failed,
                report.queries_run()
            );
        } else {
            info!(
                target: "crawler",
                "sweep finished scope={} queries={} scraped={}",
                ticket.key(),
                report.queries_run(),
                report.scraped()
            );
        }
        ticket.finish(&report);
    });

    Ok(key)
}
