//! Metrics for external search calls
//!
//! Tracks success rates, error counts and response times per country

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMetrics {
    pub country: String,
    pub total_searches: u64,
    pub successful_searches: u64,
    pub failed_searches: u64,
    pub listings_returned: u64,
    pub rate_limit_hits: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_response_time_ms: f64,
    pub total_response_time_ms: u64,
}

impl SearchMetrics {
    pub fn new(country: String) -> Self {
        Self {
            country,
            total_searches: 0,
            successful_searches: 0,
            failed_searches: 0,
            listings_returned: 0,
            rate_limit_hits: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
            average_response_time_ms: 0.0,
            total_response_time_ms: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_searches == 0 {
            0.0
        } else {
            (self.successful_searches as f64 / self.total_searches as f64) * 100.0
        }
    }

    pub fn record_success(&mut self, listings: usize, response_time: Duration) {
        self.total_searches += 1;
        self.successful_searches += 1;
        self.listings_returned += listings as u64;
        self.last_success = Some(Utc::now());

        self.total_response_time_ms += response_time.as_millis() as u64;
        self.average_response_time_ms =
            self.total_response_time_ms as f64 / self.successful_searches as f64;
    }

    pub fn record_failure(&mut self, error: String, rate_limited: bool) {
        self.total_searches += 1;
        self.failed_searches += 1;
        self.last_failure = Some(Utc::now());
        self.last_error = Some(error);
        if rate_limited {
            self.rate_limit_hits += 1;
        }
    }
}

/// Countries tracked individually before new ones share one bucket.
pub const MAX_TRACKED_COUNTRIES: usize = 64;

/// Bucket for countries seen after the cap is reached.
pub const OTHER_COUNTRIES: &str = "other";

/// Process-wide search metrics, keyed by country
#[derive(Default)]
pub struct MetricsTracker {
    metrics: Mutex<HashMap<String, SearchMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<F: FnOnce(&mut SearchMetrics)>(&self, country: &str, f: F) {
        let mut metrics = match self.metrics.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let key = if metrics.contains_key(country) || metrics.len() < MAX_TRACKED_COUNTRIES {
            country
        } else {
            OTHER_COUNTRIES
        };
        let entry = metrics
            .entry(key.to_string())
            .or_insert_with(|| SearchMetrics::new(key.to_string()));
        f(entry);
    }

    pub fn record_success(&self, country: &str, listings: usize, response_time: Duration) {
        self.with_entry(country, |m| m.record_success(listings, response_time));
    }

    pub fn record_failure(&self, country: &str, error: String, rate_limited: bool) {
        self.with_entry(country, |m| {
            m.record_failure(error, rate_limited);
            log::debug!(
                target: "scraper",
                "search failure recorded country={} success_rate={:.2}%",
                m.country,
                m.success_rate()
            );
        });
    }

    pub fn get_metrics(&self, country: &str) -> Option<SearchMetrics> {
        let metrics = self.metrics.lock().ok()?;
        metrics.get(country).cloned()
    }

    /// Snapshot of every country, sorted by country code
    pub fn get_all_metrics(&self) -> Vec<SearchMetrics> {
        let mut all: Vec<SearchMetrics> = match self.metrics.lock() {
            Ok(m) => m.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        all.sort_by(|a, b| a.country.cmp(&b.country));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = SearchMetrics::new("us".to_string());
        assert_eq!(metrics.country, "us");
        assert_eq!(metrics.total_searches, 0);
        assert_eq!(metrics.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate_calculation() {
        let mut metrics = SearchMetrics::new("us".to_string());
        metrics.record_success(10, Duration::from_millis(100));
        metrics.record_success(5, Duration::from_millis(300));
        metrics.record_failure("Search page returned status 429".to_string(), true);

        assert_eq!(metrics.total_searches, 3);
        assert_eq!(metrics.listings_returned, 15);
        assert_eq!(metrics.rate_limit_hits, 1);
        assert_eq!(metrics.average_response_time_ms, 200.0);
        assert!((metrics.success_rate() - 66.66).abs() < 0.1);
        assert!(metrics.last_error.is_some());
    }

    #[test]
    fn test_tracker() {
        let tracker = MetricsTracker::new();
        tracker.record_success("us", 3, Duration::from_millis(100));
        tracker.record_failure("gb", "timeout".to_string(), false);

        assert_eq!(tracker.get_metrics("us").unwrap().success_rate(), 100.0);
        assert_eq!(tracker.get_metrics("gb").unwrap().failed_searches, 1);
        assert!(tracker.get_metrics("fr").is_none());

        let all = tracker.get_all_metrics();
        let countries: Vec<&str> = all.iter().map(|m| m.country.as_str()).collect();
        assert_eq!(countries, vec!["gb", "us"]);
    }

    #[test]
    fn test_new_countries_share_bucket_past_cap() {
        let tracker = MetricsTracker::new();
        for i in 0..MAX_TRACKED_COUNTRIES + 10 {
            tracker.record_success(&format!("c{}", i), 1, Duration::from_millis(10));
        }
        tracker.record_failure("c0", "timeout".to_string(), false);

        let all = tracker.get_all_metrics();
        assert_eq!(all.len(), MAX_TRACKED_COUNTRIES + 1);
        assert_eq!(tracker.get_metrics(OTHER_COUNTRIES).unwrap().successful_searches, 10);
        assert_eq!(tracker.get_metrics("c0").unwrap().failed_searches, 1);
        assert!(tracker.get_metrics(&format!("c{}", MAX_TRACKED_COUNTRIES)).is_none());
    }
}
