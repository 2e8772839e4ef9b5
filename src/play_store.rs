//! Google Play search client.
//!
//! The search page embeds its data as `AF_initDataCallback({key: 'ds:N', ...
//! data: <json>, sideChannel: {}});` script blocks. Results live in dataset
//! `ds:4` as positional arrays, so fields are read by element path.

use crate::http_client::HttpClient;
use crate::models::AppListing;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

pub const BASE_URL: &str = "https://play.google.com";

const RESULTS_DATASET: &str = "ds:4";

static DATASET_CALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)AF_initDataCallback\(\{key:\s*'(ds:\d+)'.*?data:(.*?), sideChannel: \{\}\}\);")
        .expect("valid dataset regex")
});

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search page returned status {status}")]
    Status { status: u16 },

    #[error("Malformed dataset {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SearchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SearchError::Status { status: 429 })
    }
}

/// External app search service.
#[async_trait]
pub trait AppSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize, country: &str) -> Result<Vec<AppListing>, SearchError>;
}

pub struct PlayStoreSearch {
    http: HttpClient,
    base_url: String,
    lang: String,
}

impl PlayStoreSearch {
    pub fn new(http: HttpClient, base_url: &str, lang: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: lang.to_string(),
        }
    }
}

#[async_trait]
impl AppSearch for PlayStoreSearch {
    async fn search(&self, query: &str, limit: usize, country: &str) -> Result<Vec<AppListing>, SearchError> {
        let url = format!("{}/store/search", self.base_url);
        let response = self
            .http
            .get(
                &url,
                &[("q", query), ("c", "apps"), ("hl", self.lang.as_str()), ("gl", country)],
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let listings = parse_search_results(&body, limit)?;
        log::debug!(
            target: "play_store",
            "search page parsed query={:?} country={} listings={}",
            query,
            country,
            listings.len()
        );
        Ok(listings)
    }
}

/// Element paths of listing fields inside one result entry.
struct ListingPaths {
    app_id: &'static [usize],
    title: &'static [usize],
    developer: &'static [usize],
    genre: &'static [usize],
    score: &'static [usize],
    installs: &'static [usize],
    icon: &'static [usize],
}

const CLUSTER_ENTRY: ListingPaths = ListingPaths {
    app_id: &[0, 0, 0],
    title: &[0, 3],
    developer: &[0, 14],
    genre: &[0, 5],
    score: &[0, 4, 1],
    installs: &[0, 15],
    icon: &[0, 1, 3, 2],
};

const TOP_RESULT: ListingPaths = ListingPaths {
    app_id: &[11, 0, 0],
    title: &[2, 0, 0],
    developer: &[2, 68, 0],
    genre: &[2, 79, 0, 0, 0],
    score: &[2, 51, 0, 1],
    installs: &[2, 13, 0],
    icon: &[2, 95, 0, 3, 2],
};

const TOP_RESULT_PATH: &[usize] = &[0, 1, 0, 23, 16];
const SECTIONS_PATH: &[usize] = &[0, 1];
const CLUSTER_PATH: &[usize] = &[22, 0];

fn at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, &i| v.get(i))
}

fn text_at(value: &Value, path: &[usize]) -> Option<String> {
    at(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn listing_at(entry: &Value, paths: &ListingPaths) -> Option<AppListing> {
    Some(AppListing {
        app_id: text_at(entry, paths.app_id)?,
        title: text_at(entry, paths.title),
        developer: text_at(entry, paths.developer),
        genre: text_at(entry, paths.genre),
        score: at(entry, paths.score).and_then(Value::as_f64),
        installs: text_at(entry, paths.installs),
        icon: text_at(entry, paths.icon),
    })
}

/// Raw JSON payload of the dataset with the given key, if embedded in the page.
pub fn find_dataset<'a>(html: &'a str, key: &str) -> Option<&'a str> {
    DATASET_CALLBACK
        .captures_iter(html)
        .find(|cap| &cap[1] == key)
        .and_then(|cap| cap.get(2))
        .map(|m| m.as_str())
}

/// Extracts up to `limit` listings from a search results page.
///
/// A page without the results dataset yields no listings. The optional top
/// result comes first; duplicate app ids are dropped.
pub fn parse_search_results(html: &str, limit: usize) -> Result<Vec<AppListing>, SearchError> {
    let raw = match find_dataset(html, RESULTS_DATASET) {
        Some(raw) => raw,
        None => {
            log::debug!(target: "play_store", "no {} dataset on search page", RESULTS_DATASET);
            return Ok(Vec::new());
        }
    };
    let dataset: Value = serde_json::from_str(raw).map_err(|source| SearchError::Json {
        key: RESULTS_DATASET.to_string(),
        source,
    })?;

    let top = at(&dataset, TOP_RESULT_PATH).and_then(|entry| listing_at(entry, &TOP_RESULT));

    let cluster: &[Value] = at(&dataset, SECTIONS_PATH)
        .and_then(Value::as_array)
        .and_then(|sections| {
            sections
                .iter()
                .find_map(|section| at(section, CLUSTER_PATH).and_then(Value::as_array))
        })
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut seen = HashSet::new();
    let listings = top
        .into_iter()
        .chain(cluster.iter().filter_map(|entry| listing_at(entry, &CLUSTER_ENTRY)))
        .filter(|listing| seen.insert(listing.app_id.clone()))
        .take(limit)
        .collect();

    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn put(root: &mut Value, path: &[usize], leaf: Value) {
        let mut node = root;
        for &i in path {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            let arr = node.as_array_mut().unwrap();
            if arr.len() <= i {
                arr.resize(i + 1, Value::Null);
            }
            node = &mut arr[i];
        }
        *node = leaf;
    }

    fn cluster_entry(id: &str, title: &str, genre: &str, score: f64) -> Value {
        let mut entry = Value::Null;
        put(&mut entry, CLUSTER_ENTRY.app_id, json!(id));
        put(&mut entry, CLUSTER_ENTRY.title, json!(title));
        put(&mut entry, CLUSTER_ENTRY.developer, json!("Acme"));
        put(&mut entry, CLUSTER_ENTRY.genre, json!(genre));
        put(&mut entry, CLUSTER_ENTRY.score, json!(score));
        put(&mut entry, CLUSTER_ENTRY.installs, json!("10,000+"));
        put(&mut entry, CLUSTER_ENTRY.icon, json!(format!("https://play-lh.example/{}", id)));
        entry
    }

    fn page(dataset: &Value) -> String {
        format!(
            "<html><script nonce=\"a\">AF_initDataCallback({{key: 'ds:1', hash: '1', data:[1,2], sideChannel: {{}}}});</script>\
             <script nonce=\"b\">AF_initDataCallback({{key: 'ds:4', hash: '7', data:{}, sideChannel: {{}}}});</script></html>",
            dataset
        )
    }

    fn results_dataset(entries: Vec<Value>) -> Value {
        let mut ds = Value::Null;
        put(&mut ds, &[0, 1, 0], json!(null));
        put(&mut ds, &[0, 1, 1, 22, 0], Value::Array(entries));
        ds
    }

    #[test]
    fn test_find_dataset_by_key() {
        let html = page(&json!([[]]));
        assert_eq!(find_dataset(&html, "ds:1"), Some("[1,2]"));
        assert_eq!(find_dataset(&html, "ds:4"), Some("[[]]"));
        assert_eq!(find_dataset(&html, "ds:9"), None);
    }

    #[test]
    fn test_find_dataset_returns_slice_of_page() {
        let pages: Vec<String> = (1..=3).map(|n| page(&json!([n]))).collect();
        let found: Vec<&str> = pages.iter().filter_map(|html| find_dataset(html, "ds:4")).collect();
        assert_eq!(found, vec!["[1]", "[2]", "[3]"]);
    }

    #[test]
    fn test_parse_cluster_entries() {
        let ds = results_dataset(vec![
            cluster_entry("com.one", "One", "Tools", 4.5),
            cluster_entry("com.two", "Two", "Puzzle", 3.9),
        ]);
        let listings = parse_search_results(&page(&ds), 10).unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].app_id, "com.one");
        assert_eq!(listings[0].title.as_deref(), Some("One"));
        assert_eq!(listings[0].developer.as_deref(), Some("Acme"));
        assert_eq!(listings[0].genre.as_deref(), Some("Tools"));
        assert_eq!(listings[0].score, Some(4.5));
        assert_eq!(listings[0].installs.as_deref(), Some("10,000+"));
        assert_eq!(listings[1].icon.as_deref(), Some("https://play-lh.example/com.two"));
    }

    #[test]
    fn test_parse_respects_limit() {
        let entries = (0..5)
            .map(|i| cluster_entry(&format!("com.app{}", i), "App", "Tools", 4.0))
            .collect();
        let listings = parse_search_results(&page(&results_dataset(entries)), 3).unwrap();
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[2].app_id, "com.app2");
    }

    #[test]
    fn test_top_result_comes_first_and_is_not_repeated() {
        let mut ds = results_dataset(vec![
            cluster_entry("com.top", "Top", "Tools", 4.8),
            cluster_entry("com.next", "Next", "Tools", 4.1),
        ]);
        let mut top = Value::Null;
        put(&mut top, TOP_RESULT.app_id, json!("com.top"));
        put(&mut top, TOP_RESULT.title, json!("Top"));
        put(&mut top, TOP_RESULT.score, json!(4.8));
        put(&mut ds, TOP_RESULT_PATH, top);

        let listings = parse_search_results(&page(&ds), 10).unwrap();
        let ids: Vec<&str> = listings.iter().map(|l| l.app_id.as_str()).collect();
        assert_eq!(ids, vec!["com.top", "com.next"]);
        assert_eq!(listings[0].score, Some(4.8));
        assert_eq!(listings[0].developer, None);
    }

    #[test]
    fn test_entries_without_app_id_are_skipped() {
        let mut broken = cluster_entry("x", "Broken", "Tools", 1.0);
        put(&mut broken, CLUSTER_ENTRY.app_id, Value::Null);
        let ds = results_dataset(vec![broken, cluster_entry("com.ok", "Ok", "Tools", 4.0)]);

        let listings = parse_search_results(&page(&ds), 10).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].app_id, "com.ok");
    }

    #[test]
    fn test_missing_dataset_is_empty() {
        let listings = parse_search_results("<html><body>No results</body></html>", 10).unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn test_malformed_dataset_is_error() {
        let html = "<script>AF_initDataCallback({key: 'ds:4', hash: '7', data:[[1,, sideChannel: {}});</script>";
        let err = parse_search_results(html, 10).unwrap_err();
        assert!(matches!(err, SearchError::Json { ref key, .. } if key == "ds:4"));
    }

    #[test]
    fn test_rate_limited_status() {
        assert!(SearchError::Status { status: 429 }.is_rate_limited());
        assert!(!SearchError::Status { status: 500 }.is_rate_limited());
    }
}
