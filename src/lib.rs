// Library interface for playstore_tracker
// The binary and the integration tests both build on these modules

pub mod api;
pub mod app_state;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod db;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod pacing;
pub mod pg_db;
pub mod play_store;
pub mod scheduler;
pub mod scraper;
pub mod store;

pub use app_state::AppState;
