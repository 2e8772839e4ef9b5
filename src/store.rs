//! Persistence gateway over the `apps` table.
//!
//! The backend is picked from the database URL: `postgres://` URLs go through a
//! deadpool connection pool, anything else is treated as a SQLite file. SQLite
//! operations open a fresh connection per call.

use crate::models::{month_bounds, AppListing, AppRecord, MonthCount, Stats};
use crate::{db, pg_db};
use chrono::{Local, NaiveDate};
use deadpool_postgres::Pool;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("Invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

#[derive(Clone)]
pub enum Store {
    Sqlite(PathBuf),
    Postgres(Pool),
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Sqlite(path) => f.debug_tuple("Sqlite").field(path).finish(),
            Store::Postgres(_) => f.write_str("Postgres"),
        }
    }
}

fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

fn sqlite_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("sqlite://").unwrap_or(url))
}

impl Store {
    /// Connects to the backend named by `database_url` and ensures the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let store = if is_postgres_url(database_url) {
            Store::Postgres(pg_db::create_pool(database_url)?)
        } else {
            Store::Sqlite(sqlite_path(database_url))
        };
        store.create_tables().await?;
        Ok(store)
    }

    pub async fn create_tables(&self) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(path) => {
                let conn = db::open(path)?;
                db::create_tables(&conn)?;
                Ok(())
            }
            Store::Postgres(pool) => pg_db::create_tables(pool).await,
        }
    }

    /// Upserts one listing, stamped with today's local date.
    pub async fn insert_app(&self, app: &AppListing) -> Result<(), StoreError> {
        self.insert_app_on(app, Local::now().date_naive()).await
    }

    pub async fn insert_app_on(&self, app: &AppListing, today: NaiveDate) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(path) => {
                let conn = db::open(path)?;
                db::insert_app(&conn, app, today)?;
                Ok(())
            }
            Store::Postgres(pool) => pg_db::insert_app(pool, app, today).await,
        }
    }

    pub async fn get_apps_by_month(&self, year: i32, month: u32) -> Result<Vec<AppRecord>, StoreError> {
        let (start, end) =
            month_bounds(year, month).ok_or(StoreError::InvalidMonth { year, month })?;
        match self {
            Store::Sqlite(path) => {
                let conn = db::open(path)?;
                Ok(db::get_apps_first_seen_between(&conn, start, end)?)
            }
            Store::Postgres(pool) => pg_db::get_apps_first_seen_between(pool, start, end).await,
        }
    }

    pub async fn get_all_months(&self) -> Result<Vec<MonthCount>, StoreError> {
        match self {
            Store::Sqlite(path) => {
                let conn = db::open(path)?;
                Ok(db::get_all_months(&conn)?)
            }
            Store::Postgres(pool) => pg_db::get_all_months(pool).await,
        }
    }

    pub async fn get_stats(&self) -> Result<Stats, StoreError> {
        match self {
            Store::Sqlite(path) => {
                let conn = db::open(path)?;
                Ok(db::get_stats(&conn)?)
            }
            Store::Postgres(pool) => pg_db::get_stats(pool).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert!(is_postgres_url("postgres://user@localhost/apps"));
        assert!(is_postgres_url("postgresql://localhost/apps"));
        assert!(!is_postgres_url("sqlite://apps.db"));
        assert_eq!(sqlite_path("sqlite://data/apps.db"), PathBuf::from("data/apps.db"));
        assert_eq!(sqlite_path("apps.db"), PathBuf::from("apps.db"));
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("apps.db").display());
        let store = Store::connect(&url).await.unwrap();

        let app = AppListing {
            app_id: "com.example".to_string(),
            genre: Some("Tools".to_string()),
            ..Default::default()
        };
        let day = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        store.insert_app_on(&app, day).await.unwrap();
        store
            .insert_app_on(&app, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
            .await
            .unwrap();

        let july = store.get_apps_by_month(2025, 7).await.unwrap();
        assert_eq!(july.len(), 1);
        assert_eq!(july[0].first_seen, day);
        assert!(store.get_apps_by_month(2025, 8).await.unwrap().is_empty());

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_apps, 1);
    }

    #[tokio::test]
    async fn test_invalid_month() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(dir.path().join("apps.db").to_str().unwrap())
            .await
            .unwrap();
        let err = store.get_apps_by_month(2025, 13).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidMonth { month: 13, .. }));
    }
}
