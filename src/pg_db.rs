use crate::models::{AppListing, AppRecord, CategoryCount, DateRange, MonthCount, Stats};
use chrono::NaiveDate;
use deadpool_postgres::{Config, CreatePoolError, ManagerConfig, Pool, RecyclingMethod, Runtime};
use log::{error, info};
use tokio_postgres::{NoTls, Row};

use crate::store::StoreError;

/// Creates a PostgreSQL connection pool from a `postgres://` URL
pub fn create_pool(database_url: &str) -> Result<Pool, CreatePoolError> {
    info!(target: "store", "Creating PostgreSQL connection pool...");

    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;

    info!(target: "store", "PostgreSQL connection pool created successfully");
    Ok(pool)
}

pub async fn create_tables(pool: &Pool) -> Result<(), StoreError> {
    let client = pool.get().await?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS apps (
                app_id TEXT PRIMARY KEY,
                title TEXT,
                developer TEXT,
                category TEXT,
                score DOUBLE PRECISION,
                installs TEXT,
                icon_url TEXT,
                first_seen DATE NOT NULL,
                last_updated DATE NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_apps_first_seen ON apps(first_seen);
            CREATE INDEX IF NOT EXISTS idx_apps_category ON apps(category);",
        )
        .await?;

    info!(target: "store", "Tables ensured.");
    Ok(())
}

/// Insert app (upsert). Conflicts only move `last_updated`.
pub async fn insert_app(pool: &Pool, app: &AppListing, today: NaiveDate) -> Result<(), StoreError> {
    let client = pool.get().await?;

    match client
        .execute(
            "INSERT INTO apps (app_id, title, developer, category, score, installs, icon_url, first_seen, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             ON CONFLICT (app_id) DO UPDATE SET last_updated = EXCLUDED.last_updated",
            &[
                &app.app_id,
                &app.title,
                &app.developer,
                &app.genre,
                &app.score,
                &app.installs,
                &app.icon,
                &today,
            ],
        )
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(target: "store", "Failed to insert app app_id={}: {}", app.app_id, e);
            Err(e.into())
        }
    }
}

fn app_from_row(row: &Row) -> Result<AppRecord, tokio_postgres::Error> {
    Ok(AppRecord {
        app_id: row.try_get(0)?,
        title: row.try_get(1)?,
        developer: row.try_get(2)?,
        category: row.try_get(3)?,
        score: row.try_get(4)?,
        installs: row.try_get(5)?,
        icon_url: row.try_get(6)?,
        first_seen: row.try_get(7)?,
        last_updated: row.try_get(8)?,
    })
}

/// Apps first seen in `[start, end)`, newest first
pub async fn get_apps_first_seen_between(
    pool: &Pool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AppRecord>, StoreError> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT app_id, title, developer, category, score, installs, icon_url, first_seen, last_updated
             FROM apps WHERE first_seen >= $1 AND first_seen < $2
             ORDER BY first_seen DESC, app_id",
            &[&start, &end],
        )
        .await?;

    Ok(rows.iter().map(app_from_row).collect::<Result<Vec<_>, _>>()?)
}

pub async fn get_all_months(pool: &Pool) -> Result<Vec<MonthCount>, StoreError> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT TO_CHAR(first_seen, 'YYYY-MM') AS month, COUNT(*) AS count
             FROM apps GROUP BY month ORDER BY month DESC",
            &[],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            Ok(MonthCount {
                month: row.try_get(0)?,
                count: row.try_get(1)?,
            })
        })
        .collect::<Result<Vec<_>, tokio_postgres::Error>>()?)
}

pub async fn get_stats(pool: &Pool) -> Result<Stats, StoreError> {
    let client = pool.get().await?;

    let total_row = client.query_one("SELECT COUNT(*) FROM apps", &[]).await?;
    let total_apps: i64 = total_row.try_get(0)?;

    let category_rows = client
        .query(
            "SELECT category, COUNT(*) AS count FROM apps
             GROUP BY category ORDER BY count DESC, category LIMIT 10",
            &[],
        )
        .await?;
    let by_category = category_rows
        .iter()
        .map(|row| {
            Ok(CategoryCount {
                category: row.try_get(0)?,
                count: row.try_get(1)?,
            })
        })
        .collect::<Result<Vec<_>, tokio_postgres::Error>>()?;

    let range_row = client
        .query_one("SELECT MIN(first_seen), MAX(first_seen) FROM apps", &[])
        .await?;
    let date_range = DateRange {
        oldest: range_row.try_get(0)?,
        newest: range_row.try_get(1)?,
    };

    Ok(Stats {
        total_apps,
        by_category,
        date_range,
    })
}
