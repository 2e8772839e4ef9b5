use crate::models::{AppListing, AppRecord, CategoryCount, DateRange, MonthCount, Stats};
use chrono::NaiveDate;
use log::error;
use rusqlite::{params, Connection, Result, Row};
use std::path::Path;

const APP_COLUMNS: &str =
    "app_id, title, developer, category, score, installs, icon_url, first_seen, last_updated";

pub fn open(path: &Path) -> Result<Connection> {
    Connection::open(path)
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    log::info!(target: "store", "Creating tables if not exists...");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS apps (
            app_id TEXT PRIMARY KEY,
            title TEXT,
            developer TEXT,
            category TEXT,
            score REAL,
            installs TEXT,
            icon_url TEXT,
            first_seen TEXT NOT NULL,
            last_updated TEXT NOT NULL
        );",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_apps_first_seen ON apps(first_seen);",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_apps_category ON apps(category);",
        [],
    )?;

    log::info!(target: "store", "Tables ensured.");
    Ok(())
}

/// Upsert one listing. An existing row only gets its `last_updated` bumped.
pub fn insert_app(conn: &Connection, app: &AppListing, today: NaiveDate) -> Result<()> {
    match conn.execute(
        "INSERT INTO apps (app_id, title, developer, category, score, installs, icon_url, first_seen, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(app_id) DO UPDATE SET last_updated = excluded.last_updated",
        params![
            app.app_id,
            app.title,
            app.developer,
            app.genre,
            app.score,
            app.installs,
            app.icon,
            today,
        ],
    ) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(target: "store", "Failed to insert app app_id={}: {}", app.app_id, e);
            Err(e)
        }
    }
}

fn app_from_row(row: &Row<'_>) -> Result<AppRecord> {
    Ok(AppRecord {
        app_id: row.get(0)?,
        title: row.get(1)?,
        developer: row.get(2)?,
        category: row.get(3)?,
        score: row.get(4)?,
        installs: row.get(5)?,
        icon_url: row.get(6)?,
        first_seen: row.get(7)?,
        last_updated: row.get(8)?,
    })
}

/// Apps first seen in `[start, end)`, newest first.
pub fn get_apps_first_seen_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AppRecord>> {
    let sql = format!(
        "SELECT {} FROM apps WHERE first_seen >= ?1 AND first_seen < ?2 ORDER BY first_seen DESC, app_id",
        APP_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![start, end], app_from_row)?;

    let mut apps = Vec::new();
    for row in rows {
        apps.push(row?);
    }
    Ok(apps)
}

pub fn get_app(conn: &Connection, app_id: &str) -> Result<Option<AppRecord>> {
    let sql = format!("SELECT {} FROM apps WHERE app_id = ?1", APP_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map([app_id], app_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn get_all_months(conn: &Connection) -> Result<Vec<MonthCount>> {
    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', first_seen) AS month, COUNT(*) AS count
         FROM apps GROUP BY month ORDER BY month DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(MonthCount {
            month: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_app_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM apps", [], |row| row.get(0))
}

pub fn get_top_categories(conn: &Connection, limit: i64) -> Result<Vec<CategoryCount>> {
    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) AS count FROM apps
         GROUP BY category ORDER BY count DESC, category LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(CategoryCount {
            category: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_date_range(conn: &Connection) -> Result<DateRange> {
    conn.query_row(
        "SELECT MIN(first_seen), MAX(first_seen) FROM apps",
        [],
        |row| {
            Ok(DateRange {
                oldest: row.get(0)?,
                newest: row.get(1)?,
            })
        },
    )
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    Ok(Stats {
        total_apps: get_app_count(conn)?,
        by_category: get_top_categories(conn, 10)?,
        date_range: get_date_range(conn)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::month_bounds;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn listing(id: &str, genre: &str) -> AppListing {
        AppListing {
            app_id: id.to_string(),
            title: Some(format!("{} title", id)),
            developer: Some("Dev".to_string()),
            genre: Some(genre.to_string()),
            score: Some(4.2),
            installs: Some("1,000+".to_string()),
            icon: Some(format!("https://img.example/{}.png", id)),
        }
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = setup();
        create_tables(&conn).unwrap();
        assert_eq!(get_app_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_upsert_only_touches_last_updated() {
        let conn = setup();
        insert_app(&conn, &listing("com.a", "Tools"), date(2025, 1, 10)).unwrap();

        let mut changed = listing("com.a", "Games");
        changed.title = Some("Renamed".to_string());
        changed.score = None;
        insert_app(&conn, &changed, date(2025, 3, 2)).unwrap();

        let app = get_app(&conn, "com.a").unwrap().unwrap();
        assert_eq!(app.first_seen, date(2025, 1, 10));
        assert_eq!(app.last_updated, date(2025, 3, 2));
        assert_eq!(app.title.as_deref(), Some("com.a title"));
        assert_eq!(app.category.as_deref(), Some("Tools"));
        assert_eq!(app.score, Some(4.2));
        assert_eq!(get_app_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_insert_with_missing_fields() {
        let conn = setup();
        let bare = AppListing {
            app_id: "com.bare".to_string(),
            ..Default::default()
        };
        insert_app(&conn, &bare, date(2025, 5, 1)).unwrap();

        let app = get_app(&conn, "com.bare").unwrap().unwrap();
        assert_eq!(app.title, None);
        assert_eq!(app.score, None);
        assert_eq!(app.first_seen, date(2025, 5, 1));
    }

    #[test]
    fn test_apps_by_month_filters_and_orders() {
        let conn = setup();
        insert_app(&conn, &listing("com.jan", "Tools"), date(2025, 1, 31)).unwrap();
        insert_app(&conn, &listing("com.feb1", "Tools"), date(2025, 2, 1)).unwrap();
        insert_app(&conn, &listing("com.feb2", "Tools"), date(2025, 2, 20)).unwrap();
        insert_app(&conn, &listing("com.mar", "Tools"), date(2025, 3, 1)).unwrap();
        insert_app(&conn, &listing("com.feb_prev", "Tools"), date(2024, 2, 15)).unwrap();

        let (start, end) = month_bounds(2025, 2).unwrap();
        let apps = get_apps_first_seen_between(&conn, start, end).unwrap();
        let ids: Vec<&str> = apps.iter().map(|a| a.app_id.as_str()).collect();
        assert_eq!(ids, vec!["com.feb2", "com.feb1"]);
    }

    #[test]
    fn test_all_months_counts_sum_to_total() {
        let conn = setup();
        insert_app(&conn, &listing("a", "Tools"), date(2024, 12, 5)).unwrap();
        insert_app(&conn, &listing("b", "Tools"), date(2025, 1, 5)).unwrap();
        insert_app(&conn, &listing("c", "Tools"), date(2025, 1, 6)).unwrap();
        insert_app(&conn, &listing("d", "Tools"), date(2025, 2, 7)).unwrap();

        let months = get_all_months(&conn).unwrap();
        let labels: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["2025-02", "2025-01", "2024-12"]);
        assert_eq!(months.iter().map(|m| m.count).sum::<i64>(), get_app_count(&conn).unwrap());
    }

    #[test]
    fn test_stats_top_categories() {
        let conn = setup();
        let today = date(2025, 6, 1);
        for cat in 0..12 {
            for n in 0..=cat {
                insert_app(&conn, &listing(&format!("app.{}.{}", cat, n), &format!("Cat{:02}", cat)), today)
                    .unwrap();
            }
        }
        insert_app(&conn, &listing("old", "Cat00"), date(2024, 1, 1)).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total_apps, 79);
        assert_eq!(stats.by_category.len(), 10);
        assert_eq!(stats.by_category[0].category.as_deref(), Some("Cat11"));
        assert!(stats
            .by_category
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
        assert_eq!(stats.date_range.oldest, Some(date(2024, 1, 1)));
        assert_eq!(stats.date_range.newest, Some(today));
    }

    #[test]
    fn test_stats_on_empty_table() {
        let conn = setup();
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total_apps, 0);
        assert!(stats.by_category.is_empty());
        assert_eq!(stats.date_range, DateRange::default());
    }
}
