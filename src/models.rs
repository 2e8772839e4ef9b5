use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One search hit as returned by the store's search page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppListing {
    pub app_id: String,
    pub title: Option<String>,
    pub developer: Option<String>,
    pub genre: Option<String>,
    pub score: Option<f64>,
    pub installs: Option<String>,
    pub icon: Option<String>,
}

/// A row of the `apps` table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppRecord {
    pub app_id: String,
    pub title: Option<String>,
    pub developer: Option<String>,
    pub category: Option<String>,
    pub score: Option<f64>,
    pub installs: Option<String>,
    pub icon_url: Option<String>,
    pub first_seen: NaiveDate,
    pub last_updated: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MonthCount {
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct DateRange {
    pub oldest: Option<NaiveDate>,
    pub newest: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total_apps: i64,
    pub by_category: Vec<CategoryCount>,
    pub date_range: DateRange,
}

/// First day of the given month and first day of the following one.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}
