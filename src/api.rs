//! HTTP routes.
//!
//! Read endpoints go straight to the store. Scrape endpoints start a
//! background sweep and answer immediately: `202` when started, `409` when a
//! sweep with the same scope is still running.

use crate::catalog::{self, COUNTRIES};
use crate::crawler::{self, AlreadyRunning, CategoryKind, SweepScope};
use crate::store::StoreError;
use crate::AppState;
use actix_cors::Cors;
use actix_web::{get, post, web, HttpResponse, Responder};
use log::error;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_SEARCH_QUERY: &str = "new apps 2025";
pub const MAX_LIMIT: usize = 250;

/// Any origin may call the API; the dashboard is served separately.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let body = json!({"error": err.to_string()});
        actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .service(root)
    .service(get_apps)
    .service(list_months)
    .service(get_stats)
    .service(list_categories)
    .service(list_countries)
    .service(scrape_search)
    .service(scrape_new)
    .service(scrape_new_all)
    .service(scrape_categories)
    .service(scrape_queries)
    .service(scrape_full)
    .service(scrape_status)
    .service(get_metrics);
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({"error": message}))
}

fn internal_error(context: &str, e: StoreError) -> HttpResponse {
    error!(target: "api", "{}: {}", context, e);
    HttpResponse::InternalServerError().json(json!({"error": "Internal server error"}))
}

fn resolve_limit(requested: Option<usize>, default: usize) -> Result<usize, HttpResponse> {
    match requested.unwrap_or(default) {
        limit @ 1..=MAX_LIMIT => Ok(limit),
        _ => Err(bad_request(&format!("limit must be between 1 and {}", MAX_LIMIT))),
    }
}

fn resolve_text(requested: Option<&str>, default: &str, name: &str) -> Result<String, HttpResponse> {
    let value = requested.unwrap_or(default).trim();
    if value.is_empty() {
        Err(bad_request(&format!("{} must not be empty", name)))
    } else {
        Ok(value.to_string())
    }
}

fn start_sweep(data: web::Data<AppState>, scope: SweepScope, limit: usize, mut body: Value) -> HttpResponse {
    let (status, scope_key, mut response) = match crawler::spawn_sweep(data, scope, limit) {
        Ok(key) => ("started", key, HttpResponse::Accepted()),
        Err(AlreadyRunning(key)) => ("already_running", key, HttpResponse::Conflict()),
    };
    if let Value::Object(map) = &mut body {
        map.insert("status".to_string(), json!(status));
        map.insert("scope".to_string(), json!(scope_key));
    }
    response.json(body)
}

#[get("/")]
async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok", "message": "PlayStore Tracker API"}))
}

#[derive(Debug, Deserialize)]
struct MonthQuery {
    year: i32,
    month: u32,
}

/// Apps first seen in the given month
#[get("/apps")]
async fn get_apps(data: web::Data<AppState>, query: web::Query<MonthQuery>) -> impl Responder {
    let MonthQuery { year, month } = query.into_inner();
    if !(1..=12).contains(&month) {
        return bad_request("month must be between 1 and 12");
    }

    match data.store().get_apps_by_month(year, month).await {
        Ok(apps) => HttpResponse::Ok().json(json!({
            "year": year,
            "month": month,
            "count": apps.len(),
            "apps": apps,
        })),
        Err(StoreError::InvalidMonth { .. }) => bad_request("year is out of range"),
        Err(e) => internal_error("Failed to get apps by month", e),
    }
}

#[get("/months")]
async fn list_months(data: web::Data<AppState>) -> impl Responder {
    match data.store().get_all_months().await {
        Ok(months) => HttpResponse::Ok().json(months),
        Err(e) => internal_error("Failed to get months", e),
    }
}

#[get("/stats")]
async fn get_stats(data: web::Data<AppState>) -> impl Responder {
    match data.store().get_stats().await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => internal_error("Failed to get stats", e),
    }
}

#[get("/categories")]
async fn list_categories() -> impl Responder {
    HttpResponse::Ok().json(json!({"categories": catalog::categories()}))
}

#[get("/countries")]
async fn list_countries() -> impl Responder {
    HttpResponse::Ok().json(json!({"countries": COUNTRIES}))
}

#[derive(Debug, Deserialize)]
struct SearchScrapeQuery {
    query: Option<String>,
    limit: Option<usize>,
    country: Option<String>,
}

#[post("/scrape/search")]
async fn scrape_search(data: web::Data<AppState>, params: web::Query<SearchScrapeQuery>) -> HttpResponse {
    let query = match resolve_text(params.query.as_deref(), DEFAULT_SEARCH_QUERY, "query") {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let country = match resolve_text(params.country.as_deref(), "us", "country") {
        Ok(c) => c.to_lowercase(),
        Err(resp) => return resp,
    };
    let limit = match resolve_limit(params.limit, data.config.scrape.request_limit) {
        Ok(l) => l,
        Err(resp) => return resp,
    };

    let body = json!({"query": query, "country": country});
    start_sweep(data, SweepScope::Search { query, country }, limit, body)
}

#[derive(Debug, Deserialize)]
struct NewAppsQuery {
    country: Option<String>,
    limit: Option<usize>,
}

#[post("/scrape/new")]
async fn scrape_new(data: web::Data<AppState>, params: web::Query<NewAppsQuery>) -> HttpResponse {
    let country = match resolve_text(params.country.as_deref(), "us", "country") {
        Ok(c) => c.to_lowercase(),
        Err(resp) => return resp,
    };
    let limit = match resolve_limit(params.limit, data.config.scrape.request_limit) {
        Ok(l) => l,
        Err(resp) => return resp,
    };

    let body = json!({"country": country});
    start_sweep(data, SweepScope::NewApps { country }, limit, body)
}

#[post("/scrape/new/all")]
async fn scrape_new_all(data: web::Data<AppState>) -> HttpResponse {
    let limit = data.config.scrape.sweep_limit;
    start_sweep(data, SweepScope::AllNewApps, limit, json!({}))
}

#[derive(Debug, Deserialize)]
struct CategoriesQuery {
    #[serde(default)]
    kind: CategoryKind,
}

#[post("/scrape/categories")]
async fn scrape_categories(data: web::Data<AppState>, params: web::Query<CategoriesQuery>) -> HttpResponse {
    let kind = params.kind;
    let limit = data.config.scrape.sweep_limit;
    start_sweep(data, SweepScope::Categories(kind), limit, json!({"kind": kind}))
}

#[post("/scrape/queries")]
async fn scrape_queries(data: web::Data<AppState>) -> HttpResponse {
    let limit = data.config.scrape.sweep_limit;
    start_sweep(data, SweepScope::Queries, limit, json!({}))
}

#[post("/scrape/full")]
async fn scrape_full(data: web::Data<AppState>) -> HttpResponse {
    let limit = data.config.scrape.full_scrape_limit;
    start_sweep(
        data,
        SweepScope::Full,
        limit,
        json!({"message": "Full scrape runs in the background and takes several minutes"}),
    )
}

#[get("/scrape/status")]
async fn scrape_status(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.sweeps.snapshot())
}

#[get("/metrics")]
async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.scraper.metrics().get_all_metrics())
}
