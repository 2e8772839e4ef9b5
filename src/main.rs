use actix_web::{web, App, HttpServer};
use log::{info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use playstore_tracker::config::Config;
use playstore_tracker::play_store::PlayStoreSearch;
use playstore_tracker::scraper::Scraper;
use playstore_tracker::store::Store;
use playstore_tracker::{api, scheduler, AppState};
use std::io;
use std::sync::Arc;

fn init_logging() {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return;
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));

    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
        Err(e) => eprintln!("Invalid logging config: {}", e),
    }
}

fn startup_error<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::Other, e)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logging();

    let cfg = Config::load().map_err(startup_error)?;
    let store = Store::connect(&cfg.database_url).await.map_err(startup_error)?;
    info!("Store ready: {:?}", store);

    let http = cfg.play_store.create_http_client().map_err(startup_error)?;
    let search = PlayStoreSearch::new(http, &cfg.play_store.base_url, &cfg.play_store.lang);
    info!("Search client initialized:");
    info!("  Base URL: {}", cfg.play_store.base_url);
    info!("  Timeout: {}s", cfg.play_store.timeout_secs);
    info!("  Max retries: {}", cfg.play_store.max_retries);
    info!("  Search interval: {}ms", cfg.scrape.search_interval_ms);

    let scraper = Scraper::new(Arc::new(search), store, &cfg.scrape);
    let data = web::Data::new(AppState::new(scraper, cfg.clone()));

    // start background scheduler
    scheduler::spawn(data.clone());

    // Bind to the first available port in the configured range
    let host = cfg.server.host.clone();
    let mut last_err: Option<io::Error> = None;
    for offset in 0..cfg.server.port_attempts.max(1) {
        let port = match cfg.server.port.checked_add(offset) {
            Some(p) => p,
            None => break,
        };
        let data_clone = data.clone();
        match HttpServer::new(move || App::new()
                .wrap(api::cors())
                .app_data(data_clone.clone())
                .configure(api::configure))
            .bind((host.as_str(), port))
        {
            Ok(server) => {
                info!("Listening on http://{}:{}", host, port);
                return server.run().await;
            }
            Err(e) => {
                warn!("Port {} unavailable: {}", port, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, "no port available")))
}
