use crate::crawler::{self, SweepScope};
use crate::AppState;
use actix_web::web;
use log::{info, warn};
use std::time::Duration;

/// Starts the periodic full scrape if `scrape.full_scrape_interval_secs` is set.
pub fn spawn(data: web::Data<AppState>) {
    let interval_secs = match data.config.scrape.full_scrape_interval_secs {
        Some(secs) if secs > 0 => secs,
        _ => {
            info!(target: "scheduler", "periodic full scrape disabled");
            return;
        }
    };
    info!(target: "scheduler", "periodic full scrape every {}s", interval_secs);

    actix_web::rt::spawn(async move {
        loop {
            // sleep between cycles
            actix_web::rt::time::sleep(Duration::from_secs(interval_secs)).await;

            let limit = data.config.scrape.full_scrape_limit;
            match crawler::spawn_sweep(data.clone(), SweepScope::Full, limit) {
                Ok(scope) => info!(target: "scheduler", "scheduled sweep started scope={}", scope),
                Err(e) => warn!(target: "scheduler", "skipping scheduled sweep: {}", e),
            }
        }
    });
}
