use std::sync::Arc;

use actix_web::{
    middleware,
    web::{self, Data},
    App, HttpServer,
};
use log::info;

mod auth;
mod config;
mod db;
mod errors;
mod openapi;
mod routes;
mod structs;
#[cfg(test)]
mod test_helpers;
mod validation;

use config::Config;
use db::{PgPurchaseStore, PurchaseStore};

/// Handles shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PurchaseStore>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // reads .env too, so it runs before the logger picks up RUST_LOG
    let config = Config::load().unwrap_or_else(|e| e.exit());

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if config.uses_insecure_token() {
        log::warn!(
            "API_TOKEN is not set; using the insecure placeholder token. Set API_TOKEN before exposing this service."
        );
    }

    info!("Connecting to {}", config.database_url());

    let db_pool = db::connect(&config).await.map_err(|e| {
        log::error!("FATAL: database unreachable at {}: {}", config.database_url(), e);
        e
    })?;

    db::init_schema(&db_pool).await.map_err(|e| {
        log::error!("FATAL: failed to initialise schema: {}", e);
        e
    })?;

    info!("Database schema ready");

    let state = Data::new(AppState {
        store: Arc::new(PgPurchaseStore::new(db_pool)),
    });
    let api_token: Arc<str> = Arc::from(config.api_token.as_str());

    info!("Starting HTTP server on http://{}:{}/", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .configure(routes::configure(state.clone(), Arc::clone(&api_token)))
            .default_service(web::to(routes::default_handler))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
