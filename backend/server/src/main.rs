mod config;
mod handlers;
mod query_validation;
mod routes;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use config::Config;
use handlers::AppState;
use query_validation::ReportQueryValidator;
use serverdeck_services::{
    AccessGate, CacheService, CachedPerformanceService, ExporterProxy, PerformanceService,
    ServerService, create_connection,
};

/// Upper bound on rows returned by the sample history route.
const MAX_HISTORY_RESULTS: u64 = 1000;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();

    log::info!("Starting ServerDeck on {}:{}", config.server_host, config.server_port);

    let db = create_connection(&config.database_url).await?;
    log::info!("Database connection established");
    log::info!("Note: Run migrations with 'cd migrations && cargo run -- up' if not already done");

    // Redis is optional; a bad URL only costs the cache
    let cache_service = Arc::new(
        CacheService::new(config.redis_url.clone(), "serverdeck").unwrap_or_else(|e| {
            log::warn!("Failed to initialize Redis cache: {}. Continuing without cache.", e);
            CacheService::disabled()
        }),
    );
    if cache_service.is_enabled() {
        log::info!("Redis cache enabled");
    }

    let performance = Arc::new(CachedPerformanceService::new(
        Arc::new(PerformanceService::new(db.clone())),
        cache_service,
        config.cache_ttl_report,
        config.cache_ttl_summary,
    ));

    let app_state = web::Data::new(AppState {
        servers: Arc::new(ServerService::new(db)),
        performance,
        exporter: Arc::new(ExporterProxy::new(
            config.exporter_port,
            &config.exporter_path,
            config.exporter_timeout,
        )),
        gate: AccessGate::new(config.management_secret.clone()),
        query_validator: ReportQueryValidator::new(
            config.default_lookback_days,
            config.max_lookback_days,
            config.sample_days,
            MAX_HISTORY_RESULTS,
        ),
    });

    let bind_addr = format!("{}:{}", config.server_host, config.server_port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_method()
            .allow_any_origin()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server terminated with an error")
}
