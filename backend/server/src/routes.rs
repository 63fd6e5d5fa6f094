use crate::handlers;
use actix_web::{HttpResponse, error, web};
use serverdeck_shared::ApiResponse;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ApiResponse::failure("Invalid request body", message)),
        )
        .into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(handlers::health))
        // Performance endpoints
        .route("/api/performance", web::get().to(handlers::get_fleet_summary))
        .route(
            "/api/performance/sample/{server_id}",
            web::post().to(handlers::generate_sample_data),
        )
        .route(
            "/api/performance/{server_id}",
            web::get().to(handlers::get_server_report),
        )
        .route(
            "/api/performance/{server_id}",
            web::post().to(handlers::record_sample),
        )
        .route(
            "/api/performance/{server_id}/samples",
            web::get().to(handlers::get_sample_history),
        )
        // Inventory endpoints
        .route("/api/dashboard", web::get().to(handlers::get_dashboard))
        .route("/api/servers", web::get().to(handlers::list_servers))
        .route("/api/servers", web::post().to(handlers::create_server))
        .route("/api/servers/{id}", web::get().to(handlers::get_server))
        .route("/api/servers/{id}", web::put().to(handlers::update_server))
        .route("/api/servers/{id}", web::delete().to(handlers::delete_server))
        .route(
            "/api/servers/{id}/metrics",
            web::get().to(handlers::get_server_metrics),
        );
}
