use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use serverdeck_services::{
    AccessDenied, AccessGate, AccessGrant, CachedPerformanceService, ExporterError, ExporterProxy,
    ServerService, ServiceError,
};
use serverdeck_shared::{ApiResponse, SampleInput, ServerForm, ServerReport};

use crate::query_validation::{DaysQuery, HistoryQuery, ReportQueryValidator};

pub const SECURITY_CODE_HEADER: &str = "X-Security-Code";
pub const NO_DATA_MESSAGE: &str = "No performance data available for this server";

pub struct AppState {
    pub servers: Arc<ServerService>,
    pub performance: Arc<CachedPerformanceService>,
    pub exporter: Arc<ExporterProxy>,
    pub gate: AccessGate,
    pub query_validator: ReportQueryValidator,
}

#[derive(Debug, Deserialize)]
struct CodeQuery {
    code: Option<String>,
}

/// Security code from the header, else from `?code=`.
fn presented_code(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(SECURITY_CODE_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    web::Query::<CodeQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().code)
}

fn authorize(state: &AppState, req: &HttpRequest) -> Result<AccessGrant, HttpResponse> {
    let code = presented_code(req);
    state.gate.authorize(code.as_deref()).map_err(|denied| {
        log::warn!("Rejected {} {}: {}", req.method(), req.path(), denied);
        let status = match denied {
            AccessDenied::Missing => StatusCode::UNAUTHORIZED,
            AccessDenied::Invalid => StatusCode::FORBIDDEN,
        };
        HttpResponse::build(status).json(ApiResponse::failure(denied.to_string(), "Access denied"))
    })
}

fn error_response(action: &str, err: ServiceError) -> HttpResponse {
    let status = match &err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        log::error!("Failed to {}: {}", action, err);
        HttpResponse::build(status).json(ApiResponse::failure(
            format!("Failed to {}", action),
            err.to_string(),
        ))
    } else {
        log::debug!("Could not {}: {}", action, err);
        HttpResponse::build(status).json(ApiResponse::failure(err.to_string(), err.to_string()))
    }
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// Latest sample of every server
pub async fn get_fleet_summary(state: web::Data<AppState>) -> impl Responder {
    match state.performance.fleet_summary().await {
        Ok(rows) => HttpResponse::Ok().json(ApiResponse::success(rows)),
        Err(e) => error_response("load performance summary", e),
    }
}

/// Rolled-up performance for one server over `?days=N`
pub async fn get_server_report(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<DaysQuery>,
) -> impl Responder {
    let server_id = path.into_inner();
    let lookback = match state.query_validator.lookback(query.days.as_deref()) {
        Ok(lookback) => lookback,
        Err(e) => return error_response("read lookback window", e),
    };

    match state.performance.server_report(server_id, lookback).await {
        Ok(ServerReport::Available(report)) => HttpResponse::Ok().json(ApiResponse::success(report)),
        Ok(report @ ServerReport::NoData) => {
            HttpResponse::Ok().json(ApiResponse::unsuccessful(report.into_data(), NO_DATA_MESSAGE))
        }
        Err(e) => error_response("load performance report", e),
    }
}

/// Raw samples for one server, newest first
pub async fn get_sample_history(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    let server_id = path.into_inner();
    let lookback = match state.query_validator.lookback(query.days.as_deref()) {
        Ok(lookback) => lookback,
        Err(e) => return error_response("read lookback window", e),
    };
    let limit = match state.query_validator.limit(query.limit.as_deref()) {
        Ok(limit) => limit,
        Err(e) => return error_response("read history limit", e),
    };

    match state
        .performance
        .inner()
        .sample_history(server_id, lookback, Some(limit))
        .await
    {
        Ok(samples) => HttpResponse::Ok().json(ApiResponse::success(samples)),
        Err(e) => error_response("load sample history", e),
    }
}

pub async fn record_sample(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<SampleInput>,
) -> impl Responder {
    let grant = match authorize(&state, &req) {
        Ok(grant) => grant,
        Err(denied) => return denied,
    };
    let server_id = path.into_inner();

    match state.performance.record_sample(&grant, server_id, &body).await {
        Ok(sample) => HttpResponse::Created().json(ApiResponse::success(sample)),
        Err(e) => error_response("record performance sample", e),
    }
}

/// Fill a server with `?days=N` days of demo samples
pub async fn generate_sample_data(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    query: web::Query<DaysQuery>,
) -> impl Responder {
    let grant = match authorize(&state, &req) {
        Ok(grant) => grant,
        Err(denied) => return denied,
    };
    let server_id = path.into_inner();
    let days = match state.query_validator.sample_days(query.days.as_deref()) {
        Ok(days) => days,
        Err(e) => return error_response("read sample days", e),
    };

    match state
        .performance
        .generate_sample_data(&grant, server_id, days)
        .await
    {
        Ok((server, samples)) => HttpResponse::Ok().json(ApiResponse::success_with_message(
            json!({
                "serverId": server.id,
                "serverIp": server.server_ip,
                "samplesCreated": samples.len(),
                "days": days,
            }),
            format!("Sample performance data generated for {} days", days),
        )),
        Err(e) => error_response("generate sample data", e),
    }
}

pub async fn get_dashboard(state: web::Data<AppState>) -> impl Responder {
    match state.servers.dashboard().await {
        Ok(dashboard) => HttpResponse::Ok().json(ApiResponse::success(dashboard)),
        Err(e) => error_response("load dashboard", e),
    }
}

pub async fn list_servers(state: web::Data<AppState>) -> impl Responder {
    match state.servers.list_servers().await {
        Ok(servers) => HttpResponse::Ok().json(ApiResponse::success(servers)),
        Err(e) => error_response("list servers", e),
    }
}

pub async fn get_server(state: web::Data<AppState>, path: web::Path<i32>) -> impl Responder {
    match state.servers.get_server(path.into_inner()).await {
        Ok(server) => HttpResponse::Ok().json(ApiResponse::success(server)),
        Err(e) => error_response("load server", e),
    }
}

pub async fn create_server(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ServerForm>,
) -> impl Responder {
    let grant = match authorize(&state, &req) {
        Ok(grant) => grant,
        Err(denied) => return denied,
    };

    match state.servers.create_server(&grant, &body).await {
        Ok(server) => {
            log::info!("Server {} registered as id {}", server.server_number, server.id);
            state.performance.invalidate_summary().await;
            HttpResponse::Created().json(ApiResponse::success_with_message(
                server,
                "Server added successfully",
            ))
        }
        Err(e) => error_response("add server", e),
    }
}

pub async fn update_server(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<ServerForm>,
) -> impl Responder {
    let grant = match authorize(&state, &req) {
        Ok(grant) => grant,
        Err(denied) => return denied,
    };
    let server_id = path.into_inner();

    match state.servers.update_server(&grant, server_id, &body).await {
        Ok(server) => {
            state.performance.invalidate_server(server_id).await;
            HttpResponse::Ok().json(ApiResponse::success_with_message(
                server,
                "Server updated successfully",
            ))
        }
        Err(e) => error_response("update server", e),
    }
}

pub async fn delete_server(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> impl Responder {
    let grant = match authorize(&state, &req) {
        Ok(grant) => grant,
        Err(denied) => return denied,
    };
    let server_id = path.into_inner();

    match state.servers.delete_server(&grant, server_id).await {
        Ok(()) => {
            log::info!("Server {} deleted with its samples", server_id);
            state.performance.invalidate_server(server_id).await;
            HttpResponse::Ok().json(ApiResponse::success_with_message(
                json!({ "id": server_id }),
                "Server deleted successfully",
            ))
        }
        Err(e) => error_response("delete server", e),
    }
}

/// Forward the server's exporter output as-is
pub async fn get_server_metrics(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> impl Responder {
    let server = match state.servers.get_server(path.into_inner()).await {
        Ok(server) => server,
        Err(e) => return error_response("load server", e),
    };

    match state.exporter.fetch(&server.server_ip).await {
        Ok(metrics) => HttpResponse::Ok()
            .content_type(
                metrics
                    .content_type
                    .unwrap_or_else(|| "text/plain; version=0.0.4".to_string()),
            )
            .body(metrics.body),
        Err(e) => {
            let status = match e {
                ExporterError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            log::error!("Failed to fetch metrics for server {}: {}", server.id, e);
            HttpResponse::build(status).json(ApiResponse::failure(
                "Failed to fetch metrics from exporter",
                e.to_string(),
            ))
        }
    }
}
