pub mod access;
pub mod aggregation;
pub mod cache_service;
pub mod cached_performance_service;
pub mod database;
pub mod entity;
pub mod error;
pub mod exporter_proxy;
pub mod performance_service;
pub mod sample_generator;
pub mod server_service;

#[cfg(test)]
mod test_utils;

pub use access::{AccessDenied, AccessGate, AccessGrant};
pub use aggregation::LookbackDays;
pub use cache_service::CacheService;
pub use cached_performance_service::CachedPerformanceService;
pub use database::create_connection;
pub use error::{ServiceError, ServiceResult};
pub use exporter_proxy::{ExporterError, ExporterMetrics, ExporterProxy};
pub use performance_service::PerformanceService;
pub use server_service::ServerService;

// Re-export entities for convenience
pub use entity::performance_samples;
pub use entity::servers;
