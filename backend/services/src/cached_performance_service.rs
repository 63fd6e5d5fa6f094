use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serverdeck_shared::{
    NewPerformanceSample, PerformanceSample, SampleInput, ServerInfo, ServerPerformanceSummary,
    ServerReport,
};

use crate::access::AccessGrant;
use crate::aggregation::LookbackDays;
use crate::error::ServiceResult;
use crate::{CacheService, PerformanceService};

const SUMMARY_KEY: &str = "performance:summary";

fn report_prefix(server_id: i32) -> String {
    format!("performance:report:{}:", server_id)
}

fn report_key(server_id: i32, lookback: LookbackDays) -> String {
    format!("{}{}", report_prefix(server_id), lookback.days())
}

/// Read-through cache in front of [`PerformanceService`].
///
/// Cache failures never fail a request: they are logged and the store is
/// queried directly. Writes through this type drop the affected entries.
pub struct CachedPerformanceService {
    performance: Arc<PerformanceService>,
    cache: Arc<CacheService>,
    report_ttl: Duration,
    summary_ttl: Duration,
}

impl CachedPerformanceService {
    pub fn new(
        performance: Arc<PerformanceService>,
        cache: Arc<CacheService>,
        report_ttl: Duration,
        summary_ttl: Duration,
    ) -> Self {
        Self {
            performance,
            cache,
            report_ttl,
            summary_ttl,
        }
    }

    pub fn inner(&self) -> &PerformanceService {
        &self.performance
    }

    async fn cached<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.cache.get::<T>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, ttl).await {
            log::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    pub async fn server_report(
        &self,
        server_id: i32,
        lookback: LookbackDays,
    ) -> ServiceResult<ServerReport> {
        let key = report_key(server_id, lookback);
        if let Some(hit) = self.cached::<ServerReport>(&key).await {
            return Ok(hit);
        }

        let report = self.performance.server_report(server_id, lookback).await?;
        self.store(&key, &report, self.report_ttl).await;
        Ok(report)
    }

    pub async fn fleet_summary(&self) -> ServiceResult<Vec<ServerPerformanceSummary>> {
        if let Some(hit) = self.cached::<Vec<ServerPerformanceSummary>>(SUMMARY_KEY).await {
            return Ok(hit);
        }

        let rows = self.performance.fleet_summary().await?;
        self.store(SUMMARY_KEY, &rows, self.summary_ttl).await;
        Ok(rows)
    }

    pub async fn generate_sample_data(
        &self,
        grant: &AccessGrant,
        server_id: i32,
        days: u32,
    ) -> ServiceResult<(ServerInfo, Vec<NewPerformanceSample>)> {
        let generated = self
            .performance
            .generate_sample_data(grant, server_id, days)
            .await?;
        self.invalidate_server(server_id).await;
        Ok(generated)
    }

    pub async fn record_sample(
        &self,
        grant: &AccessGrant,
        server_id: i32,
        input: &SampleInput,
    ) -> ServiceResult<PerformanceSample> {
        let stored = self.performance.record_sample(grant, server_id, input).await?;
        self.invalidate_server(server_id).await;
        Ok(stored)
    }

    /// Drop cached reports for one server and the fleet summary.
    pub async fn invalidate_server(&self, server_id: i32) {
        if let Err(e) = self.cache.delete_prefix(&report_prefix(server_id)).await {
            log::warn!("Failed to invalidate reports for server {}: {}", server_id, e);
        }
        self.invalidate_summary().await;
    }

    pub async fn invalidate_summary(&self) {
        if let Err(e) = self.cache.delete(SUMMARY_KEY).await {
            log::warn!("Failed to invalidate fleet summary: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_grant;
    use crate::server_service::ServerService;
    use crate::test_utils::{server_form, setup_test_db};

    #[test]
    fn report_keys_are_per_server_and_window() {
        let fifteen = LookbackDays::DEFAULT;
        let thirty = LookbackDays::new(30, 365).unwrap();

        assert_eq!(report_key(3, fifteen), "performance:report:3:15");
        assert_eq!(report_key(3, thirty), "performance:report:3:30");
        assert!(report_key(3, thirty).starts_with(&report_prefix(3)));
        assert!(!report_key(31, thirty).starts_with(&report_prefix(3)));
    }

    #[tokio::test]
    async fn passes_through_without_redis() {
        let db = setup_test_db().await;
        let server = ServerService::new(db.clone())
            .create_server(&test_grant(), &server_form(1, "10.0.0.1"))
            .await
            .unwrap();
        let cached = CachedPerformanceService::new(
            Arc::new(PerformanceService::new(db)),
            Arc::new(CacheService::disabled()),
            Duration::from_secs(30),
            Duration::from_secs(10),
        );

        assert_eq!(
            cached.server_report(server.id, LookbackDays::DEFAULT).await.unwrap(),
            ServerReport::NoData
        );

        cached.generate_sample_data(&test_grant(), server.id, 3).await.unwrap();

        assert!(cached.server_report(server.id, LookbackDays::DEFAULT).await.unwrap().has_data());
        let summary = cached.fleet_summary().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert!(summary[0].last_updated.is_some());
    }
}
