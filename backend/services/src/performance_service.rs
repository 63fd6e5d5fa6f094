use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, Query};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ExprTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serverdeck_shared::{
    NewPerformanceSample, PerformanceSample, SampleInput, ServerInfo, ServerPerformanceSummary,
    ServerReport,
};

use crate::access::AccessGrant;
use crate::aggregation::{self, LookbackDays};
use crate::entity::{performance_samples, servers};
use crate::error::{ServiceError, ServiceResult};
use crate::sample_generator;
use crate::server_service::entity_to_server_info;

/// Upper bound on demo rows generated in one call.
pub const MAX_GENERATED_DAYS: u32 = 365;

pub struct PerformanceService {
    db: DatabaseConnection,
}

impl PerformanceService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Roll up a server's samples over the lookback window ending now.
    pub async fn server_report(
        &self,
        server_id: i32,
        lookback: LookbackDays,
    ) -> ServiceResult<ServerReport> {
        self.server_report_at(server_id, lookback, Utc::now()).await
    }

    pub async fn server_report_at(
        &self,
        server_id: i32,
        lookback: LookbackDays,
        now: DateTime<Utc>,
    ) -> ServiceResult<ServerReport> {
        self.find_server(server_id).await?;

        let samples = self
            .samples_in_range(server_id, lookback.window_start(now), now, None)
            .await?;

        Ok(aggregation::compute_report(&samples, lookback, now))
    }

    /// Samples for a server within `[from, to]`, newest first.
    pub async fn samples_in_range(
        &self,
        server_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<u64>,
    ) -> ServiceResult<Vec<PerformanceSample>> {
        let mut query = performance_samples::Entity::find()
            .filter(performance_samples::Column::ServerId.eq(server_id))
            .filter(performance_samples::Column::Timestamp.gte(from.fixed_offset()))
            .filter(performance_samples::Column::Timestamp.lte(to.fixed_offset()))
            .order_by_desc(performance_samples::Column::Timestamp)
            .order_by_asc(performance_samples::Column::Id);

        if let Some(limit_val) = limit {
            query = query.limit(limit_val);
        }

        let rows = query.all(&self.db).await?;
        Ok(rows.iter().map(entity_to_sample).collect())
    }

    /// History listing for one server; unknown servers are `NotFound`.
    pub async fn sample_history(
        &self,
        server_id: i32,
        lookback: LookbackDays,
        limit: Option<u64>,
    ) -> ServiceResult<Vec<PerformanceSample>> {
        self.find_server(server_id).await?;
        let now = Utc::now();
        self.samples_in_range(server_id, lookback.window_start(now), now, limit)
            .await
    }

    /// Latest sample for a single server
    pub async fn latest_sample(&self, server_id: i32) -> ServiceResult<Option<PerformanceSample>> {
        let row = performance_samples::Entity::find()
            .filter(performance_samples::Column::ServerId.eq(server_id))
            .order_by_desc(performance_samples::Column::Timestamp)
            .order_by_asc(performance_samples::Column::Id)
            .one(&self.db)
            .await?;

        Ok(row.as_ref().map(entity_to_sample))
    }

    /// Latest sample of every listed server, fetched in one round trip.
    ///
    /// Rows whose timestamp equals their server's maximum are selected with a
    /// correlated subquery; ties collapse to the lowest id afterwards.
    pub async fn latest_samples_for(
        &self,
        server_ids: &[i32],
    ) -> ServiceResult<Vec<PerformanceSample>> {
        if server_ids.is_empty() {
            return Ok(Vec::new());
        }

        let newer = Alias::new("newer");
        let max_timestamp = Query::select()
            .expr(Func::max(Expr::col((
                newer.clone(),
                performance_samples::Column::Timestamp,
            ))))
            .from_as(performance_samples::Entity, newer.clone())
            .and_where(
                Expr::col((newer, performance_samples::Column::ServerId)).equals((
                    performance_samples::Entity,
                    performance_samples::Column::ServerId,
                )),
            )
            .to_owned();

        let rows = performance_samples::Entity::find()
            .filter(performance_samples::Column::ServerId.is_in(server_ids.iter().copied()))
            .filter(
                Expr::col((
                    performance_samples::Entity,
                    performance_samples::Column::Timestamp,
                ))
                .in_subquery(max_timestamp),
            )
            .all(&self.db)
            .await?;

        let mut latest: Vec<PerformanceSample> =
            aggregation::latest_per_server(rows.iter().map(entity_to_sample))
                .into_values()
                .collect();
        latest.sort_by_key(|s| s.server_id);
        Ok(latest)
    }

    /// One row per registered server, in registration order.
    pub async fn fleet_summary(&self) -> ServiceResult<Vec<ServerPerformanceSummary>> {
        let servers: Vec<ServerInfo> = servers::Entity::find()
            .order_by_asc(servers::Column::Id)
            .all(&self.db)
            .await?
            .iter()
            .map(entity_to_server_info)
            .collect();

        let ids: Vec<i32> = servers.iter().map(|s| s.id).collect();
        let latest = aggregation::latest_per_server(self.latest_samples_for(&ids).await?);

        Ok(aggregation::summarize_fleet(&servers, &latest))
    }

    /// Generate and store `days` demo samples for a server.
    pub async fn generate_sample_data(
        &self,
        _grant: &AccessGrant,
        server_id: i32,
        days: u32,
    ) -> ServiceResult<(ServerInfo, Vec<NewPerformanceSample>)> {
        if days == 0 || days > MAX_GENERATED_DAYS {
            return Err(ServiceError::InvalidInput(format!(
                "Sample days must be between 1 and {}",
                MAX_GENERATED_DAYS
            )));
        }

        let server = self.find_server(server_id).await?;
        let samples = {
            let mut rng = rand::thread_rng();
            sample_generator::generate_samples(&server, days, Utc::now(), &mut rng)
        };

        self.insert_samples(&samples).await?;
        log::info!(
            "Generated {} sample performance records for server {}",
            samples.len(),
            server.id
        );

        Ok((server, samples))
    }

    /// Store one measurement, stamping it with the server's current IP.
    pub async fn record_sample(
        &self,
        _grant: &AccessGrant,
        server_id: i32,
        input: &SampleInput,
    ) -> ServiceResult<PerformanceSample> {
        validate_sample(input)?;
        let server = self.find_server(server_id).await?;

        let model = performance_samples::ActiveModel {
            server_id: Set(server.id),
            server_ip: Set(server.server_ip.clone()),
            timestamp: Set(input.timestamp.unwrap_or_else(Utc::now).fixed_offset()),
            uptime: Set(input.uptime),
            cpu_utilization: Set(input.cpu_utilization),
            memory_usage: Set(input.memory_usage),
            disk_usage: Set(input.disk_usage),
            network_in: Set(input.network_in),
            network_out: Set(input.network_out),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(entity_to_sample(&model))
    }

    /// Batch insert; an empty slice is a no-op.
    pub async fn insert_samples(&self, samples: &[NewPerformanceSample]) -> ServiceResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let created_at = Utc::now().fixed_offset();
        let active_models: Vec<performance_samples::ActiveModel> = samples
            .iter()
            .map(|sample| performance_samples::ActiveModel {
                server_id: Set(sample.server_id),
                server_ip: Set(sample.server_ip.clone()),
                timestamp: Set(sample.timestamp.fixed_offset()),
                uptime: Set(sample.uptime),
                cpu_utilization: Set(sample.cpu_utilization),
                memory_usage: Set(sample.memory_usage),
                disk_usage: Set(sample.disk_usage),
                network_in: Set(sample.network_in),
                network_out: Set(sample.network_out),
                created_at: Set(created_at),
                ..Default::default()
            })
            .collect();

        performance_samples::Entity::insert_many(active_models)
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn find_server(&self, server_id: i32) -> ServiceResult<ServerInfo> {
        servers::Entity::find_by_id(server_id)
            .one(&self.db)
            .await?
            .map(|row| entity_to_server_info(&row))
            .ok_or_else(|| ServiceError::server_not_found(server_id))
    }
}

fn validate_sample(input: &SampleInput) -> ServiceResult<()> {
    let percentages = [
        ("cpuUtilization", input.cpu_utilization),
        ("memoryUsage", input.memory_usage),
        ("diskUsage", input.disk_usage),
    ];
    for (field, value) in percentages {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ServiceError::InvalidInput(format!(
                "{} must be a percentage between 0 and 100, got {}",
                field, value
            )));
        }
    }

    let counters = [
        ("uptime", input.uptime),
        ("networkIn", input.network_in),
        ("networkOut", input.network_out),
    ];
    for (field, value) in counters {
        if value < 0 {
            return Err(ServiceError::InvalidInput(format!(
                "{} must not be negative, got {}",
                field, value
            )));
        }
    }

    Ok(())
}

fn entity_to_sample(entity: &performance_samples::Model) -> PerformanceSample {
    PerformanceSample {
        id: entity.id,
        server_id: entity.server_id,
        server_ip: entity.server_ip.clone(),
        timestamp: entity.timestamp.with_timezone(&Utc),
        uptime: entity.uptime,
        cpu_utilization: entity.cpu_utilization,
        memory_usage: entity.memory_usage,
        disk_usage: entity.disk_usage,
        network_in: entity.network_in,
        network_out: entity.network_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_grant;
    use crate::server_service::ServerService;
    use crate::test_utils::{sample_at, server_form, setup_test_db};
    use chrono::Duration;
    use serverdeck_shared::{PerformanceReport, ServerReport};

    async fn register(db: &DatabaseConnection, number: i64) -> ServerInfo {
        ServerService::new(db.clone())
            .create_server(&test_grant(), &server_form(number, &format!("10.0.0.{}", number)))
            .await
            .unwrap()
    }

    fn available(report: ServerReport) -> PerformanceReport {
        match report {
            ServerReport::Available(r) => r,
            ServerReport::NoData => panic!("expected data"),
        }
    }

    #[tokio::test]
    async fn report_over_stored_samples() {
        let db = setup_test_db().await;
        let server = register(&db, 1).await;
        let service = PerformanceService::new(db);
        let now = Utc::now();

        let mut today = sample_at(&server, now - Duration::minutes(1), 10.0);
        today.uptime = 86_000;
        today.network_in = 500;
        service
            .insert_samples(&[
                sample_at(&server, now - Duration::days(10), 30.0),
                today,
                sample_at(&server, now - Duration::days(3), 20.0),
                sample_at(&server, now - Duration::days(20), 99.0),
            ])
            .await
            .unwrap();

        let report = available(
            service
                .server_report_at(server.id, LookbackDays::DEFAULT, now)
                .await
                .unwrap(),
        );

        assert_eq!(report.uptime, 86_000);
        assert_eq!(report.cpu_utilization.last_7_days, 15.0);
        assert_eq!(report.cpu_utilization.last_15_days, 20.0);
        assert_eq!(report.network_stats.inbound, 500);
        assert_eq!(report.data_points, Some(3));
    }

    #[tokio::test]
    async fn report_is_idempotent_without_writes() {
        let db = setup_test_db().await;
        let server = register(&db, 2).await;
        let service = PerformanceService::new(db);
        let now = Utc::now();
        service
            .insert_samples(&[
                sample_at(&server, now - Duration::hours(5), 41.5),
                sample_at(&server, now - Duration::days(2), 12.25),
            ])
            .await
            .unwrap();

        let first = service.server_report_at(server.id, LookbackDays::DEFAULT, now).await.unwrap();
        let second = service.server_report_at(server.id, LookbackDays::DEFAULT, now).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn server_without_samples_reports_no_data() {
        let db = setup_test_db().await;
        let server = register(&db, 3).await;
        let service = PerformanceService::new(db);

        let report = service.server_report(server.id, LookbackDays::DEFAULT).await.unwrap();

        assert_eq!(report, ServerReport::NoData);
        assert_eq!(report.into_data(), PerformanceReport::default());
    }

    #[tokio::test]
    async fn unknown_server_is_not_found() {
        let service = PerformanceService::new(setup_test_db().await);

        let err = service.server_report(404, LookbackDays::DEFAULT).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service.generate_sample_data(&test_grant(), 404, 15).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn fleet_summary_covers_every_server() {
        let db = setup_test_db().await;
        let with_data = register(&db, 1).await;
        let without_data = register(&db, 2).await;
        let service = PerformanceService::new(db);
        let now = Utc::now();

        let mut latest = sample_at(&with_data, now - Duration::minutes(5), 55.0);
        latest.memory_usage = 61.0;
        service
            .insert_samples(&[sample_at(&with_data, now - Duration::days(1), 5.0), latest.clone()])
            .await
            .unwrap();

        let rows = service.fleet_summary().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].server_id, with_data.id);
        assert_eq!(rows[0].cpu_utilization, 55.0);
        assert_eq!(rows[0].memory_usage, 61.0);
        assert_eq!(
            rows[0].last_updated.map(|t| t.timestamp()),
            Some(latest.timestamp.timestamp())
        );
        assert_eq!(rows[1].server_id, without_data.id);
        assert_eq!(rows[1].last_updated, None);
        assert_eq!(rows[1].cpu_utilization, 0.0);
    }

    #[tokio::test]
    async fn batched_latest_matches_single_lookup() {
        let db = setup_test_db().await;
        let a = register(&db, 1).await;
        let b = register(&db, 2).await;
        let service = PerformanceService::new(db);
        let now = Utc::now();
        service
            .insert_samples(&[
                sample_at(&a, now - Duration::days(2), 1.0),
                sample_at(&a, now - Duration::hours(1), 2.0),
                sample_at(&b, now - Duration::hours(3), 3.0),
                sample_at(&b, now - Duration::days(9), 4.0),
            ])
            .await
            .unwrap();

        let batched = service.latest_samples_for(&[a.id, b.id]).await.unwrap();

        assert_eq!(batched.len(), 2);
        for sample in batched {
            let single = service.latest_sample(sample.server_id).await.unwrap().unwrap();
            assert_eq!(single, sample);
        }
    }

    #[tokio::test]
    async fn generated_samples_are_stored() {
        let db = setup_test_db().await;
        let server = register(&db, 4).await;
        let service = PerformanceService::new(db);

        let (owner, samples) = service
            .generate_sample_data(&test_grant(), server.id, 15)
            .await
            .unwrap();

        assert_eq!(owner.id, server.id);
        assert_eq!(samples.len(), 15);
        let report = available(
            service
                .server_report(server.id, LookbackDays::DEFAULT)
                .await
                .unwrap(),
        );
        assert_eq!(report.data_points, Some(15));
        let expected_in: i64 = samples.iter().map(|s| s.network_in).sum();
        assert_eq!(report.network_stats.inbound, expected_in);
    }

    #[tokio::test]
    async fn generate_rejects_out_of_range_days() {
        let db = setup_test_db().await;
        let server = register(&db, 5).await;
        let service = PerformanceService::new(db);

        for days in [0, MAX_GENERATED_DAYS + 1] {
            let err = service
                .generate_sample_data(&test_grant(), server.id, days)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn recorded_sample_copies_server_ip() {
        let db = setup_test_db().await;
        let server = register(&db, 6).await;
        let service = PerformanceService::new(db);

        let input = SampleInput {
            timestamp: None,
            uptime: 7_200,
            cpu_utilization: 42.0,
            memory_usage: 18.5,
            disk_usage: 73.0,
            network_in: 1_024,
            network_out: 2_048,
        };
        let stored = service.record_sample(&test_grant(), server.id, &input).await.unwrap();

        assert_eq!(stored.server_ip, server.server_ip);
        assert_eq!(service.latest_sample(server.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn recorded_sample_is_validated() {
        let db = setup_test_db().await;
        let server = register(&db, 7).await;
        let service = PerformanceService::new(db);

        let bad = SampleInput {
            timestamp: None,
            uptime: 10,
            cpu_utilization: 140.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            network_in: 0,
            network_out: 0,
        };
        let err = service.record_sample(&test_grant(), server.id, &bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let negative = SampleInput { cpu_utilization: 1.0, network_out: -5, ..bad };
        let err = service.record_sample(&test_grant(), server.id, &negative).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let db = setup_test_db().await;
        let server = register(&db, 8).await;
        let service = PerformanceService::new(db);
        let now = Utc::now();
        service
            .insert_samples(&[
                sample_at(&server, now - Duration::days(3), 3.0),
                sample_at(&server, now - Duration::days(1), 1.0),
                sample_at(&server, now - Duration::days(2), 2.0),
            ])
            .await
            .unwrap();

        let history = service
            .sample_history(server.id, LookbackDays::DEFAULT, Some(2))
            .await
            .unwrap();

        let cpus: Vec<f64> = history.iter().map(|s| s.cpu_utilization).collect();
        assert_eq!(cpus, vec![1.0, 2.0]);
    }
}
