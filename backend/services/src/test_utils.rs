use chrono::{DateTime, Utc};
use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serverdeck_shared::{
    ListInput, NewPerformanceSample, NumberInput, ServerForm, ServerInfo,
};

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// A form that passes validation as-is.
pub fn server_form(number: i64, ip: &str) -> ServerForm {
    ServerForm {
        model: format!("PowerEdge R{}", 600 + number),
        server_number: NumberInput::Int(number),
        os: "Ubuntu 22.04".into(),
        ram: "64GB".into(),
        storage: "2TB".into(),
        username: "admin".into(),
        password: "hunter2".into(),
        server_ip: ip.into(),
        allocated_domains: ListInput::One("app.example.com".into()),
        teams: ListInput::One("infra".into()),
        status: None,
    }
}

/// A sample for `server` with the given CPU figure and zeroed counters.
pub fn sample_at(server: &ServerInfo, timestamp: DateTime<Utc>, cpu: f64) -> NewPerformanceSample {
    NewPerformanceSample {
        server_id: server.id,
        server_ip: server.server_ip.clone(),
        timestamp,
        uptime: 3_600,
        cpu_utilization: cpu,
        memory_usage: 50.0,
        disk_usage: 25.0,
        network_in: 0,
        network_out: 0,
    }
}
