use sea_orm_migration::prelude::*;

pub mod m20250301_000001_create_servers;
pub mod m20250301_000002_create_performance_samples;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_servers::Migration),
            Box::new(m20250301_000002_create_performance_samples::Migration),
        ]
    }
}
