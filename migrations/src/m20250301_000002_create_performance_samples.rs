use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_servers::Servers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PerformanceSamples::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PerformanceSamples::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::ServerId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::ServerIp)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::Timestamp)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::Uptime)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::CpuUtilization)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::MemoryUsage)
                            .double()
                            .default(0.0)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::DiskUsage)
                            .double()
                            .default(0.0)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::NetworkIn)
                            .big_integer()
                            .default(0)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::NetworkOut)
                            .big_integer()
                            .default(0)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceSamples::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_performance_samples_server_id")
                            .from(PerformanceSamples::Table, PerformanceSamples::ServerId)
                            .to(Servers::Table, Servers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-server time-range scans and latest-sample lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_performance_samples_server_timestamp")
                    .table(PerformanceSamples::Table)
                    .col(PerformanceSamples::ServerId)
                    .col(PerformanceSamples::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_performance_samples_server_ip_timestamp")
                    .table(PerformanceSamples::Table)
                    .col(PerformanceSamples::ServerIp)
                    .col(PerformanceSamples::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PerformanceSamples::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PerformanceSamples {
    Table,
    Id,
    ServerId,
    ServerIp,
    Timestamp,
    Uptime,
    CpuUtilization,
    MemoryUsage,
    DiskUsage,
    NetworkIn,
    NetworkOut,
    CreatedAt,
}
