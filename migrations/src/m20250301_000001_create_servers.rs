use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Servers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Servers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Servers::ServerNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Servers::Model).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::Os).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::Ram).string_len(100).not_null())
                    .col(ColumnDef::new(Servers::Storage).string_len(100).not_null())
                    .col(ColumnDef::new(Servers::Username).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::Password).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::ServerIp).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::AllocatedDomains).json().not_null())
                    .col(ColumnDef::new(Servers::Teams).json().not_null())
                    .col(
                        ColumnDef::new(Servers::Status)
                            .string_len(8)
                            .default("off")
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Servers::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Servers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_servers_server_number")
                    .table(Servers::Table)
                    .col(Servers::ServerNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Servers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Servers {
    Table,
    Id,
    ServerNumber,
    Model,
    Os,
    Ram,
    Storage,
    Username,
    Password,
    ServerIp,
    AllocatedDomains,
    Teams,
    Status,
    CreatedAt,
    UpdatedAt,
}
