use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "performance_samples")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub server_id: i32,
    pub server_ip: String,
    pub timestamp: DateTimeWithTimeZone,
    #[sea_orm(column_type = "BigInteger")]
    pub uptime: i64,
    #[sea_orm(column_type = "Double")]
    pub cpu_utilization: f64,
    #[sea_orm(column_type = "Double")]
    pub memory_usage: f64,
    #[sea_orm(column_type = "Double")]
    pub disk_usage: f64,
    #[sea_orm(column_type = "BigInteger")]
    pub network_in: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub network_out: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::servers::Entity",
        from = "Column::ServerId",
        to = "super::servers::Column::Id",
        on_delete = "Cascade"
    )]
    Server,
}

impl Related<super::servers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Server.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
