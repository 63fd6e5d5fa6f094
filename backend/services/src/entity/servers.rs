use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "servers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub server_number: i32,
    pub model: String,
    pub os: String,
    pub ram: String,
    pub storage: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub server_ip: String,
    #[sea_orm(column_type = "Json")]
    pub allocated_domains: Json,
    #[sea_orm(column_type = "Json")]
    pub teams: Json,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::performance_samples::Entity")]
    PerformanceSamples,
}

impl Related<super::performance_samples::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PerformanceSamples.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
