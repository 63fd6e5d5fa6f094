use std::net::IpAddr;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::Set;
use serde_json::{Value, json};
use serverdeck_shared::{Dashboard, FleetStats, PowerStatus, ServerForm, ServerInfo};

use crate::access::AccessGrant;
use crate::entity::{performance_samples, servers};
use crate::error::{ServiceError, ServiceResult};

pub const MIN_SERVER_NUMBER: i64 = 1;
pub const MAX_SERVER_NUMBER: i64 = 100;

/// A server form after trimming, list normalization and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedServer {
    pub server_number: i32,
    pub model: String,
    pub os: String,
    pub ram: String,
    pub storage: String,
    pub username: String,
    pub password: String,
    pub server_ip: String,
    pub allocated_domains: Vec<String>,
    pub teams: Vec<String>,
    pub status: Option<PowerStatus>,
}

fn required(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn validate_form(form: &ServerForm) -> ServiceResult<ValidatedServer> {
    let server_number = form
        .server_number
        .as_integer()
        .ok_or_else(|| ServiceError::InvalidInput("Server number must be an integer".into()))?;
    if !(MIN_SERVER_NUMBER..=MAX_SERVER_NUMBER).contains(&server_number) {
        return Err(ServiceError::InvalidInput(format!(
            "Server number must be between {} and {}",
            MIN_SERVER_NUMBER, MAX_SERVER_NUMBER
        )));
    }

    let server_ip = required("Server IP", &form.server_ip)?;
    if server_ip.parse::<IpAddr>().is_err() {
        return Err(ServiceError::InvalidInput(format!(
            "Server IP is not a valid address: {}",
            server_ip
        )));
    }

    let allocated_domains = form.allocated_domains.normalize();
    if allocated_domains.is_empty() {
        return Err(ServiceError::InvalidInput("Allocated domain is required".into()));
    }
    let teams = form.teams.normalize();
    if teams.is_empty() {
        return Err(ServiceError::InvalidInput("Team assignment is required".into()));
    }

    Ok(ValidatedServer {
        server_number: server_number as i32,
        model: required("Server model", &form.model)?,
        os: required("Operating system", &form.os)?,
        ram: required("RAM specification", &form.ram)?,
        storage: required("Storage specification", &form.storage)?,
        username: required("Username", &form.username)?,
        password: required("Password", &form.password)?,
        server_ip,
        allocated_domains,
        teams,
        status: form.status,
    })
}

/// Counts shown on the dashboard. Teams are counted per assignment, so a
/// team assigned to two servers counts twice.
pub fn fleet_stats(servers: &[ServerInfo]) -> FleetStats {
    let online_servers = servers.iter().filter(|s| s.status == PowerStatus::On).count();
    FleetStats {
        total_servers: servers.len(),
        online_servers,
        offline_servers: servers.len() - online_servers,
        active_teams: servers.iter().map(|s| s.teams.len()).sum(),
    }
}

pub struct ServerService {
    db: DatabaseConnection,
}

impl ServerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All servers ordered by server number
    pub async fn list_servers(&self) -> ServiceResult<Vec<ServerInfo>> {
        let rows = servers::Entity::find()
            .order_by_asc(servers::Column::ServerNumber)
            .all(&self.db)
            .await?;

        Ok(rows.iter().map(entity_to_server_info).collect())
    }

    pub async fn get_server(&self, server_id: i32) -> ServiceResult<ServerInfo> {
        let row = self.find_model(server_id).await?;
        Ok(entity_to_server_info(&row))
    }

    pub async fn create_server(
        &self,
        _grant: &AccessGrant,
        form: &ServerForm,
    ) -> ServiceResult<ServerInfo> {
        let server = validate_form(form)?;
        self.ensure_number_available(server.server_number, None).await?;

        let now = Utc::now().fixed_offset();
        let model = servers::ActiveModel {
            server_number: Set(server.server_number),
            model: Set(server.model),
            os: Set(server.os),
            ram: Set(server.ram),
            storage: Set(server.storage),
            username: Set(server.username),
            password: Set(server.password),
            server_ip: Set(server.server_ip),
            allocated_domains: Set(json!(server.allocated_domains)),
            teams: Set(json!(server.teams)),
            status: Set(server.status.unwrap_or_default().as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| number_conflict(e, server.server_number))?;

        log::info!("Registered server #{} ({})", model.server_number, model.model);
        Ok(entity_to_server_info(&model))
    }

    /// Replace every mutable field. An omitted status keeps the current one.
    pub async fn update_server(
        &self,
        _grant: &AccessGrant,
        server_id: i32,
        form: &ServerForm,
    ) -> ServiceResult<ServerInfo> {
        let server = validate_form(form)?;
        let existing = self.find_model(server_id).await?;
        self.ensure_number_available(server.server_number, Some(server_id)).await?;

        let status = server
            .status
            .unwrap_or_else(|| PowerStatus::from_stored(&existing.status));

        let mut active: servers::ActiveModel = existing.into();
        active.server_number = Set(server.server_number);
        active.model = Set(server.model);
        active.os = Set(server.os);
        active.ram = Set(server.ram);
        active.storage = Set(server.storage);
        active.username = Set(server.username);
        active.password = Set(server.password);
        active.server_ip = Set(server.server_ip);
        active.allocated_domains = Set(json!(server.allocated_domains));
        active.teams = Set(json!(server.teams));
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| number_conflict(e, server.server_number))?;
        Ok(entity_to_server_info(&updated))
    }

    /// Delete a server together with its samples.
    pub async fn delete_server(&self, _grant: &AccessGrant, server_id: i32) -> ServiceResult<()> {
        let txn = self.db.begin().await?;

        let removed_samples = performance_samples::Entity::delete_many()
            .filter(performance_samples::Column::ServerId.eq(server_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let removed = servers::Entity::delete_by_id(server_id).exec(&txn).await?;
        if removed.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::server_not_found(server_id));
        }

        txn.commit().await?;
        log::info!(
            "Deleted server {} and {} performance samples",
            server_id,
            removed_samples
        );
        Ok(())
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        let servers = self.list_servers().await?;
        let stats = fleet_stats(&servers);
        Ok(Dashboard { servers, stats })
    }

    async fn find_model(&self, server_id: i32) -> ServiceResult<servers::Model> {
        servers::Entity::find_by_id(server_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::server_not_found(server_id))
    }

    async fn ensure_number_available(
        &self,
        server_number: i32,
        exclude_id: Option<i32>,
    ) -> ServiceResult<()> {
        let mut query =
            servers::Entity::find().filter(servers::Column::ServerNumber.eq(server_number));
        if let Some(id) = exclude_id {
            query = query.filter(servers::Column::Id.ne(id));
        }

        if query.one(&self.db).await?.is_some() {
            return Err(number_in_use(server_number));
        }
        Ok(())
    }
}

fn number_in_use(server_number: i32) -> ServiceError {
    ServiceError::Conflict(format!("Server number {} is already in use", server_number))
}

// A concurrent writer can pass the pre-check and lose on the unique index.
fn number_conflict(err: DbErr, server_number: i32) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => number_in_use(server_number),
        _ => ServiceError::Store(err),
    }
}

// Rows written by older clients may hold a plain comma-delimited string.
fn json_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(arr) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![],
    }
}

pub(crate) fn entity_to_server_info(entity: &servers::Model) -> ServerInfo {
    ServerInfo {
        id: entity.id,
        server_number: entity.server_number,
        model: entity.model.clone(),
        os: entity.os.clone(),
        ram: entity.ram.clone(),
        storage: entity.storage.clone(),
        username: entity.username.clone(),
        server_ip: entity.server_ip.clone(),
        allocated_domains: json_list(&entity.allocated_domains),
        teams: json_list(&entity.teams),
        status: PowerStatus::from_stored(&entity.status),
        created_at: entity.created_at.with_timezone(&Utc),
        updated_at: entity.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_grant;
    use crate::test_utils::{server_form, setup_test_db};
    use serverdeck_shared::{ListInput, NumberInput};

    #[test]
    fn validate_form_normalizes_lists() {
        let mut form = server_form(4, "10.1.0.4");
        form.teams = ListInput::One(" infra ,web,, ".into());
        form.allocated_domains = ListInput::Many(vec!["a.example".into(), " b.example ".into()]);

        let server = validate_form(&form).unwrap();

        assert_eq!(server.teams, vec!["infra", "web"]);
        assert_eq!(server.allocated_domains, vec!["a.example", "b.example"]);
        assert_eq!(server.server_number, 4);
    }

    #[test]
    fn validate_form_rejects_bad_input() {
        let cases: Vec<Box<dyn Fn(&mut ServerForm)>> = vec![
            Box::new(|f: &mut ServerForm| f.server_number = NumberInput::Int(0)),
            Box::new(|f: &mut ServerForm| f.server_number = NumberInput::Int(101)),
            Box::new(|f: &mut ServerForm| f.server_number = NumberInput::Text("twelve".into())),
            Box::new(|f: &mut ServerForm| f.model = "   ".into()),
            Box::new(|f: &mut ServerForm| f.password = String::new()),
            Box::new(|f: &mut ServerForm| f.server_ip = "not-an-ip".into()),
            Box::new(|f: &mut ServerForm| f.teams = ListInput::One(" , ".into())),
            Box::new(|f: &mut ServerForm| f.allocated_domains = ListInput::Many(vec![])),
        ];

        for mutate in cases {
            let mut form = server_form(1, "10.0.0.1");
            mutate(&mut form);
            assert!(matches!(validate_form(&form), Err(ServiceError::InvalidInput(_))));
        }
    }

    #[test]
    fn json_list_reads_legacy_scalars() {
        assert_eq!(json_list(&json!("ops, qa")), vec!["ops", "qa"]);
        assert_eq!(json_list(&json!(["ops"])), vec!["ops"]);
        assert!(json_list(&Value::Null).is_empty());
    }

    #[tokio::test]
    async fn create_list_and_dashboard() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();

        let mut second = server_form(2, "10.0.0.2");
        second.status = Some(PowerStatus::On);
        second.teams = ListInput::One("infra, web".into());
        service.create_server(&grant, &second).await.unwrap();
        let first = service.create_server(&grant, &server_form(1, "10.0.0.1")).await.unwrap();
        assert_eq!(first.status, PowerStatus::Off);

        let dashboard = service.dashboard().await.unwrap();

        let numbers: Vec<i32> = dashboard.servers.iter().map(|s| s.server_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(
            dashboard.stats,
            FleetStats {
                total_servers: 2,
                online_servers: 1,
                offline_servers: 1,
                active_teams: 3,
            }
        );
    }

    #[tokio::test]
    async fn duplicate_server_number_conflicts() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();
        service.create_server(&grant, &server_form(5, "10.0.0.5")).await.unwrap();

        let err = service
            .create_server(&grant, &server_form(5, "10.0.0.6"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_duplicate_numbers_conflict() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();
        let first = server_form(5, "10.0.0.5");
        let second = server_form(5, "10.0.0.6");

        let (a, b) = tokio::join!(
            service.create_server(&grant, &first),
            service.create_server(&grant, &second)
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(ServiceError::Conflict(_))))
        );
        assert_eq!(service.list_servers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_keeps_status_when_omitted() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();
        let mut form = server_form(8, "10.0.0.8");
        form.status = Some(PowerStatus::On);
        let created = service.create_server(&grant, &form).await.unwrap();

        let mut edit = server_form(9, "10.0.0.99");
        edit.model = "DL360 Gen11".into();
        let updated = service.update_server(&grant, created.id, &edit).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.server_number, 9);
        assert_eq!(updated.model, "DL360 Gen11");
        assert_eq!(updated.server_ip, "10.0.0.99");
        assert_eq!(updated.status, PowerStatus::On);
    }

    #[tokio::test]
    async fn update_may_keep_its_own_number_but_not_take_another() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();
        let a = service.create_server(&grant, &server_form(1, "10.0.0.1")).await.unwrap();
        service.create_server(&grant, &server_form(2, "10.0.0.2")).await.unwrap();

        assert!(service.update_server(&grant, a.id, &server_form(1, "10.0.0.11")).await.is_ok());
        let err = service
            .update_server(&grant, a.id, &server_form(2, "10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_servers_are_not_found() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();

        assert!(matches!(service.get_server(77).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.update_server(&grant, 77, &server_form(3, "10.0.0.3")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_server(&grant, 77).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_server() {
        let service = ServerService::new(setup_test_db().await);
        let grant = test_grant();
        let created = service.create_server(&grant, &server_form(3, "10.0.0.3")).await.unwrap();

        service.delete_server(&grant, created.id).await.unwrap();

        assert!(service.list_servers().await.unwrap().is_empty());
    }
}
