use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Power state recorded for a server. New servers start `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    On,
    #[default]
    Off,
}

impl PowerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerStatus::On => "on",
            PowerStatus::Off => "off",
        }
    }

    /// Anything other than "on" is treated as off.
    pub fn from_stored(value: &str) -> Self {
        if value.eq_ignore_ascii_case("on") {
            PowerStatus::On
        } else {
            PowerStatus::Off
        }
    }
}

/// A registered server as exposed over the API. Credentials stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub id: i32,
    pub server_number: i32,
    pub model: String,
    pub os: String,
    pub ram: String,
    pub storage: String,
    pub username: String,
    pub server_ip: String,
    pub allocated_domains: Vec<String>,
    pub teams: Vec<String>,
    pub status: PowerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A list field that older clients send as a single comma-delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    One(String),
    Many(Vec<String>),
}

impl Default for ListInput {
    fn default() -> Self {
        ListInput::Many(Vec::new())
    }
}

impl ListInput {
    /// Split, trim and drop empty entries. Order is preserved.
    pub fn normalize(&self) -> Vec<String> {
        let parts: Vec<&str> = match self {
            ListInput::One(value) => value.split(',').collect(),
            ListInput::Many(values) => values.iter().flat_map(|v| v.split(',')).collect(),
        };

        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Server number as sent by forms (string) or JSON clients (number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Int(i64),
    Text(String),
}

impl Default for NumberInput {
    fn default() -> Self {
        NumberInput::Text(String::new())
    }
}

impl NumberInput {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            NumberInput::Int(n) => Some(*n),
            NumberInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Add/edit payload for a server. Every field defaults so that missing
/// values surface as validation messages rather than parse failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerForm {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub server_number: NumberInput,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub server_ip: String,
    #[serde(default, alias = "allocatedDomain")]
    pub allocated_domains: ListInput,
    #[serde(default, alias = "team")]
    pub teams: ListInput,
    #[serde(default)]
    pub status: Option<PowerStatus>,
}

/// One stored performance measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub id: i32,
    pub server_id: i32,
    pub server_ip: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: i64,
    pub cpu_utilization: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_in: i64,
    pub network_out: i64,
}

/// A sample ready to be written; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerformanceSample {
    pub server_id: i32,
    pub server_ip: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: i64,
    pub cpu_utilization: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_in: i64,
    pub network_out: i64,
}

/// Ingestion payload for a single measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInput {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub uptime: i64,
    pub cpu_utilization: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub disk_usage: f64,
    #[serde(default)]
    pub network_in: i64,
    #[serde(default)]
    pub network_out: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuUtilization {
    #[serde(rename = "last15Days")]
    pub last_15_days: f64,
    #[serde(rename = "last7Days")]
    pub last_7_days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    #[serde(rename = "in")]
    pub inbound: i64,
    #[serde(rename = "out")]
    pub outbound: i64,
}

/// Rolled-up performance for one server over a lookback window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub uptime: i64,
    pub cpu_utilization: CpuUtilization,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_stats: NetworkStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
}

/// Outcome of a report request. `NoData` is a valid result, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "report", rename_all = "camelCase")]
pub enum ServerReport {
    Available(PerformanceReport),
    NoData,
}

impl ServerReport {
    pub fn has_data(&self) -> bool {
        matches!(self, ServerReport::Available(_))
    }

    /// The report body, zero-valued when there was no data.
    pub fn into_data(self) -> PerformanceReport {
        match self {
            ServerReport::Available(report) => report,
            ServerReport::NoData => PerformanceReport::default(),
        }
    }
}

/// One row of the fleet summary: a server and its latest sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPerformanceSummary {
    pub server_id: i32,
    pub server_name: String,
    pub server_ip: String,
    pub uptime: i64,
    pub cpu_utilization: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_servers: usize,
    pub online_servers: usize,
    pub offline_servers: usize,
    pub active_teams: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub servers: Vec<ServerInfo>,
    pub stats: FleetStats,
}
