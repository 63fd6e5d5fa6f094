//! Performance rollups.
//!
//! Everything here is pure: callers fetch samples from the store and pass
//! `now` explicitly, so the same inputs always produce the same report.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serverdeck_shared::{
    CpuUtilization, NetworkStats, PerformanceReport, PerformanceSample, ServerInfo,
    ServerPerformanceSummary, ServerReport,
};

use crate::error::{ServiceError, ServiceResult};

/// Trailing sub-windows for CPU averages, measured back from `now`
/// independently of the fetch window.
pub const LONG_CPU_WINDOW_DAYS: i64 = 15;
pub const SHORT_CPU_WINDOW_DAYS: i64 = 7;

/// Length of the report's fetch window, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookbackDays(u32);

impl LookbackDays {
    pub const DEFAULT: LookbackDays = LookbackDays(15);

    /// Accepts `1..=max_days`. Zero, negatives and values above the limit
    /// are rejected rather than clamped.
    pub fn new(days: i64, max_days: u32) -> ServiceResult<Self> {
        if days <= 0 {
            return Err(ServiceError::InvalidInput(format!(
                "Lookback window must be a positive number of days, got {}",
                days
            )));
        }
        if days > i64::from(max_days) {
            return Err(ServiceError::InvalidInput(format!(
                "Lookback window exceeds maximum of {} days",
                max_days
            )));
        }
        Ok(LookbackDays(days as u32))
    }

    pub fn parse(raw: &str, max_days: u32) -> ServiceResult<Self> {
        let days: i64 = raw.trim().parse().map_err(|_| {
            ServiceError::InvalidInput(format!(
                "Lookback window must be an integer number of days, got '{}'",
                raw
            ))
        })?;
        Self::new(days, max_days)
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.0))
    }

    /// Human-readable range echoed in reports, e.g. "15 days".
    pub fn label(&self) -> String {
        format!("{} days", self.0)
    }
}

impl Default for LookbackDays {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for LookbackDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte counters are summed saturating at `i64::MAX`.
fn total(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0i64, i64::saturating_add)
}

/// Round to two decimals, halves away from zero (all inputs here are >= 0).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

// Greatest timestamp wins; on a tie the earlier-inserted (lower id) sample.
fn is_newer(candidate: &PerformanceSample, current: &PerformanceSample) -> bool {
    candidate.timestamp > current.timestamp
        || (candidate.timestamp == current.timestamp && candidate.id < current.id)
}

/// The single most recent sample of a set.
pub fn most_recent(samples: &[PerformanceSample]) -> Option<&PerformanceSample> {
    samples.iter().fold(None, |best, sample| match best {
        Some(current) if !is_newer(sample, current) => Some(current),
        _ => Some(sample),
    })
}

/// Roll up the samples fetched for one server.
///
/// `samples` is the whole fetched set for the lookback window. Memory, disk
/// and network figures cover all of it; the CPU averages only cover samples
/// inside the trailing 15 and 7 day windows ending at `now`.
pub fn compute_report(
    samples: &[PerformanceSample],
    lookback: LookbackDays,
    now: DateTime<Utc>,
) -> ServerReport {
    let Some(latest) = most_recent(samples) else {
        return ServerReport::NoData;
    };

    let long_start = now - Duration::days(LONG_CPU_WINDOW_DAYS);
    let short_start = now - Duration::days(SHORT_CPU_WINDOW_DAYS);

    let cpu_since = |start: DateTime<Utc>| {
        mean(
            samples
                .iter()
                .filter(|s| s.timestamp >= start)
                .map(|s| s.cpu_utilization),
        )
    };

    ServerReport::Available(PerformanceReport {
        uptime: latest.uptime,
        cpu_utilization: CpuUtilization {
            last_15_days: round2(cpu_since(long_start)),
            last_7_days: round2(cpu_since(short_start)),
        },
        memory_usage: round2(mean(samples.iter().map(|s| s.memory_usage))),
        disk_usage: round2(mean(samples.iter().map(|s| s.disk_usage))),
        network_stats: NetworkStats {
            inbound: total(samples.iter().map(|s| s.network_in)),
            outbound: total(samples.iter().map(|s| s.network_out)),
        },
        data_points: Some(samples.len()),
        time_range: Some(lookback.label()),
    })
}

/// Reduce an arbitrary batch of samples to the latest one per server.
pub fn latest_per_server(
    samples: impl IntoIterator<Item = PerformanceSample>,
) -> HashMap<i32, PerformanceSample> {
    let mut latest: HashMap<i32, PerformanceSample> = HashMap::new();
    for sample in samples {
        match latest.get(&sample.server_id) {
            Some(current) if !is_newer(&sample, current) => {}
            _ => {
                latest.insert(sample.server_id, sample);
            }
        }
    }
    latest
}

/// One row per server, in the order given, whether or not it has samples.
pub fn summarize_fleet(
    servers: &[ServerInfo],
    latest: &HashMap<i32, PerformanceSample>,
) -> Vec<ServerPerformanceSummary> {
    servers
        .iter()
        .map(|server| match latest.get(&server.id) {
            Some(sample) => ServerPerformanceSummary {
                server_id: server.id,
                server_name: server.model.clone(),
                server_ip: server.server_ip.clone(),
                uptime: sample.uptime,
                cpu_utilization: sample.cpu_utilization,
                memory_usage: sample.memory_usage,
                disk_usage: sample.disk_usage,
                last_updated: Some(sample.timestamp),
            },
            None => ServerPerformanceSummary {
                server_id: server.id,
                server_name: server.model.clone(),
                server_ip: server.server_ip.clone(),
                uptime: 0,
                cpu_utilization: 0.0,
                memory_usage: 0.0,
                disk_usage: 0.0,
                last_updated: None,
            },
        })
        .collect()
}
