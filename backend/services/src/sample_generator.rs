//! Synthetic performance rows for demos and manual testing.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serverdeck_shared::{NewPerformanceSample, ServerInfo};

use crate::aggregation::round2;

/// Today plus the fourteen days before it.
pub const DEFAULT_SAMPLE_DAYS: u32 = 15;

const UPTIME_RANGE_SECS: std::ops::Range<i64> = 3_600..90_000;
const NETWORK_BYTES_RANGE: std::ops::Range<i64> = 0..1_000_000;

/// One sample per day for `days` days, oldest first, the last stamped `now`.
///
/// Values are drawn independently; nothing is checked against samples that
/// already exist for the same server and day.
pub fn generate_samples<R: Rng>(
    server: &ServerInfo,
    days: u32,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<NewPerformanceSample> {
    (0..days)
        .rev()
        .map(|days_ago| NewPerformanceSample {
            server_id: server.id,
            server_ip: server.server_ip.clone(),
            timestamp: now - Duration::days(i64::from(days_ago)),
            uptime: rng.gen_range(UPTIME_RANGE_SECS),
            cpu_utilization: random_percent(rng),
            memory_usage: random_percent(rng),
            disk_usage: random_percent(rng),
            network_in: rng.gen_range(NETWORK_BYTES_RANGE),
            network_out: rng.gen_range(NETWORK_BYTES_RANGE),
        })
        .collect()
}

fn random_percent<R: Rng>(rng: &mut R) -> f64 {
    round2(rng.gen_range(0.0..100.0))
}
