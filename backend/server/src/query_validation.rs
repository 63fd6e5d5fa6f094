use serde::Deserialize;
use serverdeck_services::performance_service::MAX_GENERATED_DAYS;
use serverdeck_services::sample_generator::DEFAULT_SAMPLE_DAYS;
use serverdeck_services::{LookbackDays, ServiceError, ServiceResult};

/// `?days=N`, kept as text so bad input reaches the validator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaysQuery {
    #[serde(default)]
    pub days: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub days: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

/// Validate and normalize window and size parameters
#[derive(Debug, Clone)]
pub struct ReportQueryValidator {
    default_lookback: LookbackDays,
    max_lookback_days: u32,
    default_sample_days: u32,
    max_results: u64,
}

impl ReportQueryValidator {
    /// Defaults outside their accepted ranges fall back to 15 days.
    pub fn new(
        default_lookback_days: u32,
        max_lookback_days: u32,
        default_sample_days: u32,
        max_results: u64,
    ) -> Self {
        let default_lookback = LookbackDays::new(i64::from(default_lookback_days), max_lookback_days)
            .unwrap_or_else(|_| {
                log::warn!(
                    "Default lookback of {} days is outside 1..={}; using {}",
                    default_lookback_days,
                    max_lookback_days,
                    LookbackDays::DEFAULT
                );
                LookbackDays::DEFAULT
            });

        let default_sample_days = if (1..=MAX_GENERATED_DAYS).contains(&default_sample_days) {
            default_sample_days
        } else {
            log::warn!(
                "Default sample days of {} is outside 1..={}; using {}",
                default_sample_days,
                MAX_GENERATED_DAYS,
                DEFAULT_SAMPLE_DAYS
            );
            DEFAULT_SAMPLE_DAYS
        };

        Self {
            default_lookback,
            max_lookback_days,
            default_sample_days,
            max_results,
        }
    }

    pub fn lookback(&self, raw: Option<&str>) -> ServiceResult<LookbackDays> {
        match raw {
            None => Ok(self.default_lookback),
            Some(value) => LookbackDays::parse(value, self.max_lookback_days),
        }
    }

    pub fn sample_days(&self, raw: Option<&str>) -> ServiceResult<u32> {
        let Some(value) = raw else {
            return Ok(self.default_sample_days);
        };
        match value.trim().parse::<u32>() {
            Ok(days) if (1..=MAX_GENERATED_DAYS).contains(&days) => Ok(days),
            _ => Err(ServiceError::InvalidInput(format!(
                "days must be an integer between 1 and {}, got {:?}",
                MAX_GENERATED_DAYS, value
            ))),
        }
    }

    /// Over-limit values are clamped; garbage is rejected.
    pub fn limit(&self, raw: Option<&str>) -> ServiceResult<u64> {
        let Some(value) = raw else {
            return Ok(self.max_results);
        };
        match value.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ServiceError::InvalidInput(format!(
                "limit must be a positive integer, got {:?}",
                value
            ))),
            Ok(limit) => Ok(limit.min(self.max_results)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ReportQueryValidator {
        ReportQueryValidator::new(15, 365, 15, 1000)
    }

    #[test]
    fn lookback_defaults_and_bounds() {
        let v = validator();

        assert_eq!(v.lookback(None).unwrap().days(), 15);
        assert_eq!(v.lookback(Some("30")).unwrap().days(), 30);
        for bad in ["0", "-3", "abc", "366", ""] {
            assert!(matches!(v.lookback(Some(bad)), Err(ServiceError::InvalidInput(_))), "{bad}");
        }
    }

    #[test]
    fn out_of_range_default_falls_back() {
        let v = ReportQueryValidator::new(900, 365, 15, 1000);
        assert_eq!(v.lookback(None).unwrap(), LookbackDays::DEFAULT);
    }

    #[test]
    fn out_of_range_sample_default_falls_back() {
        for configured in [0, 999] {
            let v = ReportQueryValidator::new(15, 365, configured, 1000);
            assert_eq!(v.sample_days(None).unwrap(), DEFAULT_SAMPLE_DAYS);
        }
        assert_eq!(ReportQueryValidator::new(15, 365, 30, 1000).sample_days(None).unwrap(), 30);
    }

    #[test]
    fn sample_days_default_and_rejects_zero() {
        let v = validator();

        assert_eq!(v.sample_days(None).unwrap(), 15);
        assert_eq!(v.sample_days(Some("3")).unwrap(), 3);
        assert!(v.sample_days(Some("0")).is_err());
        assert!(v.sample_days(Some("many")).is_err());
    }

    #[test]
    fn limit_is_clamped() {
        let v = validator();

        assert_eq!(v.limit(None).unwrap(), 1000);
        assert_eq!(v.limit(Some("50")).unwrap(), 50);
        assert_eq!(v.limit(Some("5000")).unwrap(), 1000);
        assert!(v.limit(Some("0")).is_err());
    }
}
