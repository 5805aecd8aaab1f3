//! Engine tuning loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

use insync_core::phone::DEFAULT_COUNTRY_CODE;

const DEFAULT_DISPATCH_INTERVAL_SECS: u64 = 60;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 300;
const DEFAULT_BATCH_SIZE: i64 = 200;
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_ATTEMPTS: i32 = 10;
const DEFAULT_CLAIM_LEASE_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Scheduling and delivery settings shared by the loops and the coordinator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period of the dispatch loop.
    pub dispatch_interval: Duration,
    /// Period of the retry loop.
    pub retry_interval: Duration,
    /// Maximum records picked up per tick.
    pub batch_size: i64,
    /// Deliveries run in parallel within one tick.
    pub concurrency: usize,
    /// Timeout applied to every transport call.
    pub send_timeout: Duration,
    /// Attempts before a record is abandoned; `0` retries forever.
    pub max_attempts: i32,
    /// How long a record may stay `Sending` before it counts as interrupted.
    pub claim_lease: Duration,
    /// Prefix for 10-digit national phone numbers.
    pub default_country_code: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(DEFAULT_DISPATCH_INTERVAL_SECS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            claim_lease: Duration::from_secs(DEFAULT_CLAIM_LEASE_SECS),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default |
    /// |---------------------------------|---------|
    /// | `NOTIFY_DISPATCH_INTERVAL_SECS` | `60`    |
    /// | `NOTIFY_RETRY_INTERVAL_SECS`    | `300`   |
    /// | `NOTIFY_BATCH_SIZE`             | `200`   |
    /// | `NOTIFY_CONCURRENCY`            | `8`     |
    /// | `NOTIFY_SEND_TIMEOUT_SECS`      | `15`    |
    /// | `NOTIFY_MAX_ATTEMPTS`           | `10`    |
    /// | `NOTIFY_CLAIM_LEASE_SECS`       | `600`   |
    /// | `SMS_DEFAULT_COUNTRY_CODE`      | `1`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |var, default: Duration| -> Result<Duration, ConfigError> {
            let value: u64 = parse(&lookup, var, default.as_secs())?;
            positive(var, value)?;
            Ok(Duration::from_secs(value))
        };

        let dispatch_interval = secs("NOTIFY_DISPATCH_INTERVAL_SECS", defaults.dispatch_interval)?;
        let retry_interval = secs("NOTIFY_RETRY_INTERVAL_SECS", defaults.retry_interval)?;
        let send_timeout = secs("NOTIFY_SEND_TIMEOUT_SECS", defaults.send_timeout)?;
        let claim_lease = secs("NOTIFY_CLAIM_LEASE_SECS", defaults.claim_lease)?;

        let batch_size: i64 = parse(&lookup, "NOTIFY_BATCH_SIZE", defaults.batch_size)?;
        positive("NOTIFY_BATCH_SIZE", batch_size)?;
        let concurrency: usize = parse(&lookup, "NOTIFY_CONCURRENCY", defaults.concurrency)?;
        positive("NOTIFY_CONCURRENCY", concurrency)?;

        let max_attempts: i32 = parse(&lookup, "NOTIFY_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts < 0 {
            return Err(ConfigError::Invalid {
                var: "NOTIFY_MAX_ATTEMPTS",
                value: max_attempts.to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        let default_country_code = lookup("SMS_DEFAULT_COUNTRY_CODE")
            .map(|v| v.trim().trim_start_matches('+').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_country_code);

        Ok(Self {
            dispatch_interval,
            retry_interval,
            batch_size,
            concurrency,
            send_timeout,
            max_attempts,
            claim_lease,
            default_country_code,
        })
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive<T>(var: &'static str, value: T) -> Result<(), ConfigError>
where
    T: PartialOrd + Default + ToString,
{
    if value > T::default() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.dispatch_interval, Duration::from_secs(60));
        assert_eq!(config.retry_interval, Duration::from_secs(300));
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.default_country_code, "1");
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("NOTIFY_DISPATCH_INTERVAL_SECS", "5"),
            ("NOTIFY_MAX_ATTEMPTS", "0"),
            ("SMS_DEFAULT_COUNTRY_CODE", "+44"),
        ])
        .unwrap();
        assert_eq!(config.dispatch_interval, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 0);
        assert_eq!(config.default_country_code, "44");
    }

    #[test]
    fn garbage_is_rejected() {
        assert_matches!(
            from_pairs(&[("NOTIFY_BATCH_SIZE", "lots")]),
            Err(ConfigError::Invalid { var: "NOTIFY_BATCH_SIZE", .. })
        );
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert_matches!(
            from_pairs(&[("NOTIFY_CONCURRENCY", "0")]),
            Err(ConfigError::Invalid { var: "NOTIFY_CONCURRENCY", .. })
        );
    }
}
