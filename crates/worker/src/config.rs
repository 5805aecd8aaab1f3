/// Process-level settings for the worker binary.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
    /// How long to wait for the loops to finish after a shutdown signal.
    pub shutdown_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `DATABASE_URL`          | required |
    /// | `LOG_FORMAT`            | `text` (`json` for JSON lines) |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`    |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let json_logs = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            database_url,
            json_logs,
            shutdown_timeout_secs,
        }
    }
}
